// Bounded breadth-first construction of reference diagrams
//
// The builder walks an object space from a root set, following whatever
// neighbors its edge source yields, and records what it sees as a `Diagram`.

use crate::error::{Error, Result};
use crate::graph::color::{self, gradient, TOO_MANY_END, TOO_MANY_START};
use crate::graph::label::{edge_label, extra_attrs, object_label};
use crate::object::{EdgeSource, Inspect, ObjectId, ObjectSpace, StructuralKind};
use crate::output::{Diagram, Statement};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Predicate over an object in the space
pub type Predicate<'a> = Box<dyn Fn(ObjectId, &dyn Inspect) -> bool + 'a>;

/// Caller-supplied label annotation
pub type ExtraInfo<'a> = Box<dyn Fn(ObjectId, &dyn Inspect) -> String + 'a>;

/// Caller-supplied node attributes; `None` values are dropped
pub type ExtraNodeAttrs<'a> = Box<dyn Fn(ObjectId, &dyn Inspect) -> BTreeMap<String, Option<String>> + 'a>;

/// Which way edges are followed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow referrers; arrows point from the neighbor to the object
    Backward,
    /// Follow referents; arrows point from the object to the neighbor
    Forward,
}

impl Direction {
    fn summary_label(self, skipped: usize) -> String {
        match self {
            Direction::Backward => format!("{} more backreferences", skipped),
            Direction::Forward => format!("{} more references", skipped),
        }
    }
}

/// Traversal limits and decorations
pub struct GraphOptions<'a> {
    pub max_depth: usize,
    /// Fan-out limit per node
    pub too_many: usize,
    pub extra_ignore: HashSet<ObjectId>,
    /// Rejected neighbors are neither drawn nor traversed
    pub filter: Option<Predicate<'a>>,
    pub highlight: Option<Predicate<'a>>,
    /// Culled objects are traversed through but not drawn
    pub cull: Option<Predicate<'a>>,
    pub extra_info: Option<ExtraInfo<'a>>,
    pub extra_node_attrs: Option<ExtraNodeAttrs<'a>>,
    /// Append the referrer count to each type name
    pub refcounts: bool,
    pub shortnames: bool,
}

impl Default for GraphOptions<'_> {
    fn default() -> Self {
        Self {
            max_depth: 3,
            too_many: 10,
            extra_ignore: HashSet::new(),
            filter: None,
            highlight: None,
            cull: None,
            extra_info: None,
            extra_node_attrs: None,
            refcounts: false,
            shortnames: true,
        }
    }
}

impl<'a> GraphOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn too_many(mut self, too_many: usize) -> Self {
        self.too_many = too_many;
        self
    }

    pub fn ignore(mut self, ids: impl IntoIterator<Item = ObjectId>) -> Self {
        self.extra_ignore.extend(ids);
        self
    }

    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(ObjectId, &dyn Inspect) -> bool + 'a,
    {
        self.filter = Some(Box::new(f));
        self
    }

    pub fn highlight<F>(mut self, f: F) -> Self
    where
        F: Fn(ObjectId, &dyn Inspect) -> bool + 'a,
    {
        self.highlight = Some(Box::new(f));
        self
    }

    pub fn cull<F>(mut self, f: F) -> Self
    where
        F: Fn(ObjectId, &dyn Inspect) -> bool + 'a,
    {
        self.cull = Some(Box::new(f));
        self
    }

    pub fn extra_info<F>(mut self, f: F) -> Self
    where
        F: Fn(ObjectId, &dyn Inspect) -> String + 'a,
    {
        self.extra_info = Some(Box::new(f));
        self
    }

    pub fn extra_node_attrs<F>(mut self, f: F) -> Self
    where
        F: Fn(ObjectId, &dyn Inspect) -> BTreeMap<String, Option<String>> + 'a,
    {
        self.extra_node_attrs = Some(Box::new(f));
        self
    }

    pub fn refcounts(mut self, refcounts: bool) -> Self {
        self.refcounts = refcounts;
        self
    }

    pub fn shortnames(mut self, shortnames: bool) -> Self {
        self.shortnames = shortnames;
        self
    }
}

/// Builds diagrams over one object space
pub struct GraphBuilder<'s, 'o> {
    space: &'s dyn ObjectSpace,
    options: GraphOptions<'o>,
}

/// Per-build working state
struct Walk {
    queue: VecDeque<ObjectId>,
    depth: HashMap<ObjectId, usize>,
    /// Drawn node standing in for each culled object
    anchors: HashMap<ObjectId, ObjectId>,
    /// First weak-reference wrapper seen; all others fold into it
    weak_canonical: Option<ObjectId>,
}

impl<'s, 'o> GraphBuilder<'s, 'o> {
    pub fn new(space: &'s dyn ObjectSpace, options: GraphOptions<'o>) -> Self {
        Self { space, options }
    }

    /// Walk from `roots` and describe everything reached
    ///
    /// Every root must exist in the space. An empty root set yields an
    /// empty diagram.
    pub fn build(
        &self,
        roots: &[ObjectId],
        edges: &dyn EdgeSource,
        direction: Direction,
    ) -> Result<Diagram> {
        let mut diagram = Diagram::new();
        let mut walk = Walk {
            queue: VecDeque::new(),
            depth: HashMap::new(),
            anchors: HashMap::new(),
            weak_canonical: None,
        };

        for &root in roots {
            if !self.space.contains(root) {
                return Err(Error::UnknownObject(root));
            }
            let root = self.canonical(&mut walk, root);
            if walk.depth.contains_key(&root) {
                continue;
            }
            diagram.push(Statement::Root { id: root.node_id() });
            walk.depth.insert(root, 0);
            walk.queue.push_back(root);
        }

        let mut edge_count = 0usize;
        while let Some(target) = walk.queue.pop_front() {
            let Some(obj) = self.space.get(target) else {
                continue;
            };
            let tdepth = walk.depth[&target];
            let anchor = walk.anchors.get(&target).copied();
            // Objects without an anchor are drawn.
            let visible = anchor.unwrap_or(target);

            if anchor.is_none() {
                self.emit_node(&mut diagram, target, obj, tdepth);
            }

            if tdepth >= self.options.max_depth {
                continue;
            }
            if obj.structural_kind() == StructuralKind::Module {
                continue;
            }

            let mut n = 0usize;
            let mut skipped = 0usize;
            for neighbor in edges.neighbors(target) {
                if self.options.extra_ignore.contains(&neighbor) {
                    continue;
                }
                let neighbor = self.canonical(&mut walk, neighbor);
                if self.options.extra_ignore.contains(&neighbor) {
                    continue;
                }
                let Some(nobj) = self.space.get(neighbor) else {
                    continue;
                };
                if let Some(filter) = &self.options.filter {
                    if !filter(neighbor, nobj) {
                        continue;
                    }
                }
                if n >= self.options.too_many {
                    skipped += 1;
                    continue;
                }
                n += 1;

                let first_visit = !walk.depth.contains_key(&neighbor);
                let neighbor_culled = if first_visit {
                    self.is_culled(neighbor, nobj)
                } else {
                    walk.anchors.contains_key(&neighbor)
                };

                if !neighbor_culled && !(anchor.is_some() && neighbor == visible) {
                    diagram.push(self.edge(direction, target, obj, visible, neighbor, nobj));
                    edge_count += 1;
                }

                if first_visit {
                    walk.depth.insert(neighbor, tdepth + 1);
                    if neighbor_culled {
                        walk.anchors.insert(neighbor, visible);
                    }
                    walk.queue.push_back(neighbor);
                }
            }

            if skipped > 0 {
                self.emit_summary(&mut diagram, direction, target, visible, tdepth, skipped);
            }
        }

        tracing::debug!(
            nodes = diagram.node_count(),
            edges = edge_count,
            visited = walk.depth.len(),
            "object graph built"
        );
        Ok(diagram)
    }

    /// Fold weak-reference wrappers into one node
    fn canonical(&self, walk: &mut Walk, id: ObjectId) -> ObjectId {
        let is_weak = self
            .space
            .get(id)
            .map(|o| o.structural_kind() == StructuralKind::WeakRef)
            .unwrap_or(false);
        if !is_weak {
            return id;
        }
        *walk.weak_canonical.get_or_insert(id)
    }

    fn is_culled(&self, id: ObjectId, obj: &dyn Inspect) -> bool {
        self.options.cull.as_ref().map(|cull| cull(id, obj)).unwrap_or(false)
    }

    fn emit_node(&self, diagram: &mut Diagram, id: ObjectId, obj: &dyn Inspect, depth: usize) {
        let node = id.node_id();
        let extra_info = self.options.extra_info.as_ref().map(|f| f(id, obj));
        let extra = self
            .options
            .extra_node_attrs
            .as_ref()
            .map(|f| extra_attrs(&f(id, obj)))
            .unwrap_or_default();
        let refcount = self
            .options
            .refcounts
            .then(|| self.space.referrers(id).len());
        diagram.push(Statement::Label {
            id: node.clone(),
            label: object_label(obj, extra_info.as_deref(), refcount, self.options.shortnames),
            extra,
        });

        let highlighted = self
            .options
            .highlight
            .as_ref()
            .map(|h| h(id, obj))
            .unwrap_or(false);
        let is_module = obj.structural_kind() == StructuralKind::Module;
        let fill = color::node_color(depth, self.options.max_depth, is_module, highlighted);
        diagram.push(Statement::Fill {
            id: node.clone(),
            color: fill,
        });
        if color::needs_light_text(fill) {
            diagram.push(Statement::LightText { id: node.clone() });
        }

        if obj.has_finalizer() {
            let satellite = format!("{}_has_finalizer", node);
            diagram.push(Statement::Marker {
                from: node,
                to: satellite.clone(),
            });
            diagram.push(Statement::Finalizer { id: satellite });
        }
    }

    /// Edge between the drawn stand-in of `target` and `neighbor`
    fn edge(
        &self,
        direction: Direction,
        target: ObjectId,
        tobj: &dyn Inspect,
        visible: ObjectId,
        neighbor: ObjectId,
        nobj: &dyn Inspect,
    ) -> Statement {
        let spliced = visible != target;
        let (from, to, attrs) = match direction {
            Direction::Backward => {
                let attrs = if spliced {
                    String::new()
                } else {
                    edge_label(nobj, target, self.options.shortnames)
                };
                (neighbor, visible, attrs)
            }
            Direction::Forward => {
                let attrs = if spliced {
                    String::new()
                } else {
                    edge_label(tobj, neighbor, self.options.shortnames)
                };
                (visible, neighbor, attrs)
            }
        };
        Statement::Edge {
            from: from.node_id(),
            to: to.node_id(),
            attrs,
        }
    }

    fn emit_summary(
        &self,
        diagram: &mut Diagram,
        direction: Direction,
        target: ObjectId,
        visible: ObjectId,
        depth: usize,
        skipped: usize,
    ) {
        let summary = format!("too_many_{}", target.node_id());
        let node = visible.node_id();
        let marker = match direction {
            Direction::Backward => Statement::Marker {
                from: summary.clone(),
                to: node,
            },
            Direction::Forward => Statement::Marker {
                from: node,
                to: summary.clone(),
            },
        };
        diagram.push(marker);
        diagram.push(Statement::Summary {
            id: summary.clone(),
            label: direction.summary_label(skipped),
            color: gradient(TOO_MANY_START, TOO_MANY_END, depth + 1, self.options.max_depth),
        });
        diagram.push(Statement::LightText { id: summary });
    }
}
