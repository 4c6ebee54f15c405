// In-memory object space backed by a petgraph graph
//
// A `Heap` is either assembled programmatically (tests, embedding hosts) or
// loaded from a JSON snapshot dumped by a host runtime. Referents come back
// in declaration order, referrers in the order their sources were inserted.

use crate::error::{Error, Result};
use crate::object::{Inspect, MapKeyRef, ObjectId, ObjectSpace, StructuralKind, SummaryError};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Maximum length of a generated or supplied summary
const SUMMARY_LIMIT: usize = 40;

/// Key of a mapping entry in a heap snapshot
///
/// Plain JSON strings become `Str`; anything else is described by type and
/// summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapKey {
    Str(String),
    Other { type_name: String, summary: String },
}

impl MapKey {
    pub fn other(type_name: impl Into<String>, summary: impl Into<String>) -> Self {
        MapKey::Other {
            type_name: type_name.into(),
            summary: summary.into(),
        }
    }

    fn borrowed(&self) -> MapKeyRef<'_> {
        match self {
            MapKey::Str(s) => MapKeyRef::Str(s),
            MapKey::Other { type_name, summary } => MapKeyRef::Other { type_name, summary },
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(s.to_string())
    }
}

/// One key/value pair of a mapping object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: MapKey,
    pub value: ObjectId,
}

/// An object stored in a heap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapObject {
    /// Short type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Module defining the type
    pub module: Option<String>,
    /// Explicit summary; generated from the kind when absent
    pub summary: Option<String>,
    /// Simulates a failing text rendering hook
    pub summary_fails: bool,
    pub kind: StructuralKind,
    pub finalizer: bool,
    /// Plain outgoing references, in order
    pub refs: Vec<ObjectId>,
    /// Attribute container
    pub attributes: Option<ObjectId>,
    pub entries: Vec<MapEntry>,
    pub locals: Option<ObjectId>,
    pub globals: Option<ObjectId>,
    pub receiver: Option<ObjectId>,
    pub function: Option<ObjectId>,
    /// Named attributes of a function object, sorted by name
    pub named: BTreeMap<String, ObjectId>,
}

impl HeapObject {
    /// Create a plain object of the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn kind(mut self, kind: StructuralKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_finalizer(mut self) -> Self {
        self.finalizer = true;
        self
    }

    pub fn unrepresentable(mut self) -> Self {
        self.summary_fails = true;
        self
    }

    pub fn refs(mut self, refs: impl IntoIterator<Item = ObjectId>) -> Self {
        self.refs.extend(refs);
        self
    }

    pub fn attributes(mut self, container: ObjectId) -> Self {
        self.attributes = Some(container);
        self
    }

    pub fn entry(mut self, key: impl Into<MapKey>, value: ObjectId) -> Self {
        self.kind = StructuralKind::Mapping;
        self.entries.push(MapEntry {
            key: key.into(),
            value,
        });
        self
    }

    pub fn frame(mut self, locals: ObjectId, globals: ObjectId) -> Self {
        self.kind = StructuralKind::Frame;
        self.locals = Some(locals);
        self.globals = Some(globals);
        self
    }

    pub fn bound(mut self, receiver: ObjectId, function: ObjectId) -> Self {
        self.kind = StructuralKind::Method;
        self.receiver = Some(receiver);
        self.function = Some(function);
        self
    }

    /// Named attribute of a function object
    pub fn function_attr(mut self, name: impl Into<String>, target: ObjectId) -> Self {
        self.kind = StructuralKind::Function;
        self.named.insert(name.into(), target);
        self
    }

    /// Every object this one references, without duplicates
    ///
    /// Plain references come first, structural links after.
    pub fn all_referents(&self) -> Vec<ObjectId> {
        let structural = self
            .attributes
            .into_iter()
            .chain(self.entries.iter().map(|e| e.value))
            .chain(self.locals)
            .chain(self.globals)
            .chain(self.receiver)
            .chain(self.function)
            .chain(self.named.values().copied());

        let mut out: Vec<ObjectId> = Vec::with_capacity(self.refs.len());
        for id in self.refs.iter().copied().chain(structural) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

}

impl Inspect for HeapObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn module_name(&self) -> Option<&str> {
        self.module.as_deref()
    }

    fn short_summary(&self) -> std::result::Result<String, SummaryError> {
        if self.summary_fails {
            return Err(SummaryError(format!("{} cannot be rendered", self.type_name)));
        }
        let summary = match (&self.summary, self.kind) {
            (Some(s), _) => s.clone(),
            (None, StructuralKind::Function) => format!("<function {}>", self.type_name),
            (None, _) => match self.len() {
                Some(n) => format!("{} items", n),
                None => format!("<{} object>", self.qualified_type_name()),
            },
        };
        Ok(summary.chars().take(SUMMARY_LIMIT).collect())
    }

    fn has_finalizer(&self) -> bool {
        self.finalizer
    }

    fn len(&self) -> Option<usize> {
        match self.kind {
            StructuralKind::Container => Some(self.refs.len()),
            StructuralKind::Mapping => Some(self.entries.len()),
            _ => None,
        }
    }

    fn structural_kind(&self) -> StructuralKind {
        self.kind
    }

    fn attribute_container(&self) -> Option<ObjectId> {
        self.attributes
    }

    fn frame_locals(&self) -> Option<ObjectId> {
        self.locals
    }

    fn frame_globals(&self) -> Option<ObjectId> {
        self.globals
    }

    fn bound_receiver(&self) -> Option<ObjectId> {
        self.receiver
    }

    fn bound_function(&self) -> Option<ObjectId> {
        self.function
    }

    fn mapping_entries(&self) -> Vec<(MapKeyRef<'_>, ObjectId)> {
        self.entries.iter().map(|e| (e.key.borrowed(), e.value)).collect()
    }

    fn function_attributes(&self) -> Vec<(&str, ObjectId)> {
        self.named.iter().map(|(k, &v)| (k.as_str(), v)).collect()
    }
}

/// Serialized form of a heap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub objects: Vec<SnapshotObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotObject {
    pub id: ObjectId,
    #[serde(flatten)]
    pub object: HeapObject,
}

/// Identity and insertion position of a graph node
///
/// Node indices are recycled after removal, so ordering uses `seq`.
#[derive(Debug, Clone, Copy)]
struct Slot {
    id: ObjectId,
    seq: u64,
}

/// A bounded, explicit object space
#[derive(Debug, Default)]
pub struct Heap {
    graph: StableDiGraph<HeapObject, ()>,
    index: HashMap<ObjectId, NodeIndex>,
    slots: HashMap<NodeIndex, Slot>,
    /// Referrers waiting for their target to be inserted
    pending: HashMap<ObjectId, Vec<ObjectId>>,
    next_id: u64,
    next_seq: u64,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Insert an object under a freshly assigned identity
    pub fn insert(&mut self, object: HeapObject) -> ObjectId {
        let mut id = ObjectId(self.next_id.max(1));
        // Only reachable once ids run up against u64::MAX.
        while self.index.contains_key(&id) {
            id = ObjectId(id.0.wrapping_add(1).max(1));
        }
        self.place(id, object);
        id
    }

    /// Insert an object under a caller-chosen identity
    pub fn insert_with_id(&mut self, id: ObjectId, object: HeapObject) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(Error::invalid_snapshot(format!("duplicate object id {}", id)));
        }
        self.place(id, object);
        Ok(())
    }

    fn place(&mut self, id: ObjectId, object: HeapObject) {
        let referents = object.all_referents();
        let node = self.graph.add_node(object);
        self.index.insert(id, node);
        self.slots.insert(
            node,
            Slot {
                id,
                seq: self.next_seq,
            },
        );
        self.next_seq += 1;
        self.next_id = self.next_id.max(id.0.saturating_add(1));

        for target in referents {
            self.connect(id, target);
        }
        for source in self.pending.remove(&id).unwrap_or_default() {
            self.connect(source, id);
        }
    }

    fn connect(&mut self, source: ObjectId, target: ObjectId) {
        match (self.index.get(&source), self.index.get(&target)) {
            (Some(&s), Some(&t)) => {
                self.graph.add_edge(s, t, ());
            }
            _ => self.pending.entry(target).or_default().push(source),
        }
    }

    /// Add a plain reference after both objects exist, e.g. to close a cycle
    pub fn link(&mut self, source: ObjectId, target: ObjectId) -> Result<()> {
        let node = *self.index.get(&source).ok_or(Error::UnknownObject(source))?;
        let object = &mut self.graph[node];
        if object.all_referents().contains(&target) {
            return Ok(());
        }
        object.refs.push(target);
        self.connect(source, target);
        Ok(())
    }

    /// Drop an object, as if it had been collected
    pub fn remove(&mut self, id: ObjectId) -> Option<HeapObject> {
        let node = self.index.remove(&id)?;
        self.slots.remove(&node);
        self.graph.remove_node(node)
    }

    pub fn object(&self, id: ObjectId) -> Option<&HeapObject> {
        self.index.get(&id).map(|&node| &self.graph[node])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Build a heap from a snapshot, validating every reference
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut heap = Heap::new();
        for SnapshotObject { id, object } in snapshot.objects {
            heap.insert_with_id(id, object)?;
        }
        if let Some((missing, sources)) = heap.pending.iter().next() {
            return Err(Error::invalid_snapshot(format!(
                "object {} referenced by {} does not exist",
                missing,
                sources.first().map(|s| s.to_string()).unwrap_or_default()
            )));
        }
        Ok(heap)
    }

    /// Load a JSON snapshot from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        Self::from_snapshot(snapshot)
    }

    /// Export the heap as a snapshot, objects ordered by identity
    pub fn to_snapshot(&self) -> Snapshot {
        let mut objects: Vec<SnapshotObject> = self
            .index
            .iter()
            .map(|(&id, &node)| SnapshotObject {
                id,
                object: self.graph[node].clone(),
            })
            .collect();
        objects.sort_by_key(|o| o.id);
        Snapshot { objects }
    }

    fn slot(&self, node: NodeIndex) -> Option<Slot> {
        self.slots.get(&node).copied()
    }
}

impl ObjectSpace for Heap {
    fn get(&self, id: ObjectId) -> Option<&dyn Inspect> {
        self.object(id).map(|o| o as &dyn Inspect)
    }

    fn tracked(&self) -> Vec<ObjectId> {
        let mut slots: Vec<Slot> = self.slots.values().copied().collect();
        slots.sort_by_key(|s| s.seq);
        slots.into_iter().map(|s| s.id).collect()
    }

    fn referrers(&self, id: ObjectId) -> Vec<ObjectId> {
        let Some(&node) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut sources: Vec<Slot> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter_map(|e| self.slot(e.source()))
            .collect();
        sources.sort_by_key(|s| s.seq);
        sources.dedup_by_key(|s| s.seq);
        sources.into_iter().map(|s| s.id).collect()
    }

    fn referents(&self, id: ObjectId) -> Vec<ObjectId> {
        self.object(id)
            .map(|o| {
                o.all_referents()
                    .into_iter()
                    .filter(|r| self.index.contains_key(r))
                    .collect()
            })
            .unwrap_or_default()
    }
}
