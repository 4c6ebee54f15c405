// Diagram model and DOT serialization
//
// A diagram is an ordered list of statements exactly as a traversal emitted
// them. Rendering is a straight walk over that list, so output is
// byte-stable for a given traversal.

use crate::graph::color::Hsv;
use std::io::{self, Write};

/// Header shared by every diagram
pub const DOT_HEADER: &str = "digraph ObjectGraph {\n  node[shape=box, style=filled, fillcolor=white];\n";

/// One line of a diagram
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Marks a node as belonging to the root set
    Root { id: String },
    /// Node label, already quoted, plus extra attributes
    Label { id: String, label: String, extra: String },
    Fill { id: String, color: Hsv },
    /// White text on a dark fill
    LightText { id: String },
    /// Reference edge; `attrs` is empty or a bracketed list with a leading space
    Edge { from: String, to: String, attrs: String },
    /// Short dotted edge tying a synthetic node to its object
    Marker { from: String, to: String },
    /// Stand-in for neighbors dropped by the fan-out limit
    Summary { id: String, label: String, color: Hsv },
    /// Satellite flagging an attached finalizer
    Finalizer { id: String },
}

impl Statement {
    fn write_to(&self, w: &mut dyn Write) -> io::Result<()> {
        match self {
            Statement::Root { id } => writeln!(w, "  {}[fontcolor=red];", id),
            Statement::Label { id, label, extra } => {
                writeln!(w, "  {}[label=\"{}\"{}];", id, label, extra)
            }
            Statement::Fill { id, color } => writeln!(w, "  {}[fillcolor=\"{}\"];", id, color),
            Statement::LightText { id } => writeln!(w, "  {}[fontcolor=white];", id),
            Statement::Edge { from, to, attrs } => writeln!(w, "  {} -> {}{};", from, to, attrs),
            Statement::Marker { from, to } => writeln!(
                w,
                "  {} -> {} [color=red,style=dotted,len=0.25,weight=10];",
                from, to
            ),
            Statement::Summary { id, label, color } => writeln!(
                w,
                "  {}[label=\"{}\",shape=box,height=0.25,color=red,fillcolor=\"{}\",fontsize=6];",
                id, label, color
            ),
            Statement::Finalizer { id } => writeln!(
                w,
                "  {}[label=\"finalizer\",shape=doublecircle,height=0.25,color=red,fillcolor=\"0,.5,1\",fontsize=6];",
                id
            ),
        }
    }
}

/// A reference edge as seen from the outside
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeView<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub attrs: &'a str,
}

/// Node and edge declarations produced by one traversal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagram {
    statements: Vec<Statement>,
    /// Objects drawn, synthetic nodes excluded
    node_count: usize,
}

impl Diagram {
    /// Create an empty diagram
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        if matches!(statement, Statement::Label { .. }) {
            self.node_count += 1;
        }
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Number of object nodes
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Ids of labeled object nodes, in emission order
    pub fn nodes(&self) -> Vec<&str> {
        self.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Label { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Reference edges, in emission order
    pub fn edges(&self) -> Vec<EdgeView<'_>> {
        self.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Edge { from, to, attrs } => Some(EdgeView {
                    from: from.as_str(),
                    to: to.as_str(),
                    attrs: attrs.as_str(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Ids of nodes marked as roots
    pub fn roots(&self) -> Vec<&str> {
        self.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Root { id } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Fill color of a node, if one was emitted
    pub fn fill_of(&self, node: &str) -> Option<Hsv> {
        self.statements.iter().find_map(|s| match s {
            Statement::Fill { id, color } if id == node => Some(*color),
            _ => None,
        })
    }

    /// Summary nodes with their labels
    pub fn summaries(&self) -> Vec<(&str, &str)> {
        self.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Summary { id, label, .. } => Some((id.as_str(), label.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Serialize as Graphviz DOT
    pub fn write_dot(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(DOT_HEADER.as_bytes())?;
        for statement in &self.statements {
            statement.write_to(w)?;
        }
        w.write_all(b"}\n")
    }

    pub fn to_dot(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_dot(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
