//! refgraph - Explore object reference graphs
//!
//! Walks a bounded object space breadth-first from a set of roots and
//! renders what it finds as Graphviz DOT, finds shortest reference chains
//! and takes a census of tracked objects. A JSON heap snapshot format and
//! the `refgraph` binary make the same tools available from the shell.

pub mod census;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod object;
pub mod output;
pub mod show;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use graph::{
    find_backref_chain, find_chain, find_ref_chain, Direction, GraphBuilder, GraphOptions,
};
pub use object::{
    EdgeSource, Heap, HeapObject, Inspect, ObjectId, ObjectSpace, Referents, Referrers,
    StructuralKind,
};
pub use output::{Diagram, GraphOutput, Presentation, Presenter, SystemTools, ToolRunner};
pub use show::{show_backrefs, show_chain, show_graph, show_refs};
