// Reference graph traversal
//
// Diagram construction, chain search and the rendering helpers both share.

pub mod builder;
pub mod chain;
pub mod color;
pub mod label;

pub use builder::{Direction, GraphBuilder, GraphOptions, Predicate};
pub use chain::{find_backref_chain, find_chain, find_ref_chain, DEFAULT_CHAIN_DEPTH};
pub use color::Hsv;
