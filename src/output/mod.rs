// Output generation module

pub mod diagrams;
pub mod present;

pub use diagrams::*;
pub use present::{GraphOutput, Presentation, Presenter, SystemTools, ToolRunner};
