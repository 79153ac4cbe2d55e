//! The process graph data model.

mod action;
pub mod artifact;
mod graph;
mod process;
mod types;
mod value;

pub use action::*;
pub use artifact::ProcessArchive;
pub use graph::GraphIndex;
pub use process::*;
pub use types::*;
pub use value::*;
