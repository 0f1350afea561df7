//! Core job-graph data structures

mod arena;
mod node;

pub use arena::Graph;
pub use node::{InputValue, Node, NodeId, NodeMeta};
