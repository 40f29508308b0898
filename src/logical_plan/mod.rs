pub mod logical_plan;
pub mod tree_node;

pub use logical_plan::*;
pub use tree_node::*;
