pub mod aggregate;
pub mod alias;
pub mod expr;
pub mod expr_fn;
pub mod tree_node;
pub mod window;
mod operation;

pub use aggregate::*;
pub use alias::*;
pub use expr::*;
pub use expr_fn::*;
pub use tree_node::*;
pub use window::*;


