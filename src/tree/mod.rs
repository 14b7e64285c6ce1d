mod node;
mod tree;

pub use node::{DynamicChild, Node};
pub use tree::Tree;
