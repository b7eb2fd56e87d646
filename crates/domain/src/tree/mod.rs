//! Resource tree model.

mod aggregate;
mod node;
mod path;

pub use aggregate::{AggregateTree, ResourceEntry};
pub use node::{NodeKind, Protocol, ResourceClass, TreeNode};
pub use path::ResourcePath;

#[cfg(test)]
pub(crate) use node::tests::{path as test_path, sample_root};
