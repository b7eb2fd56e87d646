//! Arbor Domain - Core drag-and-drop types
//!
//! This crate defines the ordered-tree model of the Arbor workspace and the
//! pure algorithms that turn a drop into a minimal mutation of it.
//! All types here are pure Rust with no I/O dependencies.

pub mod diff;
pub mod drag;
pub mod edge;
pub mod error;
pub mod id;
pub mod lists;
pub mod migration;
pub mod order;
pub mod resource;
pub mod settings;
pub mod tree;
pub mod ui_state;

pub use diff::{OrderUpdate, PatchSet};
pub use drag::{
    Availability, DragDomain, DragSource, DropEvent, DropInstruction, DropOperation, DropTarget,
    ParamRowRef, TreeNodeRef,
};
pub use edge::{DropClass, DropRejection, ResolvedDrop};
pub use error::{DomainError, DomainResult};
pub use id::generate_id;
pub use order::{Edge, Ordered, Placement};
pub use resource::{CreateResourceInput, CreatedResource, UpdateResourceInput};
pub use settings::EngineSettings;
pub use tree::{
    AggregateTree, NodeKind, Protocol, ResourceClass, ResourceEntry, ResourcePath, TreeNode,
};
pub use ui_state::{TreeItemState, TreeItemUIState, TreeStateTable};
