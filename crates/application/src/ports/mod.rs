//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the drop engine and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod activity_bar_repository;
mod environment_backend;
mod file_system;
mod resource_backend;
mod tree_state_repository;

pub use activity_bar_repository::{ActivityBarError, ActivityBarRepository};
pub use environment_backend::{EnvironmentBackend, EnvironmentBackendError};
pub use file_system::{FileSystem, FileSystemError};
pub use resource_backend::{BackendError, ResourceBackend};
pub use tree_state_repository::{TreeItemStateRepository, TreeStateError};
