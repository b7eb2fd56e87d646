//! Arbor Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod persistence;
pub mod serialization;

pub use adapters::{InMemoryEnvironmentBackend, InMemoryResourceBackend};
pub use persistence::{
    ACTIVITY_BAR_FILE, FileActivityBarRepository, FileTreeItemStateRepository, SettingsError,
    SettingsRepository, TREE_STATE_FILE, TokioFileSystem,
};
pub use serialization::{
    SerializationError, from_json, from_json_bytes, to_json_stable, to_json_stable_bytes,
};
