//! Tree item state repository port
//!
//! Persists the client-only expanded/order state of tree nodes.

use async_trait::async_trait;

use arbor_domain::TreeItemUIState;

/// Errors that can occur while persisting UI state.
#[derive(Debug, thiserror::Error)]
pub enum TreeStateError {
    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Repository trait for per-node UI state.
#[async_trait]
pub trait TreeItemStateRepository: Send + Sync {
    /// Loads every stored row.
    ///
    /// Returns an empty list when nothing was stored yet.
    async fn load_all(&self) -> Result<Vec<TreeItemUIState>, TreeStateError>;

    /// Inserts or replaces one row.
    ///
    /// # Errors
    /// Returns an error if the row cannot be written.
    async fn put_tree_item_state(&self, row: &TreeItemUIState) -> Result<(), TreeStateError>;

    /// Inserts or replaces many rows at once.
    ///
    /// # Errors
    /// Returns an error if the rows cannot be written.
    async fn batch_put_tree_item_state(
        &self,
        rows: &[TreeItemUIState],
    ) -> Result<(), TreeStateError>;

    /// Removes one row. Removing a missing row is not an error.
    ///
    /// # Errors
    /// Returns an error if storage cannot be updated.
    async fn remove_tree_item_state(&self, id: &str) -> Result<(), TreeStateError>;
}
