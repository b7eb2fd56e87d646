//! Persisted side table of per-node UI state.

use std::collections::HashSet;

use arbor_domain::{TreeItemState, TreeItemUIState, TreeStateTable};
use tracing::debug;

use crate::ports::{TreeItemStateRepository, TreeStateError};

/// The UI state table together with the repository that persists it.
///
/// Writes go to the repository first and are mirrored locally only once
/// they succeed.
pub struct TreeStateStore<R: TreeItemStateRepository> {
    table: TreeStateTable,
    repository: R,
}

impl<R: TreeItemStateRepository> TreeStateStore<R> {
    /// Creates an empty store over `repository`.
    #[must_use]
    pub const fn new(repository: R) -> Self {
        Self {
            table: TreeStateTable::new(),
            repository,
        }
    }

    /// Loads every persisted row.
    ///
    /// # Errors
    /// Returns an error if the repository cannot be read.
    pub async fn init(&mut self) -> Result<usize, TreeStateError> {
        let rows = self.repository.load_all().await?;
        self.table = rows.into_iter().collect();
        debug!(rows = self.table.len(), "Loaded tree item state");
        Ok(self.table.len())
    }

    /// Clears the local table. Persisted rows are kept.
    pub fn teardown(&mut self) {
        self.table = TreeStateTable::new();
    }

    /// The local table.
    #[must_use]
    pub const fn table(&self) -> &TreeStateTable {
        &self.table
    }

    /// The underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// State for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<TreeItemState> {
        self.table.get(id)
    }

    /// Writes one row.
    ///
    /// # Errors
    /// Returns an error if the row cannot be persisted.
    pub async fn put(&mut self, id: &str, state: TreeItemState) -> Result<(), TreeStateError> {
        let row = TreeItemUIState {
            id: id.to_string(),
            state,
        };
        self.repository.put_tree_item_state(&row).await?;
        self.table.put(row.id, state);
        Ok(())
    }

    /// Writes many rows in one call.
    ///
    /// # Errors
    /// Returns an error if the rows cannot be persisted.
    pub async fn batch_put(&mut self, rows: Vec<TreeItemUIState>) -> Result<(), TreeStateError> {
        if rows.is_empty() {
            return Ok(());
        }
        self.repository.batch_put_tree_item_state(&rows).await?;
        for row in rows {
            self.table.put(row.id, row.state);
        }
        Ok(())
    }

    /// Removes the rows of `ids` that exist; returns the removed ids.
    ///
    /// # Errors
    /// Returns the first failure; rows removed before it stay removed.
    pub async fn remove_all(&mut self, ids: &[String]) -> Result<Vec<String>, TreeStateError> {
        let mut removed = Vec::new();
        for id in ids {
            if self.table.get(id).is_none() {
                continue;
            }
            self.repository.remove_tree_item_state(id).await?;
            self.table.remove(id);
            removed.push(id.clone());
        }
        Ok(removed)
    }

    /// Removes rows whose ids are not in `live`.
    ///
    /// # Errors
    /// Returns an error if a removal cannot be persisted.
    pub async fn retain_live(
        &mut self,
        live: &HashSet<String>,
    ) -> Result<Vec<String>, TreeStateError> {
        let orphaned = self.table.orphaned(live);
        self.remove_all(&orphaned).await
    }
}
