//! File-based tree item state repository.
//!
//! Every row lives in one `tree_state.json` map keyed by node id. Each write
//! rewrites the whole file atomically.

use std::path::{Path, PathBuf};

use arbor_application::ports::{
    FileSystem, FileSystemError, TreeItemStateRepository, TreeStateError,
};
use arbor_domain::{TreeItemUIState, TreeStateTable};
use async_trait::async_trait;
use tracing::trace;

use crate::serialization::{from_json, to_json_stable_bytes};

/// File name of the tree state map inside the workspace directory.
pub const TREE_STATE_FILE: &str = "tree_state.json";

/// File-based repository for per-node UI state.
#[derive(Debug, Clone)]
pub struct FileTreeItemStateRepository<F> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> FileTreeItemStateRepository<F> {
    /// Creates a repository storing its rows under `workspace`.
    pub fn new(fs: F, workspace: &Path) -> Self {
        Self {
            fs,
            path: workspace.join(TREE_STATE_FILE),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<TreeStateTable, TreeStateError> {
        match self.fs.read_file_string(&self.path).await {
            Ok(content) => {
                from_json(&content).map_err(|e| TreeStateError::Serialization(e.to_string()))
            }
            Err(FileSystemError::NotFound(_)) => Ok(TreeStateTable::new()),
            Err(e) => Err(TreeStateError::Storage(e.to_string())),
        }
    }

    async fn write(&self, table: &TreeStateTable) -> Result<(), TreeStateError> {
        let content = to_json_stable_bytes(table)
            .map_err(|e| TreeStateError::Serialization(e.to_string()))?;
        self.fs
            .write_file_atomic(&self.path, &content)
            .await
            .map_err(|e| TreeStateError::Storage(e.to_string()))?;
        trace!(path = %self.path.display(), rows = table.len(), "Tree state written");
        Ok(())
    }
}

#[async_trait]
impl<F: FileSystem> TreeItemStateRepository for FileTreeItemStateRepository<F> {
    async fn load_all(&self) -> Result<Vec<TreeItemUIState>, TreeStateError> {
        Ok(self.read().await?.rows())
    }

    async fn put_tree_item_state(&self, row: &TreeItemUIState) -> Result<(), TreeStateError> {
        let mut table = self.read().await?;
        table.put(row.id.clone(), row.state);
        self.write(&table).await
    }

    async fn batch_put_tree_item_state(
        &self,
        rows: &[TreeItemUIState],
    ) -> Result<(), TreeStateError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut table = self.read().await?;
        for row in rows {
            table.put(row.id.clone(), row.state);
        }
        self.write(&table).await
    }

    async fn remove_tree_item_state(&self, id: &str) -> Result<(), TreeStateError> {
        let mut table = self.read().await?;
        if table.remove(id).is_none() {
            return Ok(());
        }
        self.write(&table).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::persistence::TokioFileSystem;
    use arbor_domain::TreeItemState;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn row(id: &str, order: u32, expanded: bool) -> TreeItemUIState {
        TreeItemUIState {
            id: id.into(),
            state: TreeItemState { order, expanded },
        }
    }

    #[tokio::test]
    async fn test_load_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let repo = FileTreeItemStateRepository::new(TokioFileSystem::new(), dir.path());
        assert!(repo.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_batch_and_remove_persist() {
        let dir = TempDir::new().unwrap();
        let repo = FileTreeItemStateRepository::new(TokioFileSystem::new(), dir.path());

        repo.put_tree_item_state(&row("b", 2, false)).await.unwrap();
        repo.batch_put_tree_item_state(&[row("a", 1, true), row("b", 3, true)])
            .await
            .unwrap();
        repo.remove_tree_item_state("missing").await.unwrap();

        let reopened = FileTreeItemStateRepository::new(TokioFileSystem::new(), dir.path());
        assert_eq!(
            reopened.load_all().await.unwrap(),
            vec![row("a", 1, true), row("b", 3, true)]
        );

        reopened.remove_tree_item_state("a").await.unwrap();
        assert_eq!(repo.load_all().await.unwrap(), vec![row("b", 3, true)]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TREE_STATE_FILE), "not json").unwrap();
        let repo = FileTreeItemStateRepository::new(TokioFileSystem::new(), dir.path());
        assert!(matches!(
            repo.load_all().await,
            Err(TreeStateError::Serialization(_))
        ));
    }
}
