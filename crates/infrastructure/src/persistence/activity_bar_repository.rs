//! File-based activity bar repository.

use std::path::{Path, PathBuf};

use arbor_application::ports::{
    ActivityBarError, ActivityBarRepository, FileSystem, FileSystemError,
};
use arbor_domain::lists::ActivityBarState;
use async_trait::async_trait;

use crate::serialization::{from_json, to_json_stable_bytes};

/// File name of the activity bar layout inside the workspace directory.
pub const ACTIVITY_BAR_FILE: &str = "activity_bar.json";

/// Stores the activity bar layout as `activity_bar.json`.
#[derive(Debug, Clone)]
pub struct FileActivityBarRepository<F> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> FileActivityBarRepository<F> {
    /// Creates a repository storing the layout under `workspace`.
    pub fn new(fs: F, workspace: &Path) -> Self {
        Self {
            fs,
            path: workspace.join(ACTIVITY_BAR_FILE),
        }
    }
}

#[async_trait]
impl<F: FileSystem> ActivityBarRepository for FileActivityBarRepository<F> {
    async fn load(&self) -> Result<ActivityBarState, ActivityBarError> {
        match self.fs.read_file_string(&self.path).await {
            Ok(content) => {
                from_json(&content).map_err(|e| ActivityBarError::Serialization(e.to_string()))
            }
            Err(FileSystemError::NotFound(_)) => Ok(ActivityBarState::default()),
            Err(e) => Err(ActivityBarError::Storage(e.to_string())),
        }
    }

    async fn save(&self, state: &ActivityBarState) -> Result<(), ActivityBarError> {
        let content = to_json_stable_bytes(state)
            .map_err(|e| ActivityBarError::Serialization(e.to_string()))?;
        self.fs
            .write_file_atomic(&self.path, &content)
            .await
            .map_err(|e| ActivityBarError::Storage(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::persistence::TokioFileSystem;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let dir = TempDir::new().unwrap();
        let repo = FileActivityBarRepository::new(TokioFileSystem::new(), dir.path());
        assert_eq!(repo.load().await.unwrap(), ActivityBarState::default());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let repo = FileActivityBarRepository::new(TokioFileSystem::new(), dir.path());
        let state = ActivityBarState {
            group_order: vec!["environments".into(), "collections".into()],
            active: Some("collections".into()),
        };

        repo.save(&state).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join(ACTIVITY_BAR_FILE)).unwrap();
        assert!(content.contains("\"groupOrder\""));
        assert_eq!(repo.load().await.unwrap(), state);
    }
}
