//! Real file system implementation.

use std::ffi::OsString;
use std::path::Path;

use arbor_application::ports::{FileSystem, FileSystemError};
use tokio::fs;

/// Real file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn map_io_error(path: &Path, e: std::io::Error) -> FileSystemError {
    match e.kind() {
        std::io::ErrorKind::NotFound => FileSystemError::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => {
            FileSystemError::PermissionDenied(path.to_path_buf())
        }
        _ => FileSystemError::Io(e),
    }
}

async fn ensure_parent(path: &Path) -> Result<(), FileSystemError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| map_io_error(parent, e))?;
    }
    Ok(())
}

impl FileSystem for TokioFileSystem {
    async fn read_file_string(&self, path: &Path) -> Result<String, FileSystemError> {
        fs::read_to_string(path)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FileSystemError> {
        ensure_parent(path).await?;
        fs::write(path, contents)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn write_file_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), FileSystemError> {
        ensure_parent(path).await?;
        let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, contents)
            .await
            .map_err(|e| map_io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, path)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FileSystemError> {
        fs::remove_file(path)
            .await
            .map_err(|e| map_io_error(path, e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_atomic_write_creates_parents_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("tree.json");
        let fs = TokioFileSystem::new();

        fs.write_file_atomic(&path, b"{}\n").await.unwrap();
        fs.write_file_atomic(&path, b"[]\n").await.unwrap();

        assert_eq!(fs.read_file_string(&path).await.unwrap(), "[]\n");
        assert!(!fs.exists(&dir.path().join("state").join("tree.json.tmp")).await);
    }

    #[tokio::test]
    async fn test_missing_file_maps_to_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let err = TokioFileSystem::new().read_file_string(&path).await.unwrap_err();
        assert!(matches!(err, FileSystemError::NotFound(p) if p == path));
    }

    #[tokio::test]
    async fn test_remove_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let fs = TokioFileSystem::new();
        fs.write_file(&path, b"1").await.unwrap();
        fs.remove_file(&path).await.unwrap();
        assert!(!fs.exists(&path).await);
    }
}
