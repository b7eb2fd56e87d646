//! File system port

use std::future::Future;
use std::path::{Path, PathBuf};

/// Errors returned by file system operations.
#[derive(Debug, thiserror::Error)]
pub enum FileSystemError {
    /// The path does not exist.
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// Access was denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Port for the file operations the file-backed repositories need.
pub trait FileSystem: Send + Sync {
    /// Reads a whole file as UTF-8.
    ///
    /// # Errors
    /// Returns `NotFound` if the file does not exist.
    fn read_file_string(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<String, FileSystemError>> + Send;

    /// Writes a file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    fn write_file(
        &self,
        path: &Path,
        contents: &[u8],
    ) -> impl Future<Output = Result<(), FileSystemError>> + Send;

    /// Writes to a sibling temp file and renames it over `path`.
    ///
    /// # Errors
    /// Returns an error if either step fails.
    fn write_file_atomic(
        &self,
        path: &Path,
        contents: &[u8],
    ) -> impl Future<Output = Result<(), FileSystemError>> + Send;

    /// True if the path exists.
    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;

    /// Removes a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> impl Future<Output = Result<(), FileSystemError>> + Send;
}
