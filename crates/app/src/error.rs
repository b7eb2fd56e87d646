//! Application error types

use std::path::PathBuf;

use arbor_application::DropError;
use arbor_application::ports::BackendError;
use arbor_domain::DomainError;
use arbor_infrastructure::{SerializationError, SettingsError};
use thiserror::Error;

/// Errors raised while loading a session or replaying a script.
#[derive(Debug, Error)]
pub enum AppError {
    /// A fixture or script file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// A fixture or script was not valid JSON for its format.
    #[error("invalid input: {0}")]
    Parse(#[from] SerializationError),

    /// Settings could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Seeding the backend failed.
    #[error("seeding failed: {0}")]
    Seed(#[from] BackendError),

    /// The engine could not be initialized.
    #[error("engine error: {0}")]
    Engine(#[from] DropError),

    /// A path in a fixture or script could not be parsed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A `@path` reference matched no node.
    #[error("no node at {path} in {aggregate}")]
    UnresolvedPath {
        /// Aggregate searched, or `*` for every aggregate.
        aggregate: String,
        /// Path that was looked up.
        path: String,
    },

    /// Neither `--workspace`, `ARBOR_WORKSPACE` nor a config dir is available.
    #[error("no workspace directory; pass --workspace or set ARBOR_WORKSPACE")]
    NoWorkspace,
}

/// Result alias for the binary.
pub type AppResult<T> = Result<T, AppError>;
