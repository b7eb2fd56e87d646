//! Environment backend port

use async_trait::async_trait;

use arbor_domain::OrderUpdate;
use arbor_domain::lists::{CreateEnvironment, EnvironmentLists};

/// Errors returned by the environment backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentBackendError {
    /// Environment or project not found.
    #[error("Environment not found: {0}")]
    NotFound(String),

    /// The backend refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Port for environment persistence.
#[async_trait]
pub trait EnvironmentBackend: Send + Sync {
    /// Loads the global and grouped lists.
    async fn list_environments(&self) -> Result<EnvironmentLists, EnvironmentBackendError>;

    /// Creates an environment and returns its id.
    ///
    /// # Errors
    /// Returns `NotFound` if the destination project does not exist.
    async fn create_environment(
        &self,
        input: CreateEnvironment,
    ) -> Result<String, EnvironmentBackendError>;

    /// Deletes an environment.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id.
    async fn delete_environment(&self, id: &str) -> Result<(), EnvironmentBackendError>;

    /// Applies order changes across any lists.
    ///
    /// # Errors
    /// Returns `NotFound` if an id is unknown.
    async fn batch_update_environments(
        &self,
        updates: Vec<OrderUpdate>,
    ) -> Result<(), EnvironmentBackendError>;
}
