//! Resource backend port
//!
//! Defines the interface to the remote resource store. Resources are
//! addressed by opaque id and by materialized path within an aggregate; the
//! store has no move primitive across aggregates.

use async_trait::async_trait;

use arbor_domain::lists::EndpointParams;
use arbor_domain::{
    CreateResourceInput, CreatedResource, ResourceEntry, ResourcePath, UpdateResourceInput,
};

/// Errors returned by the resource backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The aggregate or resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A resource already exists at the requested path.
    #[error("Resource already exists: {0}")]
    Conflict(String),

    /// The backend refused the payload.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The transport failed before the backend answered.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Port for the remote resource API.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Creates a single resource.
    ///
    /// # Errors
    /// Returns `BackendError::Conflict` if the path is taken.
    async fn create_resource(
        &self,
        aggregate_id: &str,
        input: CreateResourceInput,
    ) -> Result<CreatedResource, BackendError>;

    /// Creates many resources in one call, parents before children.
    ///
    /// # Errors
    /// Returns an error if any resource cannot be created.
    async fn batch_create_resources(
        &self,
        aggregate_id: &str,
        inputs: Vec<CreateResourceInput>,
    ) -> Result<Vec<CreatedResource>, BackendError>;

    /// Updates one resource.
    ///
    /// # Errors
    /// Returns `BackendError::NotFound` for an unknown id.
    async fn update_resource(
        &self,
        aggregate_id: &str,
        input: UpdateResourceInput,
    ) -> Result<(), BackendError>;

    /// Updates many resources in one call.
    ///
    /// # Errors
    /// Returns an error if any update is refused.
    async fn batch_update_resources(
        &self,
        aggregate_id: &str,
        inputs: Vec<UpdateResourceInput>,
    ) -> Result<(), BackendError>;

    /// Deletes a resource and everything beneath it.
    ///
    /// # Errors
    /// Returns `BackendError::NotFound` for an unknown id.
    async fn delete_resource(&self, aggregate_id: &str, id: &str) -> Result<(), BackendError>;

    /// Lists every entry at or beneath `path`.
    ///
    /// # Errors
    /// Returns `BackendError::NotFound` for an unknown aggregate.
    async fn stream_resource_entries(
        &self,
        aggregate_id: &str,
        path: &ResourcePath,
    ) -> Result<Vec<ResourceEntry>, BackendError>;

    /// Parameter lists of an endpoint as the backend stores them, with the
    /// row ids it assigned.
    ///
    /// # Errors
    /// Returns `BackendError::NotFound` for an unknown aggregate or endpoint.
    async fn describe_endpoint_params(
        &self,
        aggregate_id: &str,
        endpoint_id: &str,
    ) -> Result<EndpointParams, BackendError>;
}
