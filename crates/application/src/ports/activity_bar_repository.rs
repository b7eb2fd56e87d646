//! Activity bar repository port

use async_trait::async_trait;

use arbor_domain::lists::ActivityBarState;

/// Errors that can occur while persisting the activity bar.
#[derive(Debug, thiserror::Error)]
pub enum ActivityBarError {
    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Repository trait for the activity bar layout.
#[async_trait]
pub trait ActivityBarRepository: Send + Sync {
    /// Loads the saved layout, or the default when none was saved.
    async fn load(&self) -> Result<ActivityBarState, ActivityBarError>;

    /// Saves the layout.
    ///
    /// # Errors
    /// Returns an error if the layout cannot be written.
    async fn save(&self, state: &ActivityBarState) -> Result<(), ActivityBarError>;
}
