//! Drop error types

use std::fmt;

use arbor_domain::{DomainError, DropRejection};
use thiserror::Error;

use crate::ports::{ActivityBarError, BackendError, EnvironmentBackendError, TreeStateError};

/// A sequential backend step of a subtree migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStep {
    /// Batched create at the destination.
    CreateDestination,
    /// Delete of the source root.
    DeleteSource,
    /// Renumbering of source siblings and shifted destination siblings.
    RenumberSiblings,
    /// Rekeying of UI state to the new ids.
    ReconcileTreeState,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateDestination => "create-destination",
            Self::DeleteSource => "delete-source",
            Self::RenumberSiblings => "renumber-siblings",
            Self::ReconcileTreeState => "reconcile-tree-state",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by drop handlers.
///
/// Every class except `ValidationBlocked` leaves the local tree possibly out
/// of sync with the backend; re-streaming the affected path recovers it.
#[derive(Debug, Error)]
pub enum DropError {
    /// The drop is illegal. No backend call was issued.
    #[error("drop blocked: {0}")]
    ValidationBlocked(#[from] DropRejection),

    /// The source or target was not in the local state at drop time.
    #[error("not found: {0}")]
    NotFound(String),

    /// A migration step failed after earlier steps succeeded.
    #[error("migration failed at {failed_step} after {completed:?}: {source}")]
    PartialMigrationFailure {
        /// Step that failed.
        failed_step: MigrationStep,
        /// Steps that completed before it.
        completed: Vec<MigrationStep>,
        /// Whether destination creates were rolled back.
        compensated: bool,
        /// Backend failure.
        #[source]
        source: BackendError,
    },

    /// A single resource call was rejected.
    #[error("backend rejected the request: {0}")]
    BackendRejection(#[from] BackendError),

    /// An environment call was rejected.
    #[error("environment backend rejected the request: {0}")]
    EnvironmentRejection(#[from] EnvironmentBackendError),

    /// Persisting UI state failed.
    #[error("tree state error: {0}")]
    TreeState(#[from] TreeStateError),

    /// Persisting the activity bar failed.
    #[error("activity bar error: {0}")]
    ActivityBar(#[from] ActivityBarError),

    /// A list computation failed for a reason other than a missing id.
    #[error("domain error: {0}")]
    Domain(DomainError),
}

impl From<DomainError> for DropError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::ItemNotFound(id) => Self::NotFound(id),
            other => Self::Domain(other),
        }
    }
}

impl DropError {
    /// True when the UI should show the blocked indicator.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::ValidationBlocked(rejection) if rejection.is_blocked())
    }
}

/// Result type alias for drop handlers.
pub type DropResult<T> = Result<T, DropError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_item_maps_to_not_found() {
        let error = DropError::from(DomainError::ItemNotFound("x".into()));
        assert!(matches!(error, DropError::NotFound(id) if id == "x"));
    }

    #[test]
    fn only_blocking_rejections_are_blocked() {
        assert!(DropError::from(DropRejection::NameCollision("foo".into())).is_blocked());
        assert!(!DropError::from(DropRejection::SameNode("foo".into())).is_blocked());
        assert!(!DropError::NotFound("x".into()).is_blocked());
    }

    #[test]
    fn partial_failure_message_names_the_step() {
        let error = DropError::PartialMigrationFailure {
            failed_step: MigrationStep::DeleteSource,
            completed: vec![MigrationStep::CreateDestination],
            compensated: false,
            source: BackendError::Transport("closed".into()),
        };
        assert!(error.to_string().contains("delete-source"));
    }
}
