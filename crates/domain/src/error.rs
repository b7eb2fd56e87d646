//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or list computation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An item referenced by id is not part of the list or tree.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// An order value is outside the valid `1..=n` range.
    #[error("invalid order {order} for item {id}")]
    InvalidOrder {
        /// Item carrying the bad order.
        id: String,
        /// The rejected value.
        order: u32,
    },

    /// A materialized path could not be interpreted.
    #[error("invalid resource path: {0}")]
    InvalidPath(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A node was expected to be a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The subtree to flatten or migrate is empty.
    #[error("empty subtree: {0}")]
    EmptySubtree(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
