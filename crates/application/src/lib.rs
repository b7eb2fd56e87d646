//! Application layer for Arbor.
//!
//! Drop handlers, the subtree migration saga and the stores they mutate.
//! Everything talking to the outside world goes through the traits in
//! [`ports`].

pub mod engine;
pub mod error;
pub mod ports;
pub mod store;
pub mod use_cases;

pub use engine::{DropEngine, DropReport};
pub use error::{DropError, DropResult, MigrationStep};
pub use store::{ActivityBarStore, OptimisticTreeStore, TreeStateStore};
