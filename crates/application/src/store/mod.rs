//! Explicitly constructed services holding client-side state.

mod activity_bar_store;
mod tree_state_store;
mod tree_store;

pub use activity_bar_store::ActivityBarStore;
pub use tree_state_store::TreeStateStore;
pub use tree_store::OptimisticTreeStore;
