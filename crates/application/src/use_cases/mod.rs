//! Application use cases (drop handling orchestration).

mod batching;
mod drop_router;
mod handle_environment_drop;
mod handle_param_drop;
mod handle_table_drop;
mod handle_tree_drop;
mod migrate_subtree;
mod reconcile_tree_state;
mod refresh_tree_path;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
pub(crate) mod test_support;

pub use drop_router::{DropMonitorRegistry, MonitorHandle};
pub use handle_environment_drop::{EnvironmentDropTarget, HandleEnvironmentDrop};
pub use handle_param_drop::{HandleParamDrop, ParamDrop, ParamDropTarget};
pub use handle_table_drop::{HandleTableDrop, TableDropOutcome};
pub use handle_tree_drop::{HandleTreeDrop, TreeDrop, TreeDropOutcome, TreeDropTarget};
pub use migrate_subtree::{MigrateSubtree, MigrationReport, MigrationRequest};
pub use reconcile_tree_state::{ReconcileReport, ReconcileTreeState};
pub use refresh_tree_path::{RefreshReport, RefreshTreePath};
