//! Refresh tree path use case

use arbor_domain::ResourcePath;
use tracing::debug;

use crate::error::DropResult;
use crate::ports::{ResourceBackend, TreeItemStateRepository};
use crate::store::{OptimisticTreeStore, TreeStateStore};

/// What a refresh changed locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Entries upserted from the stream.
    pub applied: usize,
    /// Nodes the stream no longer reported.
    pub pruned: Vec<String>,
}

/// Re-streams one path of an aggregate and reconciles the local tree.
///
/// This is how the optimistic tree recovers after any partial failure.
#[derive(Clone)]
pub struct RefreshTreePath<B> {
    backend: B,
}

impl<B: ResourceBackend> RefreshTreePath<B> {
    /// Creates a new `RefreshTreePath` use case.
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Executes the use case.
    ///
    /// # Errors
    /// Returns an error if the stream fails or an entry cannot be applied.
    pub async fn execute<R: TreeItemStateRepository>(
        &self,
        store: &mut OptimisticTreeStore,
        ui: &mut TreeStateStore<R>,
        aggregate_id: &str,
        path: &ResourcePath,
    ) -> DropResult<RefreshReport> {
        let entries = self.backend.stream_resource_entries(aggregate_id, path).await?;
        let applied = entries.len();
        let pruned = store.reconcile_path(aggregate_id, path, entries)?;
        ui.remove_all(&pruned).await?;

        debug!(
            aggregate = aggregate_id,
            path = %path.raw(),
            applied,
            pruned = pruned.len(),
            "Refreshed tree path"
        );
        Ok(RefreshReport { applied, pruned })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{MockBackend, MockStateRepository, entry, two_projects};
    use arbor_domain::NodeKind;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_refresh_applies_and_prunes() {
        let backend = MockBackend::default();
        backend.set_entries(
            "p1",
            vec![
                entry("f", "endpoints/F", NodeKind::Dir, 1),
                entry("x", "endpoints/F/X", NodeKind::Item, 2),
                entry("w", "endpoints/F/W", NodeKind::Item, 1),
            ],
        );
        let repository = MockStateRepository::with_rows(&[("y", 2, false)]);
        let mut ui = TreeStateStore::new(repository.clone());
        ui.init().await.unwrap();
        let mut store = two_projects();

        let report = RefreshTreePath::new(backend)
            .execute(
                &mut store,
                &mut ui,
                "p1",
                &ResourcePath::parse("endpoints/F").unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(report.applied, 3);
        assert_eq!(report.pruned, vec!["y".to_string()]);
        let folder = store.aggregate("p1").unwrap().find("f").unwrap();
        let ids: Vec<&str> = folder.child_nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["w", "x"]);
        assert!(repository.get("y").is_none());
    }

    #[tokio::test]
    async fn test_stream_failure_is_backend_rejection() {
        let backend = MockBackend::failing_on("stream");
        let mut ui = TreeStateStore::new(MockStateRepository::default());
        let mut store = two_projects();

        let err = RefreshTreePath::new(backend)
            .execute(
                &mut store,
                &mut ui,
                "p1",
                &ResourcePath::parse("endpoints").unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, crate::DropError::BackendRejection(_)));
        assert!(store.aggregate("p1").unwrap().find("y").is_some());
    }
}
