//! Reconcile tree state use case

use arbor_domain::{OrderUpdate, TreeItemState, TreeItemUIState};
use arbor_domain::migration::IdPairing;
use tracing::debug;

use crate::ports::{TreeItemStateRepository, TreeStateError};
use crate::store::TreeStateStore;

/// Rows written and removed by a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Rows copied to new ids.
    pub written: Vec<TreeItemUIState>,
    /// Old ids whose rows were dropped.
    pub removed: Vec<String>,
}

/// Carries UI state over to the ids assigned by a migration.
///
/// Rows of the old ids are copied to the new ids first; only then are the
/// rows of every removed id deleted, so a failure in between never loses
/// state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileTreeState;

impl ReconcileTreeState {
    /// Creates a new `ReconcileTreeState` use case.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes the use case.
    ///
    /// # Errors
    /// Returns an error if a row cannot be written or removed.
    pub async fn execute<R: TreeItemStateRepository>(
        &self,
        ui: &mut TreeStateStore<R>,
        pairing: &IdPairing,
        removed_ids: &[String],
    ) -> Result<ReconcileReport, TreeStateError> {
        let written = ui.table().rekeyed_rows(
            pairing
                .pairs
                .iter()
                .map(|(old_id, new_id)| (old_id.as_str(), new_id.as_str())),
        );
        ui.batch_put(written.clone()).await?;
        let removed = ui.remove_all(removed_ids).await?;

        debug!(
            written = written.len(),
            removed = removed.len(),
            "Reconciled tree item state"
        );
        Ok(ReconcileReport { written, removed })
    }
}

/// Mirrors renumbered orders into existing UI state rows.
pub(crate) async fn sync_state_orders<R: TreeItemStateRepository>(
    ui: &mut TreeStateStore<R>,
    updates: &[OrderUpdate],
) -> Result<(), TreeStateError> {
    let rows: Vec<TreeItemUIState> = updates
        .iter()
        .filter_map(|update| {
            ui.get(&update.id).map(|state| TreeItemUIState {
                id: update.id.clone(),
                state: TreeItemState {
                    order: update.order,
                    ..state
                },
            })
        })
        .collect();
    ui.batch_put(rows).await
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
    use crate::use_cases::test_support::MockStateRepository;
    use arbor_domain::TreeItemState;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_state_moves_to_new_ids() {
        let repository =
            MockStateRepository::with_rows(&[("f", 1, true), ("x", 1, false), ("k", 2, true)]);
        let mut ui = TreeStateStore::new(repository.clone());
        ui.init().await.unwrap();

        let pairing = IdPairing {
            pairs: vec![
                ("f".into(), "f2".into()),
                ("x".into(), "x2".into()),
                ("y".into(), "y2".into()),
            ],
            unmatched: vec![],
        };
        let removed = vec!["f".to_string(), "x".to_string(), "y".to_string()];
        let report = ReconcileTreeState::new()
            .execute(&mut ui, &pairing, &removed)
            .await
            .unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.removed, vec!["f".to_string(), "x".to_string()]);
        assert_eq!(
            repository.get("f2"),
            Some(TreeItemState {
                order: 1,
                expanded: true
            })
        );
        assert!(repository.get("f").is_none());
        assert!(repository.get("y2").is_none());
        assert!(repository.get("k").is_some());
        assert_eq!(ui.table().len(), 3);
    }
}
