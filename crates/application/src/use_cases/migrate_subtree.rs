//! Migrate subtree use case
//!
//! The backend has no move across aggregates, so a cross-aggregate drop is
//! a saga: recreate the subtree at the destination, delete the source,
//! renumber the siblings on both sides and carry the UI state over.

use arbor_domain::diff::{changed_orders, order_map};
use arbor_domain::migration::{IdPairing, flatten_subtree, pair_created, plan_creation};
use arbor_domain::order::{insert, provisional_order, remove};
use arbor_domain::{
    AggregateTree, CreateResourceInput, CreatedResource, EngineSettings, OrderUpdate, Placement,
    TreeNodeRef,
};
use tracing::{error, info, warn};

use crate::error::{DropError, DropResult, MigrationStep};
use crate::ports::{BackendError, ResourceBackend, TreeItemStateRepository};
use crate::store::{OptimisticTreeStore, TreeStateStore};
use crate::use_cases::batching::{batch_update_chunked, order_inputs};
use crate::use_cases::reconcile_tree_state::{
    ReconcileReport, ReconcileTreeState, sync_state_orders,
};

/// Where a subtree should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    /// Root of the subtree to move.
    pub source: TreeNodeRef,
    /// Aggregate receiving it.
    pub destination_aggregate_id: String,
    /// Directory receiving it.
    pub destination_parent_id: String,
    /// Position among that directory's children.
    pub placement: Placement,
}

/// Everything a completed migration did.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    /// Payloads sent to the destination, root first.
    pub inputs: Vec<CreateResourceInput>,
    /// Resources created at the destination.
    pub created: Vec<CreatedResource>,
    /// Old id to new id.
    pub pairing: IdPairing,
    /// Id the recreated root received.
    pub new_root_id: String,
    /// Every id removed from the source aggregate.
    pub removed_ids: Vec<String>,
    /// Renumbered source siblings.
    pub source_updates: Vec<OrderUpdate>,
    /// Destination siblings shifted by the insert.
    pub destination_updates: Vec<OrderUpdate>,
    /// UI state carried over.
    pub tree_state: ReconcileReport,
    /// Steps that ran, in order.
    pub completed: Vec<MigrationStep>,
}

/// Local state needed to undo a migration that failed early.
struct Compensation {
    destination_aggregate_id: String,
    created_root_id: Option<String>,
    snapshots: Option<(AggregateTree, AggregateTree)>,
}

/// Moves a subtree from one aggregate to another.
#[derive(Clone)]
pub struct MigrateSubtree<B> {
    backend: B,
    settings: EngineSettings,
}

impl<B: ResourceBackend> MigrateSubtree<B> {
    /// Creates a new `MigrateSubtree` use case.
    pub const fn new(backend: B, settings: EngineSettings) -> Self {
        Self { backend, settings }
    }

    /// Executes the migration.
    ///
    /// The local trees are updated optimistically before the first backend
    /// call, with the source ids standing in until the create returns.
    ///
    /// # Errors
    /// Returns `NotFound` if the source, its parent or the destination is
    /// missing, and `PartialMigrationFailure` naming the failed step when a
    /// backend call fails.
    pub async fn execute<R: TreeItemStateRepository>(
        &self,
        store: &mut OptimisticTreeStore,
        ui: &mut TreeStateStore<R>,
        request: MigrationRequest,
    ) -> DropResult<MigrationReport> {
        let source_aggregate_id = request.source.aggregate_id.as_str();
        let source_id = request.source.node_id.as_str();
        let destination_aggregate_id = request.destination_aggregate_id.as_str();

        let (node, source_parent_id) = match store.locate(&request.source) {
            Some((node, Some(parent))) => (node.clone(), parent.id.clone()),
            Some((node, None)) => return Err(DropError::NotFound(format!("parent of {}", node.id))),
            None => return Err(DropError::NotFound(source_id.to_string())),
        };
        let destination_tree = store
            .aggregate(destination_aggregate_id)
            .ok_or_else(|| DropError::NotFound(destination_aggregate_id.to_string()))?;
        let destination_parent = destination_tree
            .find(&request.destination_parent_id)
            .ok_or_else(|| DropError::NotFound(request.destination_parent_id.clone()))?;
        let destination_path = destination_parent.path.clone();
        provisional_order(&destination_parent.child_nodes, &request.placement)?;

        let snapshots = if self.settings.rollback_partial_migrations {
            let source_tree = store
                .aggregate(source_aggregate_id)
                .cloned()
                .ok_or_else(|| DropError::NotFound(source_aggregate_id.to_string()))?;
            Some((source_tree, destination_tree.clone()))
        } else {
            None
        };

        let entries = flatten_subtree(&node);
        let removed_ids = node.subtree_ids();

        let (source_updates, source_inputs) = {
            let parent = store
                .aggregate_mut(source_aggregate_id)?
                .find_mut(&source_parent_id)
                .ok_or_else(|| DropError::NotFound(source_parent_id.clone()))?;
            let before = order_map(&parent.child_nodes);
            remove(&mut parent.child_nodes, source_id)?;
            let updates = changed_orders(&before, &parent.child_nodes);
            let inputs = order_inputs(&parent.child_nodes, &updates);
            (updates, inputs)
        };

        let (root_order, destination_updates, destination_inputs) = {
            let parent = store
                .aggregate_mut(destination_aggregate_id)?
                .find_mut(&request.destination_parent_id)
                .ok_or_else(|| DropError::NotFound(request.destination_parent_id.clone()))?;
            let mut placeholder = node;
            placeholder.parent_id = Some(parent.id.clone());
            placeholder.rebase(&destination_path);
            let before = order_map(&parent.child_nodes);
            insert(&mut parent.child_nodes, placeholder, &request.placement)?;
            let updates = changed_orders(&before, &parent.child_nodes);
            let inputs = order_inputs(&parent.child_nodes, &updates);
            let root_order = parent
                .child_nodes
                .iter()
                .find(|child| child.id == source_id)
                .map(|child| child.order)
                .ok_or_else(|| DropError::NotFound(source_id.to_string()))?;
            (root_order, updates, inputs)
        };

        let plans = plan_creation(&entries, &destination_path, root_order)?;
        let mut compensation = Compensation {
            destination_aggregate_id: destination_aggregate_id.to_string(),
            created_root_id: None,
            snapshots,
        };
        let mut completed = Vec::new();

        let inputs: Vec<CreateResourceInput> =
            plans.iter().map(|plan| plan.input.clone()).collect();
        let created = match self
            .backend
            .batch_create_resources(destination_aggregate_id, inputs.clone())
            .await
        {
            Ok(created) => created,
            Err(source) => {
                return Err(self
                    .fail(
                        store,
                        MigrationStep::CreateDestination,
                        completed,
                        source,
                        Some(compensation),
                    )
                    .await);
            }
        };
        completed.push(MigrationStep::CreateDestination);

        let pairing = pair_created(&plans, &created);
        if !pairing.unmatched.is_empty() {
            warn!(unmatched = ?pairing.unmatched, "Created resources without a matching source");
        }
        let new_root_id = pairing
            .as_map()
            .get(source_id)
            .map(|id| (*id).to_string())
            .unwrap_or_else(|| source_id.to_string());
        compensation.created_root_id = Some(new_root_id.clone());
        store.replace_ids(destination_aggregate_id, &pairing)?;

        if let Err(source) = self.backend.delete_resource(source_aggregate_id, source_id).await {
            return Err(self
                .fail(
                    store,
                    MigrationStep::DeleteSource,
                    completed,
                    source,
                    Some(compensation),
                )
                .await);
        }
        completed.push(MigrationStep::DeleteSource);

        let chunk_size = self.settings.batch_size();
        let mut renumbered = batch_update_chunked(
            &self.backend,
            source_aggregate_id,
            source_inputs,
            chunk_size,
        )
        .await;
        if renumbered.is_ok() {
            renumbered = batch_update_chunked(
                &self.backend,
                destination_aggregate_id,
                destination_inputs,
                chunk_size,
            )
            .await;
        }
        if let Err(source) = renumbered {
            return Err(self
                .fail(
                    store,
                    MigrationStep::RenumberSiblings,
                    completed,
                    source,
                    None,
                )
                .await);
        }
        completed.push(MigrationStep::RenumberSiblings);

        let tree_state = ReconcileTreeState::new()
            .execute(ui, &pairing, &removed_ids)
            .await
            .inspect_err(|err| error!(error = %err, "Failed to carry tree state over"))?;
        sync_state_orders(ui, &source_updates).await?;
        sync_state_orders(ui, &destination_updates).await?;
        completed.push(MigrationStep::ReconcileTreeState);

        info!(
            source = source_aggregate_id,
            destination = destination_aggregate_id,
            root = %new_root_id,
            resources = created.len(),
            "Subtree migrated"
        );
        Ok(MigrationReport {
            inputs,
            created,
            pairing,
            new_root_id,
            removed_ids,
            source_updates,
            destination_updates,
            tree_state,
            completed,
        })
    }

    /// Logs a failed step and compensates when allowed.
    async fn fail(
        &self,
        store: &mut OptimisticTreeStore,
        failed_step: MigrationStep,
        completed: Vec<MigrationStep>,
        source: BackendError,
        compensation: Option<Compensation>,
    ) -> DropError {
        let compensated = match compensation {
            Some(compensation) if compensation.snapshots.is_some() => {
                self.compensate(store, compensation).await
            }
            _ => false,
        };
        error!(
            step = %failed_step,
            completed = ?completed,
            compensated,
            error = %source,
            "Subtree migration failed"
        );
        DropError::PartialMigrationFailure {
            failed_step,
            completed,
            compensated,
            source,
        }
    }

    /// Deletes the recreated root and restores both local trees.
    async fn compensate(
        &self,
        store: &mut OptimisticTreeStore,
        compensation: Compensation,
    ) -> bool {
        if let Some(root_id) = &compensation.created_root_id {
            if let Err(err) = self
                .backend
                .delete_resource(&compensation.destination_aggregate_id, root_id)
                .await
            {
                warn!(root = %root_id, error = %err, "Could not delete recreated subtree");
                return false;
            }
        }
        if let Some((source_tree, destination_tree)) = compensation.snapshots {
            store.restore_aggregate(source_tree);
            store.restore_aggregate(destination_tree);
        }
        true
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
    use arbor_domain::{NodeKind, TreeItemState};
    use pretty_assertions::assert_eq;

    fn request(placement: Placement) -> MigrationRequest {
        MigrationRequest {
            source: TreeNodeRef::new("p1", "f"),
            destination_aggregate_id: "p2".into(),
            destination_parent_id: "h".into(),
            placement,
        }
    }

    async fn ui(repository: &MockStateRepository) -> TreeStateStore<MockStateRepository> {
        let mut ui = TreeStateStore::new(repository.clone());
        ui.init().await.unwrap();
        ui
    }

    fn endpoints_root_id(store: &OptimisticTreeStore, aggregate_id: &str) -> String {
        store
            .sub_root(aggregate_id, arbor_domain::ResourceClass::Endpoint)
            .unwrap()
            .id
            .clone()
    }

    #[tokio::test]
    async fn test_subtree_is_recreated_and_source_deleted() {
        let backend = MockBackend::default();
        let repository = MockStateRepository::with_rows(&[("f", 1, true), ("x", 1, false)]);
        let mut ui = ui(&repository).await;
        let mut store = two_projects();
        let mut migration = request(Placement::before("k"));
        migration.destination_parent_id = endpoints_root_id(&store, "p2");

        let report = MigrateSubtree::new(backend.clone(), EngineSettings::default())
            .execute(&mut store, &mut ui, migration)
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec!["batch_create", "delete", "batch_update", "batch_update"]
        );
        assert_eq!(report.created.len(), 3);
        assert_eq!(report.pairing.pairs.len(), 3);
        assert_eq!(report.removed_ids, vec!["f", "x", "y"]);
        assert_eq!(report.source_updates, vec![OrderUpdate::new("g", 1)]);
        assert_eq!(report.destination_updates, vec![OrderUpdate::new("k", 3)]);
        assert_eq!(report.completed.len(), 4);

        let source = store.aggregate("p1").unwrap();
        assert!(source.find("f").is_none());
        assert_eq!(source.find("g").unwrap().order, 1);

        let destination = store.aggregate("p2").unwrap();
        let root = destination.find(&report.new_root_id).unwrap();
        assert_eq!(root.order, 2);
        assert_eq!(root.path.raw(), "endpoints/F");
        assert!(
            root.child_nodes
                .iter()
                .all(|child| child.parent_id.as_deref() == Some(report.new_root_id.as_str()))
        );
        assert!(destination.find("x").is_none());

        assert_eq!(
            repository.get(&report.new_root_id),
            Some(TreeItemState {
                order: 1,
                expanded: true
            })
        );
        assert!(repository.get("f").is_none());
    }

    #[tokio::test]
    async fn test_renumbered_siblings_keep_ui_state_in_step() {
        let backend = MockBackend::default();
        let repository = MockStateRepository::with_rows(&[("g", 2, false), ("k", 2, true)]);
        let mut ui = ui(&repository).await;
        let mut store = two_projects();
        let mut migration = request(Placement::before("k"));
        migration.destination_parent_id = endpoints_root_id(&store, "p2");

        MigrateSubtree::new(backend, EngineSettings::default())
            .execute(&mut store, &mut ui, migration)
            .await
            .unwrap();

        assert_eq!(
            repository.get("g"),
            Some(TreeItemState {
                order: 1,
                expanded: false
            })
        );
        assert_eq!(
            repository.get("k"),
            Some(TreeItemState {
                order: 3,
                expanded: true
            })
        );
        assert_eq!(ui.get("k").map(|state| state.order), Some(3));
    }

    #[tokio::test]
    async fn test_dir_and_item_sharing_a_name_get_distinct_ids() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();
        store
            .apply_entries(
                "p1",
                vec![
                    entry("d", "endpoints/F/foo", NodeKind::Dir, 3),
                    entry("i", "endpoints/F/foo", NodeKind::Item, 4),
                ],
            )
            .unwrap();

        let report = MigrateSubtree::new(backend, EngineSettings::default())
            .execute(&mut store, &mut ui, request(Placement::Append))
            .await
            .unwrap();

        let pairs = report.pairing.as_map();
        let kind_of = |id: &str| {
            report
                .created
                .iter()
                .find(|created| created.id == id)
                .map(|created| created.kind)
        };
        assert_ne!(pairs["d"], pairs["i"]);
        assert_eq!(kind_of(pairs["d"]), Some(NodeKind::Dir));
        assert_eq!(kind_of(pairs["i"]), Some(NodeKind::Item));
        assert!(report.pairing.unmatched.is_empty());
    }

    #[tokio::test]
    async fn test_children_keep_their_relative_paths() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        MigrateSubtree::new(backend.clone(), EngineSettings::default())
            .execute(&mut store, &mut ui, request(Placement::Append))
            .await
            .unwrap();

        let log = backend.log.lock().expect("Lock poisoned");
        let (aggregate, inputs) = &log.created[0];
        assert_eq!(aggregate, "p2");
        let paths: Vec<String> = inputs
            .iter()
            .map(|input| input.full_path().raw())
            .collect();
        assert_eq!(
            paths,
            vec!["endpoints/H/F", "endpoints/H/F/X", "endpoints/H/F/Y"]
        );
        assert_eq!(inputs[0].order, 2);
    }

    #[tokio::test]
    async fn test_delete_failure_without_rollback_keeps_local_move() {
        let backend = MockBackend::failing_on("delete");
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let err = MigrateSubtree::new(backend.clone(), EngineSettings::default())
            .execute(&mut store, &mut ui, request(Placement::Append))
            .await
            .unwrap_err();

        match err {
            DropError::PartialMigrationFailure {
                failed_step,
                completed,
                compensated,
                ..
            } => {
                assert_eq!(failed_step, MigrationStep::DeleteSource);
                assert_eq!(completed, vec![MigrationStep::CreateDestination]);
                assert!(!compensated);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.aggregate("p1").unwrap().find("f").is_none());
        assert_eq!(backend.calls(), vec!["batch_create", "delete"]);
    }

    #[tokio::test]
    async fn test_delete_failure_with_rollback_compensates() {
        let backend = MockBackend::failing_on("delete");
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();
        let before = store.aggregate("p2").unwrap().clone();
        let settings = EngineSettings {
            rollback_partial_migrations: true,
            ..EngineSettings::default()
        };

        let err = MigrateSubtree::new(backend.clone(), settings)
            .execute(&mut store, &mut ui, request(Placement::Append))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DropError::PartialMigrationFailure {
                failed_step: MigrationStep::DeleteSource,
                compensated: true,
                ..
            }
        ));
        assert_eq!(backend.calls(), vec!["batch_create", "delete", "delete"]);
        assert_eq!(store.aggregate("p2").unwrap(), &before);
    }

    #[tokio::test]
    async fn test_create_failure_with_rollback_restores_trees() {
        let backend = MockBackend::failing_on("batch_create");
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();
        let source_before = store.aggregate("p1").unwrap().clone();
        let destination_before = store.aggregate("p2").unwrap().clone();
        let settings = EngineSettings {
            rollback_partial_migrations: true,
            ..EngineSettings::default()
        };

        let err = MigrateSubtree::new(backend, settings)
            .execute(&mut store, &mut ui, request(Placement::Append))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DropError::PartialMigrationFailure {
                failed_step: MigrationStep::CreateDestination,
                compensated: true,
                ..
            }
        ));
        assert_eq!(store.aggregate("p1").unwrap(), &source_before);
        assert_eq!(store.aggregate("p2").unwrap(), &destination_before);
    }

    #[tokio::test]
    async fn test_renumber_failure_reports_completed_steps() {
        let backend = MockBackend::failing_on("batch_update");
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let err = MigrateSubtree::new(backend, EngineSettings::default())
            .execute(&mut store, &mut ui, request(Placement::Append))
            .await
            .unwrap_err();

        match err {
            DropError::PartialMigrationFailure {
                failed_step,
                completed,
                ..
            } => {
                assert_eq!(failed_step, MigrationStep::RenumberSiblings);
                assert_eq!(
                    completed,
                    vec![MigrationStep::CreateDestination, MigrationStep::DeleteSource]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_edge_target_changes_nothing() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();
        let before = store.collections_trees().to_vec();

        let err = MigrateSubtree::new(backend.clone(), EngineSettings::default())
            .execute(&mut store, &mut ui, request(Placement::before("ghost")))
            .await
            .unwrap_err();

        assert!(matches!(err, DropError::NotFound(_)));
        assert_eq!(store.collections_trees(), before.as_slice());
        assert!(backend.calls().is_empty());
    }
}
