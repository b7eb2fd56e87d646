//! Handle tree drop use case

use arbor_domain::diff::{changed_orders, merge_updates, order_map};
use arbor_domain::edge::{TreeDropEnd, resolve_tree_drop};
use arbor_domain::order::{insert, provisional_order, remove, reorder};
use arbor_domain::{
    CreateResourceInput, DropClass, DropInstruction, DropOperation, DropRejection, EngineSettings,
    OrderUpdate, PatchSet, ResolvedDrop, ResourceClass, ResourcePath, TreeItemState, TreeNodeRef,
    UpdateResourceInput,
};
use tracing::{debug, info, warn};

use crate::error::{DropError, DropResult};
use crate::ports::{ResourceBackend, TreeItemStateRepository};
use crate::store::{OptimisticTreeStore, TreeStateStore};
use crate::use_cases::batching::{batch_update_chunked, order_inputs};
use crate::use_cases::migrate_subtree::{MigrateSubtree, MigrationReport, MigrationRequest};
use crate::use_cases::reconcile_tree_state::sync_state_orders;
use crate::use_cases::refresh_tree_path::RefreshTreePath;

/// What a tree node was dropped on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeDropTarget {
    /// Another node.
    Node(TreeNodeRef),
    /// The empty area of an aggregate's class root.
    Root {
        /// Aggregate id.
        aggregate_id: String,
        /// Sub-root class.
        class: ResourceClass,
    },
}

impl TreeDropTarget {
    fn aggregate_id(&self) -> &str {
        match self {
            Self::Node(node) => &node.aggregate_id,
            Self::Root { aggregate_id, .. } => aggregate_id,
        }
    }
}

/// A completed tree drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDrop {
    /// Dragged node.
    pub source: TreeNodeRef,
    /// Node or root under the pointer.
    pub target: TreeDropTarget,
    /// Sensor instruction.
    pub instruction: DropInstruction,
}

/// Result of a handled tree drop.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeDropOutcome {
    /// Nothing to do.
    Unchanged,
    /// Siblings were renumbered in place.
    Reordered {
        /// Aggregate id.
        aggregate_id: String,
        /// Changed orders.
        updates: Vec<OrderUpdate>,
    },
    /// The node moved to another directory of the same aggregate.
    Moved {
        /// Aggregate id.
        aggregate_id: String,
        /// The moved node.
        node_id: String,
        /// Its new path.
        path: ResourcePath,
        /// Its new order.
        order: u32,
        /// Siblings renumbered on both sides.
        updates: Vec<OrderUpdate>,
    },
    /// The subtree was recreated in another aggregate.
    Migrated(Box<MigrationReport>),
}

impl TreeDropOutcome {
    /// The drop expressed as a patch.
    #[must_use]
    pub fn patch(&self) -> PatchSet<CreateResourceInput> {
        match self {
            Self::Unchanged => PatchSet::default(),
            Self::Reordered { updates, .. } => PatchSet::updates(updates.clone()),
            Self::Moved {
                node_id,
                order,
                updates,
                ..
            } => PatchSet::updates(merge_updates(
                updates.clone(),
                vec![OrderUpdate::new(node_id, *order)],
            )),
            Self::Migrated(report) => PatchSet {
                to_add: report.inputs.clone(),
                to_update: merge_updates(
                    report.source_updates.clone(),
                    report.destination_updates.clone(),
                ),
                to_remove: report.removed_ids.first().cloned().into_iter().collect(),
            },
        }
    }
}

/// Drop context captured before any mutation.
struct PlannedDrop {
    resolved: ResolvedDrop,
    source: TreeNodeRef,
    source_parent_id: String,
    source_parent_path: ResourcePath,
    destination_aggregate_id: String,
    destination_path: ResourcePath,
}

/// Executes drops within and across aggregate trees.
pub struct HandleTreeDrop<B> {
    backend: B,
    settings: EngineSettings,
    migrate: MigrateSubtree<B>,
    refresh: RefreshTreePath<B>,
}

impl<B: ResourceBackend + Clone> HandleTreeDrop<B> {
    /// Creates a new `HandleTreeDrop` use case.
    pub fn new(backend: B, settings: EngineSettings) -> Self {
        Self {
            migrate: MigrateSubtree::new(backend.clone(), settings.clone()),
            refresh: RefreshTreePath::new(backend.clone()),
            backend,
            settings,
        }
    }

    /// Executes the use case.
    ///
    /// Drops that would do nothing resolve to [`TreeDropOutcome::Unchanged`]
    /// without touching the backend.
    ///
    /// # Errors
    /// Returns `ValidationBlocked` for illegal drops, `NotFound` when a node
    /// is missing locally, and backend errors from the executed calls.
    pub async fn execute<R: TreeItemStateRepository>(
        &self,
        store: &mut OptimisticTreeStore,
        ui: &mut TreeStateStore<R>,
        drop: TreeDrop,
    ) -> DropResult<TreeDropOutcome> {
        if drop.instruction.blocked {
            warn!(source = %drop.source.node_id, "Drop arrived blocked");
            return Err(DropRejection::InstructionBlocked.into());
        }
        let Some(operation) = drop.instruction.operation else {
            warn!(source = %drop.source.node_id, "Drop arrived without an operation");
            return Err(DropRejection::MissingOperation.into());
        };

        let Some(planned) = Self::plan(store, &drop, operation)? else {
            return Ok(TreeDropOutcome::Unchanged);
        };
        debug!(
            class = ?planned.resolved.class,
            source = %planned.source.node_id,
            destination = %planned.resolved.destination_parent_id,
            "Classified tree drop"
        );

        let outcome = match planned.resolved.class {
            DropClass::WithinList => self.reorder_within(store, ui, &planned).await?,
            DropClass::CrossList | DropClass::CombineFolder => {
                self.move_within_aggregate(store, ui, &planned).await?
            }
            DropClass::CrossAggregate => {
                let request = MigrationRequest {
                    source: planned.source.clone(),
                    destination_aggregate_id: planned.destination_aggregate_id.clone(),
                    destination_parent_id: planned.resolved.destination_parent_id.clone(),
                    placement: planned.resolved.placement.clone(),
                };
                let report = self.migrate.execute(store, ui, request).await?;
                TreeDropOutcome::Migrated(Box::new(report))
            }
        };

        if self.settings.refresh_after_drop && !matches!(outcome, TreeDropOutcome::Unchanged) {
            self.refresh_affected(store, ui, &planned).await;
        }
        Ok(outcome)
    }

    /// Validates the drop against the local trees.
    ///
    /// Returns `None` for drops that would do nothing.
    fn plan(
        store: &OptimisticTreeStore,
        drop: &TreeDrop,
        operation: DropOperation,
    ) -> DropResult<Option<PlannedDrop>> {
        let (source, source_parent) = store
            .locate(&drop.source)
            .ok_or_else(|| DropError::NotFound(drop.source.node_id.clone()))?;
        let Some(source_parent) = source_parent else {
            debug!(source = %source.id, "Sub-roots cannot be dragged");
            return Ok(None);
        };

        let (target, target_parent, operation) = match &drop.target {
            TreeDropTarget::Node(target) => {
                let (node, parent) = store
                    .locate(target)
                    .ok_or_else(|| DropError::NotFound(target.node_id.clone()))?;
                (node, parent, operation)
            }
            TreeDropTarget::Root {
                aggregate_id,
                class,
            } => {
                let root = store
                    .sub_root(aggregate_id, *class)
                    .ok_or_else(|| DropError::NotFound(aggregate_id.clone()))?;
                (root, None, DropOperation::Combine)
            }
        };
        let destination_aggregate_id = drop.target.aggregate_id().to_string();

        let resolved = match resolve_tree_drop(
            TreeDropEnd {
                aggregate_id: &drop.source.aggregate_id,
                node: source,
                parent: Some(source_parent),
            },
            TreeDropEnd {
                aggregate_id: &destination_aggregate_id,
                node: target,
                parent: target_parent,
            },
            operation,
        ) {
            Ok(resolved) => resolved,
            Err(rejection) if rejection.is_blocked() => {
                warn!(
                    source = %source.id,
                    target = %target.id,
                    reason = %rejection,
                    "Tree drop blocked"
                );
                return Err(rejection.into());
            }
            Err(rejection) => {
                debug!(
                    source = %source.id,
                    target = %target.id,
                    reason = %rejection,
                    "Tree drop ignored"
                );
                return Ok(None);
            }
        };

        let destination_path = store
            .aggregate(&destination_aggregate_id)
            .and_then(|tree| tree.find(&resolved.destination_parent_id))
            .map(|parent| parent.path.clone())
            .ok_or_else(|| DropError::NotFound(resolved.destination_parent_id.clone()))?;

        Ok(Some(PlannedDrop {
            source: drop.source.clone(),
            source_parent_id: source_parent.id.clone(),
            source_parent_path: source_parent.path.clone(),
            destination_aggregate_id,
            destination_path,
            resolved,
        }))
    }

    async fn reorder_within<R: TreeItemStateRepository>(
        &self,
        store: &mut OptimisticTreeStore,
        ui: &mut TreeStateStore<R>,
        planned: &PlannedDrop,
    ) -> DropResult<TreeDropOutcome> {
        let aggregate_id = planned.source.aggregate_id.as_str();
        let (updates, inputs) = {
            let parent = store
                .aggregate_mut(aggregate_id)?
                .find_mut(&planned.source_parent_id)
                .ok_or_else(|| DropError::NotFound(planned.source_parent_id.clone()))?;
            let before = order_map(&parent.child_nodes);
            reorder(
                &mut parent.child_nodes,
                &planned.source.node_id,
                &planned.resolved.placement,
            )?;
            let updates = changed_orders(&before, &parent.child_nodes);
            let inputs = order_inputs(&parent.child_nodes, &updates);
            (updates, inputs)
        };
        if updates.is_empty() {
            debug!(source = %planned.source.node_id, "Reorder left every order unchanged");
            return Ok(TreeDropOutcome::Unchanged);
        }

        let chunk_size = self.settings.batch_size();
        batch_update_chunked(&self.backend, aggregate_id, inputs, chunk_size).await?;
        sync_state_orders(ui, &updates).await?;

        info!(aggregate = aggregate_id, changed = updates.len(), "Tree siblings reordered");
        Ok(TreeDropOutcome::Reordered {
            aggregate_id: aggregate_id.to_string(),
            updates,
        })
    }

    async fn move_within_aggregate<R: TreeItemStateRepository>(
        &self,
        store: &mut OptimisticTreeStore,
        ui: &mut TreeStateStore<R>,
        planned: &PlannedDrop,
    ) -> DropResult<TreeDropOutcome> {
        let aggregate_id = planned.source.aggregate_id.as_str();
        let source_id = planned.source.node_id.as_str();
        let destination_id = planned.resolved.destination_parent_id.as_str();
        if planned.source_parent_id == destination_id {
            return self.reorder_within(store, ui, planned).await;
        }
        let tree = store.aggregate_mut(aggregate_id)?;

        let destination = tree
            .find(destination_id)
            .ok_or_else(|| DropError::NotFound(destination_id.to_string()))?;
        provisional_order(&destination.child_nodes, &planned.resolved.placement)?;

        let (mut node, source_updates) = {
            let parent = tree
                .find_mut(&planned.source_parent_id)
                .ok_or_else(|| DropError::NotFound(planned.source_parent_id.clone()))?;
            let before = order_map(&parent.child_nodes);
            let node = remove(&mut parent.child_nodes, source_id)?;
            (node, changed_orders(&before, &parent.child_nodes))
        };
        node.parent_id = Some(destination_id.to_string());
        node.rebase(&planned.destination_path);
        let kind = node.kind;
        let path = node.path.clone();

        let destination = tree
            .find_mut(destination_id)
            .ok_or_else(|| DropError::NotFound(destination_id.to_string()))?;
        let before = order_map(&destination.child_nodes);
        insert(
            &mut destination.child_nodes,
            node,
            &planned.resolved.placement,
        )?;
        let destination_updates = changed_orders(&before, &destination.child_nodes);
        let order = destination
            .child_nodes
            .iter()
            .find(|child| child.id == source_id)
            .map(|child| child.order)
            .ok_or_else(|| DropError::NotFound(source_id.to_string()))?;

        let updates = merge_updates(source_updates, destination_updates);
        let mut inputs = order_inputs(&destination.child_nodes, &updates);
        if let Some(source_parent) = tree.find(&planned.source_parent_id) {
            if planned.source_parent_id != destination_id {
                inputs.extend(order_inputs(&source_parent.child_nodes, &updates));
            }
        }

        self.backend
            .update_resource(
                aggregate_id,
                UpdateResourceInput::relocate(
                    source_id,
                    kind,
                    planned.destination_path.clone(),
                    order,
                ),
            )
            .await?;
        let chunk_size = self.settings.batch_size();
        batch_update_chunked(&self.backend, aggregate_id, inputs, chunk_size).await?;

        let expanded = ui.get(source_id).is_some_and(|state| state.expanded);
        ui.put(source_id, TreeItemState { order, expanded }).await?;
        sync_state_orders(ui, &updates).await?;

        info!(
            aggregate = aggregate_id,
            node = source_id,
            path = %path.raw(),
            order,
            "Tree node moved"
        );
        Ok(TreeDropOutcome::Moved {
            aggregate_id: aggregate_id.to_string(),
            node_id: source_id.to_string(),
            path,
            order,
            updates,
        })
    }

    /// Re-streams both sides of a drop. Failures are logged, not returned.
    async fn refresh_affected<R: TreeItemStateRepository>(
        &self,
        store: &mut OptimisticTreeStore,
        ui: &mut TreeStateStore<R>,
        planned: &PlannedDrop,
    ) {
        let mut paths = vec![(
            planned.source.aggregate_id.as_str(),
            &planned.source_parent_path,
        )];
        let destination = (
            planned.destination_aggregate_id.as_str(),
            &planned.destination_path,
        );
        if !paths.contains(&destination) {
            paths.push(destination);
        }
        for (aggregate_id, path) in paths {
            if let Err(err) = self.refresh.execute(store, ui, aggregate_id, path).await {
                warn!(
                    aggregate = aggregate_id,
                    path = %path.raw(),
                    error = %err,
                    "Refresh after drop failed"
                );
            }
        }
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
    use crate::use_cases::test_support::{
        MockBackend, MockStateRepository, entry, two_projects,
    };
    use arbor_domain::NodeKind;
    use pretty_assertions::assert_eq;

    fn settings() -> EngineSettings {
        EngineSettings {
            refresh_after_drop: false,
            ..EngineSettings::default()
        }
    }

    fn node_drop(
        source: &str,
        target_aggregate: &str,
        target: &str,
        operation: DropOperation,
    ) -> TreeDrop {
        TreeDrop {
            source: TreeNodeRef::new("p1", source),
            target: TreeDropTarget::Node(TreeNodeRef::new(target_aggregate, target)),
            instruction: DropInstruction::new(operation),
        }
    }

    async fn ui(repository: &MockStateRepository) -> TreeStateStore<MockStateRepository> {
        let mut ui = TreeStateStore::new(repository.clone());
        ui.init().await.unwrap();
        ui
    }

    fn child_ids(store: &OptimisticTreeStore, aggregate_id: &str, parent_id: &str) -> Vec<String> {
        store
            .aggregate(aggregate_id)
            .unwrap()
            .find(parent_id)
            .unwrap()
            .child_nodes
            .iter()
            .map(|node| node.id.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_reorder_within_list_sends_changed_orders() {
        let backend = MockBackend::default();
        let repository = MockStateRepository::with_rows(&[("f", 1, true)]);
        let mut ui = ui(&repository).await;
        let mut store = two_projects();

        let outcome = HandleTreeDrop::new(backend.clone(), settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("g", "p1", "f", DropOperation::ReorderBefore),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TreeDropOutcome::Reordered {
                aggregate_id: "p1".into(),
                updates: vec![OrderUpdate::new("g", 1), OrderUpdate::new("f", 2)],
            }
        );
        assert_eq!(backend.calls(), vec!["batch_update"]);
        assert_eq!(repository.get("f").unwrap().order, 2);
        assert!(repository.get("f").unwrap().expanded);
    }

    #[tokio::test]
    async fn test_drop_on_current_position_is_unchanged() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let outcome = HandleTreeDrop::new(backend.clone(), settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("f", "p1", "g", DropOperation::ReorderBefore),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TreeDropOutcome::Unchanged);
        assert!(outcome.patch().is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_combine_onto_own_parent_as_last_child_is_unchanged() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let outcome = HandleTreeDrop::new(backend.clone(), settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("y", "p1", "f", DropOperation::Combine),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TreeDropOutcome::Unchanged);
        assert!(outcome.patch().is_empty());
        assert!(backend.calls().is_empty());
        assert_eq!(child_ids(&store, "p1", "f"), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_combine_onto_own_parent_moves_child_last() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let outcome = HandleTreeDrop::new(backend.clone(), settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("x", "p1", "f", DropOperation::Combine),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TreeDropOutcome::Reordered {
                aggregate_id: "p1".into(),
                updates: vec![OrderUpdate::new("y", 1), OrderUpdate::new("x", 2)],
            }
        );
        assert_eq!(backend.calls(), vec!["batch_update"]);
    }

    #[tokio::test]
    async fn test_combine_moves_folder_under_target() {
        let backend = MockBackend::default();
        let repository = MockStateRepository::default();
        let mut ui = ui(&repository).await;
        let mut store = two_projects();

        let outcome = HandleTreeDrop::new(backend.clone(), settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("g", "p1", "f", DropOperation::Combine),
            )
            .await
            .unwrap();

        match outcome {
            TreeDropOutcome::Moved { path, order, .. } => {
                assert_eq!(path.raw(), "endpoints/F/G");
                assert_eq!(order, 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(child_ids(&store, "p1", "f"), vec!["x", "y", "g"]);
        assert_eq!(backend.calls(), vec!["update"]);
        assert_eq!(repository.get("g").unwrap().order, 3);
    }

    #[tokio::test]
    async fn test_cross_list_reorder_renumbers_both_lists() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();
        let root_id = store.sub_root("p1", ResourceClass::Endpoint).unwrap().id.clone();

        let outcome = HandleTreeDrop::new(backend.clone(), settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("x", "p1", "g", DropOperation::ReorderBefore),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome.patch().to_update,
            vec![
                OrderUpdate::new("y", 1),
                OrderUpdate::new("g", 3),
                OrderUpdate::new("x", 2),
            ]
        );
        assert_eq!(child_ids(&store, "p1", &root_id), vec!["f", "x", "g"]);
        assert_eq!(child_ids(&store, "p1", "f"), vec!["y"]);
        assert_eq!(backend.calls(), vec!["update", "batch_update"]);

        let log = backend.log.lock().expect("Lock poisoned");
        let (_, relocated) = &log.updated[0];
        assert_eq!(relocated.path.as_ref().unwrap().raw(), "endpoints");
        assert_eq!(relocated.order, Some(2));
    }

    #[tokio::test]
    async fn test_drop_on_root_appends_to_sub_root() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();
        let drop = TreeDrop {
            source: TreeNodeRef::new("p1", "x"),
            target: TreeDropTarget::Root {
                aggregate_id: "p1".into(),
                class: ResourceClass::Endpoint,
            },
            instruction: DropInstruction::new(DropOperation::ReorderAfter),
        };

        let outcome = HandleTreeDrop::new(backend, settings())
            .execute(&mut store, &mut ui, drop)
            .await
            .unwrap();

        assert!(matches!(outcome, TreeDropOutcome::Moved { order: 3, .. }));
    }

    #[tokio::test]
    async fn test_parent_into_own_child_is_blocked() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();
        let before = store.collections_trees().to_vec();

        let err = HandleTreeDrop::new(backend.clone(), settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("f", "p1", "x", DropOperation::ReorderBefore),
            )
            .await
            .unwrap_err();

        assert!(err.is_blocked());
        assert_eq!(store.collections_trees(), before.as_slice());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_combine_onto_item_is_ignored() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let outcome = HandleTreeDrop::new(backend.clone(), settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("g", "p1", "x", DropOperation::Combine),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TreeDropOutcome::Unchanged);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blocked_or_empty_instruction_is_rejected() {
        let handler = HandleTreeDrop::new(MockBackend::default(), settings());
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let mut blocked = node_drop("g", "p1", "f", DropOperation::ReorderBefore);
        blocked.instruction.blocked = true;
        let err = handler.execute(&mut store, &mut ui, blocked).await.unwrap_err();
        assert!(err.is_blocked());

        let mut empty = node_drop("g", "p1", "f", DropOperation::ReorderBefore);
        empty.instruction.operation = None;
        let err = handler.execute(&mut store, &mut ui, empty).await.unwrap_err();
        assert!(matches!(
            err,
            DropError::ValidationBlocked(DropRejection::MissingOperation)
        ));
    }

    #[tokio::test]
    async fn test_unknown_source_is_not_found() {
        let handler = HandleTreeDrop::new(MockBackend::default(), settings());
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let err = handler
            .execute(
                &mut store,
                &mut ui,
                node_drop("ghost", "p1", "f", DropOperation::ReorderBefore),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DropError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_cross_aggregate_drop_migrates() {
        let backend = MockBackend::default();
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();

        let outcome = HandleTreeDrop::new(backend, settings())
            .execute(
                &mut store,
                &mut ui,
                node_drop("f", "p2", "h", DropOperation::Combine),
            )
            .await
            .unwrap();

        let patch = outcome.patch();
        assert_eq!(patch.to_add.len(), 3);
        assert_eq!(patch.to_remove, vec!["f".to_string()]);
        assert_eq!(child_ids(&store, "p2", "h").len(), 2);
        assert!(store.aggregate("p1").unwrap().find("f").is_none());
    }

    #[tokio::test]
    async fn test_refresh_after_drop_streams_affected_path() {
        let backend = MockBackend::default();
        backend.set_entries(
            "p1",
            vec![
                entry("g", "endpoints/G", NodeKind::Dir, 1),
                entry("f", "endpoints/F", NodeKind::Dir, 2),
                entry("x", "endpoints/F/X", NodeKind::Item, 1),
                entry("y", "endpoints/F/Y", NodeKind::Item, 2),
            ],
        );
        let mut ui = ui(&MockStateRepository::default()).await;
        let mut store = two_projects();
        let root_id = store.sub_root("p1", ResourceClass::Endpoint).unwrap().id.clone();

        HandleTreeDrop::new(backend.clone(), EngineSettings::default())
            .execute(
                &mut store,
                &mut ui,
                node_drop("g", "p1", "f", DropOperation::ReorderBefore),
            )
            .await
            .unwrap();

        assert_eq!(backend.calls(), vec!["batch_update", "stream"]);
        assert_eq!(child_ids(&store, "p1", &root_id), vec!["g", "f"]);
        assert_eq!(child_ids(&store, "p1", "f"), vec!["x", "y"]);
    }
}
