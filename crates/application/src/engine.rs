//! Drop engine
//!
//! Owns every store and routes each drop event to the handler of its drag
//! domain. Drops are handled one at a time: the caller awaits `handle`
//! before feeding the next event.

use std::collections::BTreeMap;

use arbor_domain::lists::{
    ActivityBarItem, EndpointParams, EnvironmentLists, EnvironmentMovePlan, ParamsPatch, Tables,
};
use arbor_domain::{
    AggregateTree, DragDomain, DragSource, DropEvent, DropInstruction, DropOperation,
    DropRejection, DropTarget, EngineSettings, OrderUpdate, ResourcePath,
};
use tracing::{debug, info, warn};

use crate::error::{DropError, DropResult};
use crate::ports::{
    ActivityBarRepository, EnvironmentBackend, ResourceBackend, TreeItemStateRepository,
};
use crate::store::{ActivityBarStore, OptimisticTreeStore, TreeStateStore};
use crate::use_cases::{
    DropMonitorRegistry, EnvironmentDropTarget, HandleEnvironmentDrop, HandleParamDrop,
    HandleTableDrop, HandleTreeDrop, MonitorHandle, ParamDrop, ParamDropTarget, TableDropOutcome,
    TreeDrop, TreeDropOutcome, TreeDropTarget,
};

/// Parameter lists of an endpoint that is open for editing.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenEndpoint {
    /// Aggregate owning the endpoint.
    pub aggregate_id: String,
    /// Its parameter lists.
    pub params: EndpointParams,
}

/// What handling one drop event did.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReport {
    /// No installed monitor accepted the event.
    Ignored,
    /// Activity bar buttons were reordered.
    ActivityBar(Vec<OrderUpdate>),
    /// A tree drop was handled.
    Tree(TreeDropOutcome),
    /// A parameter row moved.
    Params(ParamsPatch),
    /// An environment moved.
    Environments(EnvironmentMovePlan),
    /// A table row moved.
    Table(TableDropOutcome),
}

/// Every drag-and-drop surface behind one entry point.
pub struct DropEngine<B, E, R, A>
where
    B: ResourceBackend + Clone,
    E: EnvironmentBackend + Clone,
    R: TreeItemStateRepository,
    A: ActivityBarRepository,
{
    registry: DropMonitorRegistry,
    monitors: Vec<MonitorHandle>,
    backend: B,
    environment_backend: E,
    trees: OptimisticTreeStore,
    tree_state: TreeStateStore<R>,
    activity_bar: ActivityBarStore<A>,
    environments: EnvironmentLists,
    endpoints: BTreeMap<String, OpenEndpoint>,
    tables: Tables,
    tree_drop: HandleTreeDrop<B>,
    param_drop: HandleParamDrop<B>,
    environment_drop: HandleEnvironmentDrop<E>,
    table_drop: HandleTableDrop,
}

impl<B, E, R, A> DropEngine<B, E, R, A>
where
    B: ResourceBackend + Clone,
    E: EnvironmentBackend + Clone,
    R: TreeItemStateRepository,
    A: ActivityBarRepository,
{
    /// Wires the handlers to their ports. Call [`Self::init`] before use.
    pub fn new(
        backend: B,
        environment_backend: E,
        tree_state: R,
        activity_bar: A,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry: DropMonitorRegistry::new(),
            monitors: Vec::new(),
            tree_drop: HandleTreeDrop::new(backend.clone(), settings),
            param_drop: HandleParamDrop::new(backend.clone()),
            environment_drop: HandleEnvironmentDrop::new(environment_backend.clone()),
            table_drop: HandleTableDrop::new(),
            backend,
            environment_backend,
            trees: OptimisticTreeStore::new(),
            tree_state: TreeStateStore::new(tree_state),
            activity_bar: ActivityBarStore::new(activity_bar),
            environments: EnvironmentLists::default(),
            endpoints: BTreeMap::new(),
            tables: Tables::default(),
        }
    }

    /// Loads every store and installs a monitor per drag domain.
    ///
    /// Each aggregate is filled from a full stream of its entries.
    ///
    /// # Errors
    /// Returns the first port failure.
    pub async fn init(
        &mut self,
        aggregates: Vec<AggregateTree>,
        buttons: Vec<ActivityBarItem>,
    ) -> DropResult<()> {
        let ids: Vec<String> = aggregates.iter().map(|tree| tree.id.clone()).collect();
        self.trees.init(aggregates);
        for aggregate_id in &ids {
            let entries = self
                .backend
                .stream_resource_entries(aggregate_id, &ResourcePath::root())
                .await?;
            self.trees.apply_entries(aggregate_id, entries)?;
        }
        self.tree_state.init().await?;
        self.activity_bar.init(buttons).await?;
        self.environments = self.environment_backend.list_environments().await?;
        self.environments.sort();

        for domain in [
            DragDomain::ActivityBar,
            DragDomain::Tree,
            DragDomain::Params,
            DragDomain::Environments,
            DragDomain::Table,
        ] {
            self.monitors.push(self.registry.install(domain));
        }
        info!(aggregates = ids.len(), "Drop engine ready");
        Ok(())
    }

    /// Uninstalls every monitor and clears the local stores.
    pub fn teardown(&mut self) {
        for handle in self.monitors.drain(..) {
            self.registry.uninstall(handle);
        }
        self.trees.teardown();
        self.tree_state.teardown();
        self.activity_bar.teardown();
        self.environments = EnvironmentLists::default();
        self.endpoints.clear();
        self.tables = Tables::default();
    }

    /// Local aggregate trees.
    #[must_use]
    pub const fn trees(&self) -> &OptimisticTreeStore {
        &self.trees
    }

    /// Local UI state.
    #[must_use]
    pub const fn tree_state(&self) -> &TreeStateStore<R> {
        &self.tree_state
    }

    /// Mutable local UI state, for expanding and collapsing nodes.
    pub const fn tree_state_mut(&mut self) -> &mut TreeStateStore<R> {
        &mut self.tree_state
    }

    /// Activity bar layout.
    #[must_use]
    pub const fn activity_bar(&self) -> &ActivityBarStore<A> {
        &self.activity_bar
    }

    /// Environment lists.
    #[must_use]
    pub const fn environments(&self) -> &EnvironmentLists {
        &self.environments
    }

    /// Local tables.
    #[must_use]
    pub const fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Replaces the local tables.
    pub fn set_tables(&mut self, tables: Tables) {
        self.tables = tables;
    }

    /// Parameter lists of an open endpoint.
    #[must_use]
    pub fn endpoint(&self, endpoint_id: &str) -> Option<&OpenEndpoint> {
        self.endpoints.get(endpoint_id)
    }

    /// Makes an endpoint's parameter lists draggable.
    pub fn open_endpoint(
        &mut self,
        endpoint_id: impl Into<String>,
        aggregate_id: impl Into<String>,
        mut params: EndpointParams,
    ) {
        params.sort();
        self.endpoints.insert(
            endpoint_id.into(),
            OpenEndpoint {
                aggregate_id: aggregate_id.into(),
                params,
            },
        );
    }

    /// Mutable access to the monitor registry.
    pub const fn registry_mut(&mut self) -> &mut DropMonitorRegistry {
        &mut self.registry
    }

    /// Handles one drop event.
    ///
    /// # Errors
    /// Returns the handler's error; see [`DropError`].
    pub async fn handle(&mut self, event: DropEvent) -> DropResult<DropReport> {
        if self.registry.route(&event).is_none() {
            return Ok(DropReport::Ignored);
        }
        let DropEvent {
            source,
            target,
            instruction,
        } = event;
        let Some(target) = target else {
            return Ok(DropReport::Ignored);
        };
        debug!(domain = ?source.domain(), "Routing drop");

        let result = self.dispatch(source, target, instruction).await;
        if let Err(err @ (DropError::ValidationBlocked(_) | DropError::NotFound(_))) = &result {
            warn!(error = %err, "Can't drop");
        }
        result
    }

    async fn dispatch(
        &mut self,
        source: DragSource,
        target: DropTarget,
        instruction: DropInstruction,
    ) -> DropResult<DropReport> {
        match (source, target) {
            (
                DragSource::ActivityBarButton { id },
                DropTarget::ActivityBarButton { id: target_id },
            ) => {
                let operation = operation(instruction)?;
                if operation == DropOperation::Combine || id == target_id {
                    return Ok(DropReport::ActivityBar(Vec::new()));
                }
                let updates = self
                    .activity_bar
                    .reorder(&id, &operation.placement(&target_id))
                    .await?;
                Ok(DropReport::ActivityBar(updates))
            }
            (
                DragSource::TreeNode(source),
                target @ (DropTarget::TreeNode(_) | DropTarget::TreeRoot { .. }),
            ) => {
                let target = match target {
                    DropTarget::TreeRoot {
                        aggregate_id,
                        class,
                    } => TreeDropTarget::Root {
                        aggregate_id,
                        class,
                    },
                    DropTarget::TreeNode(node) => TreeDropTarget::Node(node),
                    _ => return Ok(DropReport::Ignored),
                };
                let drop = TreeDrop {
                    source,
                    target,
                    instruction,
                };
                let outcome = self
                    .tree_drop
                    .execute(&mut self.trees, &mut self.tree_state, drop)
                    .await?;
                Ok(DropReport::Tree(outcome))
            }
            (
                DragSource::ParamRow(source),
                target @ (DropTarget::ParamRow(_) | DropTarget::ParamList { .. }),
            ) => {
                let target = match target {
                    DropTarget::ParamRow(row) => ParamDropTarget::Row(row),
                    DropTarget::ParamList { endpoint_id, shape } => {
                        ParamDropTarget::List { endpoint_id, shape }
                    }
                    _ => return Ok(DropReport::Ignored),
                };
                let OpenEndpoint {
                    aggregate_id,
                    params,
                } = self
                    .endpoints
                    .get_mut(&source.endpoint_id)
                    .ok_or_else(|| DropError::NotFound(source.endpoint_id.clone()))?;
                let drop = ParamDrop {
                    source,
                    target,
                    instruction,
                };
                let patch = self
                    .param_drop
                    .execute(aggregate_id.as_str(), params, drop)
                    .await?;
                Ok(DropReport::Params(patch))
            }
            (DragSource::EnvironmentItem { environment_id }, target) => {
                let target = match target {
                    DropTarget::EnvironmentItem { environment_id } => {
                        EnvironmentDropTarget::Item(environment_id)
                    }
                    DropTarget::EnvironmentGroup { scope } => EnvironmentDropTarget::Group(scope),
                    _ => return Ok(DropReport::Ignored),
                };
                let plan = self
                    .environment_drop
                    .execute(&mut self.environments, &environment_id, target, instruction)
                    .await?;
                Ok(DropReport::Environments(plan))
            }
            (
                DragSource::TableRow { table_id, row_key },
                DropTarget::TableRow {
                    table_id: target_table,
                    row_key: target_key,
                },
            ) => {
                let outcome = self.table_drop.execute(
                    &mut self.tables,
                    (&table_id, &row_key),
                    (&target_table, &target_key),
                    instruction,
                )?;
                Ok(DropReport::Table(outcome))
            }
            _ => Ok(DropReport::Ignored),
        }
    }
}

fn operation(instruction: DropInstruction) -> DropResult<DropOperation> {
    if instruction.blocked {
        return Err(DropRejection::InstructionBlocked.into());
    }
    instruction
        .operation
        .ok_or_else(|| DropRejection::MissingOperation.into())
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
        MockActivityBarRepository, MockBackend, MockEnvironmentBackend, MockStateRepository,
        entry,
    };
    use arbor_domain::lists::{ParamRow, ParamShape, Table, TableRow};
    use arbor_domain::{NodeKind, ParamRowRef, TreeNodeRef};
    use pretty_assertions::assert_eq;

    type TestEngine = DropEngine<
        MockBackend,
        MockEnvironmentBackend,
        MockStateRepository,
        MockActivityBarRepository,
    >;

    async fn engine() -> (TestEngine, MockBackend) {
        let backend = MockBackend::default();
        backend.set_entries(
            "p1",
            vec![
                entry("f", "endpoints/F", NodeKind::Dir, 1),
                entry("x", "endpoints/F/X", NodeKind::Item, 1),
                entry("g", "endpoints/G", NodeKind::Dir, 2),
            ],
        );
        let environments = MockEnvironmentBackend::with_globals(&["Dev", "Prod"]);
        let settings = EngineSettings {
            refresh_after_drop: false,
            ..EngineSettings::default()
        };
        let mut engine = DropEngine::new(
            backend.clone(),
            environments,
            MockStateRepository::default(),
            MockActivityBarRepository::default(),
            settings,
        );
        engine
            .init(
                vec![AggregateTree::new("p1", "Project A", 1)],
                vec![
                    ActivityBarItem::new("projects", "folder", 1),
                    ActivityBarItem::new("environments", "globe", 2),
                ],
            )
            .await
            .unwrap();
        (engine, backend)
    }

    #[tokio::test]
    async fn test_init_streams_aggregates() {
        let (engine, backend) = engine().await;
        assert_eq!(backend.calls(), vec!["stream"]);
        let tree = engine.trees().aggregate("p1").unwrap();
        assert_eq!(tree.find_parent("x").unwrap().id, "f");
        assert_eq!(engine.environments().globals.len(), 2);
    }

    #[tokio::test]
    async fn test_tree_event_is_routed() {
        let (mut engine, _) = engine().await;
        let report = engine
            .handle(DropEvent::new(
                DragSource::TreeNode(TreeNodeRef::new("p1", "g")),
                DropTarget::TreeNode(TreeNodeRef::new("p1", "f")),
                DropOperation::ReorderBefore,
            ))
            .await
            .unwrap();
        assert!(matches!(report, DropReport::Tree(TreeDropOutcome::Reordered { .. })));
    }

    #[tokio::test]
    async fn test_activity_bar_event_is_routed() {
        let (mut engine, _) = engine().await;
        let report = engine
            .handle(DropEvent::new(
                DragSource::ActivityBarButton {
                    id: "environments".into(),
                },
                DropTarget::ActivityBarButton {
                    id: "projects".into(),
                },
                DropOperation::ReorderBefore,
            ))
            .await
            .unwrap();
        assert_eq!(
            report,
            DropReport::ActivityBar(vec![
                OrderUpdate::new("environments", 1),
                OrderUpdate::new("projects", 2),
            ])
        );
    }

    #[tokio::test]
    async fn test_param_event_needs_open_endpoint() {
        let (mut engine, _) = engine().await;
        let event = DropEvent::new(
            DragSource::ParamRow(ParamRowRef {
                endpoint_id: "x".into(),
                shape: ParamShape::Query,
                row_id: "q1".into(),
            }),
            DropTarget::ParamList {
                endpoint_id: "x".into(),
                shape: ParamShape::Header,
            },
            DropOperation::Combine,
        );
        let err = engine.handle(event.clone()).await.unwrap_err();
        assert!(matches!(err, DropError::NotFound(_)));

        engine.open_endpoint(
            "x",
            "p1",
            EndpointParams {
                query: vec![ParamRow::new("q1", "page", "1", 1)],
                ..EndpointParams::default()
            },
        );
        let report = engine.handle(event).await.unwrap();
        assert!(matches!(report, DropReport::Params(patch) if patch.headers.to_add.len() == 1));
        assert!(engine.endpoint("x").unwrap().params.query.is_empty());
    }

    #[tokio::test]
    async fn test_environment_and_table_events_are_routed() {
        let (mut engine, _) = engine().await;
        let first = engine.environments().globals[0].id.clone();
        let second = engine.environments().globals[1].id.clone();
        let report = engine
            .handle(DropEvent::new(
                DragSource::EnvironmentItem {
                    environment_id: second.clone(),
                },
                DropTarget::EnvironmentItem {
                    environment_id: first,
                },
                DropOperation::ReorderBefore,
            ))
            .await
            .unwrap();
        assert!(matches!(report, DropReport::Environments(plan) if plan.updates.len() == 2));
        assert_eq!(engine.environments().globals[0].id, second);

        engine.set_tables(Tables {
            tables: vec![Table {
                id: "vars".into(),
                rows: vec![TableRow::new("A", 1), TableRow::new("B", 2)],
            }],
        });
        let report = engine
            .handle(DropEvent::new(
                DragSource::TableRow {
                    table_id: "vars".into(),
                    row_key: "B".into(),
                },
                DropTarget::TableRow {
                    table_id: "vars".into(),
                    row_key: "A".into(),
                },
                DropOperation::ReorderBefore,
            ))
            .await
            .unwrap();
        assert_eq!(report, DropReport::Table(TableDropOutcome::Moved));
        assert_eq!(engine.tables().get("vars").unwrap().keys(), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_mismatched_domains_and_teardown_ignore_events() {
        let (mut engine, _) = engine().await;
        let mismatched = DropEvent::new(
            DragSource::TreeNode(TreeNodeRef::new("p1", "g")),
            DropTarget::EnvironmentItem {
                environment_id: "e".into(),
            },
            DropOperation::ReorderBefore,
        );
        assert_eq!(engine.handle(mismatched).await.unwrap(), DropReport::Ignored);

        engine.teardown();
        let event = DropEvent::new(
            DragSource::TreeNode(TreeNodeRef::new("p1", "g")),
            DropTarget::TreeNode(TreeNodeRef::new("p1", "f")),
            DropOperation::ReorderBefore,
        );
        assert_eq!(engine.handle(event).await.unwrap(), DropReport::Ignored);
        assert!(engine.trees().collections_trees().is_empty());
    }
}
