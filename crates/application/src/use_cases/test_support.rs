//! Mock ports and fixtures shared by the use case tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use arbor_domain::lists::{
    ActivityBarState, CreateEnvironment, EndpointParams, EnvironmentItem, EnvironmentLists,
};
use arbor_domain::{
    AggregateTree, CreateResourceInput, CreatedResource, NodeKind, OrderUpdate, Protocol,
    ResourceClass, ResourceEntry, ResourcePath, TreeItemState, TreeItemUIState,
    UpdateResourceInput,
};
use async_trait::async_trait;

use crate::ports::{
    ActivityBarError, ActivityBarRepository, BackendError, EnvironmentBackend,
    EnvironmentBackendError, ResourceBackend, TreeItemStateRepository, TreeStateError,
};
use crate::store::OptimisticTreeStore;

/// Backend call names, in the order they were made.
#[derive(Debug, Default)]
pub struct BackendLog {
    pub calls: Vec<String>,
    pub created: Vec<(String, Vec<CreateResourceInput>)>,
    pub updated: Vec<(String, UpdateResourceInput)>,
    pub batch_updated: Vec<(String, Vec<UpdateResourceInput>)>,
    pub deleted: Vec<(String, String)>,
    pub entries: HashMap<String, Vec<ResourceEntry>>,
    pub params: HashMap<String, EndpointParams>,
    pub fail_on: Option<&'static str>,
    next_id: usize,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub log: Arc<Mutex<BackendLog>>,
}

impl MockBackend {
    /// Fails the first call named `call`.
    pub fn failing_on(call: &'static str) -> Self {
        let backend = Self::default();
        backend.log.lock().expect("Lock poisoned").fail_on = Some(call);
        backend
    }

    pub fn set_entries(&self, aggregate_id: &str, entries: Vec<ResourceEntry>) {
        self.log
            .lock()
            .expect("Lock poisoned")
            .entries
            .insert(aggregate_id.to_string(), entries);
    }

    /// Stored parameter lists returned by `describe_endpoint_params`.
    pub fn set_params(&self, endpoint_id: &str, params: EndpointParams) {
        self.log
            .lock()
            .expect("Lock poisoned")
            .params
            .insert(endpoint_id.to_string(), params);
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().expect("Lock poisoned").calls.clone()
    }

    fn record(&self, call: &str) -> Result<(), BackendError> {
        let mut log = self.log.lock().expect("Lock poisoned");
        log.calls.push(call.to_string());
        if log.fail_on == Some(call) {
            log.fail_on = None;
            return Err(BackendError::Transport(format!("{call} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceBackend for MockBackend {
    async fn create_resource(
        &self,
        aggregate_id: &str,
        input: CreateResourceInput,
    ) -> Result<CreatedResource, BackendError> {
        let mut created = self.batch_create_resources(aggregate_id, vec![input]).await?;
        created
            .pop()
            .ok_or_else(|| BackendError::Rejected("nothing created".into()))
    }

    async fn batch_create_resources(
        &self,
        aggregate_id: &str,
        inputs: Vec<CreateResourceInput>,
    ) -> Result<Vec<CreatedResource>, BackendError> {
        self.record("batch_create")?;
        let mut log = self.log.lock().expect("Lock poisoned");
        let created = inputs
            .iter()
            .map(|input| {
                log.next_id += 1;
                CreatedResource {
                    id: format!("new-{}", log.next_id),
                    name: input.name.clone(),
                    path: input.path.clone(),
                    kind: input.kind,
                }
            })
            .collect();
        log.created.push((aggregate_id.to_string(), inputs));
        Ok(created)
    }

    async fn update_resource(
        &self,
        aggregate_id: &str,
        input: UpdateResourceInput,
    ) -> Result<(), BackendError> {
        self.record("update")?;
        let mut log = self.log.lock().expect("Lock poisoned");
        log.updated.push((aggregate_id.to_string(), input));
        Ok(())
    }

    async fn batch_update_resources(
        &self,
        aggregate_id: &str,
        inputs: Vec<UpdateResourceInput>,
    ) -> Result<(), BackendError> {
        self.record("batch_update")?;
        let mut log = self.log.lock().expect("Lock poisoned");
        log.batch_updated.push((aggregate_id.to_string(), inputs));
        Ok(())
    }

    async fn delete_resource(&self, aggregate_id: &str, id: &str) -> Result<(), BackendError> {
        self.record("delete")?;
        let mut log = self.log.lock().expect("Lock poisoned");
        log.deleted.push((aggregate_id.to_string(), id.to_string()));
        Ok(())
    }

    async fn stream_resource_entries(
        &self,
        aggregate_id: &str,
        path: &ResourcePath,
    ) -> Result<Vec<ResourceEntry>, BackendError> {
        self.record("stream")?;
        let log = self.log.lock().expect("Lock poisoned");
        Ok(log
            .entries
            .get(aggregate_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.path.starts_with(path))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_endpoint_params(
        &self,
        _aggregate_id: &str,
        endpoint_id: &str,
    ) -> Result<EndpointParams, BackendError> {
        self.record("params")?;
        let log = self.log.lock().expect("Lock poisoned");
        log.params
            .get(endpoint_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(endpoint_id.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct MockStateRepository {
    pub rows: Arc<Mutex<BTreeMap<String, TreeItemState>>>,
}

impl MockStateRepository {
    pub fn with_rows(rows: &[(&str, u32, bool)]) -> Self {
        let repository = Self::default();
        {
            let mut stored = repository.rows.lock().expect("Lock poisoned");
            for (id, order, expanded) in rows {
                stored.insert(
                    (*id).to_string(),
                    TreeItemState {
                        order: *order,
                        expanded: *expanded,
                    },
                );
            }
        }
        repository
    }

    pub fn get(&self, id: &str) -> Option<TreeItemState> {
        self.rows.lock().expect("Lock poisoned").get(id).copied()
    }
}

#[async_trait]
impl TreeItemStateRepository for MockStateRepository {
    async fn load_all(&self) -> Result<Vec<TreeItemUIState>, TreeStateError> {
        let rows = self.rows.lock().expect("Lock poisoned");
        Ok(rows
            .iter()
            .map(|(id, state)| TreeItemUIState {
                id: id.clone(),
                state: *state,
            })
            .collect())
    }

    async fn put_tree_item_state(&self, row: &TreeItemUIState) -> Result<(), TreeStateError> {
        let mut rows = self.rows.lock().expect("Lock poisoned");
        rows.insert(row.id.clone(), row.state);
        Ok(())
    }

    async fn batch_put_tree_item_state(
        &self,
        rows: &[TreeItemUIState],
    ) -> Result<(), TreeStateError> {
        let mut stored = self.rows.lock().expect("Lock poisoned");
        for row in rows {
            stored.insert(row.id.clone(), row.state);
        }
        Ok(())
    }

    async fn remove_tree_item_state(&self, id: &str) -> Result<(), TreeStateError> {
        self.rows.lock().expect("Lock poisoned").remove(id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockEnvironmentBackend {
    pub lists: Arc<Mutex<EnvironmentLists>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockEnvironmentBackend {
    pub fn with_globals(names: &[&str]) -> Self {
        let backend = Self::default();
        backend.lists.lock().expect("Lock poisoned").globals = names
            .iter()
            .zip(1..)
            .map(|(name, order)| EnvironmentItem::new(format!("env-{order}"), *name, order))
            .collect();
        backend
    }
}

#[async_trait]
impl EnvironmentBackend for MockEnvironmentBackend {
    async fn list_environments(&self) -> Result<EnvironmentLists, EnvironmentBackendError> {
        Ok(self.lists.lock().expect("Lock poisoned").clone())
    }

    async fn create_environment(
        &self,
        input: CreateEnvironment,
    ) -> Result<String, EnvironmentBackendError> {
        let mut calls = self.calls.lock().expect("Lock poisoned");
        calls.push(format!("create {}", input.name));
        Ok(format!("created-{}", calls.len()))
    }

    async fn delete_environment(&self, id: &str) -> Result<(), EnvironmentBackendError> {
        self.calls.lock().expect("Lock poisoned").push(format!("delete {id}"));
        Ok(())
    }

    async fn batch_update_environments(
        &self,
        updates: Vec<OrderUpdate>,
    ) -> Result<(), EnvironmentBackendError> {
        self.calls
            .lock()
            .expect("Lock poisoned")
            .push(format!("update {}", updates.len()));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockActivityBarRepository {
    pub saved: Arc<Mutex<ActivityBarState>>,
}

#[async_trait]
impl ActivityBarRepository for MockActivityBarRepository {
    async fn load(&self) -> Result<ActivityBarState, ActivityBarError> {
        Ok(self.saved.lock().expect("Lock poisoned").clone())
    }

    async fn save(&self, state: &ActivityBarState) -> Result<(), ActivityBarError> {
        *self.saved.lock().expect("Lock poisoned") = state.clone();
        Ok(())
    }
}

pub fn entry(id: &str, raw: &str, kind: NodeKind, order: u32) -> ResourceEntry {
    let path = ResourcePath::parse(raw).expect("valid path");
    ResourceEntry {
        id: id.into(),
        name: path.name().unwrap_or_default().to_string(),
        path,
        class: ResourceClass::Endpoint,
        kind,
        order: Some(order),
        protocol: (kind == NodeKind::Item).then_some(Protocol::Get),
    }
}

/// `p1`: endpoints/F{X, Y} and endpoints/G{}.
/// `p2`: endpoints/H{Z} and endpoints/K.
pub fn two_projects() -> OptimisticTreeStore {
    let mut store = OptimisticTreeStore::new();
    store.init(vec![
        AggregateTree::new("p1", "Project A", 1),
        AggregateTree::new("p2", "Project B", 2),
    ]);
    store
        .apply_entries(
            "p1",
            vec![
                entry("f", "endpoints/F", NodeKind::Dir, 1),
                entry("x", "endpoints/F/X", NodeKind::Item, 1),
                entry("y", "endpoints/F/Y", NodeKind::Item, 2),
                entry("g", "endpoints/G", NodeKind::Dir, 2),
            ],
        )
        .expect("valid entries");
    store
        .apply_entries(
            "p2",
            vec![
                entry("h", "endpoints/H", NodeKind::Dir, 1),
                entry("z", "endpoints/H/Z", NodeKind::Item, 1),
                entry("k", "endpoints/K", NodeKind::Item, 2),
            ],
        )
        .expect("valid entries");
    store
}
