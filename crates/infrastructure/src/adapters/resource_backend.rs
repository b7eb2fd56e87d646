//! In-memory resource backend adapter
//!
//! Stands in for the remote resource API. Resources are kept per aggregate
//! with their parent path, so a relocate rewrites the parent paths of the
//! whole subtree and a delete cascades by path prefix.

use std::collections::HashMap;
use std::sync::Arc;

use arbor_application::ports::{BackendError, ResourceBackend};
use arbor_domain::lists::{AddParam, EndpointParams, ParamRow, ParamsPatch};
use arbor_domain::{
    CreateResourceInput, CreatedResource, NodeKind, PatchSet, Protocol, ResourceClass,
    ResourceEntry, ResourcePath, UpdateResourceInput, generate_id,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

/// One stored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredResource {
    id: String,
    name: String,
    class: ResourceClass,
    kind: NodeKind,
    parent: ResourcePath,
    order: u32,
    protocol: Option<Protocol>,
}

impl StoredResource {
    fn full_path(&self) -> ResourcePath {
        self.parent.child(&self.name)
    }

    fn entry(&self) -> ResourceEntry {
        ResourceEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            path: self.full_path(),
            class: self.class,
            kind: self.kind,
            order: Some(self.order),
            protocol: self.protocol,
        }
    }
}

#[derive(Debug, Default)]
struct Aggregate {
    resources: Vec<StoredResource>,
    params: HashMap<String, EndpointParams>,
}

impl Aggregate {
    fn position(&self, id: &str) -> Result<usize, BackendError> {
        self.resources
            .iter()
            .position(|resource| resource.id == id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    fn occupied(&self, path: &ResourcePath, kind: NodeKind, except: Option<&str>) -> bool {
        self.resources.iter().any(|resource| {
            resource.kind == kind
                && Some(resource.id.as_str()) != except
                && &resource.full_path() == path
        })
    }

    fn create(&mut self, input: CreateResourceInput) -> Result<CreatedResource, BackendError> {
        let full_path = input.full_path();
        if full_path.segments().first().map(String::as_str) != Some(input.class.root_segment()) {
            return Err(BackendError::Rejected(format!(
                "{full_path} is outside the {} root",
                input.class.root_segment()
            )));
        }
        if self.occupied(&full_path, input.kind, None) {
            return Err(BackendError::Conflict(full_path.raw()));
        }

        let id = generate_id();
        trace!(%id, path = %full_path, "Resource created");
        self.resources.push(StoredResource {
            id: id.clone(),
            name: input.name.clone(),
            class: input.class,
            kind: input.kind,
            parent: input.path.clone(),
            order: input.order,
            protocol: input.protocol,
        });
        Ok(CreatedResource {
            id,
            name: input.name,
            path: input.path,
            kind: input.kind,
        })
    }

    fn update(&mut self, input: UpdateResourceInput) -> Result<(), BackendError> {
        let index = self.position(&input.id)?;

        if let Some(parent) = input.path {
            let old_path = self.resources[index].full_path();
            let new_path = parent.child(&self.resources[index].name);
            if new_path.starts_with(&old_path) && new_path != old_path {
                return Err(BackendError::Rejected(format!(
                    "cannot move {old_path} beneath itself"
                )));
            }
            if self.occupied(&new_path, self.resources[index].kind, Some(input.id.as_str())) {
                return Err(BackendError::Conflict(new_path.raw()));
            }
            for resource in &mut self.resources {
                if let Some(rest) = resource.parent.strip_prefix(&old_path) {
                    resource.parent = new_path.join(&rest);
                }
            }
            self.resources[index].parent = parent;
        }
        if let Some(order) = input.order {
            self.resources[index].order = order;
        }
        if let Some(patch) = input.params {
            let params = self.params.entry(input.id).or_default();
            apply_params_patch(params, patch);
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<Vec<String>, BackendError> {
        let index = self.position(id)?;
        let path = self.resources[index].full_path();
        let mut removed = Vec::new();
        self.resources.retain(|resource| {
            let doomed = resource.id == id || resource.parent.starts_with(&path);
            if doomed {
                removed.push(resource.id.clone());
            }
            !doomed
        });
        for removed_id in &removed {
            self.params.remove(removed_id);
        }
        Ok(removed)
    }
}

fn apply_params_patch(params: &mut EndpointParams, patch: ParamsPatch) {
    apply_list_patch(&mut params.query, patch.query);
    apply_list_patch(&mut params.path, patch.path);
    apply_list_patch(&mut params.headers, patch.headers);
    params.sort();
}

fn apply_list_patch(rows: &mut Vec<ParamRow>, patch: PatchSet<AddParam>) {
    rows.retain(|row| !patch.to_remove.contains(&row.id));
    for update in patch.to_update {
        if let Some(row) = rows.iter_mut().find(|row| row.id == update.id) {
            row.order = update.order;
        }
    }
    rows.extend(patch.to_add.into_iter().map(|add| ParamRow {
        id: generate_id(),
        name: add.name,
        value: add.value,
        description: add.description,
        disabled: add.options.disabled,
        propagate: add.options.propagate,
        order: add.order,
    }));
}

#[derive(Debug, Default)]
struct State {
    aggregates: HashMap<String, Aggregate>,
    fail_next: Option<String>,
}

impl State {
    fn aggregate_mut(&mut self, id: &str) -> Result<&mut Aggregate, BackendError> {
        self.aggregates
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    fn check_failure(&mut self, call: &str) -> Result<(), BackendError> {
        if self.fail_next.as_deref() == Some(call) {
            self.fail_next = None;
            return Err(BackendError::Transport(format!("{call} failed")));
        }
        Ok(())
    }
}

/// Resource backend held entirely in memory.
///
/// Clones share the same store. Sub-roots are implicit: their paths exist
/// without a stored resource.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryResourceBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty aggregate. Registering twice keeps the contents.
    pub fn add_aggregate(&self, aggregate_id: impl Into<String>) {
        self.state.lock().aggregates.entry(aggregate_id.into()).or_default();
    }

    /// Makes the next call with this name fail with a transport error.
    ///
    /// Names are `create`, `batch_create`, `update`, `batch_update`,
    /// `delete`, `stream` and `params`.
    pub fn fail_next(&self, call: impl Into<String>) {
        self.state.lock().fail_next = Some(call.into());
    }

    /// Stores the parameter lists of an endpoint.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown aggregate or endpoint.
    pub fn set_endpoint_params(
        &self,
        aggregate_id: &str,
        endpoint_id: &str,
        params: EndpointParams,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let aggregate = state.aggregate_mut(aggregate_id)?;
        aggregate.position(endpoint_id)?;
        aggregate.params.insert(endpoint_id.to_string(), params);
        Ok(())
    }

    /// Parameter lists of an endpoint, empty when none were stored.
    #[must_use]
    pub fn endpoint_params(&self, aggregate_id: &str, endpoint_id: &str) -> EndpointParams {
        self.state
            .lock()
            .aggregates
            .get(aggregate_id)
            .and_then(|aggregate| aggregate.params.get(endpoint_id).cloned())
            .unwrap_or_default()
    }

    /// Every entry of an aggregate sorted by path.
    #[must_use]
    pub fn entries(&self, aggregate_id: &str) -> Vec<ResourceEntry> {
        let state = self.state.lock();
        let mut entries: Vec<ResourceEntry> = state
            .aggregates
            .get(aggregate_id)
            .map(|aggregate| aggregate.resources.iter().map(StoredResource::entry).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

#[async_trait]
impl ResourceBackend for InMemoryResourceBackend {
    async fn create_resource(
        &self,
        aggregate_id: &str,
        input: CreateResourceInput,
    ) -> Result<CreatedResource, BackendError> {
        let mut state = self.state.lock();
        state.check_failure("create")?;
        state.aggregate_mut(aggregate_id)?.create(input)
    }

    async fn batch_create_resources(
        &self,
        aggregate_id: &str,
        inputs: Vec<CreateResourceInput>,
    ) -> Result<Vec<CreatedResource>, BackendError> {
        let mut state = self.state.lock();
        state.check_failure("batch_create")?;
        let aggregate = state.aggregate_mut(aggregate_id)?;

        let before = aggregate.resources.len();
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            match aggregate.create(input) {
                Ok(resource) => created.push(resource),
                Err(err) => {
                    aggregate.resources.truncate(before);
                    return Err(err);
                }
            }
        }
        debug!(aggregate = aggregate_id, count = created.len(), "Batch created");
        Ok(created)
    }

    async fn update_resource(
        &self,
        aggregate_id: &str,
        input: UpdateResourceInput,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.check_failure("update")?;
        state.aggregate_mut(aggregate_id)?.update(input)
    }

    async fn batch_update_resources(
        &self,
        aggregate_id: &str,
        inputs: Vec<UpdateResourceInput>,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.check_failure("batch_update")?;
        let aggregate = state.aggregate_mut(aggregate_id)?;
        for input in &inputs {
            aggregate.position(&input.id)?;
        }
        let count = inputs.len();
        for input in inputs {
            aggregate.update(input)?;
        }
        debug!(aggregate = aggregate_id, count, "Batch updated");
        Ok(())
    }

    async fn delete_resource(&self, aggregate_id: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.check_failure("delete")?;
        let removed = state.aggregate_mut(aggregate_id)?.delete(id)?;
        debug!(aggregate = aggregate_id, id, removed = removed.len(), "Resource deleted");
        Ok(())
    }

    async fn stream_resource_entries(
        &self,
        aggregate_id: &str,
        path: &ResourcePath,
    ) -> Result<Vec<ResourceEntry>, BackendError> {
        let mut state = self.state.lock();
        state.check_failure("stream")?;
        let aggregate = state.aggregate_mut(aggregate_id)?;
        let mut entries: Vec<ResourceEntry> = aggregate
            .resources
            .iter()
            .filter(|resource| resource.full_path().starts_with(path))
            .map(StoredResource::entry)
            .collect();
        entries.sort_by(|a, b| a.path.depth().cmp(&b.path.depth()).then(a.order.cmp(&b.order)));
        Ok(entries)
    }

    async fn describe_endpoint_params(
        &self,
        aggregate_id: &str,
        endpoint_id: &str,
    ) -> Result<EndpointParams, BackendError> {
        let mut state = self.state.lock();
        state.check_failure("params")?;
        let aggregate = state.aggregate_mut(aggregate_id)?;
        aggregate.position(endpoint_id)?;
        Ok(aggregate.params.get(endpoint_id).cloned().unwrap_or_default())
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
    use arbor_domain::OrderUpdate;
    use arbor_domain::lists::ParamOptions;
    use pretty_assertions::assert_eq;

    fn path(raw: &str) -> ResourcePath {
        ResourcePath::parse(raw).unwrap()
    }

    fn dir(parent: &str, name: &str, order: u32) -> CreateResourceInput {
        CreateResourceInput {
            class: ResourceClass::Endpoint,
            kind: NodeKind::Dir,
            path: path(parent),
            name: name.into(),
            order,
            protocol: None,
        }
    }

    fn item(parent: &str, name: &str, order: u32) -> CreateResourceInput {
        CreateResourceInput {
            kind: NodeKind::Item,
            protocol: Some(Protocol::Get),
            ..dir(parent, name, order)
        }
    }

    async fn seeded() -> (InMemoryResourceBackend, Vec<CreatedResource>) {
        let backend = InMemoryResourceBackend::new();
        backend.add_aggregate("p1");
        let created = backend
            .batch_create_resources(
                "p1",
                vec![
                    dir("endpoints", "users", 1),
                    item("endpoints/users", "list", 1),
                    item("endpoints/users", "get", 2),
                    dir("endpoints", "admin", 2),
                ],
            )
            .await
            .unwrap();
        (backend, created)
    }

    fn raw_paths(entries: &[ResourceEntry]) -> Vec<String> {
        entries.iter().map(|entry| entry.path.raw()).collect()
    }

    #[tokio::test]
    async fn test_created_resource_reports_parent_path() {
        let (_, created) = seeded().await;
        assert_eq!(created[1].name, "list");
        assert_eq!(created[1].path.raw(), "endpoints/users");
    }

    #[tokio::test]
    async fn test_create_conflict_and_foreign_root() {
        let (backend, _) = seeded().await;

        let err = backend.create_resource("p1", dir("endpoints", "users", 3)).await.unwrap_err();
        assert_eq!(err, BackendError::Conflict("endpoints/users".into()));

        let err = backend.create_resource("p1", dir("schemas", "users", 1)).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));

        let err = backend.create_resource("nope", dir("endpoints", "x", 1)).await.unwrap_err();
        assert_eq!(err, BackendError::NotFound("nope".into()));
    }

    #[tokio::test]
    async fn test_failed_batch_create_leaves_nothing_behind() {
        let (backend, _) = seeded().await;
        let err = backend
            .batch_create_resources(
                "p1",
                vec![dir("endpoints", "new", 3), dir("endpoints", "admin", 4)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict(_)));
        assert_eq!(backend.entries("p1").len(), 4);
    }

    #[tokio::test]
    async fn test_stream_filters_by_prefix() {
        let (backend, _) = seeded().await;
        let entries = backend
            .stream_resource_entries("p1", &path("endpoints/users"))
            .await
            .unwrap();
        assert_eq!(
            raw_paths(&entries),
            vec!["endpoints/users", "endpoints/users/list", "endpoints/users/get"]
        );
        assert_eq!(entries[2].order, Some(2));
    }

    #[tokio::test]
    async fn test_relocate_rewrites_descendant_paths() {
        let (backend, created) = seeded().await;
        backend
            .update_resource(
                "p1",
                UpdateResourceInput::relocate(
                    &created[0].id,
                    NodeKind::Dir,
                    path("endpoints/admin"),
                    1,
                ),
            )
            .await
            .unwrap();

        assert_eq!(
            raw_paths(&backend.entries("p1")),
            vec![
                "endpoints/admin",
                "endpoints/admin/users",
                "endpoints/admin/users/get",
                "endpoints/admin/users/list",
            ]
        );
    }

    #[tokio::test]
    async fn test_relocate_into_own_subtree_is_rejected() {
        let (backend, created) = seeded().await;
        let err = backend
            .update_resource(
                "p1",
                UpdateResourceInput::relocate(
                    &created[0].id,
                    NodeKind::Dir,
                    path("endpoints/users"),
                    1,
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_batch_update_checks_every_id_first() {
        let (backend, created) = seeded().await;
        let err = backend
            .batch_update_resources(
                "p1",
                vec![
                    UpdateResourceInput::reorder(&created[0].id, NodeKind::Dir, 9),
                    UpdateResourceInput::reorder("ghost", NodeKind::Dir, 1),
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::NotFound("ghost".into()));
        assert_eq!(backend.entries("p1")[1].order, Some(1));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (backend, created) = seeded().await;
        backend.delete_resource("p1", &created[0].id).await.unwrap();
        assert_eq!(raw_paths(&backend.entries("p1")), vec!["endpoints/admin"]);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let (backend, created) = seeded().await;
        backend.fail_next("delete");
        assert!(matches!(
            backend.delete_resource("p1", &created[3].id).await,
            Err(BackendError::Transport(_))
        ));
        backend.delete_resource("p1", &created[3].id).await.unwrap();
    }

    #[tokio::test]
    async fn test_params_patch_is_applied() {
        let (backend, created) = seeded().await;
        let endpoint = &created[1].id;
        backend
            .set_endpoint_params(
                "p1",
                endpoint,
                EndpointParams {
                    query: vec![
                        ParamRow::new("q1", "page", "1", 1),
                        ParamRow::new("q2", "limit", "20", 2),
                    ],
                    ..EndpointParams::default()
                },
            )
            .unwrap();

        let patch = ParamsPatch {
            query: PatchSet {
                to_add: vec![],
                to_update: vec![OrderUpdate::new("q2", 1)],
                to_remove: vec!["q1".into()],
            },
            path: PatchSet {
                to_add: vec![AddParam {
                    name: "page".into(),
                    value: serde_json::json!("1"),
                    order: 1,
                    description: None,
                    options: ParamOptions {
                        disabled: false,
                        propagate: true,
                    },
                }],
                to_update: vec![],
                to_remove: vec![],
            },
            headers: PatchSet::default(),
        };
        backend
            .update_resource("p1", UpdateResourceInput::params(endpoint, patch))
            .await
            .unwrap();

        let params = backend.endpoint_params("p1", endpoint);
        assert_eq!(params.query.len(), 1);
        assert_eq!(params.query[0].order, 1);
        assert_eq!(params.path[0].name, "page");
        assert!(params.path[0].propagate);
    }
}
