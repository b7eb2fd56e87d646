//! Workspace fixtures.
//!
//! A fixture describes the backend contents a session starts from: the
//! aggregates with their resources, the environment lists, the activity bar
//! buttons, local tables and the parameter lists of endpoints to open.

use std::path::Path;

use arbor_application::ports::ResourceBackend;
use arbor_domain::lists::{ActivityBarItem, EndpointParams, EnvironmentLists, Tables};
use arbor_domain::{AggregateTree, CreateResourceInput, NodeKind, ResourcePath};
use arbor_infrastructure::{InMemoryResourceBackend, from_json};
use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// One aggregate and the resources to create in it, parents first.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFixture {
    /// Aggregate id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Order among aggregates.
    #[serde(default)]
    pub order: u32,
    /// Creation payloads.
    #[serde(default)]
    pub resources: Vec<CreateResourceInput>,
}

/// Parameter lists of an endpoint, located by path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointFixture {
    /// Aggregate holding the endpoint.
    pub aggregate_id: String,
    /// Full path of the endpoint item.
    pub path: ResourcePath,
    /// Its parameter lists.
    #[serde(default)]
    pub params: EndpointParams,
}

/// Everything a session is seeded from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFixture {
    /// Aggregates in display order.
    #[serde(default)]
    pub aggregates: Vec<AggregateFixture>,
    /// Global and per-project environments.
    #[serde(default)]
    pub environments: EnvironmentLists,
    /// Activity bar buttons.
    #[serde(default)]
    pub activity_bar: Vec<ActivityBarItem>,
    /// Local tables.
    #[serde(default)]
    pub tables: Tables,
    /// Endpoints opened for parameter editing.
    #[serde(default)]
    pub endpoints: Vec<EndpointFixture>,
}

/// An endpoint whose parameters were stored at the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SeededEndpoint {
    /// Backend id of the endpoint.
    pub id: String,
    /// Aggregate holding it.
    pub aggregate_id: String,
    /// Its parameter lists.
    pub params: EndpointParams,
}

impl WorkspaceFixture {
    /// Parses a fixture from JSON text.
    ///
    /// # Errors
    /// Returns `Parse` for malformed JSON.
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(from_json(json)?)
    }

    /// Reads and parses a fixture file.
    ///
    /// # Errors
    /// Returns `Read` or `Parse`.
    pub async fn load(path: &Path) -> AppResult<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AppError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }

    /// Empty local trees for every aggregate.
    #[must_use]
    pub fn aggregate_trees(&self) -> Vec<AggregateTree> {
        self.aggregates
            .iter()
            .map(|aggregate| AggregateTree::new(&aggregate.id, &aggregate.name, aggregate.order))
            .collect()
    }

    /// Creates every resource and stores endpoint parameters at `backend`.
    ///
    /// # Errors
    /// Returns `Seed` when a create is refused and `UnresolvedPath` for an
    /// endpoint that was not created.
    pub async fn seed(&self, backend: &InMemoryResourceBackend) -> AppResult<Vec<SeededEndpoint>> {
        for aggregate in &self.aggregates {
            backend.add_aggregate(&aggregate.id);
            for input in &aggregate.resources {
                backend.create_resource(&aggregate.id, input.clone()).await?;
            }
            debug!(
                aggregate = %aggregate.id,
                resources = aggregate.resources.len(),
                "Aggregate seeded"
            );
        }

        let mut endpoints = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let id = backend
                .entries(&endpoint.aggregate_id)
                .into_iter()
                .find(|entry| entry.kind == NodeKind::Item && entry.path == endpoint.path)
                .map(|entry| entry.id)
                .ok_or_else(|| AppError::UnresolvedPath {
                    aggregate: endpoint.aggregate_id.clone(),
                    path: endpoint.path.raw(),
                })?;
            backend.set_endpoint_params(&endpoint.aggregate_id, &id, endpoint.params.clone())?;
            endpoints.push(SeededEndpoint {
                id,
                aggregate_id: endpoint.aggregate_id.clone(),
                params: endpoint.params.clone(),
            });
        }
        Ok(endpoints)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
        "aggregates": [{
            "id": "p1",
            "name": "Shop",
            "resources": [
                {
                    "class": "endpoint", "kind": "dir",
                    "path": "endpoints", "name": "users", "order": 1
                },
                {
                    "class": "endpoint", "kind": "item", "protocol": "GET",
                    "path": "endpoints/users", "name": "list", "order": 1
                }
            ]
        }],
        "endpoints": [{
            "aggregateId": "p1",
            "path": "endpoints/users/list",
            "params": {"query": [{"id": "q1", "name": "page", "value": "1", "order": 1}]}
        }]
    }"#;

    #[tokio::test]
    async fn test_seed_creates_resources_and_params() {
        let fixture = WorkspaceFixture::from_json(FIXTURE).unwrap();
        let backend = InMemoryResourceBackend::new();

        let endpoints = fixture.seed(&backend).await.unwrap();

        let paths: Vec<String> = backend.entries("p1").iter().map(|e| e.path.raw()).collect();
        assert_eq!(paths, vec!["endpoints/users", "endpoints/users/list"]);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(backend.endpoint_params("p1", &endpoints[0].id).query[0].id, "q1");
        assert_eq!(fixture.aggregate_trees()[0].name, "Shop");
    }

    #[tokio::test]
    async fn test_unknown_endpoint_path_is_reported() {
        let mut fixture = WorkspaceFixture::from_json(FIXTURE).unwrap();
        fixture.endpoints[0].path = ResourcePath::parse("endpoints/users/missing").unwrap();

        let err = fixture.seed(&InMemoryResourceBackend::new()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::UnresolvedPath { path, .. } if path == "endpoints/users/missing"
        ));
    }
}
