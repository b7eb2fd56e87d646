//! In-memory environment backend adapter

use std::sync::Arc;

use arbor_application::ports::{EnvironmentBackend, EnvironmentBackendError};
use arbor_domain::lists::{
    CreateEnvironment, EnvironmentGroup, EnvironmentItem, EnvironmentLists, EnvironmentScope,
};
use arbor_domain::{OrderUpdate, generate_id};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// Environment backend held entirely in memory. Clones share the same lists.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEnvironmentBackend {
    lists: Arc<Mutex<EnvironmentLists>>,
}

impl InMemoryEnvironmentBackend {
    /// Creates a backend holding `lists`.
    #[must_use]
    pub fn new(lists: EnvironmentLists) -> Self {
        Self {
            lists: Arc::new(Mutex::new(lists)),
        }
    }

    /// Adds an empty, collapsed project group unless it already exists.
    pub fn add_project(&self, project_id: &str) {
        let mut lists = self.lists.lock();
        if lists.groups.iter().all(|group| group.project_id != project_id) {
            lists.groups.push(EnvironmentGroup {
                project_id: project_id.to_string(),
                expanded: false,
                environments: Vec::new(),
            });
        }
    }
}

fn items_mut<'a>(
    lists: &'a mut EnvironmentLists,
    scope: &EnvironmentScope,
) -> Option<&'a mut Vec<EnvironmentItem>> {
    match scope {
        EnvironmentScope::Global => Some(&mut lists.globals),
        EnvironmentScope::Project(project_id) => lists
            .groups
            .iter_mut()
            .find(|group| &group.project_id == project_id)
            .map(|group| &mut group.environments),
    }
}

fn all_items_mut(lists: &mut EnvironmentLists) -> impl Iterator<Item = &mut EnvironmentItem> {
    lists.globals.iter_mut().chain(
        lists
            .groups
            .iter_mut()
            .flat_map(|group| group.environments.iter_mut()),
    )
}

#[async_trait]
impl EnvironmentBackend for InMemoryEnvironmentBackend {
    async fn list_environments(&self) -> Result<EnvironmentLists, EnvironmentBackendError> {
        let mut lists = self.lists.lock().clone();
        lists.sort();
        Ok(lists)
    }

    async fn create_environment(
        &self,
        input: CreateEnvironment,
    ) -> Result<String, EnvironmentBackendError> {
        let mut lists = self.lists.lock();
        let items = items_mut(&mut lists, &input.scope).ok_or_else(|| match &input.scope {
            EnvironmentScope::Project(project_id) => {
                EnvironmentBackendError::NotFound(project_id.clone())
            }
            EnvironmentScope::Global => EnvironmentBackendError::Rejected("global".into()),
        })?;

        let id = generate_id();
        items.push(EnvironmentItem {
            id: id.clone(),
            name: input.name,
            order: input.order,
            color: input.color,
        });
        debug!(%id, scope = ?input.scope, "Environment created");
        Ok(id)
    }

    async fn delete_environment(&self, id: &str) -> Result<(), EnvironmentBackendError> {
        let mut lists = self.lists.lock();
        let before = lists.globals.len();
        lists.globals.retain(|env| env.id != id);
        if lists.globals.len() != before {
            return Ok(());
        }
        for group in &mut lists.groups {
            if let Some(index) = group.environments.iter().position(|env| env.id == id) {
                group.environments.remove(index);
                return Ok(());
            }
        }
        Err(EnvironmentBackendError::NotFound(id.to_string()))
    }

    async fn batch_update_environments(
        &self,
        updates: Vec<OrderUpdate>,
    ) -> Result<(), EnvironmentBackendError> {
        let mut lists = self.lists.lock();
        if let Some(missing) = updates
            .iter()
            .find(|update| lists.scope_of(&update.id).is_none())
        {
            return Err(EnvironmentBackendError::NotFound(missing.id.clone()));
        }
        for item in all_items_mut(&mut lists) {
            if let Some(update) = updates.iter().find(|update| update.id == item.id) {
                item.order = update.order;
            }
        }
        Ok(())
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
    use pretty_assertions::assert_eq;

    fn backend() -> InMemoryEnvironmentBackend {
        let backend = InMemoryEnvironmentBackend::new(EnvironmentLists {
            globals: vec![
                EnvironmentItem::new("g2", "Staging", 2),
                EnvironmentItem::new("g1", "Dev", 1),
            ],
            groups: Vec::new(),
        });
        backend.add_project("p1");
        backend
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let lists = backend().list_environments().await.unwrap();
        let ids: Vec<&str> = lists.globals.iter().map(|env| env.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2"]);
        assert_eq!(lists.groups[0].project_id, "p1");
    }

    #[tokio::test]
    async fn test_create_then_delete_moves_between_scopes() {
        let backend = backend();
        let id = backend
            .create_environment(CreateEnvironment {
                scope: EnvironmentScope::Project("p1".into()),
                name: "Dev".into(),
                order: 1,
                color: Some("green".into()),
            })
            .await
            .unwrap();
        backend.delete_environment("g1").await.unwrap();

        let lists = backend.list_environments().await.unwrap();
        assert_eq!(lists.scope_of(&id), Some(EnvironmentScope::Project("p1".into())));
        assert_eq!(lists.scope_of("g1"), None);
        assert_eq!(lists.groups[0].environments[0].color.as_deref(), Some("green"));
    }

    #[tokio::test]
    async fn test_unknown_project_and_id() {
        let backend = backend();
        let err = backend
            .create_environment(CreateEnvironment {
                scope: EnvironmentScope::Project("nope".into()),
                name: "X".into(),
                order: 1,
                color: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, EnvironmentBackendError::NotFound("nope".into()));

        let err = backend.delete_environment("ghost").await.unwrap_err();
        assert_eq!(err, EnvironmentBackendError::NotFound("ghost".into()));
    }

    #[tokio::test]
    async fn test_batch_update_is_all_or_nothing() {
        let backend = backend();
        let err = backend
            .batch_update_environments(vec![
                OrderUpdate::new("g1", 2),
                OrderUpdate::new("ghost", 1),
            ])
            .await
            .unwrap_err();
        assert_eq!(err, EnvironmentBackendError::NotFound("ghost".into()));

        backend
            .batch_update_environments(vec![OrderUpdate::new("g1", 2), OrderUpdate::new("g2", 1)])
            .await
            .unwrap();
        let lists = backend.list_environments().await.unwrap();
        assert_eq!(lists.globals[0].id, "g2");
    }
}
