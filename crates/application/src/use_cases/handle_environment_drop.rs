//! Handle environment drop use case

use arbor_domain::lists::{EnvironmentLists, EnvironmentMovePlan, EnvironmentScope};
use arbor_domain::{DropInstruction, DropOperation, DropRejection, Placement};
use tracing::{debug, info, warn};

use crate::error::{DropError, DropResult};
use crate::ports::EnvironmentBackend;

/// What an environment was dropped on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentDropTarget {
    /// Another environment.
    Item(String),
    /// A group header or the global list.
    Group(EnvironmentScope),
}

/// Moves environments within a scope or between scopes.
///
/// Scopes are separate aggregates on the backend, so a move between them
/// creates the environment at the destination and deletes the original.
#[derive(Clone)]
pub struct HandleEnvironmentDrop<E> {
    backend: E,
}

impl<E: EnvironmentBackend> HandleEnvironmentDrop<E> {
    /// Creates a new `HandleEnvironmentDrop` use case.
    pub const fn new(backend: E) -> Self {
        Self { backend }
    }

    /// Executes the use case and returns the applied plan.
    ///
    /// After a move between scopes the local entry carries the id assigned
    /// by the backend.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown environments or groups and
    /// `EnvironmentRejection` when a backend call fails.
    pub async fn execute(
        &self,
        lists: &mut EnvironmentLists,
        source_id: &str,
        target: EnvironmentDropTarget,
        instruction: DropInstruction,
    ) -> DropResult<EnvironmentMovePlan> {
        if instruction.blocked {
            return Err(DropRejection::InstructionBlocked.into());
        }
        let operation = instruction.operation.ok_or(DropRejection::MissingOperation)?;

        let (destination, placement) = match target {
            EnvironmentDropTarget::Item(target_id) => {
                if target_id == source_id || operation == DropOperation::Combine {
                    debug!(source = source_id, target = %target_id, "Environment drop ignored");
                    return Ok(EnvironmentMovePlan::default());
                }
                let scope = lists
                    .scope_of(&target_id)
                    .ok_or_else(|| DropError::NotFound(target_id.clone()))?;
                (scope, operation.placement(&target_id))
            }
            EnvironmentDropTarget::Group(scope) => (scope, Placement::Append),
        };

        let plan = lists.plan_move(source_id, &destination, &placement)?;
        if plan.is_empty() {
            return Ok(plan);
        }

        if let Some(create) = &plan.create {
            let new_id = self.backend.create_environment(create.clone()).await?;
            if let Some(old_id) = &plan.delete {
                if let Err(err) = self.backend.delete_environment(old_id).await {
                    warn!(
                        environment = %old_id,
                        error = %err,
                        "Original environment was not deleted"
                    );
                    return Err(err.into());
                }
            }
            lists.replace_id(source_id, &new_id);
            info!(
                old = source_id,
                new = %new_id,
                scope = ?destination,
                "Environment moved to another scope"
            );
        }
        if !plan.updates.is_empty() {
            self.backend.batch_update_environments(plan.updates.clone()).await?;
        }
        debug!(source = source_id, changed = plan.updates.len(), "Environment drop applied");
        Ok(plan)
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
    use crate::ports::EnvironmentBackendError;
    use arbor_domain::OrderUpdate;
    use arbor_domain::lists::{CreateEnvironment, EnvironmentGroup, EnvironmentItem};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockBackend {
        calls: Arc<Mutex<Vec<String>>>,
        created: Arc<Mutex<Vec<CreateEnvironment>>>,
        fail_delete: bool,
    }

    #[async_trait]
    impl EnvironmentBackend for MockBackend {
        async fn list_environments(&self) -> Result<EnvironmentLists, EnvironmentBackendError> {
            Ok(EnvironmentLists::default())
        }

        async fn create_environment(
            &self,
            input: CreateEnvironment,
        ) -> Result<String, EnvironmentBackendError> {
            self.calls.lock().expect("Lock poisoned").push("create".into());
            self.created.lock().expect("Lock poisoned").push(input);
            Ok("env-new".into())
        }

        async fn delete_environment(&self, id: &str) -> Result<(), EnvironmentBackendError> {
            self.calls.lock().expect("Lock poisoned").push(format!("delete {id}"));
            if self.fail_delete {
                return Err(EnvironmentBackendError::Rejected(id.to_string()));
            }
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

    fn lists() -> EnvironmentLists {
        EnvironmentLists {
            globals: vec![
                EnvironmentItem::new("g1", "Dev", 1),
                EnvironmentItem::new("g2", "Staging", 2),
                EnvironmentItem::new("g3", "Prod", 3),
            ],
            groups: vec![EnvironmentGroup {
                project_id: "p1".into(),
                expanded: true,
                environments: vec![
                    EnvironmentItem::new("e1", "Local", 1),
                    EnvironmentItem::new("e2", "Mock", 2),
                ],
            }],
        }
    }

    #[tokio::test]
    async fn test_reorder_within_globals() {
        let backend = MockBackend::default();
        let mut lists = lists();

        let plan = HandleEnvironmentDrop::new(backend.clone())
            .execute(
                &mut lists,
                "g3",
                EnvironmentDropTarget::Item("g1".into()),
                DropInstruction::new(DropOperation::ReorderBefore),
            )
            .await
            .unwrap();

        assert!(plan.create.is_none());
        assert_eq!(plan.updates.len(), 3);
        assert_eq!(*backend.calls.lock().expect("Lock poisoned"), vec!["update 3"]);
        let ids: Vec<&str> = lists.globals.iter().map(|env| env.id.as_str()).collect();
        assert_eq!(ids, vec!["g3", "g1", "g2"]);
    }

    #[tokio::test]
    async fn test_global_into_group_creates_then_deletes() {
        let backend = MockBackend::default();
        let mut lists = lists();

        let plan = HandleEnvironmentDrop::new(backend.clone())
            .execute(
                &mut lists,
                "g1",
                EnvironmentDropTarget::Item("e2".into()),
                DropInstruction::new(DropOperation::ReorderBefore),
            )
            .await
            .unwrap();

        assert_eq!(plan.delete.as_deref(), Some("g1"));
        let created = backend.created.lock().expect("Lock poisoned").clone();
        assert_eq!(created[0].scope, EnvironmentScope::Project("p1".into()));
        assert_eq!(created[0].order, 2);
        assert_eq!(
            *backend.calls.lock().expect("Lock poisoned"),
            vec!["create", "delete g1", "update 3"]
        );
        let group: Vec<&str> = lists.groups[0]
            .environments
            .iter()
            .map(|env| env.id.as_str())
            .collect();
        assert_eq!(group, vec!["e1", "env-new", "e2"]);
        assert_eq!(lists.scope_of("g1"), None);
    }

    #[tokio::test]
    async fn test_drop_on_group_header_appends() {
        let mut lists = lists();
        let plan = HandleEnvironmentDrop::new(MockBackend::default())
            .execute(
                &mut lists,
                "e1",
                EnvironmentDropTarget::Group(EnvironmentScope::Global),
                DropInstruction::new(DropOperation::Combine),
            )
            .await
            .unwrap();

        assert_eq!(plan.create.unwrap().order, 4);
        assert_eq!(lists.globals.last().unwrap().id, "env-new");
    }

    #[tokio::test]
    async fn test_failed_delete_is_reported() {
        let backend = MockBackend {
            fail_delete: true,
            ..MockBackend::default()
        };
        let mut lists = lists();

        let err = HandleEnvironmentDrop::new(backend)
            .execute(
                &mut lists,
                "g1",
                EnvironmentDropTarget::Group(EnvironmentScope::Project("p1".into())),
                DropInstruction::new(DropOperation::Combine),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DropError::EnvironmentRejection(_)));
    }

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let mut lists = lists();
        let err = HandleEnvironmentDrop::new(MockBackend::default())
            .execute(
                &mut lists,
                "g1",
                EnvironmentDropTarget::Group(EnvironmentScope::Project("nope".into())),
                DropInstruction::new(DropOperation::Combine),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DropError::NotFound(id) if id == "nope"));
    }
}
