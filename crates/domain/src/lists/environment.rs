//! Global and per-project environment lists.

use serde::{Deserialize, Serialize};

use crate::diff::{OrderUpdate, changed_orders, order_map};
use crate::error::{DomainError, DomainResult};
use crate::order::{Ordered, Placement, insert, remove, reorder, sort_by_order};

/// Which list an environment belongs to.
///
/// Each scope is its own aggregate on the backend: an environment cannot be
/// re-parented, only deleted and recreated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "scope", content = "projectId")]
pub enum EnvironmentScope {
    /// Workspace-wide environments.
    Global,
    /// Environments grouped under a project.
    Project(String),
}

/// An environment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentItem {
    /// Environment id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// 1-based order within its scope.
    pub order: u32,
    /// Optional badge color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl EnvironmentItem {
    /// Creates an environment entry.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            color: None,
        }
    }
}

impl Ordered for EnvironmentItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// Environments of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentGroup {
    /// Owning project.
    pub project_id: String,
    /// Whether the group is expanded in the list.
    #[serde(default)]
    pub expanded: bool,
    /// Environments ordered within the group.
    #[serde(default)]
    pub environments: Vec<EnvironmentItem>,
}

/// Creation payload for an environment recreated in another scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvironment {
    /// Destination scope.
    pub scope: EnvironmentScope,
    /// Name copied from the source.
    pub name: String,
    /// Order in the destination list.
    pub order: u32,
    /// Color copied from the source.
    pub color: Option<String>,
}

/// Backend work produced by one environment drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMovePlan {
    /// Environment to delete at the source scope.
    pub delete: Option<String>,
    /// Environment to create at the destination scope.
    pub create: Option<CreateEnvironment>,
    /// Order changes in both lists, excluding the moved environment.
    pub updates: Vec<OrderUpdate>,
}

impl EnvironmentMovePlan {
    /// True when the drop changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delete.is_none() && self.create.is_none() && self.updates.is_empty()
    }
}

/// The full environments panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentLists {
    /// Global environments.
    #[serde(default)]
    pub globals: Vec<EnvironmentItem>,
    /// Per-project groups.
    #[serde(default)]
    pub groups: Vec<EnvironmentGroup>,
}

impl EnvironmentLists {
    /// Environments in a scope.
    #[must_use]
    pub fn list(&self, scope: &EnvironmentScope) -> Option<&[EnvironmentItem]> {
        match scope {
            EnvironmentScope::Global => Some(&self.globals),
            EnvironmentScope::Project(project_id) => self
                .groups
                .iter()
                .find(|group| &group.project_id == project_id)
                .map(|group| group.environments.as_slice()),
        }
    }

    fn list_mut(&mut self, scope: &EnvironmentScope) -> DomainResult<&mut Vec<EnvironmentItem>> {
        match scope {
            EnvironmentScope::Global => Ok(&mut self.globals),
            EnvironmentScope::Project(project_id) => self
                .groups
                .iter_mut()
                .find(|group| &group.project_id == project_id)
                .map(|group| &mut group.environments)
                .ok_or_else(|| DomainError::ItemNotFound(project_id.clone())),
        }
    }

    /// Scope holding `id`.
    #[must_use]
    pub fn scope_of(&self, id: &str) -> Option<EnvironmentScope> {
        if self.globals.iter().any(|env| env.id == id) {
            return Some(EnvironmentScope::Global);
        }
        self.groups
            .iter()
            .find(|group| group.environments.iter().any(|env| env.id == id))
            .map(|group| EnvironmentScope::Project(group.project_id.clone()))
    }

    /// Sorts every list by order.
    pub fn sort(&mut self) {
        sort_by_order(&mut self.globals);
        for group in &mut self.groups {
            sort_by_order(&mut group.environments);
        }
    }

    /// Applies a drop locally and returns the backend work it implies.
    ///
    /// Within a scope this is a reorder. Across scopes the environment stays
    /// in the destination list under its old id until [`Self::replace_id`]
    /// swaps in the id assigned on creation.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if the source, the target or the destination
    /// group is missing.
    pub fn plan_move(
        &mut self,
        source_id: &str,
        destination: &EnvironmentScope,
        placement: &Placement,
    ) -> DomainResult<EnvironmentMovePlan> {
        let source_scope = self
            .scope_of(source_id)
            .ok_or_else(|| DomainError::ItemNotFound(source_id.to_string()))?;

        if &source_scope == destination {
            let list = self.list_mut(destination)?;
            let before = order_map(list);
            reorder(list, source_id, placement)?;
            return Ok(EnvironmentMovePlan {
                updates: changed_orders(&before, list),
                ..EnvironmentMovePlan::default()
            });
        }

        let target_list = self.list_mut(destination)?;
        if let Placement::Edge { target_id, .. } = placement {
            if !target_list.iter().any(|env| &env.id == target_id) {
                return Err(DomainError::ItemNotFound(target_id.clone()));
            }
        }

        let source_list = self.list_mut(&source_scope)?;
        let source_before = order_map(source_list);
        let environment = remove(source_list, source_id)?;
        let mut updates = changed_orders(&source_before, source_list);

        let target_list = self.list_mut(destination)?;
        let target_before = order_map(target_list);
        insert(target_list, environment, placement)?;
        updates.extend(changed_orders(&target_before, target_list));

        let moved = target_list
            .iter()
            .find(|env| env.id == source_id)
            .ok_or_else(|| DomainError::ItemNotFound(source_id.to_string()))?;

        Ok(EnvironmentMovePlan {
            delete: Some(source_id.to_string()),
            create: Some(CreateEnvironment {
                scope: destination.clone(),
                name: moved.name.clone(),
                order: moved.order,
                color: moved.color.clone(),
            }),
            updates,
        })
    }

    /// Replaces a placeholder id with the backend-assigned one.
    pub fn replace_id(&mut self, old_id: &str, new_id: &str) -> bool {
        let all = self
            .globals
            .iter_mut()
            .chain(self.groups.iter_mut().flat_map(|g| g.environments.iter_mut()));
        for env in all {
            if env.id == old_id {
                env.id = new_id.to_string();
                return true;
            }
        }
        false
    }
}
