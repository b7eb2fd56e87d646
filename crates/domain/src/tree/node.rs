//! Nested tree nodes.

use serde::{Deserialize, Serialize};

use super::path::ResourcePath;
use crate::order::{Ordered, sort_by_order};

/// Whether a node can hold children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// A directory.
    Dir,
    /// A leaf resource.
    Item,
}

/// Typed sub-root a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceClass {
    /// Ad-hoc requests.
    Request,
    /// Endpoint definitions.
    Endpoint,
    /// Reusable components.
    Component,
    /// Schemas.
    Schema,
}

impl ResourceClass {
    /// All classes in sub-root display order.
    pub const ALL: [Self; 4] = [Self::Request, Self::Endpoint, Self::Component, Self::Schema];

    /// First path segment of every resource of this class.
    #[must_use]
    pub const fn root_segment(self) -> &'static str {
        match self {
            Self::Request => "requests",
            Self::Endpoint => "endpoints",
            Self::Component => "components",
            Self::Schema => "schemas",
        }
    }

    /// Class owning a first path segment.
    #[must_use]
    pub fn from_root_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.root_segment() == segment)
    }
}

/// Request protocol of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
    /// WebSocket.
    WebSocket,
    /// GraphQL.
    GraphQl,
    /// gRPC.
    Grpc,
}

/// A node in an aggregate's resource tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Backend id.
    pub id: String,
    /// Display name, also the last path segment.
    pub name: String,
    /// Dir or Item.
    pub kind: NodeKind,
    /// Sub-root class.
    pub class: ResourceClass,
    /// 1-based order among siblings.
    pub order: u32,
    /// Materialized path including `name`.
    pub path: ResourcePath,
    /// Protocol for items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Id of the parent node, `None` for sub-roots.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Children, only populated for directories.
    #[serde(default)]
    pub child_nodes: Vec<TreeNode>,
}

impl TreeNode {
    /// Creates a childless directory node.
    #[must_use]
    pub fn dir(
        id: impl Into<String>,
        class: ResourceClass,
        path: ResourcePath,
        order: u32,
    ) -> Self {
        let name = path.name().unwrap_or_default().to_string();
        Self {
            id: id.into(),
            name,
            kind: NodeKind::Dir,
            class,
            order,
            path,
            protocol: None,
            parent_id: None,
            child_nodes: Vec::new(),
        }
    }

    /// Creates an item node.
    #[must_use]
    pub fn item(
        id: impl Into<String>,
        class: ResourceClass,
        path: ResourcePath,
        order: u32,
        protocol: Option<Protocol>,
    ) -> Self {
        let name = path.name().unwrap_or_default().to_string();
        Self {
            id: id.into(),
            name,
            kind: NodeKind::Item,
            class,
            order,
            path,
            protocol,
            parent_id: None,
            child_nodes: Vec::new(),
        }
    }

    /// Appends a child, wiring its parent id.
    #[must_use]
    pub fn with_child(mut self, mut child: Self) -> Self {
        child.parent_id = Some(self.id.clone());
        self.child_nodes.push(child);
        self
    }

    /// True for directories.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }

    /// Children sorted by order.
    #[must_use]
    pub fn sorted_children(&self) -> Vec<&Self> {
        let mut children: Vec<&Self> = self.child_nodes.iter().collect();
        children.sort_by_key(|child| child.order);
        children
    }

    /// Sorts children (recursively) by order.
    pub fn sort_recursive(&mut self) {
        sort_by_order(&mut self.child_nodes);
        for child in &mut self.child_nodes {
            child.sort_recursive();
        }
    }

    /// Depth-first search by id, including `self`.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.child_nodes.iter().find_map(|child| child.find(id))
    }

    /// Mutable depth-first search by id, including `self`.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Self> {
        if self.id == id {
            return Some(self);
        }
        self.child_nodes
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    /// The direct parent of `id` within this subtree.
    #[must_use]
    pub fn find_parent(&self, id: &str) -> Option<&Self> {
        if self.child_nodes.iter().any(|child| child.id == id) {
            return Some(self);
        }
        self.child_nodes
            .iter()
            .find_map(|child| child.find_parent(id))
    }

    /// Directory at exactly `path` within this subtree.
    #[must_use]
    pub fn find_by_path(&self, path: &ResourcePath) -> Option<&Self> {
        if &self.path == path {
            return Some(self);
        }
        self.child_nodes
            .iter()
            .filter(|child| path.starts_with(&child.path))
            .find_map(|child| child.find_by_path(path))
    }

    /// True if `id` is a strict descendant of this node.
    #[must_use]
    pub fn has_descendant(&self, id: &str) -> bool {
        self.child_nodes.iter().any(|child| child.find(id).is_some())
    }

    /// True if a direct child has the same kind and name as `candidate`,
    /// ignoring `candidate` itself.
    #[must_use]
    pub fn has_similar_child(&self, candidate: &Self) -> bool {
        self.child_nodes.iter().any(|child| {
            child.id != candidate.id && child.kind == candidate.kind && child.name == candidate.name
        })
    }

    /// Ids of this node and every descendant, pre-order.
    #[must_use]
    pub fn subtree_ids(&self) -> Vec<String> {
        let mut ids = vec![self.id.clone()];
        for child in self.sorted_children() {
            ids.extend(child.subtree_ids());
        }
        ids
    }

    /// Removes a descendant by id and returns it.
    pub fn remove_descendant(&mut self, id: &str) -> Option<Self> {
        if let Some(index) = self.child_nodes.iter().position(|child| child.id == id) {
            return Some(self.child_nodes.remove(index));
        }
        self.child_nodes
            .iter_mut()
            .find_map(|child| child.remove_descendant(id))
    }

    /// Moves this subtree beneath `parent_path`, rewriting every path.
    pub fn rebase(&mut self, parent_path: &ResourcePath) {
        self.path = parent_path.child(&self.name);
        let own_path = self.path.clone();
        let own_id = self.id.clone();
        for child in &mut self.child_nodes {
            child.parent_id = Some(own_id.clone());
            child.rebase(&own_path);
        }
    }
}

impl Ordered for TreeNode {
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
