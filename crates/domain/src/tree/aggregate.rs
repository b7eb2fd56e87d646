//! Per-aggregate trees with typed sub-roots.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::node::{NodeKind, Protocol, ResourceClass, TreeNode};
use super::path::ResourcePath;
use crate::error::{DomainError, DomainResult};
use crate::id::synthetic_dir_id;
use crate::order::{max_order, order_at};

/// One record of the authoritative entry stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    /// Backend id.
    pub id: String,
    /// Name, equal to the last path segment.
    pub name: String,
    /// Full materialized path, starting with the class segment.
    pub path: ResourcePath,
    /// Sub-root class.
    pub class: ResourceClass,
    /// Dir or Item.
    pub kind: NodeKind,
    /// Persisted order; entries without one are appended.
    #[serde(default)]
    pub order: Option<u32>,
    /// Protocol for items.
    #[serde(default)]
    pub protocol: Option<Protocol>,
}

impl ResourceEntry {
    fn into_node(self, order: u32, parent_id: Option<String>) -> TreeNode {
        TreeNode {
            id: self.id,
            name: self.name,
            kind: self.kind,
            class: self.class,
            order,
            path: self.path,
            protocol: self.protocol,
            parent_id,
            child_nodes: Vec::new(),
        }
    }
}

/// A top-level collection with its own id space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateTree {
    /// Aggregate id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Order among aggregates.
    pub order: u32,
    /// `requests` sub-root.
    pub requests: TreeNode,
    /// `endpoints` sub-root.
    pub endpoints: TreeNode,
    /// `components` sub-root.
    pub components: TreeNode,
    /// `schemas` sub-root.
    pub schemas: TreeNode,
}

impl AggregateTree {
    /// Creates an aggregate with four empty sub-roots.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        let id = id.into();
        let sub_root = |index: usize| {
            let class = ResourceClass::ALL[index];
            let path = ResourcePath::from_segments(vec![class.root_segment().to_string()]);
            let root_id = synthetic_dir_id(&id, path.segments());
            TreeNode::dir(root_id, class, path, order_at(index))
        };
        Self {
            requests: sub_root(0),
            endpoints: sub_root(1),
            components: sub_root(2),
            schemas: sub_root(3),
            id,
            name: name.into(),
            order,
        }
    }

    /// Sub-root for a class.
    #[must_use]
    pub const fn root(&self, class: ResourceClass) -> &TreeNode {
        match class {
            ResourceClass::Request => &self.requests,
            ResourceClass::Endpoint => &self.endpoints,
            ResourceClass::Component => &self.components,
            ResourceClass::Schema => &self.schemas,
        }
    }

    /// Mutable sub-root for a class.
    pub const fn root_mut(&mut self, class: ResourceClass) -> &mut TreeNode {
        match class {
            ResourceClass::Request => &mut self.requests,
            ResourceClass::Endpoint => &mut self.endpoints,
            ResourceClass::Component => &mut self.components,
            ResourceClass::Schema => &mut self.schemas,
        }
    }

    /// All sub-roots in display order.
    #[must_use]
    pub const fn roots(&self) -> [&TreeNode; 4] {
        [&self.requests, &self.endpoints, &self.components, &self.schemas]
    }

    fn roots_mut(&mut self) -> [&mut TreeNode; 4] {
        [
            &mut self.requests,
            &mut self.endpoints,
            &mut self.components,
            &mut self.schemas,
        ]
    }

    /// True if `id` is one of the sub-roots.
    #[must_use]
    pub fn is_sub_root(&self, id: &str) -> bool {
        self.roots().iter().any(|root| root.id == id)
    }

    /// Finds a node anywhere in the aggregate.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        self.roots().into_iter().find_map(|root| root.find(id))
    }

    /// Mutable lookup anywhere in the aggregate.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        self.roots_mut()
            .into_iter()
            .find_map(|root| root.find_mut(id))
    }

    /// Parent of `id`; sub-roots have none.
    #[must_use]
    pub fn find_parent(&self, id: &str) -> Option<&TreeNode> {
        self.roots().into_iter().find_map(|root| root.find_parent(id))
    }

    /// Node at a materialized path.
    #[must_use]
    pub fn find_by_path(&self, path: &ResourcePath) -> Option<&TreeNode> {
        let class = path
            .segments()
            .first()
            .and_then(|segment| ResourceClass::from_root_segment(segment))?;
        self.root(class).find_by_path(path)
    }

    /// Every node id, sub-roots included.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        self.roots()
            .into_iter()
            .flat_map(TreeNode::subtree_ids)
            .collect()
    }

    /// Detaches a node (and its subtree). Sub-roots cannot be removed.
    pub fn remove(&mut self, id: &str) -> Option<TreeNode> {
        self.roots_mut()
            .into_iter()
            .find_map(|root| root.remove_descendant(id))
    }

    /// Replaces the node with the same id, subtree included.
    ///
    /// Returns `false` if no node with that id exists.
    pub fn replace_subtree(&mut self, node: TreeNode) -> bool {
        match self.find_mut(&node.id) {
            Some(slot) => {
                *slot = node;
                true
            }
            None => false,
        }
    }

    /// Attaches `node` as a child of `parent_id`, rebasing its paths.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if the parent is missing and `NotADirectory` if
    /// the parent is an item.
    pub fn attach(&mut self, parent_id: &str, mut node: TreeNode) -> DomainResult<()> {
        let parent = self
            .find_mut(parent_id)
            .ok_or_else(|| DomainError::ItemNotFound(parent_id.to_string()))?;
        if !parent.is_dir() {
            return Err(DomainError::NotADirectory(parent_id.to_string()));
        }
        node.parent_id = Some(parent.id.clone());
        node.rebase(&parent.path);
        parent.child_nodes.push(node);
        Ok(())
    }

    /// Idempotently upserts an entry by id.
    ///
    /// Walks the path from the class sub-root, creating synthetic directories
    /// for missing intermediate segments. An entry whose id already lives at
    /// another path is moved there together with its children. A node with
    /// the same name and kind but a different id (an optimistic placeholder or
    /// a synthetic directory) takes over the entry's id.
    ///
    /// # Errors
    /// Returns `InvalidPath` if the path does not start with the entry's
    /// class segment.
    pub fn upsert_entry(&mut self, entry: ResourceEntry) -> DomainResult<()> {
        let segments = entry.path.segments().to_vec();
        if segments.first().map(String::as_str) != Some(entry.class.root_segment()) {
            return Err(DomainError::InvalidPath(entry.path.raw()));
        }

        if segments.len() == 1 {
            let root = self.root_mut(entry.class);
            retarget_children(root, &entry.id);
            root.id = entry.id;
            return Ok(());
        }

        let mut carried_children = Vec::new();
        if let Some(existing) = self.find(&entry.id) {
            if existing.path == entry.path {
                if let Some(node) = self.find_mut(&entry.id) {
                    node.name = entry.name;
                    node.kind = entry.kind;
                    node.protocol = entry.protocol;
                    if let Some(order) = entry.order {
                        node.order = order;
                    }
                }
                return Ok(());
            }
            if let Some(mut moved) = self.remove(&entry.id) {
                carried_children = std::mem::take(&mut moved.child_nodes);
            }
        }

        let aggregate_id = self.id.clone();
        let mut current = self.root_mut(entry.class);
        for depth in 1..segments.len() - 1 {
            let segment = &segments[depth];
            let position = current
                .child_nodes
                .iter()
                .position(|child| child.is_dir() && &child.name == segment);
            let index = if let Some(index) = position {
                index
            } else {
                let dir_path = ResourcePath::from_segments(segments[..=depth].to_vec());
                let mut dir = TreeNode::dir(
                    synthetic_dir_id(&aggregate_id, dir_path.segments()),
                    entry.class,
                    dir_path,
                    max_order(&current.child_nodes) + 1,
                );
                dir.parent_id = Some(current.id.clone());
                current.child_nodes.push(dir);
                current.child_nodes.len() - 1
            };
            current = &mut current.child_nodes[index];
        }

        let parent_id = current.id.clone();
        let next_order = max_order(&current.child_nodes) + 1;
        let existing = current
            .child_nodes
            .iter_mut()
            .find(|child| child.name == entry.name && child.kind == entry.kind);

        match existing {
            Some(node) => {
                node.id = entry.id;
                node.protocol = entry.protocol;
                if let Some(order) = entry.order {
                    node.order = order;
                }
                node.child_nodes.extend(carried_children);
                let own_path = node.path.clone();
                let own_id = node.id.clone();
                for child in &mut node.child_nodes {
                    child.parent_id = Some(own_id.clone());
                    child.rebase(&own_path);
                }
            }
            None => {
                let order = entry.order.unwrap_or(next_order);
                let mut node = entry.into_node(order, Some(parent_id));
                let own_path = node.path.clone();
                for mut child in carried_children {
                    child.parent_id = Some(node.id.clone());
                    child.rebase(&own_path);
                    node.child_nodes.push(child);
                }
                current.child_nodes.push(node);
            }
        }
        Ok(())
    }

    /// Removes nodes strictly beneath `path` whose ids are not in `keep`.
    ///
    /// A node survives if it or any of its descendants is kept. Returns the
    /// ids that were pruned.
    pub fn prune_under(&mut self, path: &ResourcePath, keep: &HashSet<String>) -> Vec<String> {
        let Some(class) = path
            .segments()
            .first()
            .and_then(|segment| ResourceClass::from_root_segment(segment))
        else {
            return Vec::new();
        };
        let Some(anchor_id) = self.root(class).find_by_path(path).map(|n| n.id.clone()) else {
            return Vec::new();
        };
        let mut pruned = Vec::new();
        if let Some(anchor) = self.find_mut(&anchor_id) {
            prune_children(anchor, keep, &mut pruned);
        }
        pruned
    }

    /// Sorts every sibling list by order.
    pub fn sort_recursive(&mut self) {
        for root in self.roots_mut() {
            root.sort_recursive();
        }
    }
}

fn retarget_children(node: &mut TreeNode, new_id: &str) {
    for child in &mut node.child_nodes {
        child.parent_id = Some(new_id.to_string());
    }
}

fn prune_children(node: &mut TreeNode, keep: &HashSet<String>, pruned: &mut Vec<String>) {
    for child in &mut node.child_nodes {
        prune_children(child, keep, pruned);
    }
    node.child_nodes.retain(|child| {
        let survives = keep.contains(&child.id) || !child.child_nodes.is_empty();
        if !survives {
            pruned.push(child.id.clone());
        }
        survives
    });
}
