//! Optimistic copy of every aggregate tree.

use std::collections::HashSet;

use arbor_domain::migration::IdPairing;
use arbor_domain::{
    AggregateTree, DomainError, DomainResult, ResourceClass, ResourceEntry, ResourcePath,
    TreeNode, TreeNodeRef,
};

/// In-memory nested trees, one per aggregate.
///
/// Drop handlers mutate it synchronously before their backend calls resolve;
/// the authoritative entry stream later upserts by id into the same
/// structure. Only the UI task mutates it, so it needs no locking.
#[derive(Debug, Default)]
pub struct OptimisticTreeStore {
    trees: Vec<AggregateTree>,
    initialized: bool,
}

impl OptimisticTreeStore {
    /// Creates an empty, uninitialized store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trees: Vec::new(),
            initialized: false,
        }
    }

    /// Loads the initial trees.
    pub fn init(&mut self, trees: Vec<AggregateTree>) {
        self.set_items(trees);
        self.initialized = true;
    }

    /// Drops every tree.
    pub fn teardown(&mut self) {
        self.trees.clear();
        self.initialized = false;
    }

    /// True between `init` and `teardown`.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Every aggregate, sorted by order.
    #[must_use]
    pub fn collections_trees(&self) -> &[AggregateTree] {
        &self.trees
    }

    /// Replaces every tree.
    pub fn set_items(&mut self, mut trees: Vec<AggregateTree>) {
        trees.sort_by_key(|tree| tree.order);
        for tree in &mut trees {
            tree.sort_recursive();
        }
        self.trees = trees;
    }

    /// Aggregate by id.
    #[must_use]
    pub fn aggregate(&self, aggregate_id: &str) -> Option<&AggregateTree> {
        self.trees.iter().find(|tree| tree.id == aggregate_id)
    }

    /// Mutable aggregate by id.
    ///
    /// # Errors
    /// Returns `ItemNotFound` for an unknown aggregate.
    pub fn aggregate_mut(&mut self, aggregate_id: &str) -> DomainResult<&mut AggregateTree> {
        self.trees
            .iter_mut()
            .find(|tree| tree.id == aggregate_id)
            .ok_or_else(|| DomainError::ItemNotFound(aggregate_id.to_string()))
    }

    /// Puts back a previously taken snapshot of an aggregate.
    ///
    /// Returns `false` when no aggregate with that id is loaded.
    pub fn restore_aggregate(&mut self, snapshot: AggregateTree) -> bool {
        match self.trees.iter_mut().find(|tree| tree.id == snapshot.id) {
            Some(tree) => {
                *tree = snapshot;
                true
            }
            None => false,
        }
    }

    /// A node and its parent.
    #[must_use]
    pub fn locate(&self, node: &TreeNodeRef) -> Option<(&TreeNode, Option<&TreeNode>)> {
        let tree = self.aggregate(&node.aggregate_id)?;
        let found = tree.find(&node.node_id)?;
        Some((found, tree.find_parent(&node.node_id)))
    }

    /// Sub-root of an aggregate.
    #[must_use]
    pub fn sub_root(&self, aggregate_id: &str, class: ResourceClass) -> Option<&TreeNode> {
        self.aggregate(aggregate_id).map(|tree| tree.root(class))
    }

    /// Replaces a node, subtree included.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if the aggregate or node is missing.
    pub fn update_node(&mut self, aggregate_id: &str, node: TreeNode) -> DomainResult<()> {
        let id = node.id.clone();
        if self.aggregate_mut(aggregate_id)?.replace_subtree(node) {
            Ok(())
        } else {
            Err(DomainError::ItemNotFound(id))
        }
    }

    /// Upserts one entry by its materialized path.
    ///
    /// # Errors
    /// Returns an error for an unknown aggregate or an invalid path.
    pub fn insert_by_path(&mut self, aggregate_id: &str, entry: ResourceEntry) -> DomainResult<()> {
        self.aggregate_mut(aggregate_id)?.upsert_entry(entry)
    }

    /// Removes a node and its subtree.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if the aggregate or node is missing.
    pub fn remove_by_id(&mut self, aggregate_id: &str, id: &str) -> DomainResult<TreeNode> {
        self.aggregate_mut(aggregate_id)?
            .remove(id)
            .ok_or_else(|| DomainError::ItemNotFound(id.to_string()))
    }

    /// Attaches a subtree under a directory.
    ///
    /// # Errors
    /// Returns an error if the parent is missing or not a directory.
    pub fn attach(
        &mut self,
        aggregate_id: &str,
        parent_id: &str,
        node: TreeNode,
    ) -> DomainResult<()> {
        self.aggregate_mut(aggregate_id)?.attach(parent_id, node)
    }

    /// Rewrites placeholder ids after a batch create.
    ///
    /// # Errors
    /// Returns `ItemNotFound` for an unknown aggregate.
    pub fn replace_ids(&mut self, aggregate_id: &str, pairing: &IdPairing) -> DomainResult<()> {
        let tree = self.aggregate_mut(aggregate_id)?;
        for (old_id, new_id) in &pairing.pairs {
            if let Some(node) = tree.find_mut(old_id) {
                node.id.clone_from(new_id);
                for child in &mut node.child_nodes {
                    child.parent_id = Some(new_id.clone());
                }
            }
        }
        Ok(())
    }

    /// Upserts a batch of stream entries, shallowest first.
    ///
    /// # Errors
    /// Returns the first entry that cannot be applied.
    pub fn apply_entries(
        &mut self,
        aggregate_id: &str,
        mut entries: Vec<ResourceEntry>,
    ) -> DomainResult<usize> {
        entries.sort_by_key(|entry| entry.path.depth());
        let tree = self.aggregate_mut(aggregate_id)?;
        let count = entries.len();
        for entry in entries {
            tree.upsert_entry(entry)?;
        }
        tree.sort_recursive();
        Ok(count)
    }

    /// Applies a full listing of `path` and prunes nodes it no longer reports.
    ///
    /// Returns the pruned ids.
    ///
    /// # Errors
    /// Returns an error if an entry cannot be applied.
    pub fn reconcile_path(
        &mut self,
        aggregate_id: &str,
        path: &ResourcePath,
        entries: Vec<ResourceEntry>,
    ) -> DomainResult<Vec<String>> {
        let reported: HashSet<String> = entries.iter().map(|entry| entry.id.clone()).collect();
        self.apply_entries(aggregate_id, entries)?;
        Ok(self.aggregate_mut(aggregate_id)?.prune_under(path, &reported))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use arbor_domain::{NodeKind, Protocol};
    use pretty_assertions::assert_eq;

    fn entry(id: &str, raw: &str, kind: NodeKind, order: u32) -> ResourceEntry {
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

    fn store() -> OptimisticTreeStore {
        let mut store = OptimisticTreeStore::new();
        store.init(vec![AggregateTree::new("p1", "Project A", 1)]);
        store
            .apply_entries(
                "p1",
                vec![
                    entry("x", "endpoints/F/X", NodeKind::Item, 1),
                    entry("f", "endpoints/F", NodeKind::Dir, 1),
                    entry("y", "endpoints/F/Y", NodeKind::Item, 2),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_entries_build_nested_tree() {
        let store = store();
        let tree = store.aggregate("p1").unwrap();
        let folder = tree.find("f").unwrap();
        assert_eq!(folder.child_nodes.len(), 2);
        assert_eq!(tree.find_parent("y").unwrap().id, "f");
    }

    #[test]
    fn test_stream_is_idempotent() {
        let mut store = store();
        let before = store.aggregate("p1").unwrap().clone();
        store
            .apply_entries("p1", vec![entry("y", "endpoints/F/Y", NodeKind::Item, 2)])
            .unwrap();
        assert_eq!(store.aggregate("p1").unwrap(), &before);
    }

    #[test]
    fn test_reconcile_prunes_unreported() {
        let mut store = store();
        let pruned = store
            .reconcile_path(
                "p1",
                &ResourcePath::parse("endpoints").unwrap(),
                vec![
                    entry("f", "endpoints/F", NodeKind::Dir, 1),
                    entry("x", "endpoints/F/X", NodeKind::Item, 1),
                ],
            )
            .unwrap();
        assert_eq!(pruned, vec!["y".to_string()]);
        assert!(store.aggregate("p1").unwrap().find("y").is_none());
    }

    #[test]
    fn test_remove_and_teardown() {
        let mut store = store();
        let removed = store.remove_by_id("p1", "f").unwrap();
        assert_eq!(removed.child_nodes.len(), 2);
        assert!(store.remove_by_id("p1", "f").is_err());

        store.teardown();
        assert!(!store.is_initialized());
        assert!(store.collections_trees().is_empty());
    }

    #[test]
    fn test_restore_aggregate_undoes_local_edits() {
        let mut store = store();
        let snapshot = store.aggregate("p1").unwrap().clone();
        store.remove_by_id("p1", "f").unwrap();

        assert!(store.restore_aggregate(snapshot));
        assert!(store.aggregate("p1").unwrap().find("x").is_some());
        assert!(!store.restore_aggregate(AggregateTree::new("ghost", "Ghost", 9)));
    }

    #[test]
    fn test_replace_ids_rewires_children() {
        let mut store = store();
        let pairing = IdPairing {
            pairs: vec![("f".into(), "f2".into())],
            unmatched: vec![],
        };
        store.replace_ids("p1", &pairing).unwrap();
        let tree = store.aggregate("p1").unwrap();
        assert_eq!(tree.find_parent("x").unwrap().id, "f2");
        assert_eq!(tree.find("x").unwrap().parent_id.as_deref(), Some("f2"));
    }
}
