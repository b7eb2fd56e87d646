//! Minimal order patches between two versions of a list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::order::Ordered;

/// A single order change sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderUpdate {
    /// Item id.
    pub id: String,
    /// New order.
    pub order: u32,
}

impl OrderUpdate {
    /// Creates an order update.
    #[must_use]
    pub fn new(id: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            order,
        }
    }
}

/// Minimal mutation for one affected list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSet<A> {
    /// New items, built without backend identity.
    pub to_add: Vec<A>,
    /// Existing items whose order changed.
    pub to_update: Vec<OrderUpdate>,
    /// Ids of removed items.
    pub to_remove: Vec<String>,
}

impl<A> Default for PatchSet<A> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_update: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

impl<A> PatchSet<A> {
    /// Patch that only renumbers.
    #[must_use]
    pub const fn updates(to_update: Vec<OrderUpdate>) -> Self {
        Self {
            to_add: Vec::new(),
            to_update,
            to_remove: Vec::new(),
        }
    }

    /// True when there is nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// Snapshot of `id -> order` for a list.
#[must_use]
pub fn order_map<T: Ordered>(items: &[T]) -> HashMap<String, u32> {
    items
        .iter()
        .map(|item| (item.id().to_string(), item.order()))
        .collect()
}

/// Items whose order differs between `old` and `new`.
///
/// Ids present on only one side are ignored: additions and removals travel in
/// their own patch fields. The result is sorted by new order, then id.
#[must_use]
pub fn diff_orders(old: &HashMap<String, u32>, new: &HashMap<String, u32>) -> Vec<OrderUpdate> {
    let mut changed: Vec<OrderUpdate> = new
        .iter()
        .filter(|(id, order)| old.get(*id).is_some_and(|previous| previous != *order))
        .map(|(id, order)| OrderUpdate::new(id.clone(), *order))
        .collect();
    changed.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    changed
}

/// Convenience wrapper over [`diff_orders`] for two list snapshots.
#[must_use]
pub fn changed_orders<T: Ordered>(before: &HashMap<String, u32>, after: &[T]) -> Vec<OrderUpdate> {
    diff_orders(before, &order_map(after))
}

/// Concatenates two update lists; a later entry for an id wins.
#[must_use]
pub fn merge_updates(first: Vec<OrderUpdate>, second: Vec<OrderUpdate>) -> Vec<OrderUpdate> {
    let mut merged: Vec<OrderUpdate> = Vec::with_capacity(first.len() + second.len());
    for update in first.into_iter().chain(second) {
        match merged.iter_mut().find(|existing| existing.id == update.id) {
            Some(existing) => existing.order = update.order,
            None => merged.push(update),
        }
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::order::tests::slots;
    use crate::order::{Placement, reorder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unchanged_items_are_excluded() {
        let mut list = slots(&["a", "b", "c", "d", "e"]);
        let before = order_map(&list);
        reorder(&mut list, "d", &Placement::before("c")).unwrap();

        let patch = changed_orders(&before, &list);
        assert_eq!(
            patch,
            vec![OrderUpdate::new("d", 3), OrderUpdate::new("c", 4)]
        );
    }

    #[test]
    fn test_noop_drop_produces_empty_patch() {
        let mut list = slots(&["a", "b", "c"]);
        let before = order_map(&list);
        reorder(&mut list, "b", &Placement::before("c")).unwrap();

        let patch: PatchSet<()> = PatchSet::updates(changed_orders(&before, &list));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_ids_on_one_side_only_are_ignored() {
        let old = HashMap::from([("a".to_string(), 1), ("gone".to_string(), 2)]);
        let new = HashMap::from([("a".to_string(), 2), ("fresh".to_string(), 1)]);
        assert_eq!(diff_orders(&old, &new), vec![OrderUpdate::new("a", 2)]);
    }

    #[test]
    fn test_patch_set_serializes_camel_case() {
        let patch: PatchSet<String> = PatchSet {
            to_add: vec!["x".into()],
            to_update: vec![],
            to_remove: vec!["y".into()],
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["toAdd"][0], "x");
        assert_eq!(json["toRemove"][0], "y");
    }
}
