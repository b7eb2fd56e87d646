//! Client-only per-node UI state, keyed by node id.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Display state of one tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeItemState {
    /// Local display order; may lag behind the backend order.
    pub order: u32,
    /// Whether the node is expanded.
    pub expanded: bool,
}

/// A state row together with its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeItemUIState {
    /// Node id.
    pub id: String,
    /// Stored state.
    #[serde(flatten)]
    pub state: TreeItemState,
}

/// Side table of UI state rows.
///
/// Kept apart from the tree so that rows survive id changes: after a
/// migration they are copied to the new ids and the old ones dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeStateTable {
    rows: BTreeMap<String, TreeItemState>,
}

impl TreeStateTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// State for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<TreeItemState> {
        self.rows.get(id).copied()
    }

    /// Inserts or replaces a row.
    pub fn put(&mut self, id: impl Into<String>, state: TreeItemState) {
        self.rows.insert(id.into(), state);
    }

    /// Removes a row.
    pub fn remove(&mut self, id: &str) -> Option<TreeItemState> {
        self.rows.remove(id)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row, sorted by id.
    #[must_use]
    pub fn rows(&self) -> Vec<TreeItemUIState> {
        self.rows
            .iter()
            .map(|(id, state)| TreeItemUIState {
                id: id.clone(),
                state: *state,
            })
            .collect()
    }

    /// Rows that carry the state of old ids over to new ids.
    ///
    /// Pairs whose old id has no row are skipped. The table itself is not
    /// changed; callers persist the rows and then store them.
    #[must_use]
    pub fn rekeyed_rows<'a, I>(&self, pairs: I) -> Vec<TreeItemUIState>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .filter_map(|(old_id, new_id)| {
                self.get(old_id).map(|state| TreeItemUIState {
                    id: new_id.to_string(),
                    state,
                })
            })
            .collect()
    }

    /// Ids with rows that are not in `live`.
    #[must_use]
    pub fn orphaned(&self, live: &HashSet<String>) -> Vec<String> {
        self.rows
            .keys()
            .filter(|id| !live.contains(*id))
            .cloned()
            .collect()
    }
}

impl FromIterator<TreeItemUIState> for TreeStateTable {
    fn from_iter<T: IntoIterator<Item = TreeItemUIState>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().map(|row| (row.id, row.state)).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state(order: u32, expanded: bool) -> TreeItemState {
        TreeItemState { order, expanded }
    }

    #[test]
    fn test_rekeyed_rows_copy_state() {
        let mut table = TreeStateTable::new();
        table.put("f", state(1, true));
        table.put("x", state(1, false));

        let rows = table.rekeyed_rows([("f", "f2"), ("x", "x2"), ("missing", "m2")]);
        assert_eq!(
            rows,
            vec![
                TreeItemUIState {
                    id: "f2".into(),
                    state: state(1, true),
                },
                TreeItemUIState {
                    id: "x2".into(),
                    state: state(1, false),
                },
            ]
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_orphaned_lists_dead_ids() {
        let table: TreeStateTable = vec![
            TreeItemUIState {
                id: "a".into(),
                state: state(1, false),
            },
            TreeItemUIState {
                id: "b".into(),
                state: state(2, true),
            },
        ]
        .into_iter()
        .collect();
        let live: HashSet<String> = ["a".to_string()].into_iter().collect();
        assert_eq!(table.orphaned(&live), vec!["b".to_string()]);
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn test_row_json_is_flat() {
        let row = TreeItemUIState {
            id: "a".into(),
            state: state(3, true),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!({"id": "a", "order": 3, "expanded": true}));
    }
}
