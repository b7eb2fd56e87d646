//! Local-only editable tables whose rows can be dragged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{DomainError, DomainResult};
use crate::order::{Ordered, Placement, insert, remove, reorder, swap_by_id};

/// One row, keyed by a table-unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// Row key.
    pub key: String,
    /// Column values.
    #[serde(default)]
    pub cells: BTreeMap<String, JsonValue>,
    /// Disabled rows are greyed out.
    #[serde(default)]
    pub disabled: bool,
    /// 1-based position.
    pub order: u32,
}

impl TableRow {
    /// Creates an empty enabled row.
    #[must_use]
    pub fn new(key: impl Into<String>, order: u32) -> Self {
        Self {
            key: key.into(),
            cells: BTreeMap::new(),
            disabled: false,
            order,
        }
    }

    /// Sets a column value.
    #[must_use]
    pub fn with_cell(mut self, column: impl Into<String>, value: JsonValue) -> Self {
        self.cells.insert(column.into(), value);
        self
    }
}

impl Ordered for TableRow {
    fn id(&self) -> &str {
        &self.key
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// A table and its rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Table id.
    pub id: String,
    /// Rows sorted by order.
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Row keys in display order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.key.as_str()).collect()
    }
}

/// Every table rendered at once, so rows can move between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    /// Tables by id.
    pub tables: Vec<Table>,
}

impl Tables {
    /// Table by id.
    #[must_use]
    pub fn get(&self, table_id: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.id == table_id)
    }

    fn rows_mut(&mut self, table_id: &str) -> DomainResult<&mut Vec<TableRow>> {
        self.tables
            .iter_mut()
            .find(|table| table.id == table_id)
            .map(|table| &mut table.rows)
            .ok_or_else(|| DomainError::ItemNotFound(table_id.to_string()))
    }

    /// Moves a row within its table or into another one.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if a table, the row or the target is missing.
    /// Moving into a table that already has a row with the same key fails
    /// with `InvalidIdentifier`.
    pub fn move_row(
        &mut self,
        from_table: &str,
        row_key: &str,
        to_table: &str,
        placement: &Placement,
    ) -> DomainResult<()> {
        if from_table == to_table {
            return reorder(self.rows_mut(from_table)?, row_key, placement);
        }

        let target = self.rows_mut(to_table)?;
        if target.iter().any(|row| row.key == row_key) {
            return Err(DomainError::InvalidIdentifier(row_key.to_string()));
        }
        if let Placement::Edge { target_id, .. } = placement {
            if !target.iter().any(|row| &row.key == target_id) {
                return Err(DomainError::ItemNotFound(target_id.clone()));
            }
        }

        let row = remove(self.rows_mut(from_table)?, row_key)?;
        insert(self.rows_mut(to_table)?, row, placement)
    }

    /// Exchanges two rows of the same table.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if the table or either row is missing.
    pub fn swap_rows(&mut self, table_id: &str, first: &str, second: &str) -> DomainResult<()> {
        swap_by_id(self.rows_mut(table_id)?, first, second)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tables() -> Tables {
        let rows = |keys: &[&str]| {
            keys.iter()
                .zip(1..)
                .map(|(key, order)| TableRow::new(*key, order))
                .collect()
        };
        Tables {
            tables: vec![
                Table {
                    id: "vars".into(),
                    rows: rows(&["A", "B", "C", "D"]),
                },
                Table {
                    id: "secrets".into(),
                    rows: rows(&["S"]),
                },
            ],
        }
    }

    #[test]
    fn test_swap_a_and_c() {
        let mut tables = tables();
        tables.swap_rows("vars", "A", "C").unwrap();
        let vars = tables.get("vars").unwrap();
        assert_eq!(vars.keys(), vec!["C", "B", "A", "D"]);
        let orders: Vec<u32> = vars.rows.iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_move_row_to_other_table_after_target() {
        let mut tables = tables();
        tables
            .move_row("vars", "B", "secrets", &Placement::after("S"))
            .unwrap();
        assert_eq!(tables.get("vars").unwrap().keys(), vec!["A", "C", "D"]);
        assert_eq!(tables.get("secrets").unwrap().keys(), vec!["S", "B"]);
        assert_eq!(tables.get("secrets").unwrap().rows[1].order, 2);
    }

    #[test]
    fn test_move_row_key_collision_is_rejected() {
        let mut tables = tables();
        tables.tables[1].rows.push(TableRow::new("A", 2));
        let before = tables.clone();
        let err = tables
            .move_row("vars", "A", "secrets", &Placement::Append)
            .unwrap_err();
        assert_eq!(err, DomainError::InvalidIdentifier("A".into()));
        assert_eq!(tables, before);
    }

    #[test]
    fn test_reorder_within_table() {
        let mut tables = tables();
        tables
            .move_row("vars", "D", "vars", &Placement::before("A"))
            .unwrap();
        assert_eq!(tables.get("vars").unwrap().keys(), vec!["D", "A", "B", "C"]);
    }
}
