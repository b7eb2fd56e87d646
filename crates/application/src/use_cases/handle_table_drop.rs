//! Handle table row drop use case

use arbor_domain::lists::Tables;
use arbor_domain::{DropInstruction, DropOperation, DropRejection};
use tracing::debug;

use crate::error::DropResult;

/// Result of a table row drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableDropOutcome {
    /// Nothing moved.
    Unchanged,
    /// The row moved within its table or into another one.
    Moved,
    /// The row traded places with the target row.
    Swapped,
}

/// Moves rows of local tables. Nothing is persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleTableDrop;

impl HandleTableDrop {
    /// Creates a new `HandleTableDrop` use case.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes the use case.
    ///
    /// An edge drop places the row next to the target, in whichever table
    /// the target lives. A combine onto a row of the same table swaps the
    /// two rows.
    ///
    /// # Errors
    /// Returns `ValidationBlocked` for blocked instructions or combines
    /// across tables, and `NotFound` for unknown tables or rows.
    pub fn execute(
        &self,
        tables: &mut Tables,
        (source_table, row_key): (&str, &str),
        (target_table, target_key): (&str, &str),
        instruction: DropInstruction,
    ) -> DropResult<TableDropOutcome> {
        if instruction.blocked {
            return Err(DropRejection::InstructionBlocked.into());
        }
        let operation = instruction.operation.ok_or(DropRejection::MissingOperation)?;
        if source_table == target_table && row_key == target_key {
            return Ok(TableDropOutcome::Unchanged);
        }

        if operation == DropOperation::Combine {
            if source_table != target_table {
                return Err(DropRejection::ForeignOwner(row_key.to_string()).into());
            }
            tables.swap_rows(source_table, row_key, target_key)?;
            debug!(
                table = source_table,
                first = row_key,
                second = target_key,
                "Table rows swapped"
            );
            return Ok(TableDropOutcome::Swapped);
        }

        tables.move_row(
            source_table,
            row_key,
            target_table,
            &operation.placement(target_key),
        )?;
        debug!(from = source_table, to = target_table, row = row_key, "Table row moved");
        Ok(TableDropOutcome::Moved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arbor_domain::lists::{Table, TableRow};
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
    fn test_combine_swaps_rows() {
        let mut tables = tables();
        let outcome = HandleTableDrop::new()
            .execute(
                &mut tables,
                ("vars", "A"),
                ("vars", "C"),
                DropInstruction::new(DropOperation::Combine),
            )
            .unwrap();
        assert_eq!(outcome, TableDropOutcome::Swapped);
        assert_eq!(tables.get("vars").unwrap().keys(), vec!["C", "B", "A", "D"]);
    }

    #[test]
    fn test_edge_drop_moves_across_tables() {
        let mut tables = tables();
        let outcome = HandleTableDrop::new()
            .execute(
                &mut tables,
                ("vars", "B"),
                ("secrets", "S"),
                DropInstruction::new(DropOperation::ReorderBefore),
            )
            .unwrap();
        assert_eq!(outcome, TableDropOutcome::Moved);
        assert_eq!(tables.get("secrets").unwrap().keys(), vec!["B", "S"]);
        assert_eq!(tables.get("vars").unwrap().keys(), vec!["A", "C", "D"]);
    }

    #[test]
    fn test_combine_across_tables_is_blocked() {
        let mut tables = tables();
        let err = HandleTableDrop::new()
            .execute(
                &mut tables,
                ("vars", "B"),
                ("secrets", "S"),
                DropInstruction::new(DropOperation::Combine),
            )
            .unwrap_err();
        assert!(err.is_blocked());
    }
}
