//! Drop event scripts.
//!
//! A script is a JSON array of drop events in the sensor's wire format.
//! Backend ids are not known when a script is written, so node and endpoint
//! ids may be given as `@path`; they are resolved against the local trees
//! right before the event is handled.

use std::path::Path;

use arbor_application::OptimisticTreeStore;
use arbor_domain::{DragSource, DropEvent, DropTarget, ParamRowRef, ResourcePath, TreeNodeRef};
use arbor_infrastructure::from_json;

use crate::error::{AppError, AppResult};

const PATH_PREFIX: char = '@';

/// Parses a script from JSON text.
///
/// # Errors
/// Returns `Parse` for malformed JSON.
pub fn parse_script(json: &str) -> AppResult<Vec<DropEvent>> {
    Ok(from_json(json)?)
}

/// Reads and parses a script file.
///
/// # Errors
/// Returns `Read` or `Parse`.
pub async fn load_script(path: &Path) -> AppResult<Vec<DropEvent>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_script(&json)
}

/// Replaces every `@path` id in `event` with the id of the node at that path.
///
/// # Errors
/// Returns `UnresolvedPath` when no node sits at a referenced path.
pub fn resolve_event(trees: &OptimisticTreeStore, mut event: DropEvent) -> AppResult<DropEvent> {
    match &mut event.source {
        DragSource::TreeNode(node) => resolve_node(trees, node)?,
        DragSource::ParamRow(row) => resolve_row(trees, row)?,
        DragSource::ActivityBarButton { .. }
        | DragSource::EnvironmentItem { .. }
        | DragSource::TableRow { .. } => {}
    }
    match &mut event.target {
        Some(DropTarget::TreeNode(node)) => resolve_node(trees, node)?,
        Some(DropTarget::ParamRow(row)) => resolve_row(trees, row)?,
        Some(DropTarget::ParamList { endpoint_id, .. }) => {
            *endpoint_id = resolve_endpoint(trees, endpoint_id)?;
        }
        _ => {}
    }
    Ok(event)
}

fn resolve_node(trees: &OptimisticTreeStore, node: &mut TreeNodeRef) -> AppResult<()> {
    let Some(raw) = node.node_id.strip_prefix(PATH_PREFIX) else {
        return Ok(());
    };
    let path = ResourcePath::parse(raw)?;
    let id = trees
        .aggregate(&node.aggregate_id)
        .and_then(|tree| tree.find_by_path(&path))
        .map(|found| found.id.clone())
        .ok_or_else(|| AppError::UnresolvedPath {
            aggregate: node.aggregate_id.clone(),
            path: path.raw(),
        })?;
    node.node_id = id;
    Ok(())
}

fn resolve_row(trees: &OptimisticTreeStore, row: &mut ParamRowRef) -> AppResult<()> {
    row.endpoint_id = resolve_endpoint(trees, &row.endpoint_id)?;
    Ok(())
}

fn resolve_endpoint(trees: &OptimisticTreeStore, endpoint_id: &str) -> AppResult<String> {
    let Some(raw) = endpoint_id.strip_prefix(PATH_PREFIX) else {
        return Ok(endpoint_id.to_string());
    };
    let path = ResourcePath::parse(raw)?;
    trees
        .collections_trees()
        .iter()
        .find_map(|tree| tree.find_by_path(&path))
        .map(|found| found.id.clone())
        .ok_or_else(|| AppError::UnresolvedPath {
            aggregate: "*".to_string(),
            path: path.raw(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use arbor_domain::{AggregateTree, DropOperation, NodeKind, ResourceClass, ResourceEntry};
    use pretty_assertions::assert_eq;

    fn trees() -> OptimisticTreeStore {
        let mut store = OptimisticTreeStore::new();
        store.init(vec![AggregateTree::new("p1", "Shop", 1)]);
        store
            .apply_entries(
                "p1",
                vec![ResourceEntry {
                    id: "abc".into(),
                    name: "users".into(),
                    path: ResourcePath::parse("endpoints/users").unwrap(),
                    class: ResourceClass::Endpoint,
                    kind: NodeKind::Dir,
                    order: Some(1),
                    protocol: None,
                }],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_parse_wire_format() {
        let events = parse_script(
            r#"[{
                "source": {
                    "type": "TreeNode",
                    "data": {"aggregateId": "p1", "nodeId": "@endpoints/users"}
                },
                "target": {"type": "TreeRoot", "data": {"aggregateId": "p2", "class": "endpoint"}},
                "instruction": {"operation": "combine"}
            }]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].instruction.operation, Some(DropOperation::Combine));
        assert!(!events[0].instruction.blocked);
    }

    #[test]
    fn test_path_references_are_resolved() {
        let event = DropEvent::new(
            DragSource::TreeNode(TreeNodeRef::new("p1", "@endpoints/users")),
            DropTarget::TreeNode(TreeNodeRef::new("p1", "plain-id")),
            DropOperation::ReorderBefore,
        );

        let resolved = resolve_event(&trees(), event).unwrap();

        let DragSource::TreeNode(source) = resolved.source else {
            panic!("source changed domain");
        };
        assert_eq!(source.node_id, "abc");
        assert_eq!(
            resolved.target,
            Some(DropTarget::TreeNode(TreeNodeRef::new("p1", "plain-id")))
        );
    }

    #[test]
    fn test_unknown_path_is_an_error() {
        let event = DropEvent::new(
            DragSource::TreeNode(TreeNodeRef::new("p1", "@endpoints/ghost")),
            DropTarget::TreeRoot {
                aggregate_id: "p1".into(),
                class: ResourceClass::Endpoint,
            },
            DropOperation::Combine,
        );
        let err = resolve_event(&trees(), event).unwrap_err();
        assert!(matches!(err, AppError::UnresolvedPath { path, .. } if path == "endpoints/ghost"));
    }
}
