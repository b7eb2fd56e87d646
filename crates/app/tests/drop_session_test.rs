//! End-to-end drop handling against the in-memory backends.
//!
//! Each test seeds a fresh session from the same fixture, with UI state
//! persisted to a temporary workspace directory.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use arbor::{AppError, Session, WorkspaceFixture};
use arbor_application::ports::{ActivityBarRepository, EnvironmentBackend, TreeItemStateRepository};
use arbor_application::use_cases::{TableDropOutcome, TreeDropOutcome};
use arbor_application::{DropError, DropReport};
use arbor_domain::lists::{EnvironmentItem, EnvironmentScope, ParamRow, ParamShape};
use arbor_domain::{
    DragSource, DropEvent, DropInstruction, DropOperation, DropTarget, EngineSettings,
    ParamRowRef, ResourceClass, ResourceEntry, ResourcePath, TreeItemState, TreeNodeRef,
};
use arbor_infrastructure::{
    FileActivityBarRepository, FileTreeItemStateRepository, TokioFileSystem,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::{TempDir, tempdir};

fn fixture() -> WorkspaceFixture {
    let endpoint = |kind: &str, path: &str, name: &str, order: u32| {
        json!({"class": "endpoint", "kind": kind, "path": path, "name": name, "order": order})
    };
    let fixture = json!({
        "aggregates": [
            {
                "id": "p1",
                "name": "Project A",
                "order": 1,
                "resources": [
                    endpoint("dir", "endpoints", "F", 1),
                    endpoint("item", "endpoints/F", "X", 1),
                    endpoint("item", "endpoints/F", "Y", 2),
                    endpoint("dir", "endpoints", "G", 2),
                    endpoint("item", "endpoints/G", "foo", 1),
                    endpoint("dir", "endpoints/G", "Inner", 2),
                    endpoint("item", "endpoints", "foo", 3),
                    endpoint("item", "endpoints", "H", 4)
                ]
            },
            {
                "id": "p2",
                "name": "Project B",
                "order": 2,
                "resources": [
                    endpoint("item", "endpoints", "K", 1),
                    endpoint("dir", "endpoints", "L", 2)
                ]
            }
        ],
        "environments": {
            "globals": [
                {"id": "dev", "name": "Dev", "order": 1},
                {"id": "prod", "name": "Prod", "order": 2}
            ],
            "groups": [
                {"projectId": "p1", "expanded": true, "environments": [
                    {"id": "local", "name": "Local", "order": 1}
                ]}
            ]
        },
        "activityBar": [
            {"id": "projects", "icon": "folder", "order": 1},
            {"id": "environments", "icon": "globe", "order": 2},
            {"id": "settings", "icon": "gear", "order": 3}
        ],
        "tables": {"tables": [
            {"id": "t1", "rows": [
                {"key": "A", "order": 1},
                {"key": "B", "order": 2},
                {"key": "C", "order": 3},
                {"key": "D", "order": 4}
            ]}
        ]},
        "endpoints": [{
            "aggregateId": "p1",
            "path": "endpoints/foo",
            "params": {
                "query": [
                    {"id": "q1", "name": "page", "value": "1", "order": 1},
                    {"id": "q2", "name": "limit", "value": "20", "order": 2}
                ],
                "path": [{"id": "p1", "name": "userId", "value": "42", "order": 1}]
            }
        }]
    });
    WorkspaceFixture::from_json(&fixture.to_string()).unwrap()
}

async fn open_with(settings: EngineSettings) -> (Session, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory");
    let session = Session::open(fixture(), dir.path(), settings)
        .await
        .expect("Failed to open session");
    (session, dir)
}

async fn open() -> (Session, TempDir) {
    open_with(EngineSettings::default()).await
}

fn node(aggregate_id: &str, path: &str) -> TreeNodeRef {
    TreeNodeRef::new(aggregate_id, format!("@{path}"))
}

fn tree_drop(source: TreeNodeRef, target: TreeNodeRef, operation: DropOperation) -> DropEvent {
    DropEvent::new(
        DragSource::TreeNode(source),
        DropTarget::TreeNode(target),
        operation,
    )
}

fn id_at(session: &Session, aggregate_id: &str, path: &str) -> String {
    let path = ResourcePath::parse(path).unwrap();
    session
        .engine()
        .trees()
        .aggregate(aggregate_id)
        .and_then(|tree| tree.find_by_path(&path))
        .map(|node| node.id.clone())
        .unwrap_or_else(|| panic!("no node at {path}"))
}

/// `(name, order)` of the children of `path`, as stored by the backend.
fn backend_children(session: &Session, aggregate_id: &str, path: &str) -> Vec<(String, u32)> {
    let parent = ResourcePath::parse(path).unwrap();
    let mut children: Vec<ResourceEntry> = session
        .backend()
        .entries(aggregate_id)
        .into_iter()
        .filter(|entry| entry.path.parent() == parent)
        .collect();
    children.sort_by_key(|entry| entry.order);
    children
        .into_iter()
        .map(|entry| (entry.name, entry.order.unwrap_or_default()))
        .collect()
}

/// `(name, order)` of the children of `path` in the local tree.
fn local_children(session: &Session, aggregate_id: &str, path: &str) -> Vec<(String, u32)> {
    let path = ResourcePath::parse(path).unwrap();
    let tree = session.engine().trees().aggregate(aggregate_id).unwrap();
    let parent = tree
        .find_by_path(&path)
        .unwrap_or_else(|| tree.root(ResourceClass::Endpoint));
    parent
        .sorted_children()
        .into_iter()
        .map(|child| (child.name.clone(), child.order))
        .collect()
}

fn pairs(items: &[(&str, u32)]) -> Vec<(String, u32)> {
    items
        .iter()
        .map(|(name, order)| ((*name).to_string(), *order))
        .collect()
}

#[tokio::test]
async fn test_reorder_is_a_permutation_with_dense_orders() {
    let (mut session, _dir) = open().await;

    let report = session
        .drop_event(tree_drop(
            node("p1", "endpoints/H"),
            node("p1", "endpoints/F"),
            DropOperation::ReorderBefore,
        ))
        .await
        .unwrap();

    assert!(matches!(report, DropReport::Tree(TreeDropOutcome::Reordered { .. })));
    let expected = pairs(&[("H", 1), ("F", 2), ("G", 3), ("foo", 4)]);
    assert_eq!(local_children(&session, "p1", "endpoints"), expected);
    assert_eq!(backend_children(&session, "p1", "endpoints"), expected);
}

#[tokio::test]
async fn test_drop_on_satisfied_position_changes_nothing() {
    let (mut session, _dir) = open().await;
    let before = session.backend().entries("p1");

    let report = session
        .drop_event(tree_drop(
            node("p1", "endpoints/G"),
            node("p1", "endpoints/F"),
            DropOperation::ReorderAfter,
        ))
        .await
        .unwrap();

    assert_eq!(report, DropReport::Tree(TreeDropOutcome::Unchanged));
    assert_eq!(report_patch_len(&report), 0);
    assert_eq!(session.backend().entries("p1"), before);
}

fn report_patch_len(report: &DropReport) -> usize {
    match report {
        DropReport::Tree(outcome) => {
            let patch = outcome.patch();
            patch.to_add.len() + patch.to_update.len() + patch.to_remove.len()
        }
        _ => panic!("not a tree report"),
    }
}

#[tokio::test]
async fn test_drop_into_own_descendant_is_blocked() {
    let (mut session, _dir) = open().await;
    let before = session.backend().entries("p1");

    let err = session
        .drop_event(tree_drop(
            node("p1", "endpoints/G"),
            node("p1", "endpoints/G/Inner"),
            DropOperation::Combine,
        ))
        .await
        .unwrap_err();

    assert!(matches!(&err, AppError::Engine(drop) if drop.is_blocked()));
    assert_eq!(session.backend().entries("p1"), before);
}

#[tokio::test]
async fn test_combine_onto_folder_with_same_name_child_is_blocked() {
    let (mut session, _dir) = open().await;
    let before = session.backend().entries("p1");

    let err = session
        .drop_event(tree_drop(
            node("p1", "endpoints/foo"),
            node("p1", "endpoints/G"),
            DropOperation::Combine,
        ))
        .await
        .unwrap_err();

    assert!(matches!(&err, AppError::Engine(drop) if drop.is_blocked()));
    assert_eq!(session.backend().entries("p1"), before);
    assert_eq!(
        local_children(&session, "p1", "endpoints/G"),
        pairs(&[("foo", 1), ("Inner", 2)])
    );
}

#[tokio::test]
async fn test_blocked_instruction_never_reaches_the_backend() {
    let (mut session, _dir) = open().await;
    let before = session.backend().entries("p1");
    let mut event = tree_drop(
        node("p1", "endpoints/H"),
        node("p1", "endpoints/F"),
        DropOperation::ReorderBefore,
    );
    event.instruction = DropInstruction {
        operation: Some(DropOperation::ReorderBefore),
        blocked: true,
    };

    let err = session.drop_event(event).await.unwrap_err();

    assert!(matches!(&err, AppError::Engine(drop) if drop.is_blocked()));
    assert_eq!(session.backend().entries("p1"), before);
}

#[tokio::test]
async fn test_combine_into_folder_moves_within_aggregate() {
    let (mut session, _dir) = open().await;

    let report = session
        .drop_event(tree_drop(
            node("p1", "endpoints/H"),
            node("p1", "endpoints/F"),
            DropOperation::Combine,
        ))
        .await
        .unwrap();

    assert!(matches!(report, DropReport::Tree(TreeDropOutcome::Moved { order: 3, .. })));
    let expected = pairs(&[("X", 1), ("Y", 2), ("H", 3)]);
    assert_eq!(local_children(&session, "p1", "endpoints/F"), expected);
    assert_eq!(backend_children(&session, "p1", "endpoints/F"), expected);
    assert_eq!(
        backend_children(&session, "p1", "endpoints"),
        pairs(&[("F", 1), ("G", 2), ("foo", 3)])
    );
}

#[tokio::test]
async fn test_folder_migrates_to_other_project_with_its_ui_state() {
    let (mut session, dir) = open().await;
    let old_ids: Vec<String> = ["endpoints/F", "endpoints/F/X", "endpoints/F/Y"]
        .iter()
        .map(|path| id_at(&session, "p1", path))
        .collect();
    let states = [(1, true), (1, false), (2, true)]
        .map(|(order, expanded)| TreeItemState { order, expanded });
    for (id, state) in old_ids.iter().zip(states) {
        session
            .engine_mut()
            .tree_state_mut()
            .put(id, state)
            .await
            .unwrap();
    }

    let report = session
        .drop_event(DropEvent::new(
            DragSource::TreeNode(node("p1", "endpoints/F")),
            DropTarget::TreeRoot {
                aggregate_id: "p2".into(),
                class: ResourceClass::Endpoint,
            },
            DropOperation::Combine,
        ))
        .await
        .unwrap();
    assert!(matches!(report, DropReport::Tree(TreeDropOutcome::Migrated(_))));

    // Source: F, X and Y are gone along with their state rows.
    assert_eq!(
        backend_children(&session, "p1", "endpoints"),
        pairs(&[("G", 1), ("foo", 2), ("H", 3)])
    );
    let table = session.engine().tree_state().table();
    for id in &old_ids {
        assert_eq!(table.get(id), None);
    }

    // Destination: F' appended after K and L, children keep their orders.
    assert_eq!(
        backend_children(&session, "p2", "endpoints"),
        pairs(&[("K", 1), ("L", 2), ("F", 3)])
    );
    assert_eq!(
        backend_children(&session, "p2", "endpoints/F"),
        pairs(&[("X", 1), ("Y", 2)])
    );
    assert_eq!(
        local_children(&session, "p2", "endpoints/F"),
        pairs(&[("X", 1), ("Y", 2)])
    );

    let new_ids: Vec<String> = ["endpoints/F", "endpoints/F/X", "endpoints/F/Y"]
        .iter()
        .map(|path| id_at(&session, "p2", path))
        .collect();
    for (new_id, state) in new_ids.iter().zip(states) {
        assert!(!old_ids.contains(new_id));
        assert_eq!(table.get(new_id), Some(state));
    }

    // The rekeyed rows were persisted.
    let reopened = FileTreeItemStateRepository::new(TokioFileSystem::new(), dir.path());
    let persisted = reopened.load_all().await.unwrap();
    let mut persisted_ids: Vec<String> = persisted.into_iter().map(|row| row.id).collect();
    persisted_ids.sort();
    let mut expected_ids = new_ids.clone();
    expected_ids.sort();
    assert_eq!(persisted_ids, expected_ids);
}

#[tokio::test]
async fn test_failed_delete_is_rolled_back_when_enabled() {
    let settings = EngineSettings {
        rollback_partial_migrations: true,
        ..EngineSettings::default()
    };
    let (mut session, _dir) = open_with(settings).await;
    session.backend().fail_next("delete");

    let err = session
        .drop_event(DropEvent::new(
            DragSource::TreeNode(node("p1", "endpoints/F")),
            DropTarget::TreeRoot {
                aggregate_id: "p2".into(),
                class: ResourceClass::Endpoint,
            },
            DropOperation::Combine,
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Engine(DropError::PartialMigrationFailure {
            compensated: true,
            ..
        })
    ));
    assert_eq!(
        backend_children(&session, "p2", "endpoints"),
        pairs(&[("K", 1), ("L", 2)])
    );
    assert_eq!(local_children(&session, "p2", "endpoints"), pairs(&[("K", 1), ("L", 2)]));
    assert_eq!(
        local_children(&session, "p1", "endpoints/F"),
        pairs(&[("X", 1), ("Y", 2)])
    );
}

#[tokio::test]
async fn test_failed_delete_without_rollback_leaves_duplicate() {
    let (mut session, _dir) = open().await;
    session.backend().fail_next("delete");

    let err = session
        .drop_event(DropEvent::new(
            DragSource::TreeNode(node("p1", "endpoints/F")),
            DropTarget::TreeRoot {
                aggregate_id: "p2".into(),
                class: ResourceClass::Endpoint,
            },
            DropOperation::Combine,
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Engine(DropError::PartialMigrationFailure {
            compensated: false,
            ..
        })
    ));
    assert_eq!(
        backend_children(&session, "p2", "endpoints"),
        pairs(&[("K", 1), ("L", 2), ("F", 3)])
    );
    assert_eq!(backend_children(&session, "p1", "endpoints")[0].0, "F");
}

#[tokio::test]
async fn test_generic_swap_on_table_rows() {
    let (mut session, _dir) = open().await;

    let report = session
        .drop_event(DropEvent::new(
            DragSource::TableRow {
                table_id: "t1".into(),
                row_key: "A".into(),
            },
            DropTarget::TableRow {
                table_id: "t1".into(),
                row_key: "C".into(),
            },
            DropOperation::Combine,
        ))
        .await
        .unwrap();

    assert_eq!(report, DropReport::Table(TableDropOutcome::Swapped));
    let table = session.engine().tables().get("t1").unwrap();
    let rows: Vec<(String, u32)> = table
        .rows
        .iter()
        .map(|row| (row.key.clone(), row.order))
        .collect();
    assert_eq!(rows, pairs(&[("C", 1), ("B", 2), ("A", 3), ("D", 4)]));
}

#[tokio::test]
async fn test_query_row_moves_into_path_list() {
    let (mut session, _dir) = open().await;
    let endpoint_id = id_at(&session, "p1", "endpoints/foo");

    let report = session
        .drop_event(DropEvent::new(
            DragSource::ParamRow(ParamRowRef {
                endpoint_id: "@endpoints/foo".into(),
                shape: ParamShape::Query,
                row_id: "q1".into(),
            }),
            DropTarget::ParamList {
                endpoint_id: "@endpoints/foo".into(),
                shape: ParamShape::Path,
            },
            DropOperation::Combine,
        ))
        .await
        .unwrap();

    let DropReport::Params(patch) = report else {
        panic!("expected a params report");
    };
    assert_eq!(patch.query.to_remove, vec!["q1".to_string()]);
    assert_eq!(patch.path.to_add[0].name, "page");
    assert_eq!(patch.path.to_add[0].order, 2);

    let local = &session.engine().endpoint(&endpoint_id).unwrap().params;
    let view = |rows: &[ParamRow]| -> Vec<(String, u32)> {
        rows.iter().map(|row| (row.name.clone(), row.order)).collect()
    };
    assert_eq!(view(&local.query), pairs(&[("limit", 1)]));
    assert_eq!(view(&local.path), pairs(&[("userId", 1), ("page", 2)]));

    let stored = session.backend().endpoint_params("p1", &endpoint_id);
    assert_eq!(view(&stored.query), pairs(&[("limit", 1)]));
    assert_eq!(view(&stored.path), pairs(&[("userId", 1), ("page", 2)]));
}

fn param_to_list(from: ParamShape, row_id: &str, to: ParamShape) -> DropEvent {
    DropEvent::new(
        DragSource::ParamRow(ParamRowRef {
            endpoint_id: "@endpoints/foo".into(),
            shape: from,
            row_id: row_id.into(),
        }),
        DropTarget::ParamList {
            endpoint_id: "@endpoints/foo".into(),
            shape: to,
        },
        DropOperation::Combine,
    )
}

#[tokio::test]
async fn test_query_row_moves_to_path_and_back() {
    let (mut session, _dir) = open().await;
    let endpoint_id = id_at(&session, "p1", "endpoints/foo");

    session
        .drop_event(param_to_list(ParamShape::Query, "q1", ParamShape::Path))
        .await
        .unwrap();
    let moved_id = {
        let local = &session.engine().endpoint(&endpoint_id).unwrap().params;
        let stored = session.backend().endpoint_params("p1", &endpoint_id);
        assert_eq!(local, &stored);
        local.path[1].id.clone()
    };
    assert_ne!(moved_id, "q1");

    let report = session
        .drop_event(param_to_list(
            ParamShape::Path,
            &moved_id,
            ParamShape::Query,
        ))
        .await
        .unwrap();
    let DropReport::Params(patch) = report else {
        panic!("expected a params report");
    };
    assert_eq!(patch.path.to_remove, vec![moved_id]);

    let local = &session.engine().endpoint(&endpoint_id).unwrap().params;
    let stored = session.backend().endpoint_params("p1", &endpoint_id);
    assert_eq!(local, &stored);
    let names = |rows: &[ParamRow]| -> Vec<String> {
        rows.iter().map(|row| row.name.clone()).collect()
    };
    assert_eq!(names(&stored.query), vec!["limit".to_string(), "page".to_string()]);
    assert_eq!(names(&stored.path), vec!["userId".to_string()]);
}

#[tokio::test]
async fn test_global_environment_moves_into_project_group() {
    let (mut session, _dir) = open().await;

    let report = session
        .drop_event(DropEvent::new(
            DragSource::EnvironmentItem {
                environment_id: "dev".into(),
            },
            DropTarget::EnvironmentGroup {
                scope: EnvironmentScope::Project("p1".into()),
            },
            DropOperation::Combine,
        ))
        .await
        .unwrap();

    let DropReport::Environments(plan) = report else {
        panic!("expected an environments report");
    };
    assert_eq!(plan.delete.as_deref(), Some("dev"));

    let view = |items: &[EnvironmentItem]| -> Vec<(String, u32)> {
        let mut items: Vec<(String, u32)> = items
            .iter()
            .map(|env| (env.name.clone(), env.order))
            .collect();
        items.sort_by_key(|(_, order)| *order);
        items
    };
    let stored = session
        .environment_backend()
        .list_environments()
        .await
        .unwrap();
    assert_eq!(view(&stored.globals), pairs(&[("Prod", 1)]));
    assert_eq!(
        view(&stored.groups[0].environments),
        pairs(&[("Local", 1), ("Dev", 2)])
    );

    let local = session.engine().environments();
    assert_eq!(view(&local.groups[0].environments), view(&stored.groups[0].environments));
    assert!(local.groups[0].environments.iter().all(|env| env.id != "dev"));
}

#[tokio::test]
async fn test_activity_bar_order_is_persisted() {
    let (mut session, dir) = open().await;

    session
        .drop_event(DropEvent::new(
            DragSource::ActivityBarButton {
                id: "settings".into(),
            },
            DropTarget::ActivityBarButton {
                id: "projects".into(),
            },
            DropOperation::ReorderBefore,
        ))
        .await
        .unwrap();

    let saved = FileActivityBarRepository::new(TokioFileSystem::new(), dir.path())
        .load()
        .await
        .unwrap();
    assert_eq!(saved.group_order, vec!["settings", "projects", "environments"]);
}

#[tokio::test]
async fn test_replay_continues_after_a_failed_drop() {
    let (mut session, _dir) = open().await;

    let steps = session
        .replay(vec![
            tree_drop(
                node("p1", "endpoints/missing"),
                node("p1", "endpoints/F"),
                DropOperation::ReorderBefore,
            ),
            tree_drop(
                node("p1", "endpoints/H"),
                node("p1", "endpoints/F"),
                DropOperation::ReorderBefore,
            ),
        ])
        .await;

    assert!(matches!(steps[0].outcome, Err(AppError::UnresolvedPath { .. })));
    assert!(steps[1].outcome.is_ok());
    assert!(session.render().contains("  H #1"));
}
