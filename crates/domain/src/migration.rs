//! Planning for moving a subtree into another aggregate.
//!
//! Aggregates have separate id spaces, so a subtree cannot be re-parented
//! across them. It is flattened, stripped of ids, recreated at the destination
//! in one batch, and the new ids are paired back to the old nodes by
//! `{path, name}`, with `kind` separating a directory from an item of the
//! same name.

use std::collections::HashMap;

use crate::error::{DomainError, DomainResult};
use crate::resource::{CreateResourceInput, CreatedResource};
use crate::tree::{NodeKind, Protocol, ResourceClass, ResourcePath, TreeNode};

/// One node of a flattened subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    /// Id in the source aggregate.
    pub source_id: String,
    /// Path relative to the subtree's parent; starts with the root's name.
    pub relative_path: ResourcePath,
    /// Sub-root class.
    pub class: ResourceClass,
    /// Dir or Item.
    pub kind: NodeKind,
    /// Node name.
    pub name: String,
    /// Protocol for items.
    pub protocol: Option<Protocol>,
    /// Order among its own siblings.
    pub order: u32,
}

/// Flattens `root` and its descendants in pre-order.
#[must_use]
pub fn flatten_subtree(root: &TreeNode) -> Vec<FlatEntry> {
    let base = root.path.parent();
    let mut entries = Vec::new();
    push_flat(root, &base, &mut entries);
    entries
}

fn push_flat(node: &TreeNode, base: &ResourcePath, entries: &mut Vec<FlatEntry>) {
    let relative_path = node
        .path
        .strip_prefix(base)
        .unwrap_or_else(|| ResourcePath::from_segments(vec![node.name.clone()]));
    entries.push(FlatEntry {
        source_id: node.id.clone(),
        relative_path,
        class: node.class,
        kind: node.kind,
        name: node.name.clone(),
        protocol: node.protocol,
        order: node.order,
    });
    for child in node.sorted_children() {
        push_flat(child, base, entries);
    }
}

/// A creation payload and the source node it recreates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCreate {
    /// Id of the node being recreated.
    pub source_id: String,
    /// Payload for the destination aggregate.
    pub input: CreateResourceInput,
}

/// Builds creation payloads rooted at `destination_parent`.
///
/// The first entry lands in `destination_parent` at `root_order`; every
/// descendant keeps its own sibling order beneath the recreated root.
///
/// # Errors
/// Returns `EmptySubtree` when `entries` is empty.
pub fn plan_creation(
    entries: &[FlatEntry],
    destination_parent: &ResourcePath,
    root_order: u32,
) -> DomainResult<Vec<PlannedCreate>> {
    let Some(root) = entries.first() else {
        return Err(DomainError::EmptySubtree(destination_parent.raw()));
    };

    let mut plans = Vec::with_capacity(entries.len());
    plans.push(PlannedCreate {
        source_id: root.source_id.clone(),
        input: CreateResourceInput {
            class: root.class,
            kind: root.kind,
            path: destination_parent.clone(),
            name: root.name.clone(),
            order: root_order,
            protocol: root.protocol,
        },
    });
    for entry in &entries[1..] {
        plans.push(PlannedCreate {
            source_id: entry.source_id.clone(),
            input: CreateResourceInput {
                class: entry.class,
                kind: entry.kind,
                path: destination_parent.join(&entry.relative_path.parent()),
                name: entry.name.clone(),
                order: entry.order,
                protocol: entry.protocol,
            },
        });
    }
    Ok(plans)
}

/// Result of matching created resources back to their sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPairing {
    /// `(old id, new id)` in plan order.
    pub pairs: Vec<(String, String)>,
    /// Source ids no created resource matched.
    pub unmatched: Vec<String>,
}

impl IdPairing {
    /// Lookup from old id to new id.
    #[must_use]
    pub fn as_map(&self) -> HashMap<&str, &str> {
        self.pairs
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
            .collect()
    }
}

/// Pairs backend-assigned ids with their payloads by `{path, name}`.
///
/// When a directory and an item share a location, the one of the same kind
/// wins. Each created resource is paired at most once.
#[must_use]
pub fn pair_created(plans: &[PlannedCreate], created: &[CreatedResource]) -> IdPairing {
    let mut by_location: HashMap<(String, &str), Vec<&CreatedResource>> = HashMap::new();
    for resource in created {
        by_location
            .entry((resource.path.raw(), resource.name.as_str()))
            .or_default()
            .push(resource);
    }

    let mut pairing = IdPairing::default();
    for plan in plans {
        let key = (plan.input.path.raw(), plan.input.name.as_str());
        let matched = by_location.get_mut(&key).and_then(|candidates| {
            let index = candidates
                .iter()
                .position(|resource| resource.kind == plan.input.kind)
                .or_else(|| (!candidates.is_empty()).then_some(0))?;
            Some(candidates.remove(index))
        });
        match matched {
            Some(resource) => pairing
                .pairs
                .push((plan.source_id.clone(), resource.id.clone())),
            None => pairing.unmatched.push(plan.source_id.clone()),
        }
    }
    pairing
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::{sample_root, test_path};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flatten_is_pre_order_with_relative_paths() {
        let root = sample_root();
        let folder = root.find("f").unwrap();
        let entries = flatten_subtree(folder);
        let view: Vec<(&str, String, u32)> = entries
            .iter()
            .map(|e| (e.source_id.as_str(), e.relative_path.raw(), e.order))
            .collect();
        assert_eq!(
            view,
            vec![
                ("f", "F".to_string(), 1),
                ("x", "F/X".to_string(), 1),
                ("y", "F/Y".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_plan_roots_payloads_at_destination() {
        let root = sample_root();
        let entries = flatten_subtree(root.find("f").unwrap());
        let plans = plan_creation(&entries, &test_path("endpoints/api"), 5).unwrap();

        let view: Vec<(String, &str, u32)> = plans
            .iter()
            .map(|p| (p.input.path.raw(), p.input.name.as_str(), p.input.order))
            .collect();
        assert_eq!(
            view,
            vec![
                ("endpoints/api".to_string(), "F", 5),
                ("endpoints/api/F".to_string(), "X", 1),
                ("endpoints/api/F".to_string(), "Y", 2),
            ]
        );
    }

    #[test]
    fn test_empty_subtree_is_rejected() {
        let err = plan_creation(&[], &test_path("endpoints"), 1).unwrap_err();
        assert!(matches!(err, DomainError::EmptySubtree(_)));
    }

    #[test]
    fn test_pairing_by_path_and_name() {
        let root = sample_root();
        let entries = flatten_subtree(root.find("f").unwrap());
        let plans = plan_creation(&entries, &test_path("endpoints"), 3).unwrap();
        // Backend answers out of order and drops one resource.
        let created = vec![
            CreatedResource {
                id: "y2".into(),
                name: "Y".into(),
                path: test_path("endpoints/F"),
                kind: NodeKind::Item,
            },
            CreatedResource {
                id: "f2".into(),
                name: "F".into(),
                path: test_path("endpoints"),
                kind: NodeKind::Dir,
            },
        ];
        let pairing = pair_created(&plans, &created);
        assert_eq!(
            pairing.pairs,
            vec![
                ("f".to_string(), "f2".to_string()),
                ("y".to_string(), "y2".to_string()),
            ]
        );
        assert_eq!(pairing.unmatched, vec!["x".to_string()]);
        assert_eq!(pairing.as_map().get("f"), Some(&"f2"));
    }

    #[test]
    fn test_dir_and_item_with_same_name_get_distinct_ids() {
        let plan = |source_id: &str, kind| PlannedCreate {
            source_id: source_id.into(),
            input: CreateResourceInput {
                class: ResourceClass::Endpoint,
                kind,
                path: test_path("endpoints/F"),
                name: "foo".into(),
                order: 1,
                protocol: None,
            },
        };
        let plans = vec![plan("d", NodeKind::Dir), plan("i", NodeKind::Item)];
        let created = vec![
            CreatedResource {
                id: "i2".into(),
                name: "foo".into(),
                path: test_path("endpoints/F"),
                kind: NodeKind::Item,
            },
            CreatedResource {
                id: "d2".into(),
                name: "foo".into(),
                path: test_path("endpoints/F"),
                kind: NodeKind::Dir,
            },
        ];

        let pairing = pair_created(&plans, &created);
        assert_eq!(
            pairing.pairs,
            vec![
                ("d".to_string(), "d2".to_string()),
                ("i".to_string(), "i2".to_string()),
            ]
        );
        assert!(pairing.unmatched.is_empty());
    }
}
