//! Payloads exchanged with the resource backend.

use serde::{Deserialize, Serialize};

use crate::lists::ParamsPatch;
use crate::tree::{NodeKind, Protocol, ResourceClass, ResourcePath};

/// A resource to create. `path` is the parent directory's path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceInput {
    /// Sub-root class.
    pub class: ResourceClass,
    /// Dir or Item.
    pub kind: NodeKind,
    /// Path of the parent directory.
    pub path: ResourcePath,
    /// Name, which becomes the last segment of the full path.
    pub name: String,
    /// Order among the new siblings.
    pub order: u32,
    /// Protocol for items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
}

impl CreateResourceInput {
    /// Full materialized path of the created resource.
    #[must_use]
    pub fn full_path(&self) -> ResourcePath {
        self.path.child(&self.name)
    }
}

/// Backend answer to a create: the id plus the fields used for pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResource {
    /// Backend-assigned id.
    pub id: String,
    /// Name as created.
    pub name: String,
    /// Parent path as created.
    pub path: ResourcePath,
    /// Dir or Item.
    pub kind: NodeKind,
}

/// A partial update of an existing resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceInput {
    /// Resource id.
    pub id: String,
    /// Kind of the resource, required by the backend to route the update.
    pub kind: NodeKind,
    /// New parent path, for moves within an aggregate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<ResourcePath>,
    /// New order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// Parameter list changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ParamsPatch>,
}

impl UpdateResourceInput {
    /// Order-only update.
    #[must_use]
    pub fn reorder(id: impl Into<String>, kind: NodeKind, order: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            path: None,
            order: Some(order),
            params: None,
        }
    }

    /// Moves the resource under `parent_path` at `order`.
    #[must_use]
    pub fn relocate(
        id: impl Into<String>,
        kind: NodeKind,
        parent_path: ResourcePath,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            path: Some(parent_path),
            order: Some(order),
            params: None,
        }
    }

    /// Parameter-only update of an endpoint item.
    #[must_use]
    pub fn params(id: impl Into<String>, params: ParamsPatch) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Item,
            path: None,
            order: None,
            params: Some(params),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::test_path;

    #[test]
    fn test_full_path_appends_name() {
        let input = CreateResourceInput {
            class: ResourceClass::Endpoint,
            kind: NodeKind::Item,
            path: test_path("endpoints/users"),
            name: "list".into(),
            order: 1,
            protocol: Some(Protocol::Get),
        };
        assert_eq!(input.full_path().raw(), "endpoints/users/list");
    }

    #[test]
    fn test_order_update_omits_empty_fields() {
        let update = UpdateResourceInput::reorder("x", NodeKind::Item, 3);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["order"], 3);
        assert!(json.get("path").is_none());
        assert!(json.get("params").is_none());
    }
}
