//! Typed drag payloads and drop instructions.
//!
//! Every draggable surface has its own variant with a strongly typed payload,
//! so routing a drop is an exhaustive match rather than a string comparison.

use serde::{Deserialize, Serialize};

use crate::lists::{EnvironmentScope, ParamShape};
use crate::order::{Edge, Placement};
use crate::tree::ResourceClass;

/// What a drop asks for relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropOperation {
    /// Land directly before the target.
    ReorderBefore,
    /// Land directly after the target.
    ReorderAfter,
    /// Nest inside the target.
    Combine,
}

impl DropOperation {
    /// Operation for a closest-edge hit.
    #[must_use]
    pub const fn from_edge(edge: Edge) -> Self {
        match edge {
            Edge::Before => Self::ReorderBefore,
            Edge::After => Self::ReorderAfter,
        }
    }

    /// Placement of the source among the target's siblings.
    ///
    /// `Combine` appends to the target's own children.
    #[must_use]
    pub fn placement(self, target_id: &str) -> Placement {
        match self {
            Self::ReorderBefore => Placement::before(target_id),
            Self::ReorderAfter => Placement::after(target_id),
            Self::Combine => Placement::Append,
        }
    }
}

/// Hover feedback for a candidate drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    /// The drop is legal.
    Available,
    /// The drop would do nothing; no indicator is shown.
    NotAvailable,
    /// The drop is illegal; a blocked indicator is shown.
    Blocked,
}

/// Instruction attached to a drop by the drag sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropInstruction {
    /// Requested operation, absent when the pointer left every hitbox.
    #[serde(default)]
    pub operation: Option<DropOperation>,
    /// Set when hover evaluation already blocked the drop.
    #[serde(default)]
    pub blocked: bool,
}

impl DropInstruction {
    /// Unblocked instruction for an operation.
    #[must_use]
    pub const fn new(operation: DropOperation) -> Self {
        Self {
            operation: Some(operation),
            blocked: false,
        }
    }
}

/// Reference to a node of an aggregate tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNodeRef {
    /// Owning aggregate.
    pub aggregate_id: String,
    /// Node id.
    pub node_id: String,
}

impl TreeNodeRef {
    /// Creates a node reference.
    #[must_use]
    pub fn new(aggregate_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            node_id: node_id.into(),
        }
    }
}

/// Reference to a parameter row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamRowRef {
    /// Endpoint owning the row.
    pub endpoint_id: String,
    /// List the row lives in.
    pub shape: ParamShape,
    /// Row id.
    pub row_id: String,
}

/// Feature area a drag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DragDomain {
    /// Activity bar buttons.
    ActivityBar,
    /// Project resource trees.
    Tree,
    /// Endpoint parameter rows.
    Params,
    /// Environment lists.
    Environments,
    /// Local tables.
    Table,
}

/// The dragged element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DragSource {
    /// An activity bar button.
    ActivityBarButton {
        /// Button id.
        id: String,
    },
    /// A tree node.
    TreeNode(TreeNodeRef),
    /// A parameter row.
    ParamRow(ParamRowRef),
    /// An environment entry.
    EnvironmentItem {
        /// Environment id.
        #[serde(rename = "environmentId")]
        environment_id: String,
    },
    /// A table row.
    TableRow {
        /// Table holding the row.
        #[serde(rename = "tableId")]
        table_id: String,
        /// Row key.
        #[serde(rename = "rowKey")]
        row_key: String,
    },
}

impl DragSource {
    /// Domain of the dragged element.
    #[must_use]
    pub const fn domain(&self) -> DragDomain {
        match self {
            Self::ActivityBarButton { .. } => DragDomain::ActivityBar,
            Self::TreeNode(_) => DragDomain::Tree,
            Self::ParamRow(_) => DragDomain::Params,
            Self::EnvironmentItem { .. } => DragDomain::Environments,
            Self::TableRow { .. } => DragDomain::Table,
        }
    }
}

/// The element under the pointer when the drag ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DropTarget {
    /// An activity bar button.
    ActivityBarButton {
        /// Button id.
        id: String,
    },
    /// A tree node.
    TreeNode(TreeNodeRef),
    /// The root of an aggregate for one class.
    TreeRoot {
        /// Aggregate id.
        #[serde(rename = "aggregateId")]
        aggregate_id: String,
        /// Sub-root class.
        class: ResourceClass,
    },
    /// A parameter row.
    ParamRow(ParamRowRef),
    /// A whole parameter list, used when it is empty.
    ParamList {
        /// Endpoint owning the list.
        #[serde(rename = "endpointId")]
        endpoint_id: String,
        /// Which list.
        shape: ParamShape,
    },
    /// An environment entry.
    EnvironmentItem {
        /// Environment id.
        #[serde(rename = "environmentId")]
        environment_id: String,
    },
    /// A group header or the global list.
    EnvironmentGroup {
        /// Which list.
        scope: EnvironmentScope,
    },
    /// A table row.
    TableRow {
        /// Table holding the row.
        #[serde(rename = "tableId")]
        table_id: String,
        /// Row key.
        #[serde(rename = "rowKey")]
        row_key: String,
    },
}

impl DropTarget {
    /// Domain of the drop target.
    #[must_use]
    pub const fn domain(&self) -> DragDomain {
        match self {
            Self::ActivityBarButton { .. } => DragDomain::ActivityBar,
            Self::TreeNode(_) | Self::TreeRoot { .. } => DragDomain::Tree,
            Self::ParamRow(_) | Self::ParamList { .. } => DragDomain::Params,
            Self::EnvironmentItem { .. } | Self::EnvironmentGroup { .. } => {
                DragDomain::Environments
            }
            Self::TableRow { .. } => DragDomain::Table,
        }
    }
}

/// A completed drag as reported by the sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropEvent {
    /// `source.data`.
    pub source: DragSource,
    /// `location.current.dropTargets[0].data`, absent when dropped outside.
    #[serde(default)]
    pub target: Option<DropTarget>,
    /// Attached edge or operation.
    #[serde(default)]
    pub instruction: DropInstruction,
}

impl DropEvent {
    /// Creates an unblocked drop event.
    #[must_use]
    pub const fn new(source: DragSource, target: DropTarget, operation: DropOperation) -> Self {
        Self {
            source,
            target: Some(target),
            instruction: DropInstruction::new(operation),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_json_shape() {
        let event = DropEvent::new(
            DragSource::TreeNode(TreeNodeRef::new("p1", "f")),
            DropTarget::TreeRoot {
                aggregate_id: "p2".into(),
                class: ResourceClass::Endpoint,
            },
            DropOperation::Combine,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["source"]["type"], "TreeNode");
        assert_eq!(json["source"]["data"]["nodeId"], "f");
        assert_eq!(json["target"]["type"], "TreeRoot");
        assert_eq!(json["instruction"]["operation"], "combine");

        let back: DropEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_domains_match_between_sources_and_targets() {
        let source = DragSource::EnvironmentItem {
            environment_id: "e1".into(),
        };
        let target = DropTarget::EnvironmentGroup {
            scope: EnvironmentScope::Global,
        };
        assert_eq!(source.domain(), target.domain());
    }

    #[test]
    fn test_operation_placement() {
        assert_eq!(
            DropOperation::ReorderAfter.placement("x"),
            Placement::after("x")
        );
        assert_eq!(DropOperation::Combine.placement("x"), Placement::Append);
        assert_eq!(DropOperation::from_edge(Edge::Before), DropOperation::ReorderBefore);
    }
}
