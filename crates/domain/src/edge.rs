//! Drop classification and legality checks.

use thiserror::Error;

use crate::drag::{Availability, DropOperation};
use crate::lists::ParamShape;
use crate::order::Placement;
use crate::tree::{ResourceClass, TreeNode};

/// How a legal drop must be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropClass {
    /// Same aggregate, same parent, same list shape.
    WithinList,
    /// Same aggregate, different parent or list shape.
    CrossList,
    /// Nest the source as the last child of a directory.
    CombineFolder,
    /// Different aggregates: delete and recreate.
    CrossAggregate,
}

/// Kind of list a sibling slot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListShape {
    /// Children of a tree directory.
    Tree(ResourceClass),
    /// A parameter list.
    Param(ParamShape),
    /// An environment list.
    Environment,
    /// The activity bar.
    ActivityBar,
    /// A local table.
    Table,
}

/// Where one end of a drop sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropSite<'a> {
    /// Aggregate owning the list.
    pub aggregate_id: &'a str,
    /// Id of the list's owner (parent node, endpoint, group, table).
    pub parent_id: &'a str,
    /// Shape of the list.
    pub shape: ListShape,
}

/// Why a drop was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropRejection {
    /// The source was dropped next to itself.
    #[error("cannot reorder {0} relative to itself")]
    SameNode(String),

    /// The source was combined into itself.
    #[error("cannot combine {0} into itself")]
    CombineIntoSelf(String),

    /// Source and target belong to different sub-roots.
    #[error("cannot move a {source_class:?} into {target_class:?}")]
    ClassMismatch {
        /// Class of the dragged node.
        source_class: ResourceClass,
        /// Class of the target.
        target_class: ResourceClass,
    },

    /// The target is inside the dragged subtree.
    #[error("cannot move {source_id} into its own descendant {target_id}")]
    TargetInsideSource {
        /// Dragged node.
        source_id: String,
        /// Descendant target.
        target_id: String,
    },

    /// The destination already holds a same-kind sibling with this name.
    #[error("destination already contains {0}")]
    NameCollision(String),

    /// Combine onto an item.
    #[error("{0} is not a directory")]
    NotADirectory(String),

    /// Reordering next to a sub-root.
    #[error("cannot reorder next to the root {0}")]
    RootSibling(String),

    /// Rows cannot leave the list owner they belong to.
    #[error("cannot move {0} to another owner")]
    ForeignOwner(String),

    /// The sensor flagged the drop as blocked.
    #[error("drop was blocked while hovering")]
    InstructionBlocked,

    /// The sensor reported no operation.
    #[error("drop has no operation")]
    MissingOperation,
}

impl DropRejection {
    /// Hover feedback for this rejection.
    #[must_use]
    pub const fn availability(&self) -> Availability {
        match self {
            Self::SameNode(_)
            | Self::NotADirectory(_)
            | Self::RootSibling(_)
            | Self::MissingOperation => Availability::NotAvailable,
            Self::CombineIntoSelf(_)
            | Self::ClassMismatch { .. }
            | Self::TargetInsideSource { .. }
            | Self::NameCollision(_)
            | Self::ForeignOwner(_)
            | Self::InstructionBlocked => Availability::Blocked,
        }
    }

    /// True when the UI shows a blocked indicator.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self.availability(), Availability::Blocked)
    }
}

/// Classifies a drop that passed the legality checks.
#[must_use]
pub fn classify(
    source: &DropSite<'_>,
    target: &DropSite<'_>,
    operation: DropOperation,
) -> DropClass {
    if source.aggregate_id != target.aggregate_id {
        DropClass::CrossAggregate
    } else if operation == DropOperation::Combine {
        DropClass::CombineFolder
    } else if source.parent_id == target.parent_id && source.shape == target.shape {
        DropClass::WithinList
    } else {
        DropClass::CrossList
    }
}

fn check_common(source: &TreeNode, target: &TreeNode) -> Result<(), DropRejection> {
    if source.class != target.class {
        return Err(DropRejection::ClassMismatch {
            source_class: source.class,
            target_class: target.class,
        });
    }
    if source.has_descendant(&target.id) {
        return Err(DropRejection::TargetInsideSource {
            source_id: source.id.clone(),
            target_id: target.id.clone(),
        });
    }
    Ok(())
}

/// Checks a reorder of `source` next to `target`, whose parent is
/// `target_parent` (`None` when the target is a sub-root).
///
/// # Errors
/// Returns the reason the reorder is refused.
pub fn check_reorder(
    source: &TreeNode,
    target: &TreeNode,
    target_parent: Option<&TreeNode>,
) -> Result<(), DropRejection> {
    if source.id == target.id {
        return Err(DropRejection::SameNode(source.id.clone()));
    }
    check_common(source, target)?;
    let parent = target_parent.ok_or_else(|| DropRejection::RootSibling(target.id.clone()))?;
    if parent.has_similar_child(source) {
        return Err(DropRejection::NameCollision(source.name.clone()));
    }
    Ok(())
}

/// Checks nesting `source` inside `target`.
///
/// # Errors
/// Returns the reason the combine is refused.
pub fn check_combine(source: &TreeNode, target: &TreeNode) -> Result<(), DropRejection> {
    if source.id == target.id {
        return Err(DropRejection::CombineIntoSelf(source.id.clone()));
    }
    check_common(source, target)?;
    if !target.is_dir() {
        return Err(DropRejection::NotADirectory(target.id.clone()));
    }
    if target.has_similar_child(source) {
        return Err(DropRejection::NameCollision(source.name.clone()));
    }
    Ok(())
}

/// Hover feedback for a reorder.
#[must_use]
pub fn reorder_availability(
    source: &TreeNode,
    target: &TreeNode,
    target_parent: Option<&TreeNode>,
) -> Availability {
    check_reorder(source, target, target_parent)
        .err()
        .map_or(Availability::Available, |rejection| rejection.availability())
}

/// Hover feedback for a combine.
#[must_use]
pub fn combine_availability(source: &TreeNode, target: &TreeNode) -> Availability {
    check_combine(source, target)
        .err()
        .map_or(Availability::Available, |rejection| rejection.availability())
}

/// One end of a tree drop with its surrounding context.
#[derive(Debug, Clone, Copy)]
pub struct TreeDropEnd<'a> {
    /// Aggregate owning the node.
    pub aggregate_id: &'a str,
    /// The node itself.
    pub node: &'a TreeNode,
    /// Its parent, `None` for sub-roots.
    pub parent: Option<&'a TreeNode>,
}

/// Outcome of resolving a legal tree drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDrop {
    /// How to execute it.
    pub class: DropClass,
    /// Directory that will hold the source afterwards.
    pub destination_parent_id: String,
    /// Position in that directory.
    pub placement: Placement,
}

/// Validates and classifies a drop of one tree node onto another.
///
/// # Errors
/// Returns the reason the drop is refused; no mutation should follow.
pub fn resolve_tree_drop(
    source: TreeDropEnd<'_>,
    target: TreeDropEnd<'_>,
    operation: DropOperation,
) -> Result<ResolvedDrop, DropRejection> {
    let destination = match operation {
        DropOperation::Combine => {
            check_combine(source.node, target.node)?;
            target.node
        }
        DropOperation::ReorderBefore | DropOperation::ReorderAfter => {
            check_reorder(source.node, target.node, target.parent)?;
            target
                .parent
                .ok_or_else(|| DropRejection::RootSibling(target.node.id.clone()))?
        }
    };

    let source_site = DropSite {
        aggregate_id: source.aggregate_id,
        parent_id: source.parent.map_or("", |parent| parent.id.as_str()),
        shape: ListShape::Tree(source.node.class),
    };
    let target_site = DropSite {
        aggregate_id: target.aggregate_id,
        parent_id: &destination.id,
        shape: ListShape::Tree(destination.class),
    };

    Ok(ResolvedDrop {
        class: classify(&source_site, &target_site, operation),
        destination_parent_id: destination.id.clone(),
        placement: operation.placement(&target.node.id),
    })
}
