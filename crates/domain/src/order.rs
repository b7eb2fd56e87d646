//! Order assignment for sibling lists.
//!
//! Every list the workspace lets users rearrange (tree siblings, parameter
//! rows, environments, activity bar buttons, table rows) stores a 1-based
//! `order` per item. A drop computes a *provisional* order for the moved item
//! that sits half a step before or after its target, re-sorts, and renumbers
//! the whole list back to `1..=n`. The renumbered list is what gets persisted.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// An item that occupies a slot in an ordered sibling list.
pub trait Ordered {
    /// Stable identifier of the item.
    fn id(&self) -> &str;

    /// Current 1-based order.
    fn order(&self) -> u32;

    /// Overwrites the order.
    fn set_order(&mut self, order: u32);
}

/// Side of the target a reordered item lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Directly before the target (`top` for vertical rows).
    #[serde(alias = "top", alias = "left")]
    Before,
    /// Directly after the target (`bottom` for vertical rows).
    #[serde(alias = "bottom", alias = "right")]
    After,
}

/// Where a moved item should end up in its destination list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Next to a specific sibling.
    Edge {
        /// Which side of the target.
        edge: Edge,
        /// Id of the sibling the item is dropped on.
        target_id: String,
    },
    /// After the current last item.
    Append,
}

impl Placement {
    /// Placement directly before `target_id`.
    #[must_use]
    pub fn before(target_id: impl Into<String>) -> Self {
        Self::Edge {
            edge: Edge::Before,
            target_id: target_id.into(),
        }
    }

    /// Placement directly after `target_id`.
    #[must_use]
    pub fn after(target_id: impl Into<String>) -> Self {
        Self::Edge {
            edge: Edge::After,
            target_id: target_id.into(),
        }
    }
}

/// A provisional position counted in half steps.
///
/// A settled order `n` maps to `2n`; dropping before or after a target of
/// order `n` yields `2n - 1` or `2n + 1`, i.e. `n ∓ 0.5` without floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProvisionalOrder(u64);

impl ProvisionalOrder {
    /// Position of an item that is not moving.
    #[must_use]
    pub fn settled(order: u32) -> Self {
        Self(u64::from(order) * 2)
    }

    /// Half a step before `target`.
    #[must_use]
    pub fn before(target: u32) -> Self {
        Self((u64::from(target) * 2).saturating_sub(1))
    }

    /// Half a step after `target`.
    #[must_use]
    pub fn after(target: u32) -> Self {
        Self(u64::from(target) * 2 + 1)
    }

    /// One full step after the current maximum.
    #[must_use]
    pub fn append(max: u32) -> Self {
        Self::settled(max.saturating_add(1))
    }

    /// The provisional value as a (possibly half-integer) number.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 2.0
    }
}

/// Converts a zero-based index into a 1-based order.
#[must_use]
pub fn order_at(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

/// Sorts items by their current order. Ties keep their relative position.
pub fn sort_by_order<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(Ordered::order);
}

/// Assigns `1..=n` following the current slice order.
pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_order(order_at(index));
    }
}

/// Returns true when the orders form exactly `{1..=n}`.
#[must_use]
pub fn is_contiguous<T: Ordered>(items: &[T]) -> bool {
    let mut orders: Vec<u32> = items.iter().map(Ordered::order).collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| *order == order_at(index))
}

/// Largest order in the list, or `0` for an empty list.
#[must_use]
pub fn max_order<T: Ordered>(items: &[T]) -> u32 {
    items.iter().map(Ordered::order).max().unwrap_or(0)
}

/// Computes the provisional order a placement resolves to in `list`.
///
/// # Errors
/// Returns `ItemNotFound` if the placement targets an id not in `list`.
pub fn provisional_order<T: Ordered>(
    list: &[T],
    placement: &Placement,
) -> DomainResult<ProvisionalOrder> {
    match placement {
        Placement::Append => Ok(ProvisionalOrder::append(max_order(list))),
        Placement::Edge { edge, target_id } => {
            let target = list
                .iter()
                .find(|item| item.id() == target_id)
                .ok_or_else(|| DomainError::ItemNotFound(target_id.clone()))?;
            Ok(match edge {
                Edge::Before => ProvisionalOrder::before(target.order()),
                Edge::After => ProvisionalOrder::after(target.order()),
            })
        }
    }
}

fn settle<T: Ordered>(list: &mut Vec<T>, moved_id: &str, moved_key: ProvisionalOrder) {
    let mut keyed: Vec<(ProvisionalOrder, T)> = list
        .drain(..)
        .map(|item| {
            let key = if item.id() == moved_id {
                moved_key
            } else {
                ProvisionalOrder::settled(item.order())
            };
            (key, item)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    list.extend(keyed.into_iter().map(|(_, item)| item));
    renumber(list);
}

/// Moves an item that is already part of `list`.
///
/// After the call the list is sorted and numbered `1..=n`. Dropping an item
/// onto a position it already occupies leaves every order unchanged.
///
/// # Errors
/// Returns `ItemNotFound` if `moved_id` or the placement target is missing.
pub fn reorder<T: Ordered>(
    list: &mut Vec<T>,
    moved_id: &str,
    placement: &Placement,
) -> DomainResult<()> {
    if !list.iter().any(|item| item.id() == moved_id) {
        return Err(DomainError::ItemNotFound(moved_id.to_string()));
    }
    let key = provisional_order(list, placement)?;
    settle(list, moved_id, key);
    Ok(())
}

/// Inserts an item coming from another list.
///
/// # Errors
/// Returns `ItemNotFound` if the placement target is missing.
pub fn insert<T: Ordered>(list: &mut Vec<T>, item: T, placement: &Placement) -> DomainResult<()> {
    let key = provisional_order(list, placement)?;
    let moved_id = item.id().to_string();
    list.push(item);
    settle(list, &moved_id, key);
    Ok(())
}

/// Removes an item and closes the gap it leaves.
///
/// # Errors
/// Returns `ItemNotFound` if `id` is not in the list.
pub fn remove<T: Ordered>(list: &mut Vec<T>, id: &str) -> DomainResult<T> {
    sort_by_order(list);
    let index = list
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| DomainError::ItemNotFound(id.to_string()))?;
    let removed = list.remove(index);
    renumber(list);
    Ok(removed)
}

/// Exchanges the positions of two items and renumbers.
///
/// # Errors
/// Returns `ItemNotFound` if either id is missing.
pub fn swap_by_id<T: Ordered>(list: &mut [T], first: &str, second: &str) -> DomainResult<()> {
    sort_by_order(list);
    let position = |id: &str| {
        list.iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| DomainError::ItemNotFound(id.to_string()))
    };
    let a = position(first)?;
    let b = position(second)?;
    list.swap(a, b);
    renumber(list);
    Ok(())
}
