//! Activity bar buttons.

use serde::{Deserialize, Serialize};

use crate::diff::{OrderUpdate, changed_orders, order_map};
use crate::error::{DomainError, DomainResult};
use crate::order::{Ordered, Placement, order_at, reorder};

/// A view group button in the activity bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBarItem {
    /// View group id.
    pub id: String,
    /// Icon name.
    pub icon: String,
    /// 1-based position.
    pub order: u32,
    /// Hidden buttons keep their slot.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

const fn default_visible() -> bool {
    true
}

impl ActivityBarItem {
    /// Creates a visible button.
    #[must_use]
    pub fn new(id: impl Into<String>, icon: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            icon: icon.into(),
            order,
            visible: true,
        }
    }
}

impl Ordered for ActivityBarItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// Persisted activity bar layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBarState {
    /// Button ids in display order.
    #[serde(default)]
    pub group_order: Vec<String>,
    /// Last active view group.
    #[serde(default)]
    pub active: Option<String>,
}

/// Buttons in display order plus the active selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBar {
    /// Buttons sorted by order.
    pub items: Vec<ActivityBarItem>,
    /// Active view group.
    pub active: Option<String>,
}

impl ActivityBar {
    /// Lays out `available` buttons following a saved state.
    ///
    /// Saved ids that no longer exist are dropped; buttons missing from the
    /// saved order are appended in their given order. Without a saved active
    /// group the first button becomes active.
    #[must_use]
    pub fn restore(available: Vec<ActivityBarItem>, saved: &ActivityBarState) -> Self {
        let mut remaining = available;
        let mut items = Vec::with_capacity(remaining.len());
        for id in &saved.group_order {
            if let Some(index) = remaining.iter().position(|item| &item.id == id) {
                items.push(remaining.remove(index));
            }
        }
        items.append(&mut remaining);
        for (index, item) in items.iter_mut().enumerate() {
            item.order = order_at(index);
        }

        let active = saved
            .active
            .clone()
            .filter(|id| items.iter().any(|item| &item.id == id))
            .or_else(|| items.first().map(|item| item.id.clone()));
        Self { items, active }
    }

    /// State to persist.
    #[must_use]
    pub fn state(&self) -> ActivityBarState {
        ActivityBarState {
            group_order: self.items.iter().map(|item| item.id.clone()).collect(),
            active: self.active.clone(),
        }
    }

    /// Moves a button next to another and returns the changed orders.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if either button is missing.
    pub fn reorder(
        &mut self,
        source_id: &str,
        placement: &Placement,
    ) -> DomainResult<Vec<OrderUpdate>> {
        let before = order_map(&self.items);
        reorder(&mut self.items, source_id, placement)?;
        Ok(changed_orders(&before, &self.items))
    }

    /// Marks a button active.
    ///
    /// # Errors
    /// Returns `ItemNotFound` for an unknown id.
    pub fn activate(&mut self, id: &str) -> DomainResult<()> {
        if !self.items.iter().any(|item| item.id == id) {
            return Err(DomainError::ItemNotFound(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }
}
