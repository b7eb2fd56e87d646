//! Activity bar service.

use arbor_domain::lists::{ActivityBar, ActivityBarItem};
use arbor_domain::{OrderUpdate, Placement};
use tracing::{debug, info};

use crate::error::DropResult;
use crate::ports::{ActivityBarError, ActivityBarRepository};

/// Holds the activity bar layout and persists every change.
pub struct ActivityBarStore<R: ActivityBarRepository> {
    bar: ActivityBar,
    repository: R,
}

impl<R: ActivityBarRepository> ActivityBarStore<R> {
    /// Creates an empty store over `repository`.
    #[must_use]
    pub fn new(repository: R) -> Self {
        Self {
            bar: ActivityBar::default(),
            repository,
        }
    }

    /// Lays out `available` buttons following the saved layout.
    ///
    /// # Errors
    /// Returns an error if the saved layout cannot be read.
    pub async fn init(&mut self, available: Vec<ActivityBarItem>) -> Result<(), ActivityBarError> {
        let saved = self.repository.load().await?;
        self.bar = ActivityBar::restore(available, &saved);
        debug!(buttons = self.bar.items.len(), "Activity bar restored");
        Ok(())
    }

    /// Clears the local layout.
    pub fn teardown(&mut self) {
        self.bar = ActivityBar::default();
    }

    /// Current layout.
    #[must_use]
    pub const fn bar(&self) -> &ActivityBar {
        &self.bar
    }

    /// Moves a button and persists the new order.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown buttons or a persistence error.
    pub async fn reorder(
        &mut self,
        source_id: &str,
        placement: &Placement,
    ) -> DropResult<Vec<OrderUpdate>> {
        let updates = self.bar.reorder(source_id, placement)?;
        if updates.is_empty() {
            return Ok(updates);
        }
        self.repository.save(&self.bar.state()).await?;
        info!(button = source_id, moved = updates.len(), "Activity bar reordered");
        Ok(updates)
    }

    /// Marks a button active and persists the selection.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown button or a persistence error.
    pub async fn activate(&mut self, id: &str) -> DropResult<()> {
        self.bar.activate(id)?;
        self.repository.save(&self.bar.state()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;
    use arbor_domain::lists::ActivityBarState;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockRepository {
        saved: Arc<Mutex<ActivityBarState>>,
        saves: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl ActivityBarRepository for MockRepository {
        async fn load(&self) -> Result<ActivityBarState, ActivityBarError> {
            Ok(self.saved.lock().expect("Lock poisoned").clone())
        }

        async fn save(&self, state: &ActivityBarState) -> Result<(), ActivityBarError> {
            *self.saved.lock().expect("Lock poisoned") = state.clone();
            *self.saves.lock().expect("Lock poisoned") += 1;
            Ok(())
        }
    }

    fn buttons() -> Vec<ActivityBarItem> {
        vec![
            ActivityBarItem::new("projects", "folder", 1),
            ActivityBarItem::new("environments", "globe", 2),
        ]
    }

    #[tokio::test]
    async fn test_reorder_persists_group_order() {
        let repository = MockRepository::default();
        let mut store = ActivityBarStore::new(repository.clone());
        store.init(buttons()).await.unwrap();

        store
            .reorder("environments", &Placement::before("projects"))
            .await
            .unwrap();

        let saved = repository.saved.lock().expect("Lock poisoned").clone();
        assert_eq!(saved.group_order, vec!["environments", "projects"]);
    }

    #[tokio::test]
    async fn test_noop_reorder_does_not_save() {
        let repository = MockRepository::default();
        let mut store = ActivityBarStore::new(repository.clone());
        store.init(buttons()).await.unwrap();

        let updates = store
            .reorder("projects", &Placement::before("environments"))
            .await
            .unwrap();
        assert!(updates.is_empty());
        assert_eq!(*repository.saves.lock().expect("Lock poisoned"), 0);
    }

    #[tokio::test]
    async fn test_unknown_button_is_not_found() {
        let mut store = ActivityBarStore::new(MockRepository::default());
        store.init(buttons()).await.unwrap();
        let err = store.reorder("nope", &Placement::Append).await.unwrap_err();
        assert!(matches!(err, crate::DropError::NotFound(_)));
    }
}
