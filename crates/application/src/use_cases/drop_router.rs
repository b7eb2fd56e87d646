//! Drop monitor registry
//!
//! Each feature installs a monitor for its drag domain. A drop is routed
//! only while the source's domain is installed and the target belongs to
//! the same domain.

use arbor_domain::{DragDomain, DragSource, DropEvent, DropTarget};
use tracing::debug;

/// Proof of an installed monitor; pass it back to uninstall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorHandle {
    id: u64,
    domain: DragDomain,
}

impl MonitorHandle {
    /// Domain the monitor listens to.
    #[must_use]
    pub const fn domain(&self) -> DragDomain {
        self.domain
    }
}

/// Installed drop monitors.
#[derive(Debug, Default)]
pub struct DropMonitorRegistry {
    monitors: Vec<MonitorHandle>,
    next_id: u64,
}

impl DropMonitorRegistry {
    /// Creates a registry with no monitors.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            monitors: Vec::new(),
            next_id: 0,
        }
    }

    /// Starts routing drops of `domain`.
    pub fn install(&mut self, domain: DragDomain) -> MonitorHandle {
        self.next_id += 1;
        let handle = MonitorHandle {
            id: self.next_id,
            domain,
        };
        self.monitors.push(handle);
        handle
    }

    /// Removes a monitor. Returns `false` if it was already gone.
    pub fn uninstall(&mut self, handle: MonitorHandle) -> bool {
        let before = self.monitors.len();
        self.monitors.retain(|monitor| monitor.id != handle.id);
        self.monitors.len() != before
    }

    /// True when some monitor listens to the source's domain.
    #[must_use]
    pub fn can_monitor(&self, source: &DragSource) -> bool {
        let domain = source.domain();
        self.monitors.iter().any(|monitor| monitor.domain == domain)
    }

    /// True when `target` accepts drops of `source`.
    #[must_use]
    pub fn can_drop(source: &DragSource, target: &DropTarget) -> bool {
        source.domain() == target.domain()
    }

    /// Domain that should handle `event`, if any.
    #[must_use]
    pub fn route(&self, event: &DropEvent) -> Option<DragDomain> {
        if !self.can_monitor(&event.source) {
            debug!(domain = ?event.source.domain(), "No monitor installed for drop");
            return None;
        }
        let target = event.target.as_ref()?;
        if !Self::can_drop(&event.source, target) {
            debug!(
                source = ?event.source.domain(),
                target = ?target.domain(),
                "Drop target belongs to another domain"
            );
            return None;
        }
        Some(event.source.domain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_domain::{DropOperation, TreeNodeRef};

    fn tree_event() -> DropEvent {
        DropEvent::new(
            DragSource::TreeNode(TreeNodeRef::new("p1", "a")),
            DropTarget::TreeNode(TreeNodeRef::new("p1", "b")),
            DropOperation::ReorderBefore,
        )
    }

    #[test]
    fn test_routes_installed_domain() {
        let mut registry = DropMonitorRegistry::new();
        registry.install(DragDomain::Tree);
        assert_eq!(registry.route(&tree_event()), Some(DragDomain::Tree));
    }

    #[test]
    fn test_uninstalled_domain_is_ignored() {
        let mut registry = DropMonitorRegistry::new();
        let handle = registry.install(DragDomain::Tree);
        assert!(registry.uninstall(handle));
        assert!(!registry.uninstall(handle));
        assert_eq!(registry.route(&tree_event()), None);
    }

    #[test]
    fn test_foreign_target_or_no_target_is_ignored() {
        let mut registry = DropMonitorRegistry::new();
        registry.install(DragDomain::Tree);

        let mut event = tree_event();
        event.target = Some(DropTarget::ActivityBarButton { id: "x".into() });
        assert_eq!(registry.route(&event), None);

        event.target = None;
        assert_eq!(registry.route(&event), None);
    }

    #[test]
    fn test_two_monitors_of_one_domain_are_independent() {
        let mut registry = DropMonitorRegistry::new();
        let first = registry.install(DragDomain::Tree);
        registry.install(DragDomain::Tree);
        registry.uninstall(first);
        assert_eq!(registry.route(&tree_event()), Some(DragDomain::Tree));
        assert_eq!(first.domain(), DragDomain::Tree);
    }
}
