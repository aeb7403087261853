//! Process-wide observable service status.
//!
//! Mutated only by the lifecycle controller; read by the health endpoint.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

/// Coarse lifecycle state of the whole service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Startup sequence in progress.
    Starting,
    /// Connected (or reconnecting within budget) and processing events.
    Running,
    /// Shutdown requested, tasks draining.
    ShuttingDown,
    /// Graceful shutdown completed.
    Stopped,
    /// Terminal failure (e.g. reconnect attempts exhausted).
    Error,
}

/// Shared cell holding the current status and the monitored-target count.
///
/// Cheap to clone; all clones observe the same values.
#[derive(Clone, Debug)]
pub struct StatusCell {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug)]
struct Inner {
    status: ServiceStatus,
    monitored_targets: usize,
}

impl StatusCell {
    /// New cell in the `Starting` state with zero targets.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                status: ServiceStatus::Starting,
                monitored_targets: 0,
            })),
        }
    }

    /// Current status.
    pub fn status(&self) -> ServiceStatus {
        self.inner.read().status
    }

    /// Replace the status.
    pub fn set_status(&self, status: ServiceStatus) {
        self.inner.write().status = status;
    }

    /// Number of currently monitored targets.
    pub fn monitored_targets(&self) -> usize {
        self.inner.read().monitored_targets
    }

    /// Record the monitored-target count.
    pub fn set_monitored_targets(&self, count: usize) {
        self.inner.write().monitored_targets = count;
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_starting() {
        let cell = StatusCell::new();
        assert_eq!(cell.status(), ServiceStatus::Starting);
        assert_eq!(cell.monitored_targets(), 0);
    }

    #[test]
    fn status_transitions() {
        let cell = StatusCell::new();
        cell.set_status(ServiceStatus::Running);
        assert_eq!(cell.status(), ServiceStatus::Running);
        cell.set_status(ServiceStatus::ShuttingDown);
        cell.set_status(ServiceStatus::Stopped);
        assert_eq!(cell.status(), ServiceStatus::Stopped);
    }

    #[test]
    fn clones_share_state() {
        let cell = StatusCell::new();
        let other = cell.clone();
        cell.set_status(ServiceStatus::Error);
        cell.set_monitored_targets(7);
        assert_eq!(other.status(), ServiceStatus::Error);
        assert_eq!(other.monitored_targets(), 7);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ServiceStatus::ShuttingDown).unwrap();
        assert_eq!(json, "\"shutting_down\"");
        let json = serde_json::to_string(&ServiceStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }
}
