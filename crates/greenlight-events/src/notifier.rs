//! The `Notify` trait and basic implementations.

use std::sync::Mutex;

use tracing::debug;

use greenlight_models::Notice;

/// Fire-and-forget notification sink.
///
/// Called by the orchestrator after a successful commit, once per queued
/// notice. Implementations must not block for long and must swallow (and
/// log) their own delivery failures — a broken mail server is not a reason
/// to fail an approval.
pub trait Notify: Send + Sync {
    /// Delivers one notice, best effort.
    fn notify(&self, notice: &Notice);
}

/// A sink that drops everything. Useful when no delivery channel is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notify for NullNotifier {
    fn notify(&self, notice: &Notice) {
        debug!(kind = ?notice.kind, "dropping notice, no delivery channel configured");
    }
}

/// A sink that records every notice it receives, for assertions in tests.
#[derive(Debug, Default)]
pub struct Recorder {
    notices: Mutex<Vec<Notice>>,
}

impl Recorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn recorded(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }

    /// Number of notices recorded.
    pub fn len(&self) -> usize {
        self.notices.lock().map(|n| n.len()).unwrap_or(0)
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notify for Recorder {
    fn notify(&self, notice: &Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice.clone());
        }
    }
}
