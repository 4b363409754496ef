//! Pub/sub dispatcher for notices.
//!
//! Boundary collaborators (email, websocket, inbox writers) subscribe and
//! receive a clone of every notice the workflow emits. Broadcast is best
//! effort: disconnected subscribers are dropped, send failures never reach
//! the workflow.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, RwLock};

use tracing::warn;

use greenlight_models::Notice;

use crate::error::{EventError, Result};
use crate::notifier::Notify;

/// Fan-out of notices to any number of subscriber channels.
///
/// Uses `Arc<RwLock<Vec<Sender>>>`: subscribers are added occasionally,
/// broadcast happens on every notice.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    subscribers: Arc<RwLock<Vec<Sender<Notice>>>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to all future notices.
    ///
    /// Returns a receiver that gets a clone of every dispatched notice. The
    /// channel closes when the dispatcher is dropped.
    pub fn subscribe(&self) -> Result<Receiver<Notice>> {
        let (tx, rx) = mpsc::channel();
        let mut subs = self
            .subscribers
            .write()
            .map_err(|e| EventError::LockPoisoned(e.to_string()))?;
        subs.push(tx);
        Ok(rx)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|subs| subs.len()).unwrap_or(0)
    }
}

impl Notify for Dispatcher {
    fn notify(&self, notice: &Notice) {
        match self.subscribers.write() {
            Ok(mut subs) => {
                // Drop subscribers whose receiving end is gone.
                subs.retain(|tx| tx.send(notice.clone()).is_ok());
            }
            Err(e) => {
                warn!(error = %e, "notice dropped, subscriber list poisoned");
            }
        }
    }
}
