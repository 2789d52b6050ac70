use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use monitor_logging::{monitor_debug, monitor_error};
use vacancy_core::{ChatId, PersistedState, SubscriptionBook, Timestamp, UpdateId};

use crate::persist::{load_state, save_state, DiskGuard, StoreLimits};

/// Shared subscription state with best-effort file persistence.
///
/// One mutex guards the in-memory book and is held only for the map access
/// itself. In-memory state stays authoritative when a write fails.
pub struct SubscriptionStore {
    book: Mutex<SubscriptionBook>,
    // Serializes snapshot+write so an older snapshot never lands last.
    write_lock: Mutex<()>,
    path: PathBuf,
    limits: StoreLimits,
    guard: Box<dyn DiskGuard>,
}

impl SubscriptionStore {
    /// Load from `path`; a missing or broken file yields empty state.
    pub fn open(path: impl Into<PathBuf>, limits: StoreLimits, guard: Box<dyn DiskGuard>) -> Self {
        let path = path.into();
        let state = load_state(&path, &limits);
        Self {
            book: Mutex::new(SubscriptionBook::from_state(state)),
            write_lock: Mutex::new(()),
            path,
            limits,
            guard,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite the chat's subscription and persist immediately.
    pub fn subscribe(&self, chat_id: ChatId, period: Duration, now: Timestamp) {
        self.book().subscribe(chat_id, period, now);
        self.persist();
    }

    /// Remove the chat's subscription, if any, and persist immediately.
    pub fn unsubscribe(&self, chat_id: ChatId) {
        let removed = self.book().unsubscribe(chat_id);
        if removed {
            self.persist();
        }
    }

    pub fn due_entries(&self, now: Timestamp) -> Vec<(ChatId, Duration)> {
        self.book().due_entries(now)
    }

    /// Advance the chat's next delivery. Persisted by the caller's batch.
    pub fn reschedule(&self, chat_id: ChatId, now: Timestamp) -> Option<Timestamp> {
        self.book().reschedule(chat_id, now)
    }

    /// Advance the inbound cursor. Persisted by the caller's batch.
    pub fn record_cursor(&self, update_id: UpdateId) {
        self.book().record_cursor(update_id);
    }

    pub fn next_offset(&self) -> Option<UpdateId> {
        self.book().next_offset()
    }

    pub fn snapshot(&self) -> PersistedState {
        self.book().snapshot()
    }

    /// Write the full state to disk. Failures are logged, never raised.
    pub fn persist(&self) -> bool {
        let _write = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = self.snapshot();
        match save_state(&self.path, &state, &self.limits, self.guard.as_ref()) {
            Ok(()) => {
                monitor_debug!(
                    "Persisted {} subscriptions to {:?}",
                    state.subscriptions.len(),
                    self.path
                );
                true
            }
            Err(err) => {
                monitor_error!("Failed to persist state to {:?}: {}", self.path, err);
                false
            }
        }
    }

    fn book(&self) -> MutexGuard<'_, SubscriptionBook> {
        // Poisoning is ignored: every book operation leaves it consistent.
        self.book
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
