//! In-memory address location with a history stack.
//!
//! Used for tests and for hosts without a real address bar. `navigate` and
//! `back` simulate user-driven changes that the store picks up through
//! `AddressStateStore::sync_from_location`.

use crate::ports::AddressLocation;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct InMemoryLocation {
    history: Mutex<Vec<String>>,
    pushes: AtomicU64,
}

impl InMemoryLocation {
    /// Start at the given query string.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        let initial: String = initial.into();
        let initial = initial.strip_prefix('?').unwrap_or(&initial).to_string();
        Self {
            history: Mutex::new(vec![initial]),
            pushes: AtomicU64::new(0),
        }
    }

    /// User navigation to a new query. Not counted as a store push.
    pub fn navigate(&self, query: impl Into<String>) {
        self.history.lock().push(query.into());
    }

    /// Go back one history entry. Returns `false` at the first entry.
    pub fn back(&self) -> bool {
        let mut history = self.history.lock();
        if history.len() > 1 {
            history.pop();
            true
        } else {
            false
        }
    }

    /// Number of `push` calls issued by the store.
    #[must_use]
    pub fn push_count(&self) -> u64 {
        self.pushes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

impl Default for InMemoryLocation {
    fn default() -> Self {
        Self::new("")
    }
}

impl AddressLocation for InMemoryLocation {
    fn read(&self) -> String {
        self.history.lock().last().cloned().unwrap_or_default()
    }

    fn push(&self, query: &str) {
        self.history.lock().push(query.to_string());
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }
}
