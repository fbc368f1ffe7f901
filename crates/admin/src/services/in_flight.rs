//! Registry of mutations currently running.
//!
//! A mutation is identified by `(actor, action)`. While one is running, a
//! second attempt with the same key is refused; the key is released when
//! the returned guard is dropped, including when the request future is
//! dropped because the client went away.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared set of running `(actor, action)` keys.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<String>>>,
}

/// Holds an in-flight key until dropped.
#[derive(Debug)]
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    key: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `(actor, action)`. Returns `None` if it is already running.
    pub fn try_begin(&self, actor: &str, action: &str) -> Option<InFlightGuard> {
        let key = format!("{actor}\u{1f}{action}");
        let inserted = lock(&self.active).insert(key.clone());
        inserted.then(|| InFlightGuard {
            key,
            active: Arc::clone(&self.active),
        })
    }

    /// Whether `(actor, action)` is currently running.
    #[must_use]
    pub fn is_running(&self, actor: &str, action: &str) -> bool {
        lock(&self.active).contains(&format!("{actor}\u{1f}{action}"))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.key);
    }
}

fn lock(active: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}
