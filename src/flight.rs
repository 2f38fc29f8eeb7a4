//! Request Coalescing
//!
//! Collapses concurrent loads of the same key into one execution. The first
//! caller for a key (the leader) runs the work; callers arriving while it is
//! in flight (followers) wait on a `tokio::sync::watch` channel and receive a
//! clone of the leader's result.
//!
//! This is not a cache. A record lives exactly as long as its work: the
//! leader removes it the moment the work finishes, so a later call always
//! starts fresh.
//!
//! # Locking
//!
//! The registry mutex is held only to look up, insert or remove a record,
//! never while work runs or while a follower waits.
//!
//! # Cancellation
//!
//! If the leader's future is dropped (or panics) before finishing, its
//! record is removed and the followers see the channel close. They retry,
//! and one of them becomes the new leader.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::trace;

type Slot<T> = watch::Receiver<Option<T>>;

/// Per-key duplicate suppression for async work
pub struct RequestCoalescer<T> {
    calls: Mutex<HashMap<String, Slot<T>>>,
}

enum Role<T> {
    Leader(watch::Sender<Option<T>>),
    Follower(Slot<T>),
}

/// Removes the leader's record on completion, cancellation or panic
struct CallGuard<'a, T> {
    calls: &'a Mutex<HashMap<String, Slot<T>>>,
    key: &'a str,
}

impl<T> Drop for CallGuard<'_, T> {
    fn drop(&mut self) {
        self.calls.lock().remove(self.key);
    }
}

impl<T> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> RequestCoalescer<T> {
    /// Create an empty coalescer
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key` unless a call for `key` is already in flight,
    /// in which case wait for and return that call's result.
    ///
    /// Failures are shared like successes; nothing is retried here.
    pub async fn work<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            let role = {
                let mut calls = self.calls.lock();
                match calls.get(key).cloned() {
                    Some(slot) => Role::Follower(slot),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        calls.insert(key.to_string(), rx);
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => {
                    let guard = CallGuard {
                        calls: &self.calls,
                        key,
                    };
                    let value = work().await;
                    // Forget the key before publishing; followers already
                    // holding the slot still see the value.
                    drop(guard);
                    tx.send_replace(Some(value.clone()));
                    return value;
                }
                Role::Follower(mut slot) => {
                    trace!(key, "joining in-flight call");
                    if let Ok(value) = slot.wait_for(Option::is_some).await {
                        if let Some(value) = value.as_ref() {
                            return value.clone();
                        }
                    }
                    trace!(key, "in-flight call abandoned, retrying");
                }
            }
        }
    }

    /// Number of keys with work in flight
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T> std::fmt::Debug for RequestCoalescer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
