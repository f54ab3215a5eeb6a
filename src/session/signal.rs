//! Single-use completion signal between a customer agent and its session.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

/// Create a connected signal/waiter pair.
pub fn completion<T>() -> (CompletionSignal<T>, CompletionWaiter<T>) {
    let (tx, rx) = oneshot::channel();
    (
        CompletionSignal {
            tx: Mutex::new(Some(tx)),
        },
        CompletionWaiter { rx },
    )
}

/// Firing side. Only the first `fire` delivers a value.
pub struct CompletionSignal<T> {
    tx: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> CompletionSignal<T> {
    /// Returns `true` if this call set the signal. Later calls are no-ops.
    pub fn fire(&self, value: T) -> bool {
        match self.slot().take() {
            // A dropped waiter still counts as set: the signal fired once.
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_fired(&self) -> bool {
        self.slot().is_none()
    }

    fn slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<T>>> {
        self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> fmt::Debug for CompletionSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("fired", &self.is_fired())
            .finish()
    }
}

/// Result of a bounded wait on a completion signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    Fired(T),
    TimedOut,
    /// The signal was dropped without firing.
    Dropped,
}

/// Observing side. Consumed by `wait`, so it is observed at most once.
#[derive(Debug)]
pub struct CompletionWaiter<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> CompletionWaiter<T> {
    pub async fn wait(self, timeout: Duration) -> Completion<T> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(value)) => Completion::Fired(value),
            Ok(Err(_)) => Completion::Dropped,
            Err(_) => Completion::TimedOut,
        }
    }
}
