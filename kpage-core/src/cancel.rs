//! Cooperative cancellation
//!
//! A [`CancelToken`] is threaded through file reads, retry waits and the
//! compile phases. Clones observe the same state.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Returned by every operation that observed a cancelled token
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Shared cancellation signal
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake every waiter.
    pub fn cancel(&self) {
        let mut cancelled = self.lock();
        *cancelled = true;
        self.state.wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// `Err(Cancelled)` once the token was cancelled.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Block for `duration`, returning early with `Err(Cancelled)` as soon as
    /// the token is cancelled.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let guard = self.lock();
        let (guard, _timeout) = self
            .state
            .wakeup
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *guard {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.state
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
