//! Compile gate
//!
//! Arbitrates concurrent `compile` calls according to a
//! [`ConcurrencyPolicy`]:
//! - `Exclusive`: one compilation per process; a second caller fails
//!   immediately with [`PageError::CompilationInProgress`].
//! - `PerPath`: one compilation per root path; callers for a busy path wait
//!   their turn, callers for other paths proceed.
//!
//! The returned [`GateGuard`] releases on drop, whatever the outcome.

use crate::config;
use crate::error::{PageError, PageResult};
use kpage_config::ConcurrencyPolicy;
use kpage_core::CancelToken;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace};

static GLOBAL_GATE: Lazy<Arc<CompileGate>> =
    Lazy::new(|| Arc::new(CompileGate::new(config::config().concurrency)));

/// Interval at which queued callers re-check their cancel token
const QUEUE_POLL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub struct CompileGate {
    policy: ConcurrencyPolicy,
    busy: AtomicBool,
    paths: Mutex<HashSet<String>>,
    released: Condvar,
}

impl CompileGate {
    pub fn new(policy: ConcurrencyPolicy) -> Self {
        Self {
            policy,
            busy: AtomicBool::new(false),
            paths: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// The process-wide gate, configured from the global config on first
    /// use.
    pub fn global() -> Arc<CompileGate> {
        Arc::clone(&GLOBAL_GATE)
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    /// Enter the gate for `path`.
    pub fn acquire(&self, path: &str, cancel: &CancelToken) -> PageResult<GateGuard<'_>> {
        match self.policy {
            ConcurrencyPolicy::Exclusive => {
                if self
                    .busy
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    debug!(target: "kpage::compiler", path, "compile rejected, gate busy");
                    return Err(PageError::CompilationInProgress);
                }
                Ok(GateGuard { gate: self, path: None })
            }
            ConcurrencyPolicy::PerPath => {
                let mut paths = self.lock();
                while paths.contains(path) {
                    cancel.check()?;
                    trace!(target: "kpage::compiler", path, "waiting for in-flight compile");
                    paths = self
                        .released
                        .wait_timeout(paths, QUEUE_POLL)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|poisoned| poisoned.into_inner().0);
                }
                paths.insert(path.to_string());
                Ok(GateGuard {
                    gate: self,
                    path: Some(path.to_string()),
                })
            }
        }
    }

    /// Whether any compilation currently holds the gate
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire) || !self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds the gate until dropped
#[must_use = "the gate is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a CompileGate,
    path: Option<String>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        match self.path.take() {
            None => self.gate.busy.store(false, Ordering::Release),
            Some(path) => {
                self.gate.lock().remove(&path);
                self.gate.released.notify_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_exclusive_rejects_second_caller() {
        let gate = CompileGate::new(ConcurrencyPolicy::Exclusive);
        let cancel = CancelToken::new();
        let guard = gate.acquire("/a.kpage", &cancel).unwrap();
        assert!(matches!(
            gate.acquire("/b.kpage", &cancel),
            Err(PageError::CompilationInProgress)
        ));
        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.acquire("/b.kpage", &cancel).is_ok());
    }

    #[test]
    fn test_per_path_allows_other_paths() {
        let gate = CompileGate::new(ConcurrencyPolicy::PerPath);
        let cancel = CancelToken::new();
        let _a = gate.acquire("/a.kpage", &cancel).unwrap();
        let _b = gate.acquire("/b.kpage", &cancel).unwrap();
        assert!(gate.is_busy());
    }

    #[test]
    fn test_per_path_queues_same_path() {
        let gate = Arc::new(CompileGate::new(ConcurrencyPolicy::PerPath));
        let guard = gate.acquire("/a.kpage", &CancelToken::new()).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _guard = gate.acquire("/a.kpage", &CancelToken::new()).unwrap();
                tx.send(()).unwrap();
            })
        };
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(guard);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
    }

    #[test]
    fn test_queued_caller_can_cancel() {
        let gate = CompileGate::new(ConcurrencyPolicy::PerPath);
        let _guard = gate.acquire("/a.kpage", &CancelToken::new()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(gate.acquire("/a.kpage", &cancel), Err(PageError::Cancelled)));
    }
}
