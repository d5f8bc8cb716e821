//! One-shot cancellation shared by the control plane and the hosted task.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

type CancelHook = Box<dyn FnOnce() + Send>;

/// Cancellation flag that can be set exactly once and never cleared.
///
/// Clones share state. Any number of threads may call [`cancel`] at any time;
/// only the first call transitions the token, runs the hook installed with
/// [`with_hook`], and wakes waiters. The hook finishes before any caller
/// observes the token as cancelled.
///
/// [`cancel`]: ShutdownToken::cancel
/// [`with_hook`]: ShutdownToken::with_hook
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    hook: Mutex<Option<CancelHook>>,
    condvar: Condvar,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("cancelled", &self.cancelled)
            .finish_non_exhaustive()
    }
}

impl ShutdownToken {
    /// Builds an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an uncancelled token that runs `hook` on the transition.
    #[must_use]
    pub fn with_hook(hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                hook: Mutex::new(Some(Box::new(hook))),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Requests shutdown. Returns `true` only for the call that performed the
    /// transition.
    pub fn cancel(&self) -> bool {
        let mut pending = self.inner.hook.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            return false;
        }
        if let Some(hook) = pending.take() {
            hook();
        }
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.condvar.notify_all();
        true
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Blocks until shutdown is requested.
    pub fn wait(&self) {
        let mut guard = self.inner.hook.lock().unwrap_or_else(PoisonError::into_inner);
        while !self.is_cancelled() {
            guard = self
                .inner
                .condvar
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until shutdown is requested or `timeout` elapses. Returns
    /// whether the token is cancelled.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.hook.lock().unwrap_or_else(PoisonError::into_inner);
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .inner
                .condvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn starts_uncancelled() {
        let token = ShutdownToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn cancel_is_idempotent_and_sticky() {
        let token = ShutdownToken::new();
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
        assert!(token.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn concurrent_cancels_transition_once() {
        let token = ShutdownToken::new();
        let transitions = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..16)
            .map(|_| {
                let token = token.clone();
                let transitions = Arc::clone(&transitions);
                thread::spawn(move || {
                    if token.cancel() {
                        transitions.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().expect("cancel thread");
        }
        assert_eq!(transitions.load(Ordering::SeqCst), 1);
        assert!(token.is_cancelled());
    }

    #[test]
    fn wait_wakes_on_cancel_from_another_thread() {
        let token = ShutdownToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || token.wait())
        };
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        waiter.join().expect("waiter thread");
    }

    #[test]
    fn hook_runs_once_before_waiters_wake() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = {
            let calls = Arc::clone(&calls);
            ShutdownToken::with_hook(move || {
                thread::sleep(Duration::from_millis(30));
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        let waiter = {
            let token = token.clone();
            let calls = Arc::clone(&calls);
            thread::spawn(move || {
                token.wait();
                calls.load(Ordering::SeqCst)
            })
        };
        let racer = {
            let token = token.clone();
            thread::spawn(move || token.cancel())
        };
        let won_here = token.cancel();
        let won_there = racer.join().expect("racing cancel");
        assert!(won_here ^ won_there);
        assert_eq!(waiter.join().expect("waiter thread"), 1);
        assert!(!token.cancel());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
