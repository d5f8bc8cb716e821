//! Bridges OS termination signals onto the shared shutdown token.
//!
//! The first SIGINT or SIGTERM (Ctrl+C on non-Unix targets) requests a
//! graceful shutdown. A second one while the process is still alive exits
//! immediately without cleanup.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::reporter::{LifecycleReporter, StopSource};
use crate::shutdown::ShutdownToken;

pub(crate) const SIGNALS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::signals");

/// Exit status used when a repeated signal forces termination.
pub const FORCED_EXIT_CODE: i32 = 1;

/// Errors raised while installing signal handlers.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Registering the handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The Ctrl+C handler could not be registered.
    #[cfg(not(unix))]
    #[error("failed to install Ctrl+C handler: {source}")]
    Handler {
        /// Underlying handler error.
        #[source]
        source: ctrlc::Error,
    },
    /// The watcher thread could not be spawned.
    #[error("failed to spawn signal watcher: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Applies the double-tap policy to a stream of signal numbers.
///
/// The first signal is reported and cancels `token`. The second is reported
/// as a forced exit and hands control to `force_exit`, after which the loop
/// stops consuming signals. Returns when `signals` is exhausted.
pub fn bridge_signals<I, F>(
    signals: I,
    token: &ShutdownToken,
    reporter: &dyn LifecycleReporter,
    force_exit: F,
) where
    I: IntoIterator<Item = i32>,
    F: FnOnce(i32),
{
    let mut pending = signals.into_iter();
    let Some(first) = pending.next() else {
        return;
    };
    reporter.stop_requested(StopSource::Signal(first));
    if !token.cancel() {
        debug!(target: SIGNALS_TARGET, signal = first, "shutdown already in progress");
    }

    if let Some(second) = pending.next() {
        reporter.forced_exit(second);
        force_exit(second);
    }
}

/// Live signal watcher. Dropping it stops the watcher.
#[derive(Debug)]
pub struct SignalBridge {
    active: Option<platform::Watcher>,
}

impl SignalBridge {
    /// Starts watching the platform's termination signals on a dedicated
    /// thread: SIGINT and SIGTERM on Unix, Ctrl+C elsewhere.
    pub fn install(
        token: ShutdownToken,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Result<Self, SignalError> {
        let watcher = platform::Watcher::spawn(token, reporter, |_| {
            std::process::exit(FORCED_EXIT_CODE)
        })?;
        Ok(Self {
            active: Some(watcher),
        })
    }

    /// Stops watching and joins the watcher thread. Idempotent.
    pub fn stop(&mut self) {
        if let Some(watcher) = self.active.take() {
            watcher.stop();
        }
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
mod platform {
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::{Handle, Signals};
    use tracing::{debug, warn};

    use super::{SIGNALS_TARGET, SignalError, bridge_signals};
    use crate::reporter::LifecycleReporter;
    use crate::shutdown::ShutdownToken;

    #[derive(Debug)]
    pub(super) struct Watcher {
        handle: Handle,
        thread: JoinHandle<()>,
    }

    impl Watcher {
        pub(super) fn spawn<F>(
            token: ShutdownToken,
            reporter: Arc<dyn LifecycleReporter>,
            force_exit: F,
        ) -> Result<Self, SignalError>
        where
            F: FnOnce(i32) + Send + 'static,
        {
            let mut signals = Signals::new([SIGINT, SIGTERM])
                .map_err(|source| SignalError::Install { source })?;
            let handle = signals.handle();
            let thread = thread::Builder::new()
                .name("keel-signals".to_owned())
                .spawn(move || {
                    bridge_signals(signals.forever(), &token, reporter.as_ref(), force_exit);
                    debug!(target: SIGNALS_TARGET, "signal watcher exited");
                })
                .map_err(|source| {
                    handle.close();
                    SignalError::Spawn { source }
                })?;
            Ok(Self { handle, thread })
        }

        pub(super) fn stop(self) {
            self.handle.close();
            if self.thread.join().is_err() {
                warn!(target: SIGNALS_TARGET, "signal watcher panicked");
            }
        }
    }
}

#[cfg(not(unix))]
mod platform {
    use std::sync::Arc;
    use std::sync::mpsc::{self, Sender};
    use std::thread::{self, JoinHandle};

    use tracing::{debug, warn};

    use super::{SIGNALS_TARGET, SignalError, bridge_signals};
    use crate::reporter::LifecycleReporter;
    use crate::shutdown::ShutdownToken;

    /// Number reported for Ctrl+C, matching SIGINT.
    const INTERRUPT: i32 = 2;

    #[derive(Debug)]
    pub(super) struct Watcher {
        sender: Sender<Option<i32>>,
        thread: JoinHandle<()>,
    }

    impl Watcher {
        pub(super) fn spawn<F>(
            token: ShutdownToken,
            reporter: Arc<dyn LifecycleReporter>,
            force_exit: F,
        ) -> Result<Self, SignalError>
        where
            F: FnOnce(i32) + Send + 'static,
        {
            let (sender, receiver) = mpsc::channel::<Option<i32>>();
            let interrupts = sender.clone();
            ctrlc::set_handler(move || {
                if interrupts.send(Some(INTERRUPT)).is_err() {
                    debug!(target: SIGNALS_TARGET, "interrupt after watcher stopped");
                }
            })
            .map_err(|source| SignalError::Handler { source })?;
            let thread = thread::Builder::new()
                .name("keel-signals".to_owned())
                .spawn(move || {
                    bridge_signals(
                        receiver.iter().map_while(|signal| signal),
                        &token,
                        reporter.as_ref(),
                        force_exit,
                    );
                    debug!(target: SIGNALS_TARGET, "signal watcher exited");
                })
                .map_err(|source| SignalError::Spawn { source })?;
            Ok(Self { sender, thread })
        }

        pub(super) fn stop(self) {
            if self.sender.send(None).is_err() {
                debug!(target: SIGNALS_TARGET, "signal watcher already exited");
            }
            if self.thread.join().is_err() {
                warn!(target: SIGNALS_TARGET, "signal watcher panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rstest::rstest;

    use super::*;
    use crate::tests::support::{LifecycleEvent, RecordingReporter};

    fn run(signals: Vec<i32>) -> (ShutdownToken, RecordingReporter, Option<i32>) {
        let token = ShutdownToken::new();
        let reporter = RecordingReporter::default();
        let forced = RefCell::new(None);
        bridge_signals(signals, &token, &reporter, |signal| {
            *forced.borrow_mut() = Some(signal);
        });
        (token, reporter, forced.into_inner())
    }

    #[test]
    fn no_signal_leaves_token_untouched() {
        let (token, reporter, forced) = run(Vec::new());
        assert!(!token.is_cancelled());
        assert!(reporter.events().is_empty());
        assert_eq!(forced, None);
    }

    #[rstest]
    #[case::interrupt(2)]
    #[case::terminate(15)]
    fn first_signal_cancels_gracefully(#[case] signal: i32) {
        let (token, reporter, forced) = run(vec![signal]);
        assert!(token.is_cancelled());
        assert_eq!(forced, None);
        assert_eq!(
            reporter.events(),
            vec![LifecycleEvent::StopRequested(StopSource::Signal(signal))]
        );
    }

    #[test]
    fn second_signal_forces_exit() {
        let (token, reporter, forced) = run(vec![15, 2, 15]);
        assert!(token.is_cancelled());
        assert_eq!(forced, Some(2));
        assert_eq!(
            reporter.events(),
            vec![
                LifecycleEvent::StopRequested(StopSource::Signal(15)),
                LifecycleEvent::ForcedExit(2),
            ]
        );
    }

    #[test]
    fn signal_after_ipc_stop_is_still_graceful() {
        let token = ShutdownToken::new();
        assert!(token.cancel());
        let reporter = RecordingReporter::default();
        let mut forced = false;
        bridge_signals([15], &token, &reporter, |_| forced = true);
        assert!(!forced);
        assert!(token.is_cancelled());
    }

    #[test]
    fn installed_bridge_stops_cleanly() {
        let token = ShutdownToken::new();
        let mut bridge = SignalBridge::install(
            token.clone(),
            Arc::new(RecordingReporter::default()),
        )
        .expect("install signal bridge");
        bridge.stop();
        bridge.stop();
        assert!(!token.is_cancelled());
    }
}
