//! Test double for [`LifecycleReporter`] that records events for assertions.

use std::path::Path;
use std::sync::Mutex;

use keel_config::EnvError;

use crate::lifecycle::LifecycleState;
use crate::reporter::{LifecycleReporter, StopSource};
use crate::transport::ServerError;

/// Lifecycle events captured during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LifecycleEvent {
    StateChanged(LifecycleState),
    EnvFileFailed(String),
    ListenerStarted(u16),
    ListenerFailed(String),
    StopRequested(StopSource),
    ForcedExit(i32),
    SignalsUnavailable(String),
    TaskFailed(String),
    ShutdownComplete,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingReporter {
    pub(crate) fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    /// State transitions in the order they were reported.
    pub(crate) fn states(&self) -> Vec<LifecycleState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::StateChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn contains(&self, event: &LifecycleEvent) -> bool {
        self.events().contains(event)
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn state_changed(&self, state: LifecycleState) {
        self.record(LifecycleEvent::StateChanged(state));
    }

    fn env_file_failed(&self, error: &EnvError) {
        self.record(LifecycleEvent::EnvFileFailed(error.to_string()));
    }

    fn listener_started(&self, port: u16, _port_file: &Path) {
        self.record(LifecycleEvent::ListenerStarted(port));
    }

    fn listener_failed(&self, error: &ServerError) {
        self.record(LifecycleEvent::ListenerFailed(error.to_string()));
    }

    fn stop_requested(&self, source: StopSource) {
        self.record(LifecycleEvent::StopRequested(source));
    }

    fn forced_exit(&self, signal: i32) {
        self.record(LifecycleEvent::ForcedExit(signal));
    }

    fn signals_unavailable(&self, reason: &str) {
        self.record(LifecycleEvent::SignalsUnavailable(reason.to_owned()));
    }

    fn task_failed(&self, error: &anyhow::Error) {
        self.record(LifecycleEvent::TaskFailed(format!("{error:#}")));
    }

    fn shutdown_complete(&self) {
        self.record(LifecycleEvent::ShutdownComplete);
    }
}
