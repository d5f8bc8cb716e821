//! Structured reporting of service lifecycle events.

use std::path::Path;
use std::sync::Arc;

use keel_config::{EnvError, ServiceIdentity};

use crate::lifecycle::{LIFECYCLE_TARGET, LifecycleState};
use crate::transport::ServerError;

/// What asked the service to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSource {
    /// A `STOP` command arrived over the control plane.
    Ipc,
    /// The process received a termination signal.
    Signal(i32),
}

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked on every lifecycle state transition.
    fn state_changed(&self, state: LifecycleState);

    /// Invoked when the service's `.env` file exists but cannot be loaded.
    fn env_file_failed(&self, error: &EnvError);

    /// Invoked once the control listener is bound and registered.
    fn listener_started(&self, port: u16, port_file: &Path);

    /// Invoked when the control listener cannot be started.
    fn listener_failed(&self, error: &ServerError);

    /// Invoked when a stop request arrives, before cancellation fires.
    fn stop_requested(&self, source: StopSource);

    /// Invoked when a repeated signal forces the process down.
    fn forced_exit(&self, signal: i32);

    /// Invoked when termination signals cannot be observed.
    fn signals_unavailable(&self, reason: &str);

    /// Invoked when the hosted task returns an error.
    fn task_failed(&self, error: &anyhow::Error);

    /// Invoked after teardown when the hosted task returned successfully.
    fn shutdown_complete(&self);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn state_changed(&self, state: LifecycleState) {
        (**self).state_changed(state);
    }

    fn env_file_failed(&self, error: &EnvError) {
        (**self).env_file_failed(error);
    }

    fn listener_started(&self, port: u16, port_file: &Path) {
        (**self).listener_started(port, port_file);
    }

    fn listener_failed(&self, error: &ServerError) {
        (**self).listener_failed(error);
    }

    fn stop_requested(&self, source: StopSource) {
        (**self).stop_requested(source);
    }

    fn forced_exit(&self, signal: i32) {
        (**self).forced_exit(signal);
    }

    fn signals_unavailable(&self, reason: &str) {
        (**self).signals_unavailable(reason);
    }

    fn task_failed(&self, error: &anyhow::Error) {
        (**self).task_failed(error);
    }

    fn shutdown_complete(&self) {
        (**self).shutdown_complete();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Clone)]
pub struct StructuredLifecycleReporter {
    service: String,
    version: Option<String>,
}

impl StructuredLifecycleReporter {
    /// Builds a reporter tagging events with the service identity.
    #[must_use]
    pub fn new(identity: &ServiceIdentity) -> Self {
        Self {
            service: identity.name().to_owned(),
            version: Some(identity.version().to_owned()),
        }
    }

    /// Builds a reporter for a service whose version is unknown.
    #[must_use]
    pub fn for_service(name: &str) -> Self {
        Self {
            service: name.to_owned(),
            version: None,
        }
    }

    fn version(&self) -> &str {
        self.version.as_deref().unwrap_or("unknown")
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn state_changed(&self, state: LifecycleState) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            service = %self.service,
            event = "state_changed",
            state = %state,
            "lifecycle state changed"
        );
    }

    fn env_file_failed(&self, error: &EnvError) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            service = %self.service,
            event = "env_file_failed",
            error = %error,
            "ignoring unreadable env file"
        );
    }

    fn listener_started(&self, port: u16, port_file: &Path) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            service = %self.service,
            version = self.version(),
            event = "listener_started",
            port,
            port_file = %port_file.display(),
            "started {}",
            self.version()
        );
    }

    fn listener_failed(&self, error: &ServerError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            service = %self.service,
            event = "listener_failed",
            error = %error,
            "failed to start IPC listener"
        );
    }

    fn stop_requested(&self, source: StopSource) {
        match source {
            StopSource::Ipc => tracing::info!(
                target: LIFECYCLE_TARGET,
                service = %self.service,
                event = "stop_requested",
                source = "ipc",
                "received IPC STOP command"
            ),
            StopSource::Signal(signal) => tracing::info!(
                target: LIFECYCLE_TARGET,
                service = %self.service,
                event = "stop_requested",
                source = "signal",
                signal,
                "received shutdown signal"
            ),
        }
    }

    fn forced_exit(&self, signal: i32) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            service = %self.service,
            event = "forced_exit",
            signal,
            "forced shutdown"
        );
    }

    fn signals_unavailable(&self, reason: &str) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            service = %self.service,
            event = "signals_unavailable",
            reason,
            "termination signals are not observed; use IPC STOP"
        );
    }

    fn task_failed(&self, error: &anyhow::Error) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            service = %self.service,
            event = "task_failed",
            error = %format!("{error:#}"),
            "main exited with error"
        );
    }

    fn shutdown_complete(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            service = %self.service,
            version = self.version(),
            event = "shutdown_complete",
            "shutdown complete"
        );
    }
}
