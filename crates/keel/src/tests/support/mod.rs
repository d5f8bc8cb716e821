//! Shared test doubles and harness helpers.

mod daemon;
mod reporter;

pub(crate) use daemon::{DaemonRun, Outcome, spawn_daemon, test_config, wait_until};
pub(crate) use reporter::{LifecycleEvent, RecordingReporter};
