use std::io;

use keel_config::{ConfigError, ServicePathsError};
use thiserror::Error;

use crate::transport::ServerError;

/// Reasons a run ends before or instead of hosting the task.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The environment holds an invalid setting.
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// Service paths could not be derived.
    #[error("{0}")]
    Paths(#[from] ServicePathsError),
    /// Another instance answered the health probe.
    #[error("{name} is already running")]
    AlreadyRunning {
        /// Service name.
        name: String,
    },
    /// The control plane could not be exposed.
    #[error("failed to start IPC listener: {0}")]
    Listener(#[from] ServerError),
    /// Writing CLI output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
