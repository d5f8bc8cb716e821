use std::io;
use std::path::PathBuf;

use thiserror::Error;

use keel_config::ServicePathsError;

/// Errors surfaced by the [`PortRegistry`](super::PortRegistry).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The service name could not be mapped to a path, or its directory
    /// could not be created.
    #[error(transparent)]
    Paths(#[from] ServicePathsError),
    /// Persisting the port record failed.
    #[error("failed to write port record '{path}': {source}")]
    Write {
        /// Port record path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// No readable port record exists.
    #[error("no port record at '{path}': {source}")]
    Missing {
        /// Port record path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The port record does not hold a usable port number.
    #[error("port record '{path}' holds '{contents}', not a port number")]
    Malformed {
        /// Port record path.
        path: PathBuf,
        /// Raw (trimmed) file contents.
        contents: String,
    },
}

impl RegistryError {
    /// Returns true when the error means "no instance has registered".
    ///
    /// Missing and malformed records are both read as absence; callers
    /// treat them as "not running" rather than as failures.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Missing { .. } | Self::Malformed { .. })
    }
}
