//! File-based discovery of running instances.
//!
//! A running service records the loopback port of its control listener in
//! `<data root>/<name>/<name>.port`. The path depends only on the data root
//! and the name, so writers and readers agree without coordinating. The file
//! is an unlocked key-value store: a crashed process leaves its record
//! behind, and readers must treat a record whose port refuses connections
//! exactly like a missing one.

mod errors;
mod files;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use keel_config::{RuntimeConfig, ServicePaths};

pub use self::errors::RegistryError;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Reads and writes port records under a data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRegistry {
    root: PathBuf,
}

impl PortRegistry {
    /// Builds a registry rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Builds a registry rooted at the configured data root.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.data_root())
    }

    /// Directory holding every service directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Path of the port record for `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, RegistryError> {
        Ok(self.paths(name)?.port_file().to_path_buf())
    }

    /// Persists `port` as the record for `name`, creating directories as
    /// needed. Returns the path written.
    pub fn write(&self, name: &str, port: u16) -> Result<PathBuf, RegistryError> {
        let paths = self.paths(name)?;
        paths.ensure_service_dir()?;
        let path = paths.port_file();
        files::replace_port_record(path, port).map_err(|source| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            target: REGISTRY_TARGET,
            service = name,
            port,
            file = %path.display(),
            "port record written"
        );
        Ok(path.to_path_buf())
    }

    /// Reads the port recorded for `name`.
    pub fn read(&self, name: &str) -> Result<u16, RegistryError> {
        let paths = self.paths(name)?;
        let path = paths.port_file();
        let contents = fs::read_to_string(path).map_err(|source| RegistryError::Missing {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = contents.trim();
        match trimmed.parse::<u16>() {
            Ok(port) if port != 0 => Ok(port),
            _ => Err(RegistryError::Malformed {
                path: path.to_path_buf(),
                contents: trimmed.to_owned(),
            }),
        }
    }

    /// Removes the record for `name`. Absence is not an error; other
    /// failures are logged and swallowed.
    pub fn remove(&self, name: &str) {
        let path = match self.path_for(name) {
            Ok(path) => path,
            Err(error) => {
                warn!(
                    target: REGISTRY_TARGET,
                    service = name,
                    error = %error,
                    "cannot derive port record path"
                );
                return;
            }
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(
                    target: REGISTRY_TARGET,
                    service = name,
                    file = %path.display(),
                    "port record removed"
                );
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(
                    target: REGISTRY_TARGET,
                    service = name,
                    file = %path.display(),
                    error = %error,
                    "failed to remove port record"
                );
            }
        }
    }

    fn paths(&self, name: &str) -> Result<ServicePaths, RegistryError> {
        Ok(ServicePaths::new(&self.root, name)?)
    }
}
