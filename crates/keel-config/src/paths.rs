//! Derives the per-service artefact paths shared by daemons and tools.
//!
//! Every service owns one directory under the data root. The daemon writes
//! its port record there and operator tools read it back, so both sides must
//! derive identical paths from nothing but the root and the service name.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::identity::{IdentityError, validate_name};

/// Canonical paths for the artefacts of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePaths {
    service_dir: PathBuf,
    port_file: PathBuf,
    env_file: PathBuf,
    binary: PathBuf,
}

impl ServicePaths {
    /// Derives the paths for `name` under `root`. Touches no filesystem state.
    pub fn new(root: &Path, name: &str) -> Result<Self, ServicePathsError> {
        validate_name(name)?;
        let service_dir = root.join(name);
        let binary_name = if cfg!(windows) {
            format!("{name}.exe")
        } else {
            name.to_owned()
        };
        Ok(Self {
            port_file: service_dir.join(format!("{name}.port")),
            env_file: service_dir.join(".env"),
            binary: service_dir.join(binary_name),
            service_dir,
        })
    }

    /// Directory holding the service's artefacts.
    #[must_use]
    pub fn service_dir(&self) -> &Path {
        self.service_dir.as_path()
    }

    /// File recording the IPC port of the running instance.
    #[must_use]
    pub fn port_file(&self) -> &Path {
        self.port_file.as_path()
    }

    /// Optional `.env` file loaded at startup.
    #[must_use]
    pub fn env_file(&self) -> &Path {
        self.env_file.as_path()
    }

    /// Conventional install location of the service binary.
    #[must_use]
    pub fn binary(&self) -> &Path {
        self.binary.as_path()
    }

    /// Creates the service directory with restrictive permissions.
    pub fn ensure_service_dir(&self) -> Result<(), ServicePathsError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(&self.service_dir)
            && source.kind() != io::ErrorKind::AlreadyExists
        {
            return Err(ServicePathsError::CreateDirectory {
                path: self.service_dir.clone(),
                source,
            });
        }
        Ok(())
    }
}

/// Errors raised while deriving or preparing service paths.
#[derive(Debug, Error)]
pub enum ServicePathsError {
    /// The service name cannot be mapped onto the filesystem.
    #[error(transparent)]
    Name(#[from] IdentityError),
    /// Creating the service directory failed.
    #[error("failed to prepare service directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}
