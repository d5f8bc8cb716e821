//! Process-level configuration resolved from the environment.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::defaults::{
    DATA_ROOT_ENV_VAR, DEFAULT_LOG_FILTER, LOG_FILTER_ENV_VAR, LOG_FORMAT_ENV_VAR,
    default_data_root,
};
use crate::logging::{LogFormat, LogFormatParseError, LoggingConfig};
use crate::paths::{ServicePaths, ServicePathsError};

/// Settings shared by every keel-hosted process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    data_root: PathBuf,
    logging: LoggingConfig,
}

/// Errors raised while resolving [`RuntimeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured log format is not recognised.
    #[error("invalid KEEL_LOG_FORMAT value '{value}': {source}")]
    LogFormat {
        /// Rejected value.
        value: String,
        /// Parser failure.
        #[source]
        source: LogFormatParseError,
    },
}

impl RuntimeConfig {
    /// Builds a configuration from explicit values.
    #[must_use]
    pub fn new(data_root: impl Into<PathBuf>, logging: LoggingConfig) -> Self {
        Self {
            data_root: data_root.into(),
            logging,
        }
    }

    /// Resolves the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_root = lookup(DATA_ROOT_ENV_VAR)
            .filter(|value| !value.trim().is_empty())
            .map_or_else(default_data_root, PathBuf::from);
        let filter = lookup(LOG_FILTER_ENV_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned());
        let format = match lookup(LOG_FORMAT_ENV_VAR) {
            Some(value) if !value.trim().is_empty() => value
                .trim()
                .parse::<LogFormat>()
                .map_err(|source| ConfigError::LogFormat { value, source })?,
            _ => LogFormat::default(),
        };
        Ok(Self::new(data_root, LoggingConfig::new(filter, format)))
    }

    /// Directory holding every service directory.
    #[must_use]
    pub fn data_root(&self) -> &Path {
        self.data_root.as_path()
    }

    /// Logging settings.
    #[must_use]
    pub const fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Derives the artefact paths of a named service under the data root.
    pub fn service_paths(&self, name: &str) -> Result<ServicePaths, ServicePathsError> {
        ServicePaths::new(&self.data_root, name)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(default_data_root(), LoggingConfig::default())
    }
}
