//! Shared configuration for keel-hosted services and their tooling.
//!
//! Both the daemon runtime and operator tools need to agree on where a
//! service keeps its runtime artefacts, so the path layout lives here rather
//! than in either binary. The crate also resolves the logging configuration
//! and loads the optional per-service `.env` file.

mod defaults;
mod env;
mod identity;
mod logging;
mod paths;
mod runtime;

pub use defaults::{
    DATA_ROOT_ENV_VAR, DEFAULT_LOG_FILTER, DEFAULT_LOG_FORMAT, LOG_FILTER_ENV_VAR,
    LOG_FORMAT_ENV_VAR, default_data_root,
};
pub use env::{EnvError, EnvFileStatus, load_env};
pub use identity::{IdentityError, ServiceIdentity};
pub use logging::{LogFormat, LogFormatParseError, LoggingConfig};
pub use paths::{ServicePaths, ServicePathsError};
pub use runtime::{ConfigError, RuntimeConfig};
