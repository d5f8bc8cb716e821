use std::env;
use std::path::PathBuf;

#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;

/// Environment variable overriding the directory holding every service.
pub const DATA_ROOT_ENV_VAR: &str = "KEEL_HOME";

/// Environment variable holding the tracing filter expression.
pub const LOG_FILTER_ENV_VAR: &str = "KEEL_LOG";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV_VAR: &str = "KEEL_LOG_FORMAT";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default logging format for the binaries.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Compact;

/// Computes the data root used when `KEEL_HOME` is not set.
///
/// Prefers the platform's local data directory. Hosts without one (minimal
/// containers, service accounts without a home) fall back to a per-user
/// directory under the system temp dir.
#[must_use]
pub fn default_data_root() -> PathBuf {
    if let Some(mut dir) = dirs::data_local_dir() {
        dir.push("keel");
        return dir;
    }
    fallback_data_root()
}

#[cfg(unix)]
fn fallback_data_root() -> PathBuf {
    let mut dir = env::temp_dir();
    dir.push("keel");
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    dir.push(format!("uid-{}", unsafe { geteuid() }));
    dir
}

#[cfg(not(unix))]
fn fallback_data_root() -> PathBuf {
    let mut dir = env::temp_dir();
    dir.push("keel");
    dir
}
