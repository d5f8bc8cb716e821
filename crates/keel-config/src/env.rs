//! Loads the optional per-service `.env` file.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::paths::ServicePaths;

/// Outcome of [`load_env`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFileStatus {
    /// The file existed and its variables were applied.
    Loaded,
    /// No `.env` file exists for the service.
    Missing,
}

/// Errors raised while loading a `.env` file.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The file could not be read or parsed.
    #[error("failed to load env file '{path}': {source}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Parser failure.
        #[source]
        source: dotenvy::Error,
    },
}

/// Applies the service's `.env` file to the process environment.
///
/// Variables already present in the environment win over the file, so
/// operators can always override a value at launch.
pub fn load_env(paths: &ServicePaths) -> Result<EnvFileStatus, EnvError> {
    let path = paths.env_file();
    match dotenvy::from_path(path) {
        Ok(()) => Ok(EnvFileStatus::Loaded),
        Err(dotenvy::Error::Io(error)) if error.kind() == io::ErrorKind::NotFound => {
            Ok(EnvFileStatus::Missing)
        }
        Err(source) => Err(EnvError::Parse {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_is_not_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        let paths = ServicePaths::new(root.path(), "envless").expect("paths should derive");
        assert_eq!(load_env(&paths).expect("load"), EnvFileStatus::Missing);
    }

    #[test]
    fn loads_variables_without_overriding_existing_ones() {
        let root = tempfile::tempdir().expect("temp dir");
        let paths = ServicePaths::new(root.path(), "envful").expect("paths should derive");
        paths.ensure_service_dir().expect("service dir");
        fs::write(
            paths.env_file(),
            "KEEL_CONFIG_TEST_FRESH=from-file\nPATH=/clobbered\n",
        )
        .expect("write env file");

        let previous_path = std::env::var_os("PATH");
        assert_eq!(load_env(&paths).expect("load"), EnvFileStatus::Loaded);

        assert_eq!(
            std::env::var("KEEL_CONFIG_TEST_FRESH").as_deref(),
            Ok("from-file")
        );
        assert_eq!(std::env::var_os("PATH"), previous_path);
    }
}
