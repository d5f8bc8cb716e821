use std::io;

use keel::ClientError;
use keel_config::{ConfigError, ServicePathsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Paths(#[from] ServicePathsError),
    #[error("{0}")]
    Client(#[from] ClientError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
