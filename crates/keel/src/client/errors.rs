//! Error types for control-plane clients.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::registry::RegistryError;

/// Errors surfaced by [`IpcClient`](super::IpcClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The command cannot be framed as a single request line.
    #[error("command {command:?} must be non-empty and fit on one line")]
    InvalidCommand {
        /// Rejected command.
        command: String,
    },
    /// No port record could be resolved for the service.
    #[error("{name} is not running: {source}")]
    NotRunning {
        /// Service name.
        name: String,
        /// Registry lookup failure.
        #[source]
        source: RegistryError,
    },
    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address dialled.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The request could not be written.
    #[error("failed to send request to {addr}: {source}")]
    Send {
        /// Peer address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// No complete response line arrived.
    #[error("failed to read response from {addr}: {source}")]
    Response {
        /// Peer address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The peer answered with something other than what the command expects.
    #[error("unexpected response to {command}: {}", describe_response(.response.as_deref()))]
    UnexpectedResponse {
        /// Command sent.
        command: String,
        /// Response received, or `None` when no line arrived.
        response: Option<String>,
    },
    /// The instance acknowledged `STOP` but did not deregister in time.
    #[error("{name} did not stop within {}ms", .timeout.as_millis())]
    StopTimeout {
        /// Service name.
        name: String,
        /// Time waited.
        timeout: Duration,
    },
}

impl ClientError {
    /// Returns true when the error means no instance is listening.
    ///
    /// Covers a missing or malformed port record and a record whose port
    /// refuses connections. Everything else means an instance exists but
    /// misbehaved.
    #[must_use]
    pub fn is_not_running(&self) -> bool {
        match self {
            Self::NotRunning { .. } => true,
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotFound
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}

fn describe_response(response: Option<&str>) -> String {
    response.map_or_else(|| "no response".to_owned(), |line| format!("'{line}'"))
}
