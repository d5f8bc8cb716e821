//! Error types for the control listener.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::registry::RegistryError;

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Binding the loopback address failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound address could not be read back.
    #[error("failed to read bound listener address: {source}")]
    LocalAddr {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener could not be switched to non-blocking mode.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be spawned.
    #[error("failed to spawn listener thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}

/// Errors surfaced while starting the control-plane server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The loopback listener could not be set up.
    #[error("listen: {source}")]
    Listener {
        /// Listener failure.
        #[from]
        source: ListenerError,
    },
    /// The port record could not be persisted.
    #[error("register port: {source}")]
    Registry {
        /// Registry failure.
        #[from]
        source: RegistryError,
    },
}
