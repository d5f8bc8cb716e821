//! Client side of the control plane.
//!
//! Every call resolves the service's port from the registry, opens a fresh
//! loopback connection, performs one request/response exchange, and closes
//! the connection. Connect, read, and write all share one bounded timeout so
//! a stale or wedged peer cannot block the caller indefinitely.

mod errors;

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use keel_config::RuntimeConfig;

use crate::registry::PortRegistry;
use crate::transport::protocol::{MAX_LINE_BYTES, OK, PING, PONG, STOP};

pub use self::errors::ClientError;

/// Timeout applied to connect, read, and write.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Observed state of a named instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    /// A live instance answered the health probe.
    Running {
        /// Control port of the instance.
        port: u16,
    },
    /// A port record exists but nothing healthy answers on it.
    Stale {
        /// Port named by the leftover record.
        port: u16,
    },
    /// No port record exists.
    Stopped,
}

/// Issues control commands to running instances.
#[derive(Debug, Clone)]
pub struct IpcClient {
    registry: PortRegistry,
    timeout: Duration,
}

impl IpcClient {
    /// Builds a client resolving ports through `registry`.
    #[must_use]
    pub fn new(registry: PortRegistry) -> Self {
        Self {
            registry,
            timeout: CLIENT_TIMEOUT,
        }
    }

    /// Builds a client for the configured data root.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(PortRegistry::from_config(config))
    }

    /// Overrides the network timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registry used for port resolution.
    #[must_use]
    pub const fn registry(&self) -> &PortRegistry {
        &self.registry
    }

    /// Whether a healthy instance of `name` is running. Never fails: any
    /// resolution, connection, or protocol problem reads as `false`.
    #[must_use]
    pub fn ping(&self, name: &str) -> bool {
        matches!(self.send_command(name, PING).as_deref(), Ok(PONG))
    }

    /// Alias of [`ping`](Self::ping).
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        self.ping(name)
    }

    /// Sends `command` to `name` and returns the trimmed response line.
    pub fn send_command(&self, name: &str, command: &str) -> Result<String, ClientError> {
        validate_command(command)?;
        let port = self
            .registry
            .read(name)
            .map_err(|source| ClientError::NotRunning {
                name: name.to_owned(),
                source,
            })?;
        self.exchange(port, command)
    }

    /// Asks `name` to shut down. Succeeds only on the literal `OK`.
    pub fn stop(&self, name: &str) -> Result<(), ClientError> {
        match self.send_command(name, STOP) {
            Ok(response) if response == OK => Ok(()),
            Ok(response) => Err(ClientError::UnexpectedResponse {
                command: STOP.to_owned(),
                response: Some(response),
            }),
            Err(ClientError::Response { .. }) => Err(ClientError::UnexpectedResponse {
                command: STOP.to_owned(),
                response: None,
            }),
            Err(error) => Err(error),
        }
    }

    /// Sends `STOP` and waits for the instance to remove its port record.
    pub fn stop_and_wait(&self, name: &str, timeout: Duration) -> Result<(), ClientError> {
        self.stop(name)?;
        let deadline = Instant::now() + timeout;
        loop {
            match self.registry.read(name) {
                Err(error) if error.is_absent() => return Ok(()),
                _ if Instant::now() >= deadline => {
                    return Err(ClientError::StopTimeout {
                        name: name.to_owned(),
                        timeout,
                    });
                }
                _ => thread::sleep(STOP_POLL_INTERVAL),
            }
        }
    }

    /// Classifies `name` as running, stale, or stopped.
    #[must_use]
    pub fn status(&self, name: &str) -> InstanceStatus {
        let Ok(port) = self.registry.read(name) else {
            return InstanceStatus::Stopped;
        };
        match self.exchange(port, PING) {
            Ok(response) if response == PONG => InstanceStatus::Running { port },
            _ => InstanceStatus::Stale { port },
        }
    }

    fn exchange(&self, port: u16, command: &str) -> Result<String, ClientError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|source| ClientError::Connect { addr, source })?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|source| ClientError::Send { addr, source })?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|source| ClientError::Response { addr, source })?;

        stream
            .write_all(format!("{command}\n").as_bytes())
            .and_then(|()| stream.flush())
            .map_err(|source| ClientError::Send { addr, source })?;

        read_response_line(&mut stream)
            .map_err(|source| ClientError::Response { addr, source })
    }
}

fn validate_command(command: &str) -> Result<(), ClientError> {
    if command.trim().is_empty() || command.contains(['\n', '\r']) {
        return Err(ClientError::InvalidCommand {
            command: command.to_owned(),
        });
    }
    Ok(())
}

fn read_response_line(stream: &mut TcpStream) -> std::io::Result<String> {
    let limit = u64::try_from(MAX_LINE_BYTES).unwrap_or(u64::MAX);
    let mut reader = BufReader::new(stream.take(limit));
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if line.last() != Some(&b'\n') {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "peer closed the connection before sending a complete line",
        ));
    }
    Ok(String::from_utf8_lossy(&line).trim().to_owned())
}
