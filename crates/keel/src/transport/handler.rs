//! Connection handling for the control listener.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::command::CommandHandler;
use crate::reporter::{LifecycleReporter, StopSource};

use super::LISTENER_TARGET;
use super::protocol::{
    ControlRequest, MAX_LINE_BYTES, OK, PONG, UNKNOWN, response_line,
};

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream);
}

/// Callback fired after a `STOP` has been acknowledged.
pub type ShutdownHook = Arc<dyn Fn() + Send + Sync>;

/// Dispatches one control command per connection.
pub(crate) struct ControlHandler {
    on_shutdown: ShutdownHook,
    custom: Option<Arc<dyn CommandHandler>>,
    reporter: Arc<dyn LifecycleReporter>,
    read_timeout: Duration,
}

impl ControlHandler {
    pub(crate) const fn new(
        on_shutdown: ShutdownHook,
        custom: Option<Arc<dyn CommandHandler>>,
        reporter: Arc<dyn LifecycleReporter>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            on_shutdown,
            custom,
            reporter,
            read_timeout,
        }
    }

    fn respond(stream: &mut TcpStream, response: &str) -> io::Result<()> {
        stream.write_all(response_line(response).as_bytes())?;
        stream.flush()
    }
}

impl ConnectionHandler for ControlHandler {
    fn handle(&self, mut stream: TcpStream) {
        if let Err(error) = stream.set_read_timeout(Some(self.read_timeout)) {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "failed to set read deadline"
            );
            return;
        }

        let line = match read_request_line(&mut stream) {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(
                    target: LISTENER_TARGET,
                    "connection closed before a complete command"
                );
                return;
            }
            Err(error) => {
                debug!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "dropping connection without response"
                );
                return;
            }
        };

        let text = String::from_utf8_lossy(&line);
        let result = match ControlRequest::parse(&text) {
            ControlRequest::Ping => Self::respond(&mut stream, PONG),
            ControlRequest::Stop => {
                self.reporter.stop_requested(StopSource::Ipc);
                let acknowledged = Self::respond(&mut stream, OK);
                // The acknowledgement must reach the socket before teardown
                // can begin.
                (self.on_shutdown)();
                acknowledged
            }
            ControlRequest::Custom(command) => {
                let response = self
                    .custom
                    .as_ref()
                    .map_or_else(|| UNKNOWN.to_owned(), |handler| handler.handle(command));
                Self::respond(&mut stream, &response)
            }
        };

        if let Err(error) = result {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "connection handler error"
            );
        }
    }
}

/// Reads one request line, terminator included.
///
/// Returns `Ok(None)` when the peer closes the connection before sending a
/// line terminator; partial input is discarded.
pub(crate) fn read_request_line<R: Read>(stream: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let bytes_read = read_chunk_with_retry(stream, &mut chunk)?;
        if bytes_read == 0 {
            return Ok(None);
        }

        let received = chunk.get(..bytes_read).unwrap_or_default();
        if let Some(pos) = received.iter().position(|byte| *byte == b'\n') {
            buffer.extend_from_slice(received.get(..=pos).unwrap_or_default());
            enforce_request_limit(buffer.len())?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(received);
        enforce_request_limit(buffer.len())?;
    }
}

fn read_chunk_with_retry<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_request_limit(size: usize) -> io::Result<()> {
    if size > MAX_LINE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request exceeds maximum size",
        ));
    }
    Ok(())
}
