//! Binds the control listener, publishes its port, and tears both down.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::command::CommandHandler;
use crate::registry::PortRegistry;
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};

use super::handler::{ControlHandler, ShutdownHook};
use super::listener::{ListenerHandle, SocketListener};
use super::{LISTENER_TARGET, SERVER_READ_TIMEOUT, ServerError};

/// Builder for the control-plane server of one service instance.
pub struct IpcServer {
    registry: PortRegistry,
    name: String,
    on_shutdown: ShutdownHook,
    handler: Option<Arc<dyn CommandHandler>>,
    reporter: Option<Arc<dyn LifecycleReporter>>,
    read_timeout: Duration,
}

impl IpcServer {
    /// Prepares a server for `name`, publishing its port in `registry`.
    #[must_use]
    pub fn new(registry: PortRegistry, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
            on_shutdown: Arc::new(|| {}),
            handler: None,
            reporter: None,
            read_timeout: SERVER_READ_TIMEOUT,
        }
    }

    /// Callback fired after a `STOP` command has been acknowledged.
    #[must_use]
    pub fn on_shutdown(mut self, hook: ShutdownHook) -> Self {
        self.on_shutdown = hook;
        self
    }

    /// Handler answering commands other than `PING` and `STOP`.
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sink for lifecycle events raised by connection handlers.
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn LifecycleReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// How long a connection may take to deliver its request line.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Binds `127.0.0.1:0`, writes the port record, and starts accepting.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let Self {
            registry,
            name,
            on_shutdown,
            handler,
            reporter: custom_reporter,
            read_timeout,
        } = self;
        let reporter = custom_reporter
            .unwrap_or_else(|| Arc::new(StructuredLifecycleReporter::for_service(&name)));

        let bound = SocketListener::bind_loopback()?;
        let port = bound.local_addr().port();
        let port_file = registry.write(&name, port)?;

        let control = Arc::new(ControlHandler::new(
            on_shutdown,
            handler,
            Arc::clone(&reporter),
            read_timeout,
        ));
        let listener = match bound.start(control) {
            Ok(listener) => listener,
            Err(error) => {
                registry.remove(&name);
                return Err(error.into());
            }
        };
        reporter.listener_started(port, &port_file);

        Ok(ServerHandle {
            registry,
            name,
            port,
            port_file,
            listener: Some(listener),
        })
    }
}

/// Running control-plane server.
///
/// [`stop`](Self::stop) closes the listener and removes the port record. It
/// is idempotent and also runs on drop.
#[derive(Debug)]
pub struct ServerHandle {
    registry: PortRegistry,
    name: String,
    port: u16,
    port_file: PathBuf,
    listener: Option<ListenerHandle>,
}

impl ServerHandle {
    /// Port the listener is bound to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Path of the port record published for this server.
    #[must_use]
    pub fn port_file(&self) -> &Path {
        self.port_file.as_path()
    }

    /// Whether [`stop`](Self::stop) has already run.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.listener.is_none()
    }

    /// Closes the listener, waits for the accept loop to exit, and removes
    /// the port record.
    pub fn stop(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        listener.shutdown();
        if let Err(error) = listener.join() {
            warn!(
                target: LISTENER_TARGET,
                service = %self.name,
                error = %error,
                "listener did not shut down cleanly"
            );
        }
        self.registry.remove(&self.name);
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
