//! Control-plane transport: loopback listener, per-connection dispatch, and
//! the server lifecycle that ties the listener to its port record.

mod errors;
mod handler;
mod listener;
pub mod protocol;
mod server;

pub use self::errors::{ListenerError, ServerError};
pub(crate) use self::handler::ConnectionHandler;
pub use self::handler::ShutdownHook;
pub use self::server::{IpcServer, ServerHandle};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Server-side deadline for receiving the request line.
pub const SERVER_READ_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
