//! Process lifecycle bootstrap for long-running local services.
//!
//! A service built on keel gets a uniform CLI surface (`--version`,
//! `--help`, `--health`, plus its own subcommands), a single-instance guard,
//! and a loopback control plane that lets other processes find it, probe it,
//! and ask it to stop. Signal-driven and IPC-driven shutdown converge on one
//! [`ShutdownToken`]; a second termination signal forces the process down.
//!
//! The control plane speaks one newline-terminated request and one
//! newline-terminated response per TCP connection:
//!
//! | Request | Response |
//! |---|---|
//! | `PING` | `PONG` |
//! | `STOP` | `OK`, then cancellation |
//! | anything else | handler output, or `UNKNOWN` |
//!
//! Each running instance publishes its port in
//! `<data root>/<name>/<name>.port`, which is how [`IpcClient`] finds it.

mod cli;
pub mod client;
pub mod command;
pub mod lifecycle;
pub mod registry;
pub mod reporter;
pub mod shutdown;
pub mod signals;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod tests;

pub use client::{ClientError, InstanceStatus, IpcClient};
pub use command::{Command, CommandContext, CommandHandler, FnCommand};
pub use keel_config::{RuntimeConfig, ServiceIdentity};
pub use lifecycle::{LifecycleError, LifecycleState, Service, Task};
pub use registry::{PortRegistry, RegistryError};
pub use reporter::{LifecycleReporter, StopSource, StructuredLifecycleReporter};
pub use shutdown::ShutdownToken;
pub use signals::{SignalBridge, SignalError};
pub use transport::{IpcServer, ServerError, ServerHandle};
