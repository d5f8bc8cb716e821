//! Caller-supplied extensions: CLI commands and IPC command handlers.

use std::fmt;
use std::io::Write;

use keel_config::{RuntimeConfig, ServiceIdentity};

/// Everything a CLI command receives when it runs.
pub struct CommandContext<'a> {
    /// Identity of the hosting service.
    pub identity: &'a ServiceIdentity,
    /// Resolved runtime configuration.
    pub config: &'a RuntimeConfig,
    /// Arguments following the command name.
    pub args: &'a [String],
    /// Destination for the command's normal output.
    pub stdout: &'a mut dyn Write,
}

impl fmt::Debug for CommandContext<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandContext")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// A named subcommand that runs synchronously and then exits the process.
pub trait Command: Send + Sync {
    /// One-line description shown in usage output.
    fn describe(&self) -> &str;

    /// Runs the command.
    fn execute(&self, context: CommandContext<'_>) -> anyhow::Result<()>;
}

/// Adapts a closure into a [`Command`].
pub struct FnCommand<F> {
    description: String,
    run: F,
}

impl<F> FnCommand<F>
where
    F: Fn(CommandContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    /// Wraps `run` with a usage description.
    #[must_use]
    pub fn new(description: impl Into<String>, run: F) -> Self {
        Self {
            description: description.into(),
            run,
        }
    }
}

impl<F> Command for FnCommand<F>
where
    F: Fn(CommandContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn describe(&self) -> &str {
        &self.description
    }

    fn execute(&self, context: CommandContext<'_>) -> anyhow::Result<()> {
        (self.run)(context)
    }
}

/// Answers control-plane commands other than `PING` and `STOP`.
///
/// Called on the connection's thread; the returned string becomes the single
/// response line.
pub trait CommandHandler: Send + Sync {
    /// Produces the response for `command`.
    fn handle(&self, command: &str) -> String;
}

impl<F> CommandHandler for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn handle(&self, command: &str) -> String {
        self(command)
    }
}
