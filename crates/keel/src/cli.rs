//! Single-shot CLI dispatch: built-in flags, then caller commands.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::process::ExitCode;

use keel_config::{RuntimeConfig, ServiceIdentity};

use crate::client::{InstanceStatus, IpcClient};
use crate::command::{Command, CommandContext};

const VERSION_FLAGS: &[&str] = &["--version", "-V"];
const HELP_FLAGS: &[&str] = &["--help", "-h", "help"];
const HEALTH_FLAG: &str = "--health";

const BUILTINS: &[(&str, &str)] = &[
    ("--version, -V", "Show version"),
    ("--help, -h, help", "Show this help"),
    ("--health", "Check if running"),
];

/// What the orchestrator should do after CLI dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Dispatch {
    /// A command ran; exit with this status.
    Exit(ExitCode),
    /// No command matched; start the daemon.
    Daemon,
}

/// Inputs shared by every CLI path.
pub(crate) struct Cli<'a> {
    pub(crate) identity: &'a ServiceIdentity,
    pub(crate) config: &'a RuntimeConfig,
    pub(crate) usage: Option<&'a str>,
    pub(crate) commands: &'a BTreeMap<String, Box<dyn Command>>,
    pub(crate) client: &'a IpcClient,
    pub(crate) daemon: bool,
}

impl Cli<'_> {
    /// Matches `args` (program name excluded) against built-ins first and
    /// registered commands second.
    pub(crate) fn dispatch(
        &self,
        args: &[String],
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> io::Result<Dispatch> {
        let Some((first, rest)) = args.split_first() else {
            if self.daemon {
                return Ok(Dispatch::Daemon);
            }
            self.write_usage(stdout)?;
            return Ok(Dispatch::Exit(ExitCode::SUCCESS));
        };

        let arg = first.as_str();
        if VERSION_FLAGS.contains(&arg) {
            writeln!(stdout, "{}", self.identity)?;
            return Ok(Dispatch::Exit(ExitCode::SUCCESS));
        }
        if HELP_FLAGS.contains(&arg) {
            self.write_usage(stdout)?;
            return Ok(Dispatch::Exit(ExitCode::SUCCESS));
        }
        if arg == HEALTH_FLAG {
            return self.health(stdout).map(Dispatch::Exit);
        }

        if let Some(command) = self.commands.get(arg) {
            let context = CommandContext {
                identity: self.identity,
                config: self.config,
                args: rest,
                stdout: &mut *stdout,
            };
            return match command.execute(context) {
                Ok(()) => Ok(Dispatch::Exit(ExitCode::SUCCESS)),
                Err(error) => {
                    writeln!(stderr, "error: {error:#}")?;
                    Ok(Dispatch::Exit(ExitCode::FAILURE))
                }
            };
        }

        if self.daemon {
            tracing::warn!(
                target: crate::lifecycle::LIFECYCLE_TARGET,
                service = %self.identity.name(),
                argument = arg,
                "ignoring unrecognised argument"
            );
            return Ok(Dispatch::Daemon);
        }
        writeln!(stderr, "error: unknown command '{arg}'")?;
        writeln!(
            stderr,
            "run '{} --help' for a list of commands",
            self.identity.name()
        )?;
        Ok(Dispatch::Exit(ExitCode::FAILURE))
    }

    fn health(&self, stdout: &mut dyn Write) -> io::Result<ExitCode> {
        match self.client.status(self.identity.name()) {
            InstanceStatus::Running { .. } => {
                writeln!(stdout, "OK")?;
                Ok(ExitCode::SUCCESS)
            }
            status => {
                if let InstanceStatus::Stale { port } = status {
                    tracing::debug!(
                        target: crate::lifecycle::LIFECYCLE_TARGET,
                        service = %self.identity.name(),
                        port,
                        "port record is stale"
                    );
                }
                writeln!(stdout, "NOT RUNNING")?;
                Ok(ExitCode::FAILURE)
            }
        }
    }

    fn write_usage(&self, out: &mut dyn Write) -> io::Result<()> {
        let text = self.usage.map_or_else(
            || render_usage(self.identity, self.commands),
            |custom| format!("{}\n", custom.trim_end()),
        );
        out.write_all(text.as_bytes())
    }
}

/// Renders the generated usage text.
///
/// Built-ins come first, then registered commands in name order, with
/// descriptions aligned in one column.
pub(crate) fn render_usage(
    identity: &ServiceIdentity,
    commands: &BTreeMap<String, Box<dyn Command>>,
) -> String {
    let width = BUILTINS
        .iter()
        .map(|(label, _)| label.len())
        .chain(commands.keys().map(String::len))
        .max()
        .unwrap_or_default();

    let mut text = format!("{identity}\n\nUsage: {} [command]\n\n", identity.name());
    text.push_str("Commands:\n");
    for (label, description) in BUILTINS {
        text.push_str(&format!("  {label:<width$}  {description}\n"));
    }
    if !commands.is_empty() {
        text.push('\n');
        for (name, command) in commands {
            let description = command.describe();
            if description.is_empty() {
                text.push_str(&format!("  {name}\n"));
            } else {
                text.push_str(&format!("  {name:<width$}  {description}\n"));
            }
        }
    }
    text
}
