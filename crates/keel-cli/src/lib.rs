//! Library half of `keelctl`.
//!
//! Resolves the data root, finds the named service through its port record,
//! and performs one control-plane exchange per invocation.

mod cli;
mod errors;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use keel::{InstanceStatus, IpcClient, PortRegistry};
use keel_config::{RuntimeConfig, ServicePaths};

use crate::cli::{Cli, CliCommand};
use crate::errors::AppError;

/// How long `stop --wait` waits for the port record to disappear.
const STOP_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Parses `args` (program name first) and runs the selected subcommand.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let code = u8::try_from(error.exit_code()).unwrap_or(1);
            let rendered = error.render();
            let written = if error.use_stderr() {
                write!(stderr, "{rendered}")
            } else {
                write!(stdout, "{rendered}")
            };
            written.ok();
            return ExitCode::from(code);
        }
    };

    execute(&cli, stdout).unwrap_or_else(|error| {
        writeln!(stderr, "error: {error}").ok();
        ExitCode::FAILURE
    })
}

fn execute<W: Write>(cli: &Cli, stdout: &mut W) -> Result<ExitCode, AppError> {
    let data_root = cli.data_root.clone().map_or_else(
        || RuntimeConfig::from_env().map(|config| config.data_root().to_path_buf()),
        Ok,
    )?;
    let client = IpcClient::new(PortRegistry::new(&data_root))
        .with_timeout(Duration::from_millis(cli.timeout_ms));

    match &cli.command {
        CliCommand::Ping { name } => {
            if client.ping(name) {
                writeln!(stdout, "PONG")?;
                Ok(ExitCode::SUCCESS)
            } else {
                writeln!(stdout, "NOT RUNNING")?;
                Ok(ExitCode::FAILURE)
            }
        }
        CliCommand::Stop { name, wait } => {
            if *wait {
                client.stop_and_wait(name, STOP_WAIT_TIMEOUT)?;
            } else {
                client.stop(name)?;
            }
            writeln!(stdout, "OK")?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Send { name, command } => {
            let response = client.send_command(name, &command.join(" "))?;
            writeln!(stdout, "{response}")?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Status { name } => match client.status(name) {
            InstanceStatus::Running { port } => {
                writeln!(stdout, "running on port {port}")?;
                Ok(ExitCode::SUCCESS)
            }
            InstanceStatus::Stale { port } => {
                writeln!(stdout, "stale port record ({port})")?;
                Ok(ExitCode::FAILURE)
            }
            InstanceStatus::Stopped => {
                writeln!(stdout, "not running")?;
                Ok(ExitCode::FAILURE)
            }
        },
        CliCommand::Paths { name } => {
            let paths = ServicePaths::new(&data_root, name)?;
            writeln!(stdout, "service dir: {}", paths.service_dir().display())?;
            writeln!(stdout, "port file:   {}", paths.port_file().display())?;
            writeln!(stdout, "env file:    {}", paths.env_file().display())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
