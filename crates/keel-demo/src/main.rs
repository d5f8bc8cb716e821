//! Reference daemon hosted by keel.
//!
//! Logs a heartbeat until asked to stop. Set `KEEL_DEMO_IGNORE_CANCEL=1` to
//! make it ignore graceful shutdown so only a second signal ends it.

use std::env;
use std::io::{self, Write};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use keel::{CommandContext, FnCommand, IpcClient, Service, ServiceIdentity, ShutdownToken};
use tracing::info;

const SERVICE_NAME: &str = "keel-demo";
const INTERVAL_ENV_VAR: &str = "KEEL_DEMO_INTERVAL_MS";
const IGNORE_CANCEL_ENV_VAR: &str = "KEEL_DEMO_IGNORE_CANCEL";
const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
const DEMO_TARGET: &str = "keel_demo";

fn main() -> ExitCode {
    let identity = match ServiceIdentity::new(SERVICE_NAME, env!("CARGO_PKG_VERSION")) {
        Ok(identity) => identity,
        Err(error) => {
            writeln!(io::stderr(), "error: {error}").ok();
            return ExitCode::FAILURE;
        }
    };
    let started = Instant::now();

    Service::new(identity)
        .command("stop", FnCommand::new("Stop the running instance", stop))
        .command(
            "send",
            FnCommand::new("Send a command to the running instance", send),
        )
        .ipc_handler(move |command: &str| answer(command, started))
        .run(heartbeat)
}

fn heartbeat(token: ShutdownToken) -> anyhow::Result<()> {
    let interval = interval_from_env()?;
    let ignore_cancel = env::var(IGNORE_CANCEL_ENV_VAR).is_ok_and(|value| value == "1");
    let mut beats: u64 = 0;
    loop {
        if token.wait_timeout(interval) {
            if !ignore_cancel {
                break;
            }
            thread::sleep(interval);
        }
        beats += 1;
        info!(target: DEMO_TARGET, beats, "heartbeat");
    }
    info!(target: DEMO_TARGET, beats, "heartbeat stopped");
    Ok(())
}

fn interval_from_env() -> anyhow::Result<Duration> {
    env::var(INTERVAL_ENV_VAR).map_or(Ok(DEFAULT_INTERVAL), |raw| {
        let millis: u64 = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {INTERVAL_ENV_VAR} value '{raw}'"))?;
        Ok(Duration::from_millis(millis.max(1)))
    })
}

fn answer(command: &str, started: Instant) -> String {
    if command == "UPTIME" {
        return started.elapsed().as_secs().to_string();
    }
    command
        .strip_prefix("ECHO ")
        .map_or_else(|| "UNKNOWN".to_owned(), str::to_owned)
}

fn stop(context: CommandContext<'_>) -> anyhow::Result<()> {
    let CommandContext {
        identity,
        config,
        stdout,
        ..
    } = context;
    IpcClient::from_config(config).stop(identity.name())?;
    writeln!(stdout, "OK")?;
    Ok(())
}

fn send(context: CommandContext<'_>) -> anyhow::Result<()> {
    let CommandContext {
        identity,
        config,
        args,
        stdout,
    } = context;
    if args.is_empty() {
        bail!("usage: {} send <command>", identity.name());
    }
    let response = IpcClient::from_config(config).send_command(identity.name(), &args.join(" "))?;
    writeln!(stdout, "{response}")?;
    Ok(())
}
