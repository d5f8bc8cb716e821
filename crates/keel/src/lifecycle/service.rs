//! The `Service` builder and its run loop.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use keel_config::{EnvError, RuntimeConfig, ServiceIdentity, load_env};
use tracing::debug;

use crate::cli::{Cli, Dispatch};
use crate::client::IpcClient;
use crate::command::{Command, CommandHandler};
use crate::registry::PortRegistry;
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};
use crate::shutdown::ShutdownToken;
use crate::signals::SignalBridge;
use crate::telemetry;
use crate::transport::IpcServer;

use super::{LIFECYCLE_TARGET, LifecycleError, LifecycleState};

/// Long-running work hosted by a [`Service`].
///
/// The task receives the run's shutdown token and is expected to return
/// promptly once it is cancelled.
pub type Task = Box<dyn FnOnce(ShutdownToken) -> anyhow::Result<()>>;

/// Describes a service and hosts it for the lifetime of the process.
///
/// ```no_run
/// use keel::{Service, ServiceIdentity};
///
/// # fn main() -> std::process::ExitCode {
/// let identity = ServiceIdentity::new("heartbeat", "0.1.0").expect("valid name");
/// Service::new(identity).run(|token| {
///     while !token.wait_timeout(std::time::Duration::from_secs(1)) {
///         tracing::info!("tick");
///     }
///     Ok(())
/// })
/// # }
/// ```
pub struct Service {
    identity: ServiceIdentity,
    usage: Option<String>,
    commands: BTreeMap<String, Box<dyn Command>>,
    ipc_handler: Option<Arc<dyn CommandHandler>>,
    reporter: Option<Arc<dyn LifecycleReporter>>,
    config: Option<RuntimeConfig>,
    handle_signals: bool,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("identity", &self.identity)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("handle_signals", &self.handle_signals)
            .finish_non_exhaustive()
    }
}

impl Service {
    /// Starts describing a service with the given identity.
    #[must_use]
    pub fn new(identity: ServiceIdentity) -> Self {
        Self {
            identity,
            usage: None,
            commands: BTreeMap::new(),
            ipc_handler: None,
            reporter: None,
            config: None,
            handle_signals: true,
        }
    }

    /// Replaces the generated usage text.
    #[must_use]
    pub fn usage(mut self, text: impl Into<String>) -> Self {
        self.usage = Some(text.into());
        self
    }

    /// Registers a CLI subcommand. A later registration under the same name
    /// replaces the earlier one; built-in flags always win.
    #[must_use]
    pub fn command(mut self, name: impl Into<String>, command: impl Command + 'static) -> Self {
        self.commands.insert(name.into(), Box::new(command));
        self
    }

    /// Answers control-plane commands other than `PING` and `STOP`.
    #[must_use]
    pub fn ipc_handler(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.ipc_handler = Some(Arc::new(handler));
        self
    }

    /// Overrides the lifecycle event sink.
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn LifecycleReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Uses `config` instead of resolving one from the environment.
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Enables or disables the termination-signal bridge. Enabled by
    /// default.
    #[must_use]
    pub const fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Identity this service runs under.
    #[must_use]
    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Runs with the process arguments, hosting `task` in daemon mode.
    #[must_use]
    pub fn run<F>(self, task: F) -> ExitCode
    where
        F: FnOnce(ShutdownToken) -> anyhow::Result<()> + 'static,
    {
        self.run_with(
            env::args_os().skip(1),
            &mut io::stdout(),
            &mut io::stderr(),
            Some(Box::new(task)),
        )
    }

    /// Runs as a CLI-only tool: never binds a listener.
    #[must_use]
    pub fn run_cli(self) -> ExitCode {
        self.run_with(env::args_os().skip(1), &mut io::stdout(), &mut io::stderr(), None)
    }

    /// Runs with explicit arguments (program name excluded) and output
    /// streams.
    #[must_use]
    pub fn run_with<I>(
        self,
        args: I,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        task: Option<Task>,
    ) -> ExitCode
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let arguments: Vec<String> = args
            .into_iter()
            .map(|arg| arg.into().to_string_lossy().into_owned())
            .collect();
        self.execute(&arguments, stdout, stderr, task)
            .unwrap_or_else(|error| {
                let reported = match &error {
                    LifecycleError::AlreadyRunning { .. } => writeln!(stderr, "{error}"),
                    _ => writeln!(stderr, "error: {error}"),
                };
                if let Err(write_error) = reported {
                    debug!(
                        target: LIFECYCLE_TARGET,
                        error = %write_error,
                        "failed to report error on stderr"
                    );
                }
                ExitCode::FAILURE
            })
    }

    fn execute(
        self,
        args: &[String],
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        task: Option<Task>,
    ) -> Result<ExitCode, LifecycleError> {
        let Self {
            identity,
            usage,
            commands,
            ipc_handler,
            reporter: custom_reporter,
            config: explicit_config,
            handle_signals,
        } = self;

        let (config, env_file) = resolve_config(explicit_config, &identity)?;
        if let Err(error) = telemetry::initialise(config.logging()) {
            writeln!(stderr, "warning: {error}")?;
        }
        let reporter = custom_reporter
            .unwrap_or_else(|| Arc::new(StructuredLifecycleReporter::new(&identity)));
        if let Err(error) = &env_file {
            reporter.env_file_failed(error);
        }

        let client = IpcClient::from_config(&config);
        let cli = Cli {
            identity: &identity,
            config: &config,
            usage: usage.as_deref(),
            commands: &commands,
            client: &client,
            daemon: task.is_some(),
        };
        let hosted = match (cli.dispatch(args, stdout, stderr)?, task) {
            (Dispatch::Daemon, Some(hosted)) => hosted,
            (Dispatch::Exit(code), _) => return Ok(code),
            (Dispatch::Daemon, None) => return Ok(ExitCode::SUCCESS),
        };

        let daemon = Daemon {
            identity: &identity,
            config: &config,
            client: &client,
            ipc_handler,
            reporter,
            handle_signals,
        };
        daemon.host(hosted)
    }
}

/// Resolves configuration, loading the service's `.env` in between so its
/// values take part in the final resolution.
fn resolve_config(
    explicit: Option<RuntimeConfig>,
    identity: &ServiceIdentity,
) -> Result<(RuntimeConfig, Result<(), EnvError>), LifecycleError> {
    let from_env = explicit.is_none();
    let initial = explicit.map_or_else(RuntimeConfig::from_env, Ok)?;
    let env_file = load_env(&initial.service_paths(identity.name())?).map(|status| {
        debug!(target: LIFECYCLE_TARGET, ?status, "env file checked");
    });
    let config = if from_env {
        RuntimeConfig::from_env()?
    } else {
        initial
    };
    Ok((config, env_file))
}

/// Collaborators for the daemon half of a run.
struct Daemon<'a> {
    identity: &'a ServiceIdentity,
    config: &'a RuntimeConfig,
    client: &'a IpcClient,
    ipc_handler: Option<Arc<dyn CommandHandler>>,
    reporter: Arc<dyn LifecycleReporter>,
    handle_signals: bool,
}

impl Daemon<'_> {
    fn host(self, task: Task) -> Result<ExitCode, LifecycleError> {
        let Self {
            identity,
            config,
            client,
            ipc_handler,
            reporter,
            handle_signals,
        } = self;
        let name = identity.name();
        reporter.state_changed(LifecycleState::Idle);

        if client.ping(name) {
            return Err(LifecycleError::AlreadyRunning {
                name: name.to_owned(),
            });
        }

        let announcer = Arc::clone(&reporter);
        let token = ShutdownToken::with_hook(move || {
            announcer.state_changed(LifecycleState::ShuttingDown);
        });
        let cancel = token.clone();
        let mut builder = IpcServer::new(PortRegistry::from_config(config), name)
            .on_shutdown(Arc::new(move || {
                if !cancel.cancel() {
                    debug!(target: LIFECYCLE_TARGET, "shutdown already in progress");
                }
            }))
            .reporter(Arc::clone(&reporter));
        if let Some(handler) = ipc_handler {
            builder = builder.handler(handler);
        }
        let mut server = builder.start().map_err(|error| {
            reporter.listener_failed(&error);
            reporter.state_changed(LifecycleState::Stopped);
            error
        })?;
        reporter.state_changed(LifecycleState::Listening);

        let mut bridge = handle_signals
            .then(|| SignalBridge::install(token.clone(), Arc::clone(&reporter)))
            .and_then(|installed| {
                installed
                    .inspect_err(|error| reporter.signals_unavailable(&error.to_string()))
                    .ok()
            });

        reporter.state_changed(LifecycleState::Running);
        let outcome = task(token.clone());
        if token.cancel() {
            debug!(target: LIFECYCLE_TARGET, "task returned before cancellation");
        }

        if let Some(watcher) = bridge.as_mut() {
            watcher.stop();
        }
        server.stop();

        let code = outcome.map_or_else(
            |error| {
                reporter.task_failed(&error);
                ExitCode::FAILURE
            },
            |()| {
                reporter.shutdown_complete();
                ExitCode::SUCCESS
            },
        );
        reporter.state_changed(LifecycleState::Stopped);
        Ok(code)
    }
}
