//! Hosts a [`Service`] on a background thread so tests can drive it over
//! the control plane.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use keel_config::{LoggingConfig, RuntimeConfig, ServiceIdentity};

use crate::client::IpcClient;
use crate::command::CommandHandler;
use crate::lifecycle::Service;
use crate::registry::PortRegistry;
use crate::shutdown::ShutdownToken;

use super::RecordingReporter;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Exit status and captured output of one run.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) code: ExitCode,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// A service running on its own thread.
pub(crate) struct DaemonRun {
    pub(crate) name: String,
    pub(crate) client: IpcClient,
    pub(crate) reporter: Arc<RecordingReporter>,
    thread: Option<JoinHandle<Outcome>>,
}

impl DaemonRun {
    /// Blocks until the instance answers `PING`.
    pub(crate) fn wait_until_ready(&self) -> bool {
        wait_until(Duration::from_secs(5), || self.client.ping(&self.name))
    }

    /// Waits for the run to finish and returns its outcome.
    pub(crate) fn join(mut self) -> Outcome {
        self.thread
            .take()
            .expect("daemon already joined")
            .join()
            .expect("daemon thread panicked")
    }
}

impl Drop for DaemonRun {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.client.stop(&self.name).ok();
        }
    }
}

pub(crate) fn test_config(root: &Path) -> RuntimeConfig {
    RuntimeConfig::new(root, LoggingConfig::default())
}

/// Starts `name` under `root`, hosting `task` with signal handling disabled.
pub(crate) fn spawn_daemon<F>(
    root: &Path,
    name: &str,
    handler: Option<Arc<dyn CommandHandler>>,
    task: F,
) -> DaemonRun
where
    F: FnOnce(ShutdownToken) -> anyhow::Result<()> + Send + 'static,
{
    let reporter = Arc::new(RecordingReporter::default());
    let root: PathBuf = root.to_path_buf();
    let thread = {
        let reporter = Arc::clone(&reporter);
        let root = root.clone();
        let name = name.to_owned();
        thread::spawn(move || {
            let identity = ServiceIdentity::new(name, "1.0.0").expect("valid identity");
            let mut service = Service::new(identity)
                .config(test_config(&root))
                .reporter(reporter)
                .handle_signals(false);
            if let Some(handler) = handler {
                service = service.ipc_handler(move |command: &str| handler.handle(command));
            }
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let code = service.run_with(
                Vec::<String>::new(),
                &mut stdout,
                &mut stderr,
                Some(Box::new(task)),
            );
            Outcome {
                code,
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            }
        })
    };
    DaemonRun {
        name: name.to_owned(),
        client: IpcClient::new(PortRegistry::new(root)).with_timeout(Duration::from_secs(2)),
        reporter,
        thread: Some(thread),
    }
}

/// Polls `condition` until it holds or `timeout` passes.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}
