//! Integration tests for the `keelctl` binary against live and absent
//! instances.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use keel::{IpcServer, PortRegistry, ServerHandle, ShutdownToken};
use predicates::prelude::*;
use predicates::str::contains;
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn root() -> TempDir {
    tempfile::tempdir().expect("temp dir")
}

fn keelctl(root: &TempDir) -> assert_cmd::Command {
    let mut command = cargo_bin_cmd!("keelctl");
    command
        .arg("--data-root")
        .arg(root.path())
        .arg("--timeout-ms")
        .arg("2000");
    command
}

fn serve(root: &TempDir, name: &str, token: &ShutdownToken) -> ServerHandle {
    let token = token.clone();
    IpcServer::new(PortRegistry::new(root.path()), name)
        .on_shutdown(Arc::new(move || {
            token.cancel();
        }))
        .handler(Arc::new(|command: &str| {
            command
                .strip_prefix("ECHO ")
                .map_or_else(|| "UNKNOWN".to_owned(), str::to_owned)
        }))
        .start()
        .expect("start instance")
}

#[rstest]
fn version_flag_succeeds() {
    cargo_bin_cmd!("keelctl")
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("keelctl"));
}

#[rstest]
fn ping_without_instance_reports_not_running(root: TempDir) {
    keelctl(&root)
        .args(["ping", "demo"])
        .assert()
        .failure()
        .stdout("NOT RUNNING\n");
}

#[rstest]
fn status_without_instance_reports_not_running(root: TempDir) {
    keelctl(&root)
        .args(["status", "demo"])
        .assert()
        .failure()
        .stdout("not running\n");
}

#[rstest]
fn status_reports_stale_record(root: TempDir) {
    let probe = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("probe");
    let port = probe.local_addr().expect("addr").port();
    drop(probe);
    PortRegistry::new(root.path())
        .write("ghost", port)
        .expect("stale record");

    keelctl(&root)
        .args(["status", "ghost"])
        .assert()
        .failure()
        .stdout(format!("stale port record ({port})\n"));
}

#[rstest]
fn send_without_instance_fails_as_not_running(root: TempDir) {
    keelctl(&root)
        .args(["send", "demo2", "PING"])
        .assert()
        .failure()
        .stderr(contains("demo2 is not running"));
}

#[rstest]
fn paths_prints_derived_locations(root: TempDir) {
    keelctl(&root)
        .args(["paths", "demo"])
        .assert()
        .success()
        .stdout(contains("demo.port").and(contains(".env")));
}

#[rstest]
fn paths_rejects_nested_names(root: TempDir) {
    keelctl(&root)
        .args(["paths", "a/b"])
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[rstest]
fn commands_reach_live_instance(root: TempDir) {
    let token = ShutdownToken::new();
    let server = serve(&root, "demo", &token);

    keelctl(&root)
        .args(["ping", "demo"])
        .assert()
        .success()
        .stdout("PONG\n");
    keelctl(&root)
        .args(["status", "demo"])
        .assert()
        .success()
        .stdout(format!("running on port {}\n", server.port()));
    keelctl(&root)
        .args(["send", "demo", "ECHO", "hello", "world"])
        .assert()
        .success()
        .stdout("hello world\n");
    keelctl(&root)
        .args(["stop", "demo"])
        .assert()
        .success()
        .stdout("OK\n");

    assert!(token.wait_timeout(Duration::from_secs(2)));
    drop(server);
}

#[rstest]
fn stop_wait_returns_after_deregistration(root: TempDir) {
    let token = ShutdownToken::new();
    let server = serve(&root, "waiter", &token);
    let owner = {
        let token = token.clone();
        std::thread::spawn(move || {
            let mut server = server;
            token.wait();
            server.stop();
        })
    };

    keelctl(&root)
        .args(["stop", "waiter", "--wait"])
        .assert()
        .success()
        .stdout("OK\n");
    owner.join().expect("owner thread");
    assert!(
        !PortRegistry::new(root.path())
            .path_for("waiter")
            .expect("path")
            .exists()
    );
}

struct ClosedStream;

impl Write for ClosedStream {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn run_into_closed_streams(args: &[&OsString]) -> ExitCode {
    let argv = std::iter::once(OsString::from("keelctl"))
        .chain(args.iter().map(|arg| (*arg).clone()));
    keel_cli::run(argv, &mut ClosedStream, &mut ClosedStream)
}

#[rstest]
fn closed_output_streams_keep_the_exit_status(root: TempDir) {
    let data_root = OsString::from("--data-root");
    let path = root.path().as_os_str().to_owned();
    let stop = OsString::from("stop");
    let ghost = OsString::from("ghost");
    let unknown = OsString::from("frobnicate");

    assert_eq!(
        run_into_closed_streams(&[&data_root, &path, &stop, &ghost]),
        ExitCode::FAILURE
    );
    assert_eq!(run_into_closed_streams(&[&unknown]), ExitCode::from(2));
}
