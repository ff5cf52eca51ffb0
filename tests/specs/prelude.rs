//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the lspload binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use lspload_adapters::{StubServer, StubStats};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::mpsc;

// Short timings keep a full run under a second.
const LSPLOAD_SHUTDOWN_GRACE_MS: &str = "500";
pub const RUN_SOAK_MS: &str = "200";
pub const RUN_MAX_DELAY_MS: &str = "10";

/// Env vars that would leak a developer's setup into a spec run
const SCRUBBED_ENV: &[&str] = &[
    "LSPLOAD_ADDR",
    "LSPLOAD_SOAK_MS",
    "LSPLOAD_MAX_DELAY_MS",
    "LSPLOAD_SEED",
    "LSPLOAD_CONCURRENT_INIT",
    "LSPLOAD_SHARED_WORKSPACE",
    "LSPLOAD_DETACHED",
    "LSPLOAD_WITH_EDITS",
    "LSPLOAD_TEMPLATE_DIR",
    "LSPLOAD_WORKSPACE_DIR",
    "RUST_LOG",
];

/// Path to the lspload binary.
///
/// Uses assert_cmd's lookup, which resolves relative to the test binary
/// and honors `CARGO_BIN_EXE_*` when cargo provides it.
fn lspload_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("lspload")
}

/// Create a CLI builder for lspload commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![(
                "LSPLOAD_SHUTDOWN_GRACE_MS".into(),
                LSPLOAD_SHUTDOWN_GRACE_MS.into(),
            )],
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(lspload_binary());
        cmd.args(&self.args);
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(self, expected: i32) -> Self {
        assert_eq!(
            self.output.status.code(),
            Some(expected),
            "unexpected exit code\nstderr: {}",
            self.stderr()
        );
        self
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    pub fn stdout_is_empty(self) -> Self {
        let stdout = self.stdout();
        assert!(stdout.is_empty(), "stdout should be empty\nstdout: {}", stdout);
        self
    }
}

// =============================================================================
// Language server
// =============================================================================

/// Stub language server running on its own runtime thread.
///
/// The server stops when the handle is dropped or finished.
pub struct Server {
    addr: SocketAddr,
    stop: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<StubStats>>,
}

impl Server {
    pub fn start() -> Self {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("runtime should build");
            runtime.block_on(async move {
                let server = StubServer::start().await.expect("stub server should bind");
                ready_tx
                    .send(server.addr())
                    .expect("test thread should be waiting");
                let _ = stop_rx.await;
                server.stats()
            })
        });
        let addr = ready_rx.recv().expect("stub server should report its address");
        Self {
            addr,
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Stop the server and return the traffic it saw
    pub fn finish(mut self) -> StubStats {
        self.shutdown().unwrap_or_default()
    }

    fn shutdown(&mut self) -> Option<StubStats> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.thread.take().and_then(|t| t.join().ok())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// An address nothing is listening on
pub fn closed_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

/// Number of entries left in a directory
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
