// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lspload - concurrent load tester for language servers

mod summary;
mod table;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use lspload_adapters::{TcpClientFactory, TracedFactory};
use lspload_engine::{
    ExecutionMode, InitMode, LoadTestConfig, Orchestrator, TemplateSource, WorkspaceMode,
    WorkspaceProvisioner,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "lspload",
    version,
    about = "Simulate many concurrent clients of a language server"
)]
struct Cli {
    /// Number of simulated clients
    #[arg(value_parser = parse_clients)]
    clients: usize,

    /// TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Language server address (host:port)
    #[arg(long)]
    addr: Option<String>,

    /// How long clients keep issuing requests
    #[arg(long, value_name = "MS")]
    soak_ms: Option<u64>,

    /// Upper bound of the random pause between requests
    #[arg(long, value_name = "MS")]
    max_delay_ms: Option<u64>,

    /// Initialize all clients at once instead of one by one
    #[arg(long)]
    concurrent_init: bool,

    /// Bind every client to one workspace
    #[arg(long)]
    shared_workspace: bool,

    /// Do not wait for a request before scheduling the next one
    #[arg(long)]
    detached: bool,

    /// Include document edits in the operation mix
    #[arg(long)]
    with_edits: bool,

    /// Seed for reproducible operation sequences
    #[arg(long)]
    seed: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Command-line flags override every other config layer
    fn apply(&self, config: &mut LoadTestConfig) {
        if let Some(addr) = &self.addr {
            config.address = addr.clone();
        }
        if let Some(ms) = self.soak_ms {
            config.soak_ms = ms;
        }
        if let Some(ms) = self.max_delay_ms {
            config.max_delay_ms = ms;
        }
        if self.concurrent_init {
            config.init_mode = InitMode::Concurrent;
        }
        if self.shared_workspace {
            config.workspace_mode = WorkspaceMode::Shared;
        }
        if self.detached {
            config.execution_mode = ExecutionMode::Detached;
        }
        if self.with_edits {
            config.with_edits = true;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}

fn parse_clients(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => std::process::exit(report_usage_error(&e)),
    };
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", format_error(&e));
        std::process::exit(1);
    }
}

/// Print a parse failure and return the exit code
fn report_usage_error(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            0
        }
        ErrorKind::MissingRequiredArgument | ErrorKind::UnknownArgument => {
            eprintln!("{}", Cli::command().render_usage());
            1
        }
        _ => {
            let rendered = err.to_string();
            eprintln!("{}", rendered.lines().next().unwrap_or("invalid arguments"));
            1
        }
    }
}

/// Format an anyhow error, skipping causes the top-level message already
/// contains.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run(cli: Cli) -> Result<()> {
    let _guard = setup_logging(cli.log_file.as_deref())?;
    let interrupt = interrupt_signal();

    let mut config = LoadTestConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let source = match &config.template_dir {
        Some(dir) => TemplateSource::Directory(dir.clone()),
        None => TemplateSource::Bundled,
    };
    let provisioner = WorkspaceProvisioner::new(config.workspace_base(), source);
    let factory = TracedFactory::new(TcpClientFactory::new(config.address.clone()));

    tracing::info!(
        clients = cli.clients,
        address = %config.address,
        soak_ms = config.soak_ms,
        init_mode = ?config.init_mode,
        workspace_mode = ?config.workspace_mode,
        execution_mode = ?config.execution_mode,
        "starting load test"
    );

    let mut orchestrator = Orchestrator::new(factory, provisioner, config);
    let summary = orchestrator
        .launch_test_until(cli.clients, interrupt)
        .await?;

    summary::render(&summary, &mut std::io::stdout().lock())?;
    Ok(())
}

/// Start listening for Ctrl-C right away; the returned future resolves
/// once it arrives and never resolves if no handler can be installed.
fn interrupt_signal() -> impl std::future::Future<Output = ()> {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received");
                let _ = tx.send(());
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for ctrl-c"),
        }
    });
    async move {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn setup_logging(log_file: Option<&Path>) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard, ansi) = match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)?;
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("invalid log file: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (writer, guard, false)
        }
        None => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            (writer, guard, true)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(ansi))
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
