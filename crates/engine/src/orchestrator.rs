// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator driving a full load-test run

use crate::catalog::OperationCatalog;
use crate::config::{InitMode, LoadTestConfig, WorkspaceMode};
use crate::error::OrchestratorError;
use crate::load_client::{ClientReport, LoadClient, RunSettings};
use crate::workspace::WorkspaceProvisioner;
use lspload_adapters::{ClientFactory, LanguageClient};
use lspload_core::{ClientName, ClientState, IdGen, RunPhase, UuidIdGen, Workspace};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

/// How long one client took to initialize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitTiming {
    pub name: ClientName,
    pub elapsed: Duration,
    /// Error message when initialization failed
    pub error: Option<String>,
}

impl InitTiming {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub timings: Vec<InitTiming>,
    pub reports: Vec<ClientReport>,
}

/// A launched run loop
struct ClientTask<C> {
    name: ClientName,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<ClientReport>,
    /// Second handle on the client, to close it if the task dies
    observer: C,
}

/// Owns every client, task and workspace of one run.
///
/// The registries are only touched through `&mut self`; run loops never see
/// them.
pub struct Orchestrator<F: ClientFactory, I: IdGen = UuidIdGen> {
    factory: F,
    provisioner: WorkspaceProvisioner<I>,
    config: LoadTestConfig,
    clients: Vec<LoadClient<F::Client>>,
    workspaces: Vec<Arc<Workspace>>,
    tasks: Vec<ClientTask<F::Client>>,
    reports: Vec<ClientReport>,
    phase: RunPhase,
    history: Vec<RunPhase>,
}

impl<F, I> Orchestrator<F, I>
where
    F: ClientFactory,
    I: IdGen,
{
    pub fn new(factory: F, provisioner: WorkspaceProvisioner<I>, config: LoadTestConfig) -> Self {
        Self {
            factory,
            provisioner,
            config,
            clients: Vec::new(),
            workspaces: Vec::new(),
            tasks: Vec::new(),
            reports: Vec::new(),
            phase: RunPhase::Idle,
            history: vec![RunPhase::Idle],
        }
    }

    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Every phase entered so far, starting with `Idle`
    pub fn phase_history(&self) -> &[RunPhase] {
        &self.history
    }

    /// Clients spawned or initialized but not yet running
    pub fn clients(&self) -> &[LoadClient<F::Client>] {
        &self.clients
    }

    pub fn workspaces(&self) -> &[Arc<Workspace>] {
        &self.workspaces
    }

    /// Run loops launched and not yet joined
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Reports of every joined run loop
    pub fn reports(&self) -> &[ClientReport] {
        &self.reports
    }

    fn transition(&mut self, next: RunPhase) -> Result<(), OrchestratorError> {
        self.phase = self.phase.advance(next)?;
        self.history.push(next);
        tracing::debug!(phase = %next, "phase entered");
        Ok(())
    }

    /// Create the workspaces for `n` clients and register them.
    ///
    /// Workspaces created before a failure stay registered so `cleanup`
    /// removes them.
    pub fn provision(&mut self, n: usize) -> Result<Vec<Arc<Workspace>>, OrchestratorError> {
        let projects: Vec<String> = match self.config.workspace_mode {
            WorkspaceMode::Shared => vec![format!("{}-shared", self.config.project_prefix)],
            WorkspaceMode::PerClient => (0..n)
                .map(|i| ClientName::indexed(&self.config.project_prefix, i).to_string())
                .collect(),
        };

        let mut created = Vec::with_capacity(projects.len());
        for project in projects {
            let workspace = Arc::new(self.provisioner.spawn_workspace(&project)?);
            self.workspaces.push(Arc::clone(&workspace));
            created.push(workspace);
        }
        Ok(created)
    }

    /// Build `n` load clients, each bound to `workspaces[i % len]`.
    ///
    /// With a single workspace every client shares it. Returns the number
    /// of clients registered.
    pub fn spawn_clients(&mut self, n: usize, workspaces: &[Arc<Workspace>]) -> usize {
        if workspaces.is_empty() {
            tracing::warn!(requested = n, "no workspace to bind clients to");
            return 0;
        }
        for i in 0..n {
            let name = ClientName::indexed(&self.config.project_prefix, i);
            let workspace = Arc::clone(&workspaces[i % workspaces.len()]);
            let catalog = OperationCatalog::for_workspace(&workspace, self.config.with_edits);
            let client = self.factory.create(&name);
            self.clients.push(LoadClient::new(
                name,
                client,
                workspace,
                catalog,
                RunSettings::from_config(&self.config, i),
            ));
        }
        tracing::info!(clients = n, workspaces = workspaces.len(), "clients spawned");
        n
    }

    /// Initialize every registered client, timing each one.
    ///
    /// Clients that fail are exited and dropped from the registry. Clients
    /// stay registered while their handshake runs, so cancelling this future
    /// leaves every one of them for `kill_all` to exit.
    pub async fn init_clients(&mut self) -> Vec<InitTiming> {
        let timings = match self.config.init_mode {
            InitMode::Sequential => {
                let mut timings = Vec::with_capacity(self.clients.len());
                for client in &self.clients {
                    timings.push(init_timed(client.name(), client.client(), client.workspace()).await);
                }
                timings
            }
            InitMode::Concurrent => {
                let mut set = JoinSet::new();
                for (index, client) in self.clients.iter().enumerate() {
                    let name = client.name().clone();
                    let handle = client.client().clone();
                    let workspace = Arc::clone(client.workspace());
                    set.spawn(async move { (index, init_timed(&name, &handle, &workspace).await) });
                }
                let mut results = Vec::with_capacity(set.len());
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok(result) => results.push(result),
                        Err(e) => tracing::error!(error = %e, "client init task failed"),
                    }
                }
                results.sort_by_key(|(index, _)| *index);
                results.into_iter().map(|(_, timing)| timing).collect()
            }
        };

        for client in std::mem::take(&mut self.clients) {
            let initialized = timings
                .iter()
                .any(|t| &t.name == client.name() && t.succeeded());
            if initialized {
                self.clients.push(client);
            } else {
                client.client().exit().await;
            }
        }
        timings
    }

    /// Launch a run loop task for every initialized client
    pub fn run_clients(&mut self) -> usize {
        let mut launched = 0;
        for client in std::mem::take(&mut self.clients) {
            if client.client().state() != ClientState::Initialized {
                tracing::warn!(client = %client.name(), state = %client.client().state(), "skipping client that is not initialized");
                self.clients.push(client);
                continue;
            }
            let (tx, rx) = oneshot::channel();
            let name = client.name().clone();
            let observer = client.client().clone();
            let handle = tokio::spawn(client.run(rx));
            self.tasks.push(ClientTask {
                name,
                shutdown: Some(tx),
                handle,
                observer,
            });
            launched += 1;
        }
        tracing::info!(clients = launched, "run loops launched");
        launched
    }

    /// Signal every run loop, then wait for all of them.
    ///
    /// Afterwards no task is pending and every client is closed.
    pub async fn kill_all(&mut self) -> Vec<ClientReport> {
        for task in &mut self.tasks {
            if let Some(tx) = task.shutdown.take() {
                let _ = tx.send(());
            }
        }

        let mut reports = Vec::with_capacity(self.tasks.len());
        for task in std::mem::take(&mut self.tasks) {
            match task.handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(client = %task.name, error = %e, "run loop ended abnormally");
                    task.observer.exit().await;
                }
            }
        }

        // Spawned but never launched
        for client in std::mem::take(&mut self.clients) {
            client.client().exit().await;
        }

        tracing::info!(clients = reports.len(), "all clients stopped");
        self.reports.extend(reports.iter().cloned());
        reports
    }

    /// Delete every registered workspace
    pub fn cleanup(&mut self) {
        for workspace in std::mem::take(&mut self.workspaces) {
            self.provisioner.cleanup(&workspace);
        }
    }

    /// Stop every client, then remove every workspace
    pub async fn drain(&mut self) -> Vec<ClientReport> {
        let reports = self.kill_all().await;
        self.cleanup();
        reports
    }

    /// Full run with a soak that only ends when the soak time elapses
    pub async fn launch_test(&mut self, n: usize) -> Result<RunSummary, OrchestratorError> {
        self.launch_test_until(n, std::future::pending()).await
    }

    /// Provision, spawn, initialize and run `n` clients, soak until the soak
    /// time elapses or `interrupt` completes, then drain.
    ///
    /// An interrupt during initialization abandons the run with
    /// `OrchestratorError::Interrupted`. Draining happens on every path out,
    /// errors included.
    pub async fn launch_test_until(
        &mut self,
        n: usize,
        interrupt: impl Future<Output = ()>,
    ) -> Result<RunSummary, OrchestratorError> {
        self.transition(RunPhase::Provisioning)?;

        let result = self.run_phases(n, interrupt).await;
        if let Err(e) = &result {
            tracing::error!(phase = %self.phase, error = %e, "load test failed");
        }

        self.transition(RunPhase::Draining)?;
        let reports = self.drain().await;
        self.transition(RunPhase::Terminated)?;

        result.map(|timings| RunSummary { timings, reports })
    }

    async fn run_phases(
        &mut self,
        n: usize,
        interrupt: impl Future<Output = ()>,
    ) -> Result<Vec<InitTiming>, OrchestratorError> {
        tokio::pin!(interrupt);
        let workspaces = self.provision(n)?;
        self.spawn_clients(n, &workspaces);

        self.transition(RunPhase::Initializing)?;
        let timings = tokio::select! {
            biased;
            _ = &mut interrupt => {
                tracing::info!("initialization interrupted");
                return Err(OrchestratorError::Interrupted(RunPhase::Initializing));
            }
            timings = self.init_clients() => timings,
        };
        if timings.iter().all(|t| !t.succeeded()) {
            return Err(OrchestratorError::NoClientsInitialized {
                attempted: timings.len(),
            });
        }

        self.transition(RunPhase::Running)?;
        self.run_clients();

        let soak = self.config.soak();
        tokio::select! {
            _ = tokio::time::sleep(soak) => {
                tracing::info!(soak_ms = soak.as_millis() as u64, "soak complete");
            }
            _ = &mut interrupt => {
                tracing::info!("soak interrupted");
            }
        }
        Ok(timings)
    }
}

/// Best-effort release when a run was not drained.
///
/// Nothing can be awaited here, so clients are dropped without sending
/// `shutdown`/`exit`. Run loops are aborted and every client handle the
/// orchestrator holds is released before the workspaces are removed.
impl<F: ClientFactory, I: IdGen> Drop for Orchestrator<F, I> {
    fn drop(&mut self) {
        if self.tasks.is_empty() && self.clients.is_empty() && self.workspaces.is_empty() {
            return;
        }
        tracing::warn!(
            tasks = self.tasks.len(),
            clients = self.clients.len(),
            workspaces = self.workspaces.len(),
            "orchestrator dropped without draining"
        );
        for task in self.tasks.drain(..) {
            task.handle.abort();
        }
        self.clients.clear();
        for workspace in self.workspaces.drain(..) {
            self.provisioner.cleanup(&workspace);
        }
    }
}

async fn init_timed<C: LanguageClient>(
    name: &ClientName,
    client: &C,
    workspace: &Workspace,
) -> InitTiming {
    let start = Instant::now();
    let result = client.init(workspace.root()).await;
    let elapsed = start.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;
    let error = match result {
        Ok(()) => {
            tracing::info!(client = %name, elapsed_ms, "client initialized");
            None
        }
        Err(e) => {
            tracing::warn!(client = %name, elapsed_ms, error = %e, "client failed to initialize");
            Some(e.to_string())
        }
    };
    InitTiming {
        name: name.clone(),
        elapsed,
        error,
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
