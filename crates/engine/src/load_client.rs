// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One simulated user: a language client driving random operations

use crate::catalog::{execute, issue, OperationCatalog};
use crate::config::{ExecutionMode, LoadTestConfig};
use lspload_adapters::{LanguageClient, LanguageClientError, RequestOutcome};
use lspload_core::{ClientName, Workspace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

/// Per-client run loop settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSettings {
    /// Exclusive upper bound of the pause after each operation
    pub max_delay: Duration,
    pub execution_mode: ExecutionMode,
    /// `None` seeds from the OS
    pub seed: Option<u64>,
}

impl RunSettings {
    /// Settings for the client at `index`
    pub fn from_config(config: &LoadTestConfig, index: usize) -> Self {
        Self {
            max_delay: config.max_delay(),
            execution_mode: config.execution_mode,
            seed: config.client_seed(index),
        }
    }
}

/// What one client did during its run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReport {
    pub name: ClientName,
    /// Operations that ran to completion, successfully or not
    pub iterations: u64,
    pub failures: u64,
    /// Completed operations by name
    pub operations: BTreeMap<&'static str, u64>,
    /// The loop ended on the shutdown signal
    pub cancelled: bool,
}

impl ClientReport {
    pub fn new(name: ClientName) -> Self {
        Self {
            name,
            iterations: 0,
            failures: 0,
            operations: BTreeMap::new(),
            cancelled: false,
        }
    }

    fn record(&mut self, operation: &'static str, ok: bool) {
        self.iterations += 1;
        *self.operations.entry(operation).or_default() += 1;
        if !ok {
            self.failures += 1;
        }
    }
}

/// A language client bound to a workspace and its operation catalog
pub struct LoadClient<C> {
    name: ClientName,
    client: C,
    workspace: Arc<Workspace>,
    catalog: OperationCatalog,
    settings: RunSettings,
    rng: StdRng,
}

impl<C: LanguageClient> LoadClient<C> {
    pub fn new(
        name: ClientName,
        client: C,
        workspace: Arc<Workspace>,
        catalog: OperationCatalog,
        settings: RunSettings,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            name,
            client,
            workspace,
            catalog,
            settings,
            rng,
        }
    }

    pub fn name(&self) -> &ClientName {
        &self.name
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    /// Connect the client to the server with the workspace as root
    pub async fn init(&self) -> Result<(), LanguageClientError> {
        self.client.init(self.workspace.root()).await
    }

    /// Issue random operations until `shutdown` fires (or its sender is
    /// dropped), then exit the client.
    ///
    /// Both the operation and the following pause race the shutdown signal,
    /// so an in-flight request is abandoned as soon as it fires.
    ///
    /// In detached mode the catalog's documents stay open for the whole run
    /// and requests overlap freely; they are closed before the exit.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> ClientReport {
        let mut report = ClientReport::new(self.name.clone());
        let mut detached = JoinSet::new();
        let held = match self.settings.execution_mode {
            ExecutionMode::Detached => self.open_resources().await,
            ExecutionMode::Awaited => Vec::new(),
        };
        tracing::info!(
            client = %self.name,
            operations = self.catalog.len(),
            mode = ?self.settings.execution_mode,
            "run loop started"
        );

        loop {
            let Some(operation) = self.catalog.choose(&mut self.rng).cloned() else {
                tracing::warn!(client = %self.name, "no operations to run");
                break;
            };

            match self.settings.execution_mode {
                ExecutionMode::Awaited => {
                    let result = tokio::select! {
                        biased;
                        _ = &mut shutdown => None,
                        result = execute(&self.client, &operation) => Some(result),
                    };
                    let Some(result) = result else {
                        tracing::debug!(client = %self.name, op = operation.name(), "operation cancelled");
                        report.cancelled = true;
                        break;
                    };
                    self.log_outcome(&mut report, operation.name(), result);
                }
                ExecutionMode::Detached => {
                    while let Some(joined) = detached.try_join_next() {
                        self.collect_detached(&mut report, joined);
                    }
                    let client = self.client.clone();
                    detached.spawn(async move {
                        let result = issue(&client, &operation).await;
                        (operation.name(), result)
                    });
                }
            }

            let delay = self.next_delay();
            let cancelled = tokio::select! {
                biased;
                _ = &mut shutdown => true,
                _ = tokio::time::sleep(delay) => false,
            };
            if cancelled {
                report.cancelled = true;
                break;
            }
        }

        detached.abort_all();
        while let Some(joined) = detached.join_next().await {
            self.collect_detached(&mut report, joined);
        }
        for resource in &held {
            if let Err(e) = self.client.close_document(resource).await {
                tracing::debug!(client = %self.name, resource = %resource.display(), error = %e, "close failed");
            }
        }

        self.client.exit().await;
        tracing::info!(
            client = %self.name,
            iterations = report.iterations,
            failures = report.failures,
            "run loop finished"
        );
        report
    }

    /// Run exactly `iterations` operations back to back, then exit the
    /// client. Operations are always awaited here.
    pub async fn run_iterations(mut self, iterations: usize) -> ClientReport {
        let mut report = ClientReport::new(self.name.clone());
        for _ in 0..iterations {
            let Some(operation) = self.catalog.choose(&mut self.rng).cloned() else {
                break;
            };
            let result = execute(&self.client, &operation).await;
            self.log_outcome(&mut report, operation.name(), result);
        }
        self.client.exit().await;
        report
    }

    /// Open every catalog document, returning the ones that opened
    async fn open_resources(&self) -> Vec<PathBuf> {
        let mut held = Vec::new();
        for resource in self.catalog.resources() {
            match self.client.open_document(resource).await {
                Ok(()) => held.push(resource.to_path_buf()),
                Err(e) => {
                    tracing::warn!(client = %self.name, resource = %resource.display(), error = %e, "failed to open document")
                }
            }
        }
        held
    }

    fn next_delay(&mut self) -> Duration {
        let max_ms = self.settings.max_delay.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.random_range(0..max_ms))
    }

    fn log_outcome(
        &self,
        report: &mut ClientReport,
        operation: &'static str,
        result: Result<RequestOutcome, LanguageClientError>,
    ) {
        match result {
            Ok(outcome) => {
                tracing::info!(client = %self.name, op = operation, items = outcome.items, "operation completed");
                report.record(operation, true);
            }
            Err(e) => {
                tracing::warn!(client = %self.name, op = operation, error = %e, "operation failed");
                report.record(operation, false);
            }
        }
    }

    fn collect_detached(
        &self,
        report: &mut ClientReport,
        joined: Result<
            (&'static str, Result<RequestOutcome, LanguageClientError>),
            tokio::task::JoinError,
        >,
    ) {
        match joined {
            Ok((operation, result)) => self.log_outcome(report, operation, result),
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::error!(client = %self.name, error = %e, "detached operation panicked"),
        }
    }
}

impl<C> std::fmt::Debug for LoadClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadClient")
            .field("name", &self.name)
            .field("workspace", &self.workspace.root())
            .field("operations", &self.catalog.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "load_client_tests.rs"]
mod tests;
