// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the load-test engine

use lspload_core::{PhaseError, RunPhase};
use std::path::PathBuf;
use thiserror::Error;

/// Errors creating a workspace from templates
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("no templates found in {}", .0.display())]
    TemplatesNotFound(PathBuf),
    #[error("failed to provision {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading the load-test configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Run-level failures
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),
    #[error("no client finished initialization ({attempted} attempted)")]
    NoClientsInitialized { attempted: usize },
    #[error("interrupted while {0}")]
    Interrupted(RunPhase),
    #[error(transparent)]
    InvalidPhase(#[from] PhaseError),
}
