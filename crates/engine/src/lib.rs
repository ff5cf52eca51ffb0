// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lspload execution engine

pub mod catalog;
pub mod config;
mod env;
mod error;
pub mod load_client;
mod orchestrator;
pub mod workspace;

pub use catalog::{execute, Operation, OperationCatalog};
pub use config::{ExecutionMode, InitMode, LoadTestConfig, WorkspaceMode, DEFAULT_ADDRESS};
pub use error::{ConfigError, OrchestratorError, ProvisionError};
pub use load_client::{ClientReport, LoadClient, RunSettings};
pub use orchestrator::{InitTiming, Orchestrator, RunSummary};
pub use workspace::{TemplateSource, WorkspaceProvisioner};
