// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Load-test configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `LSPLOAD_*` environment variables. Command-line flags are applied last by
//! the binary.

use crate::env;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default language server endpoint
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9999";

/// How clients are initialized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMode {
    /// One after another, so each timing reflects a single handshake
    #[default]
    Sequential,
    Concurrent,
}

/// How workspaces are assigned to clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceMode {
    #[default]
    PerClient,
    /// Every client opens the same project
    Shared,
}

/// Whether the run loop waits for each operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Awaited,
    /// Operations are spawned and the loop moves straight on to its delay
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadTestConfig {
    /// `host:port` of the language server
    pub address: String,
    pub soak_ms: u64,
    /// Upper bound (exclusive) of the random pause between operations
    pub max_delay_ms: u64,
    pub init_mode: InitMode,
    pub workspace_mode: WorkspaceMode,
    pub execution_mode: ExecutionMode,
    pub with_edits: bool,
    /// Fixed rng seed; client `i` uses `seed + i`
    pub seed: Option<u64>,
    pub project_prefix: String,
    pub template_dir: Option<PathBuf>,
    pub workspace_base: Option<PathBuf>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            soak_ms: 10_000,
            max_delay_ms: 500,
            init_mode: InitMode::default(),
            workspace_mode: WorkspaceMode::default(),
            execution_mode: ExecutionMode::default(),
            with_edits: false,
            seed: None,
            project_prefix: "client".to_string(),
            template_dir: None,
            workspace_base: None,
        }
    }
}

impl LoadTestConfig {
    /// Parse a TOML config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the optional file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay `LSPLOAD_*` environment variables
    pub fn apply_env(&mut self) {
        if let Some(address) = env::address() {
            self.address = address;
        }
        if let Some(ms) = env::soak_ms() {
            self.soak_ms = ms;
        }
        if let Some(ms) = env::max_delay_ms() {
            self.max_delay_ms = ms;
        }
        if let Some(seed) = env::seed() {
            self.seed = Some(seed);
        }
        if let Some(concurrent) = env::concurrent_init() {
            self.init_mode = if concurrent {
                InitMode::Concurrent
            } else {
                InitMode::Sequential
            };
        }
        if let Some(shared) = env::shared_workspace() {
            self.workspace_mode = if shared {
                WorkspaceMode::Shared
            } else {
                WorkspaceMode::PerClient
            };
        }
        if let Some(detached) = env::detached() {
            self.execution_mode = if detached {
                ExecutionMode::Detached
            } else {
                ExecutionMode::Awaited
            };
        }
        if let Some(with_edits) = env::with_edits() {
            self.with_edits = with_edits;
        }
        if let Some(dir) = env::template_dir() {
            self.template_dir = Some(dir);
        }
        if let Some(dir) = env::workspace_base() {
            self.workspace_base = Some(dir);
        }
    }

    pub fn soak(&self) -> Duration {
        Duration::from_millis(self.soak_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Seed for the client at `index`, if runs are seeded
    pub fn client_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(index as u64))
    }

    /// Directory under which workspaces are created
    pub fn workspace_base(&self) -> PathBuf {
        self.workspace_base
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
