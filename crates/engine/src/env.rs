// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::path::PathBuf;

fn parse_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

/// `1`/`true`/`yes` enable, `0`/`false`/`no` disable, anything else is ignored
fn parse_flag(var: &str) -> Option<bool> {
    let value = std::env::var(var).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

/// Language server address override
pub fn address() -> Option<String> {
    non_empty("LSPLOAD_ADDR")
}

pub fn soak_ms() -> Option<u64> {
    parse_u64("LSPLOAD_SOAK_MS")
}

pub fn max_delay_ms() -> Option<u64> {
    parse_u64("LSPLOAD_MAX_DELAY_MS")
}

pub fn seed() -> Option<u64> {
    parse_u64("LSPLOAD_SEED")
}

pub fn concurrent_init() -> Option<bool> {
    parse_flag("LSPLOAD_CONCURRENT_INIT")
}

pub fn shared_workspace() -> Option<bool> {
    parse_flag("LSPLOAD_SHARED_WORKSPACE")
}

pub fn detached() -> Option<bool> {
    parse_flag("LSPLOAD_DETACHED")
}

pub fn with_edits() -> Option<bool> {
    parse_flag("LSPLOAD_WITH_EDITS")
}

/// Directory of `.template` files replacing the bundled set
pub fn template_dir() -> Option<PathBuf> {
    non_empty("LSPLOAD_TEMPLATE_DIR").map(PathBuf::from)
}

/// Parent directory for provisioned workspaces
pub fn workspace_base() -> Option<PathBuf> {
    non_empty("LSPLOAD_WORKSPACE_DIR").map(PathBuf::from)
}
