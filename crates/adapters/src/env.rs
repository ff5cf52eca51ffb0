// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// How long `exit` waits for the shutdown response before closing (default: 2000ms).
pub fn shutdown_grace() -> Duration {
    parse_duration_ms("LSPLOAD_SHUTDOWN_GRACE_MS").unwrap_or(Duration::from_secs(2))
}
