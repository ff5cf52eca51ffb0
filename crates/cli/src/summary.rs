// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-client summary printed after a run

use crate::table::{Column, Table};
use lspload_engine::{ClientReport, RunSummary};
use std::io::Write;

/// Write one row per client followed by a totals line
pub fn render(summary: &RunSummary, out: &mut impl Write) -> std::io::Result<()> {
    let mut table = Table::new(vec![
        Column::left("CLIENT"),
        Column::right("INIT_MS"),
        Column::right("ITERATIONS"),
        Column::right("FAILURES"),
        Column::left("STATUS").with_max(60),
    ]);

    for timing in &summary.timings {
        let report = find_report(summary, timing.name.as_str());
        let (iterations, failures) = match report {
            Some(r) => (r.iterations.to_string(), r.failures.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let status = match (&timing.error, report) {
            (Some(error), _) => format!("init failed: {error}"),
            (None, Some(_)) => "ok".to_string(),
            (None, None) => "no report".to_string(),
        };
        table.row(vec![
            timing.name.to_string(),
            timing.elapsed.as_millis().to_string(),
            iterations,
            failures,
            status,
        ]);
    }
    table.render(out)?;

    let operations: u64 = summary.reports.iter().map(|r| r.iterations).sum();
    let failures: u64 = summary.reports.iter().map(|r| r.failures).sum();
    writeln!(
        out,
        "{} of {} clients ran, {} operations, {} failures",
        summary.reports.len(),
        summary.timings.len(),
        operations,
        failures
    )
}

fn find_report<'a>(summary: &'a RunSummary, name: &str) -> Option<&'a ClientReport> {
    summary.reports.iter().find(|r| r.name == name)
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
