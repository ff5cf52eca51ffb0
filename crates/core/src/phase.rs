// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-level phases of a load test.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Phase of one load-test run.
///
/// Linear happy path `Idle → Provisioning → Initializing → Running →
/// Draining → Terminated`. Any of the three working phases may jump straight
/// to `Draining` on failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    #[default]
    Idle,
    Provisioning,
    Initializing,
    Running,
    Draining,
    Terminated,
}

/// Rejected phase transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid phase transition: {from} -> {to}")]
pub struct PhaseError {
    pub from: RunPhase,
    pub to: RunPhase,
}

impl RunPhase {
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Provisioning)
                | (Provisioning, Initializing)
                | (Initializing, Running)
                | (Provisioning | Initializing | Running, Draining)
                | (Draining, Terminated)
        )
    }

    /// Validate and return the next phase
    pub fn advance(self, next: RunPhase) -> Result<RunPhase, PhaseError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PhaseError {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == RunPhase::Terminated
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Provisioning => "provisioning",
            RunPhase::Initializing => "initializing",
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
            RunPhase::Terminated => "terminated",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
#[path = "phase_tests.rs"]
mod tests;
