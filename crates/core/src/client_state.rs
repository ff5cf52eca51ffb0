// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle of a language client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a language client connection.
///
/// `Disconnected --init--> Initialized --exit--> Closed`. `Connecting` and
/// `ShuttingDown` are transient sub-states of `init` and `exit`. A failed
/// `init` leaves the client `Disconnected` until `exit` closes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientState {
    #[default]
    Disconnected,
    Connecting,
    Initialized,
    ShuttingDown,
    Closed,
}

impl ClientState {
    /// True while the transport may still hold an open socket
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ClientState::Connecting | ClientState::Initialized | ClientState::ShuttingDown
        )
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Disconnected => write!(f, "disconnected"),
            ClientState::Connecting => write!(f, "connecting"),
            ClientState::Initialized => write!(f, "initialized"),
            ClientState::ShuttingDown => write!(f, "shutting_down"),
            ClientState::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
#[path = "client_state_tests.rs"]
mod tests;
