// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lspload-core: shared types for the lspload load-testing harness

pub mod client_state;
pub mod id;
pub mod phase;
pub mod position;
pub mod workspace;

pub use client_state::ClientState;
pub use id::{ClientName, IdGen, SequentialIdGen, UuidIdGen};
pub use phase::{PhaseError, RunPhase};
pub use position::Position;
pub use workspace::Workspace;
