// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Language client adapters

mod documents;
mod tcp;
pub mod wire;

pub use documents::{DocumentState, DocumentTracker};
pub use tcp::{TcpClientFactory, TcpLanguageClient};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
mod stub;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ClientCall, FakeClientFactory, FakeLanguageClient};
#[cfg(any(test, feature = "test-support"))]
pub use stub::{StubServer, StubStats};

use async_trait::async_trait;
use lspload_core::{ClientName, ClientState, Position};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from language client operations
#[derive(Debug, Error)]
pub enum LanguageClientError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("client already initialized")]
    AlreadyInitialized,
    #[error("client not initialized (state: {0})")]
    NotInitialized(ClientState),
    #[error("document not open: {}", .0.display())]
    DocumentNotOpen(PathBuf),
    #[error("document already open: {}", .0.display())]
    DocumentAlreadyOpen(PathBuf),
    #[error("invalid document path: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{method} failed: {message} (code {code})")]
    Request {
        method: String,
        code: i64,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
}

impl LanguageClientError {
    /// True for failures that mean the client never got a working connection
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            LanguageClientError::Connection(_) | LanguageClientError::Handshake(_)
        )
    }
}

/// Summary of a request's result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOutcome {
    /// Number of entries in the result (hover: 0 or 1)
    pub items: usize,
}

impl RequestOutcome {
    pub fn items(items: usize) -> Self {
        Self { items }
    }
}

/// Connection to a language server.
///
/// Handles are cheap to clone and share one underlying connection. Every
/// document operation must be bracketed by `open_document`/`close_document`.
#[async_trait]
pub trait LanguageClient: Clone + Send + Sync + 'static {
    /// Current lifecycle state
    fn state(&self) -> ClientState;

    /// Connect and perform the initialize/initialized handshake.
    ///
    /// May be called once per client; later calls fail with `AlreadyInitialized`.
    async fn init(&self, root: &Path) -> Result<(), LanguageClientError>;

    async fn open_document(&self, path: &Path) -> Result<(), LanguageClientError>;

    /// Replace the whole content of an open document
    async fn change_document(&self, path: &Path, content: &str) -> Result<(), LanguageClientError>;

    async fn close_document(&self, path: &Path) -> Result<(), LanguageClientError>;

    async fn hover(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError>;

    async fn completion(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError>;

    async fn references(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError>;

    async fn workspace_symbol(&self, query: &str) -> Result<RequestOutcome, LanguageClientError>;

    /// Send shutdown + exit and close the transport.
    ///
    /// Idempotent and infallible; safe before or after a failed `init`.
    async fn exit(&self);
}

/// Creates one language client per simulated user
pub trait ClientFactory: Send + Sync + 'static {
    type Client: LanguageClient;

    fn create(&self, name: &ClientName) -> Self::Client;
}
