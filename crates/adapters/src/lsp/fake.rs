// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake language client for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ClientFactory, DocumentTracker, LanguageClient, LanguageClientError, RequestOutcome};
use async_trait::async_trait;
use lspload_core::{ClientName, ClientState, Position};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Recorded client call
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    Init { root: PathBuf },
    Open { path: PathBuf },
    Change { path: PathBuf, content: String },
    Close { path: PathBuf },
    Hover { path: PathBuf, position: Position },
    Completion { path: PathBuf, position: Position },
    References { path: PathBuf, position: Position },
    WorkspaceSymbol { query: String },
    Exit,
}

impl ClientCall {
    /// Request method name, for request calls
    pub fn method(&self) -> Option<&'static str> {
        match self {
            ClientCall::Hover { .. } => Some("hover"),
            ClientCall::Completion { .. } => Some("completion"),
            ClientCall::References { .. } => Some("references"),
            ClientCall::WorkspaceSymbol { .. } => Some("workspace_symbol"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Behavior {
    fail_init: bool,
    failing_requests: HashSet<String>,
    hang_requests: bool,
    request_delay: Duration,
    init_delay: Duration,
    items: usize,
}

struct FakeClientState {
    state: ClientState,
    init_attempted: bool,
    calls: Vec<ClientCall>,
    documents: DocumentTracker,
    behavior: Behavior,
}

/// Fake language client for testing
#[derive(Clone)]
pub struct FakeLanguageClient {
    inner: Arc<Mutex<FakeClientState>>,
}

impl Default for FakeLanguageClient {
    fn default() -> Self {
        Self::with_behavior(Behavior::default())
    }
}

impl FakeLanguageClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClientState {
                state: ClientState::Disconnected,
                init_attempted: false,
                calls: Vec::new(),
                documents: DocumentTracker::new(),
                behavior,
            })),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ClientCall> {
        self.inner.lock().calls.clone()
    }

    /// Request method names in call order
    pub fn request_methods(&self) -> Vec<&'static str> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(ClientCall::method)
            .collect()
    }

    pub fn exit_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ClientCall::Exit))
            .count()
    }

    /// Live handles sharing this client, this one included
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn open_documents(&self) -> usize {
        self.inner.lock().documents.open_count()
    }

    /// Make `init` fail with a connection error
    pub fn set_fail_init(&self, fail: bool) {
        self.inner.lock().behavior.fail_init = fail;
    }

    /// Make requests of one method fail (`hover`, `completion`, ...)
    pub fn fail_requests(&self, method: &str) {
        self.inner
            .lock()
            .behavior
            .failing_requests
            .insert(method.to_string());
    }

    /// Make every request wait forever
    pub fn set_hang_requests(&self, hang: bool) {
        self.inner.lock().behavior.hang_requests = hang;
    }

    pub fn set_request_delay(&self, delay: Duration) {
        self.inner.lock().behavior.request_delay = delay;
    }

    pub fn set_init_delay(&self, delay: Duration) {
        self.inner.lock().behavior.init_delay = delay;
    }

    /// Number of items every successful request reports
    pub fn set_items(&self, items: usize) {
        self.inner.lock().behavior.items = items;
    }

    fn ensure_initialized(inner: &FakeClientState) -> Result<(), LanguageClientError> {
        match inner.state {
            ClientState::Initialized => Ok(()),
            other => Err(LanguageClientError::NotInitialized(other)),
        }
    }

    async fn request(
        &self,
        call: ClientCall,
    ) -> Result<RequestOutcome, LanguageClientError> {
        let method = call.method().unwrap_or("request");
        let behavior = {
            let mut inner = self.inner.lock();
            inner.calls.push(call);
            Self::ensure_initialized(&inner)?;
            inner.behavior.clone()
        };

        if behavior.hang_requests {
            std::future::pending::<()>().await;
        }
        if !behavior.request_delay.is_zero() {
            tokio::time::sleep(behavior.request_delay).await;
        }
        if behavior.failing_requests.contains(method) {
            return Err(LanguageClientError::Request {
                method: method.to_string(),
                code: -32603,
                message: "fake failure".to_string(),
            });
        }
        Ok(RequestOutcome::items(behavior.items))
    }
}

#[async_trait]
impl LanguageClient for FakeLanguageClient {
    fn state(&self) -> ClientState {
        self.inner.lock().state
    }

    async fn init(&self, root: &Path) -> Result<(), LanguageClientError> {
        let behavior = {
            let mut inner = self.inner.lock();
            inner.calls.push(ClientCall::Init {
                root: root.to_path_buf(),
            });
            if inner.init_attempted || inner.state != ClientState::Disconnected {
                return Err(LanguageClientError::AlreadyInitialized);
            }
            inner.init_attempted = true;
            inner.state = ClientState::Connecting;
            inner.behavior.clone()
        };

        if !behavior.init_delay.is_zero() {
            tokio::time::sleep(behavior.init_delay).await;
        }

        let mut inner = self.inner.lock();
        if behavior.fail_init {
            if inner.state == ClientState::Connecting {
                inner.state = ClientState::Disconnected;
            }
            return Err(LanguageClientError::Connection(
                "fake connection refused".to_string(),
            ));
        }
        if inner.state == ClientState::Connecting {
            inner.state = ClientState::Initialized;
        }
        Ok(())
    }

    async fn open_document(&self, path: &Path) -> Result<(), LanguageClientError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClientCall::Open {
            path: path.to_path_buf(),
        });
        Self::ensure_initialized(&inner)?;
        inner.documents.open(path).map(|_| ())
    }

    async fn change_document(&self, path: &Path, content: &str) -> Result<(), LanguageClientError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClientCall::Change {
            path: path.to_path_buf(),
            content: content.to_string(),
        });
        Self::ensure_initialized(&inner)?;
        inner.documents.change(path).map(|_| ())
    }

    async fn close_document(&self, path: &Path) -> Result<(), LanguageClientError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClientCall::Close {
            path: path.to_path_buf(),
        });
        inner.documents.close(path)
    }

    async fn hover(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        self.request(ClientCall::Hover {
            path: path.to_path_buf(),
            position,
        })
        .await
    }

    async fn completion(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        self.request(ClientCall::Completion {
            path: path.to_path_buf(),
            position,
        })
        .await
    }

    async fn references(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        self.request(ClientCall::References {
            path: path.to_path_buf(),
            position,
        })
        .await
    }

    async fn workspace_symbol(&self, query: &str) -> Result<RequestOutcome, LanguageClientError> {
        self.request(ClientCall::WorkspaceSymbol {
            query: query.to_string(),
        })
        .await
    }

    async fn exit(&self) {
        let mut inner = self.inner.lock();
        inner.calls.push(ClientCall::Exit);
        inner.state = ClientState::Closed;
    }
}

struct FakeFactoryState {
    created: Vec<(ClientName, FakeLanguageClient)>,
    failing_init: HashSet<String>,
    behavior: Behavior,
}

/// Factory handing out fake clients and remembering each one it created
#[derive(Clone)]
pub struct FakeClientFactory {
    inner: Arc<Mutex<FakeFactoryState>>,
}

impl Default for FakeClientFactory {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeFactoryState {
                created: Vec::new(),
                failing_init: HashSet::new(),
                behavior: Behavior::default(),
            })),
        }
    }
}

impl FakeClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clients created so far, in creation order
    pub fn clients(&self) -> Vec<(ClientName, FakeLanguageClient)> {
        self.inner.lock().created.clone()
    }

    pub fn client(&self, name: &str) -> Option<FakeLanguageClient> {
        self.inner
            .lock()
            .created
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
    }

    /// The client with this name will fail `init`
    pub fn fail_init_for(&self, name: &str) {
        self.inner.lock().failing_init.insert(name.to_string());
    }

    /// Every client created afterwards hangs on requests
    pub fn hang_requests(&self) {
        self.inner.lock().behavior.hang_requests = true;
    }

    pub fn set_request_delay(&self, delay: Duration) {
        self.inner.lock().behavior.request_delay = delay;
    }

    pub fn set_init_delay(&self, delay: Duration) {
        self.inner.lock().behavior.init_delay = delay;
    }

    pub fn fail_requests(&self, method: &str) {
        self.inner
            .lock()
            .behavior
            .failing_requests
            .insert(method.to_string());
    }
}

impl ClientFactory for FakeClientFactory {
    type Client = FakeLanguageClient;

    fn create(&self, name: &ClientName) -> FakeLanguageClient {
        let mut inner = self.inner.lock();
        let mut behavior = inner.behavior.clone();
        behavior.fail_init = inner.failing_init.contains(name.as_str());
        let client = FakeLanguageClient::with_behavior(behavior);
        inner.created.push((name.clone(), client.clone()));
        client
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
