// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Language client speaking JSON-RPC over a TCP socket

use super::wire::{self, Message, WireError};
use super::{ClientFactory, DocumentTracker, LanguageClient, LanguageClientError, RequestOutcome};
use async_trait::async_trait;
use lsp_types::notification::{
    DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, Exit, Initialized,
    Notification,
};
use lsp_types::request::{
    Completion, HoverRequest, Initialize, References, Request, Shutdown, WorkspaceSymbolRequest,
};
use lsp_types::{
    ClientCapabilities, CompletionClientCapabilities, CompletionContext,
    CompletionItemCapability, CompletionParams, CompletionTriggerKind,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    HoverParams, InitializeParams, InitializedParams, PartialResultParams, ReferenceContext,
    ReferenceParams, TextDocumentClientCapabilities, TextDocumentContentChangeEvent,
    TextDocumentIdentifier, TextDocumentItem, TextDocumentPositionParams, Url,
    VersionedTextDocumentIdentifier, WorkDoneProgressParams, WorkspaceClientCapabilities,
    WorkspaceFolder, WorkspaceSymbolParams,
};
use lspload_core::{ClientName, ClientState, Position};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Reply = Result<Value, LanguageClientError>;
type PendingMap = HashMap<i64, (&'static str, oneshot::Sender<Reply>)>;

/// Responses shared between request callers and the listening task
#[derive(Default)]
struct Pending {
    waiters: Mutex<PendingMap>,
    connection_lost: AtomicBool,
}

impl Pending {
    fn fail_all(&self, reason: &str) {
        self.connection_lost.store(true, Ordering::SeqCst);
        let waiters: Vec<_> = self.waiters.lock().drain().collect();
        for (_, (method, tx)) in waiters {
            let _ = tx.send(Err(LanguageClientError::Transport(format!(
                "{} while awaiting {}",
                reason, method
            ))));
        }
    }
}

/// Removes a pending entry when the awaiting request is dropped
struct PendingSlot<'a> {
    pending: &'a Pending,
    id: i64,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.waiters.lock().remove(&self.id);
    }
}

struct Inner {
    name: ClientName,
    addr: String,
    shutdown_grace: Duration,
    state: Mutex<ClientState>,
    init_attempted: AtomicBool,
    next_id: AtomicI64,
    /// Frames queued for the writer task
    outbox: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<Pending>,
    listener: Mutex<Option<JoinHandle<()>>>,
    documents: Mutex<DocumentTracker>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
        if let Some(handle) = self.writer.get_mut().take() {
            handle.abort();
        }
    }
}

/// Language client connected to a server over TCP
#[derive(Clone)]
pub struct TcpLanguageClient {
    inner: Arc<Inner>,
}

impl TcpLanguageClient {
    pub fn new(name: ClientName, addr: impl Into<String>, shutdown_grace: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                addr: addr.into(),
                shutdown_grace,
                state: Mutex::new(ClientState::Disconnected),
                init_attempted: AtomicBool::new(false),
                next_id: AtomicI64::new(1),
                outbox: Mutex::new(None),
                writer: Mutex::new(None),
                pending: Arc::new(Pending::default()),
                listener: Mutex::new(None),
                documents: Mutex::new(DocumentTracker::new()),
            }),
        }
    }

    pub fn name(&self) -> &ClientName {
        &self.inner.name
    }

    /// Queue one whole frame for the writer task.
    ///
    /// Enqueueing never suspends, so a caller dropped mid-request cannot
    /// leave a partial frame on the socket.
    fn write(&self, message: &impl serde::Serialize) -> Result<(), LanguageClientError> {
        let framed =
            wire::encode_message(message).map_err(|e| LanguageClientError::Transport(e.to_string()))?;
        let outbox = self.inner.outbox.lock();
        let Some(tx) = outbox.as_ref() else {
            return Err(LanguageClientError::Transport("not connected".to_string()));
        };
        tx.send(framed)
            .map_err(|_| LanguageClientError::Transport("connection closed".to_string()))
    }

    async fn call<R: Request>(&self, params: R::Params) -> Reply {
        let params =
            serde_json::to_value(params).map_err(|e| LanguageClientError::Transport(e.to_string()))?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let pending: &Pending = &self.inner.pending;

        let (tx, rx) = oneshot::channel();
        pending.waiters.lock().insert(id, (R::METHOD, tx));
        let _slot = PendingSlot { pending, id };
        if pending.connection_lost.load(Ordering::SeqCst) {
            return Err(LanguageClientError::Transport(
                "connection closed".to_string(),
            ));
        }

        self.write(&wire::Request::new(id, R::METHOD, params))?;

        match rx.await {
            Ok(reply) => reply,
            Err(_) => Err(LanguageClientError::Transport(format!(
                "connection closed while awaiting {}",
                R::METHOD
            ))),
        }
    }

    async fn notify<N: Notification>(&self, params: N::Params) -> Result<(), LanguageClientError> {
        let params =
            serde_json::to_value(params).map_err(|e| LanguageClientError::Transport(e.to_string()))?;
        self.write(&wire::Notification::new(N::METHOD, params))
    }

    fn ensure_initialized(&self) -> Result<(), LanguageClientError> {
        match *self.inner.state.lock() {
            ClientState::Initialized => Ok(()),
            other => Err(LanguageClientError::NotInitialized(other)),
        }
    }

    async fn request<R: Request>(&self, params: R::Params) -> Result<RequestOutcome, LanguageClientError> {
        self.ensure_initialized()?;
        let result = self.call::<R>(params).await?;
        Ok(RequestOutcome::items(count_items(&result)))
    }

    async fn handshake(&self, root: &Path) -> Result<(), LanguageClientError> {
        let root_uri = Url::from_directory_path(root)
            .map_err(|_| LanguageClientError::InvalidPath(root.to_path_buf()))?;
        let project = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_string());

        let stream = TcpStream::connect(&self.inner.addr)
            .await
            .map_err(|e| LanguageClientError::Connection(format!("{}: {}", self.inner.addr, e)))?;
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.outbox.lock() = Some(tx);
        *self.inner.writer.lock() = Some(tokio::spawn(send_frames(
            write_half,
            rx,
            Arc::clone(&self.inner.pending),
            self.inner.name.clone(),
        )));
        let handle = tokio::spawn(listen(
            BufReader::new(read_half),
            Arc::clone(&self.inner.pending),
            self.inner.name.clone(),
        ));
        *self.inner.listener.lock() = Some(handle);

        self.call::<Initialize>(initialize_params(root_uri, project))
            .await
            .map_err(|e| LanguageClientError::Handshake(e.to_string()))?;
        self.notify::<Initialized>(InitializedParams {})
            .await
            .map_err(|e| LanguageClientError::Handshake(e.to_string()))
    }
}

#[async_trait]
impl LanguageClient for TcpLanguageClient {
    fn state(&self) -> ClientState {
        *self.inner.state.lock()
    }

    async fn init(&self, root: &Path) -> Result<(), LanguageClientError> {
        if self.inner.init_attempted.swap(true, Ordering::SeqCst) {
            return Err(LanguageClientError::AlreadyInitialized);
        }
        {
            let mut state = self.inner.state.lock();
            if *state != ClientState::Disconnected {
                return Err(LanguageClientError::AlreadyInitialized);
            }
            *state = ClientState::Connecting;
        }

        let result = self.handshake(root).await;

        // exit() may have run while connecting; never resurrect a closed client
        let mut state = self.inner.state.lock();
        if *state == ClientState::Connecting {
            *state = match result {
                Ok(()) => ClientState::Initialized,
                Err(_) => ClientState::Disconnected,
            };
        }
        result
    }

    async fn open_document(&self, path: &Path) -> Result<(), LanguageClientError> {
        self.ensure_initialized()?;
        let uri = file_url(path)?;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LanguageClientError::ReadDocument {
                path: path.to_path_buf(),
                source,
            })?;
        let version = self.inner.documents.lock().open(path)?;

        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem::new(uri, language_id(path).to_string(), version, text),
        };
        let result = self.notify::<DidOpenTextDocument>(params).await;
        if result.is_err() {
            let _ = self.inner.documents.lock().close(path);
        }
        result
    }

    async fn change_document(&self, path: &Path, content: &str) -> Result<(), LanguageClientError> {
        self.ensure_initialized()?;
        let uri = file_url(path)?;
        let version = self.inner.documents.lock().change(path)?;

        let params = DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier::new(uri, version),
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: content.to_string(),
            }],
        };
        self.notify::<DidChangeTextDocument>(params).await
    }

    async fn close_document(&self, path: &Path) -> Result<(), LanguageClientError> {
        let uri = file_url(path)?;
        self.inner.documents.lock().close(path)?;
        self.ensure_initialized()?;

        let params = DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier::new(uri),
        };
        self.notify::<DidCloseTextDocument>(params).await
    }

    async fn hover(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        let params = HoverParams {
            text_document_position_params: position_params(path, position)?,
            work_done_progress_params: WorkDoneProgressParams::default(),
        };
        self.request::<HoverRequest>(params).await
    }

    async fn completion(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        let params = CompletionParams {
            text_document_position: position_params(path, position)?,
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: Some(CompletionContext {
                trigger_kind: CompletionTriggerKind::INVOKED,
                trigger_character: None,
            }),
        };
        self.request::<Completion>(params).await
    }

    async fn references(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        let params = ReferenceParams {
            text_document_position: position_params(path, position)?,
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: ReferenceContext {
                include_declaration: true,
            },
        };
        self.request::<References>(params).await
    }

    async fn workspace_symbol(&self, query: &str) -> Result<RequestOutcome, LanguageClientError> {
        let params = WorkspaceSymbolParams {
            partial_result_params: PartialResultParams::default(),
            work_done_progress_params: WorkDoneProgressParams::default(),
            query: query.to_string(),
        };
        self.request::<WorkspaceSymbolRequest>(params).await
    }

    async fn exit(&self) {
        let previous = {
            let mut state = self.inner.state.lock();
            match *state {
                ClientState::ShuttingDown | ClientState::Closed => return,
                previous => {
                    *state = ClientState::ShuttingDown;
                    previous
                }
            }
        };

        if previous == ClientState::Initialized {
            match tokio::time::timeout(self.inner.shutdown_grace, self.call::<Shutdown>(())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::debug!(client = %self.inner.name, error = %e, "shutdown request failed")
                }
                Err(_) => tracing::debug!(
                    client = %self.inner.name,
                    grace_ms = self.inner.shutdown_grace.as_millis() as u64,
                    "shutdown request timed out"
                ),
            }
            if let Err(e) = self.notify::<Exit>(()).await {
                tracing::debug!(client = %self.inner.name, error = %e, "exit notification failed");
            }
        }

        if let Some(handle) = self.inner.listener.lock().take() {
            handle.abort();
        }
        // Closing the outbox lets the writer flush queued frames and shut down
        drop(self.inner.outbox.lock().take());
        let writer = self.inner.writer.lock().take();
        if let Some(mut writer) = writer {
            if tokio::time::timeout(self.inner.shutdown_grace, &mut writer)
                .await
                .is_err()
            {
                tracing::debug!(client = %self.inner.name, "writer did not drain in time");
                writer.abort();
            }
        }
        self.inner.pending.fail_all("client exited");
        *self.inner.state.lock() = ClientState::Closed;
    }
}

/// Background task writing queued frames in order
async fn send_frames(
    mut stream: OwnedWriteHalf,
    mut outbox: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Arc<Pending>,
    name: ClientName,
) {
    while let Some(frame) = outbox.recv().await {
        let written = match stream.write_all(&frame).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::warn!(client = %name, error = %e, "failed to write to server");
            pending.fail_all("write failed");
            return;
        }
    }
    let _ = stream.shutdown().await;
}

/// Background task routing responses to their waiting callers
async fn listen(mut reader: BufReader<OwnedReadHalf>, pending: Arc<Pending>, name: ClientName) {
    loop {
        match wire::read_message(&mut reader).await {
            Ok(Message::Response(response)) => {
                let Some(id) = response.numeric_id() else {
                    tracing::debug!(client = %name, "response without numeric id");
                    continue;
                };
                let Some((method, tx)) = pending.waiters.lock().remove(&id) else {
                    continue;
                };
                let reply = match response.error {
                    Some(error) => Err(LanguageClientError::Request {
                        method: method.to_string(),
                        code: error.code,
                        message: error.message,
                    }),
                    None => Ok(response.result.unwrap_or(Value::Null)),
                };
                let _ = tx.send(reply);
            }
            Ok(Message::Notification(notification)) => {
                tracing::trace!(client = %name, method = %notification.method, "server notification");
            }
            Ok(Message::Request(request)) => {
                tracing::debug!(client = %name, method = %request.method, "ignoring server request");
            }
            Err(WireError::Closed) => {
                tracing::debug!(client = %name, "server closed connection");
                break;
            }
            Err(e) => {
                tracing::warn!(client = %name, error = %e, "failed to read server message");
                break;
            }
        }
    }
    pending.fail_all("connection closed");
}

fn initialize_params(root_uri: Url, project: String) -> InitializeParams {
    let capabilities = ClientCapabilities {
        text_document: Some(TextDocumentClientCapabilities {
            completion: Some(CompletionClientCapabilities {
                completion_item: Some(CompletionItemCapability {
                    snippet_support: Some(true),
                    ..Default::default()
                }),
                context_support: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }),
        workspace: Some(WorkspaceClientCapabilities {
            workspace_folders: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };

    InitializeParams {
        process_id: Some(std::process::id()),
        root_uri: Some(root_uri.clone()),
        capabilities,
        workspace_folders: Some(vec![WorkspaceFolder {
            uri: root_uri,
            name: project,
        }]),
        ..Default::default()
    }
}

fn file_url(path: &Path) -> Result<Url, LanguageClientError> {
    Url::from_file_path(path).map_err(|_| LanguageClientError::InvalidPath(path.to_path_buf()))
}

fn position_params(
    path: &Path,
    position: Position,
) -> Result<TextDocumentPositionParams, LanguageClientError> {
    Ok(TextDocumentPositionParams::new(
        TextDocumentIdentifier::new(file_url(path)?),
        lsp_types::Position::new(position.line, position.character),
    ))
}

fn language_id(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("kt") | Some("kts") => "kotlin",
        _ => "plaintext",
    }
}

/// Number of entries in a request result
pub(crate) fn count_items(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        Value::Object(fields) => fields
            .get("items")
            .and_then(Value::as_array)
            .map_or(1, Vec::len),
        _ => 1,
    }
}

/// Creates TCP clients that all connect to one server address
#[derive(Debug, Clone)]
pub struct TcpClientFactory {
    addr: String,
    shutdown_grace: Duration,
}

impl TcpClientFactory {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            shutdown_grace: crate::env::shutdown_grace(),
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl ClientFactory for TcpClientFactory {
    type Client = TcpLanguageClient;

    fn create(&self, name: &ClientName) -> TcpLanguageClient {
        TcpLanguageClient::new(name.clone(), self.addr.clone(), self.shutdown_grace)
    }
}

#[cfg(test)]
#[path = "tcp_tests.rs"]
mod tests;
