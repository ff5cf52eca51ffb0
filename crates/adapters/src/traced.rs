// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced client wrappers for consistent observability

use crate::lsp::{ClientFactory, LanguageClient, LanguageClientError, RequestOutcome};
use async_trait::async_trait;
use lspload_core::{ClientName, ClientState, Position};
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing to any LanguageClient
#[derive(Clone)]
pub struct TracedClient<C> {
    inner: C,
    name: ClientName,
}

impl<C> TracedClient<C> {
    pub fn new(name: ClientName, inner: C) -> Self {
        Self { inner, name }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: LanguageClient> TracedClient<C> {
    async fn traced_request<F>(
        &self,
        span: tracing::Span,
        request: F,
    ) -> Result<RequestOutcome, LanguageClientError>
    where
        F: std::future::Future<Output = Result<RequestOutcome, LanguageClientError>> + Send,
    {
        async {
            let start = std::time::Instant::now();
            let result = request.await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(outcome) => tracing::debug!(items = outcome.items, elapsed_ms, "completed"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<C: LanguageClient> LanguageClient for TracedClient<C> {
    fn state(&self) -> ClientState {
        self.inner.state()
    }

    async fn init(&self, root: &Path) -> Result<(), LanguageClientError> {
        async {
            tracing::info!("connecting");
            let start = std::time::Instant::now();
            let result = self.inner.init(root).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "client initialized"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "init failed"),
            }
            result
        }
        .instrument(tracing::info_span!("client.init", client = %self.name, root = %root.display()))
        .await
    }

    async fn open_document(&self, path: &Path) -> Result<(), LanguageClientError> {
        let result = self.inner.open_document(path).await;
        tracing::info_span!("client.open", client = %self.name, path = %path.display())
            .in_scope(|| match &result {
                Ok(()) => tracing::trace!("opened"),
                Err(e) => tracing::warn!(error = %e, "open failed"),
            });
        result
    }

    async fn change_document(&self, path: &Path, content: &str) -> Result<(), LanguageClientError> {
        let result = self.inner.change_document(path, content).await;
        if let Err(ref e) = result {
            tracing::warn!(client = %self.name, path = %path.display(), error = %e, "change failed");
        }
        result
    }

    async fn close_document(&self, path: &Path) -> Result<(), LanguageClientError> {
        let result = self.inner.close_document(path).await;
        if let Err(ref e) = result {
            tracing::warn!(client = %self.name, path = %path.display(), error = %e, "close failed");
        }
        result
    }

    async fn hover(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        let span = tracing::debug_span!("client.hover", client = %self.name, %position);
        self.traced_request(span, self.inner.hover(path, position))
            .await
    }

    async fn completion(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        let span = tracing::debug_span!("client.completion", client = %self.name, %position);
        self.traced_request(span, self.inner.completion(path, position))
            .await
    }

    async fn references(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<RequestOutcome, LanguageClientError> {
        let span = tracing::debug_span!("client.references", client = %self.name, %position);
        self.traced_request(span, self.inner.references(path, position))
            .await
    }

    async fn workspace_symbol(&self, query: &str) -> Result<RequestOutcome, LanguageClientError> {
        let span = tracing::debug_span!("client.workspace_symbol", client = %self.name, query);
        self.traced_request(span, self.inner.workspace_symbol(query))
            .await
    }

    async fn exit(&self) {
        let start = std::time::Instant::now();
        self.inner.exit().await;
        tracing::info_span!("client.exit", client = %self.name).in_scope(|| {
            tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "client closed"
            )
        });
    }
}

/// Factory wrapper producing traced clients
#[derive(Clone)]
pub struct TracedFactory<F> {
    inner: F,
}

impl<F> TracedFactory<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: ClientFactory> ClientFactory for TracedFactory<F> {
    type Client = TracedClient<F::Client>;

    fn create(&self, name: &ClientName) -> Self::Client {
        tracing::debug!(client = %name, "creating client");
        TracedClient::new(name.clone(), self.inner.create(name))
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
