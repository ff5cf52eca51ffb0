// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process language server stub for tests
#![cfg_attr(coverage_nightly, coverage(off))]

use super::wire::{self, Message, Response};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Traffic observed by a [`StubServer`]
#[derive(Debug, Clone, Default)]
pub struct StubStats {
    pub connections: usize,
    /// Request counts keyed by method
    pub requests: HashMap<String, usize>,
    /// Notification counts keyed by method
    pub notifications: HashMap<String, usize>,
    /// Connections closed by an `exit` notification
    pub exits: usize,
}

impl StubStats {
    pub fn requests(&self, method: &str) -> usize {
        self.requests.get(method).copied().unwrap_or(0)
    }

    pub fn notifications(&self, method: &str) -> usize {
        self.notifications.get(method).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.requests.values().sum()
    }
}

#[derive(Default)]
struct Shared {
    stats: Mutex<StubStats>,
    silent: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
}

/// Minimal language server answering every request with a canned result.
///
/// `initialize` returns empty capabilities, `hover` one entry, `completion`
/// two items, `references` one location and `workspace/symbol` one symbol.
pub struct StubServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl StubServer {
    /// Bind to an ephemeral localhost port and start accepting connections
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shared = Arc::new(Shared::default());
        let task = tokio::spawn(accept_loop(listener, Arc::clone(&shared)));
        Ok(Self { addr, shared, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Snapshot of the traffic seen so far
    pub fn stats(&self) -> StubStats {
        self.shared.stats.lock().clone()
    }

    /// Never answer requests of this method
    pub fn silence(&self, method: &str) {
        self.shared.silent.lock().insert(method.to_string());
    }

    /// Answer requests of this method with an error response
    pub fn fail(&self, method: &str) {
        self.shared.failing.lock().insert(method.to_string());
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    let mut connections = tokio::task::JoinSet::new();
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            break;
        };
        shared.stats.lock().connections += 1;
        connections.spawn(serve(stream, Arc::clone(&shared)));
    }
}

async fn serve(stream: TcpStream, shared: Arc<Shared>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    while let Ok(message) = wire::read_message(&mut reader).await {
        match message {
            Message::Request(request) => {
                *shared
                    .stats
                    .lock()
                    .requests
                    .entry(request.method.clone())
                    .or_default() += 1;
                if shared.silent.lock().contains(&request.method) {
                    continue;
                }
                let response = if shared.failing.lock().contains(&request.method) {
                    Response::err(request.id, -32603, "stub failure")
                } else {
                    Response::ok(request.id, canned_result(&request.method))
                };
                let Ok(framed) = wire::encode_message(&response) else {
                    break;
                };
                if write_half.write_all(&framed).await.is_err() {
                    break;
                }
            }
            Message::Notification(notification) => {
                let mut stats = shared.stats.lock();
                *stats
                    .notifications
                    .entry(notification.method.clone())
                    .or_default() += 1;
                if notification.method == "exit" {
                    stats.exits += 1;
                    break;
                }
            }
            Message::Response(_) => {}
        }
    }
}

fn canned_result(method: &str) -> Value {
    match method {
        "initialize" => json!({ "capabilities": {} }),
        "textDocument/hover" => json!({ "contents": "stub" }),
        "textDocument/completion" => json!({
            "isIncomplete": false,
            "items": [{ "label": "log" }, { "label": "greet" }],
        }),
        "textDocument/references" => json!([{
            "uri": "file:///stub/Completion.kt",
            "range": {
                "start": { "line": 0, "character": 0 },
                "end": { "line": 0, "character": 3 },
            },
        }]),
        "workspace/symbol" => json!([{
            "name": "log",
            "kind": 12,
            "location": {
                "uri": "file:///stub/Completion.kt",
                "range": {
                    "start": { "line": 0, "character": 4 },
                    "end": { "line": 0, "character": 7 },
                },
            },
        }]),
        _ => Value::Null,
    }
}
