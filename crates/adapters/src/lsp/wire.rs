// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC messages and `Content-Length` framing

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest message body accepted from a peer
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Longest header line accepted, terminator included
const MAX_HEADER_LINE: usize = 8 * 1024;

/// Errors from reading or writing framed messages
#[derive(Debug, Error)]
pub enum WireError {
    #[error("connection closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("invalid message body: {0}")]
    Json(#[from] serde_json::Error),
}

/// A JSON-RPC message in either direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// `null` params are omitted from the wire
fn params_field(params: Value) -> Option<Value> {
    (!params.is_null()).then_some(params)
}

impl Request {
    pub fn new(id: i64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            method: method.to_string(),
            params: params_field(params),
        }
    }
}

impl Notification {
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params: params_field(params),
        }
    }
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, code: i64, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: None,
            error: Some(ResponseError {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    /// Numeric request id this response answers, if any
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.as_ref().and_then(Value::as_i64)
    }
}

/// Serialize a message with its `Content-Length` header
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>, WireError> {
    let json = serde_json::to_string(message)?;
    let mut framed = format!("Content-Length: {}\r\n\r\n", json.len()).into_bytes();
    framed.extend_from_slice(json.as_bytes());
    Ok(framed)
}

/// Read one framed message.
///
/// Returns `WireError::Closed` on a clean EOF before any header byte.
/// Bodies above [`MAX_CONTENT_LENGTH`] are rejected before allocating.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, WireError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;

    loop {
        let mut line = String::new();
        let read = (&mut *reader)
            .take(MAX_HEADER_LINE as u64)
            .read_line(&mut line)
            .await?;
        if read == 0 {
            return Err(if saw_header {
                WireError::InvalidHeader("unexpected end of headers".to_string())
            } else {
                WireError::Closed
            });
        }
        saw_header = true;
        if !line.ends_with('\n') && read == MAX_HEADER_LINE {
            return Err(WireError::InvalidHeader(format!(
                "header line longer than {MAX_HEADER_LINE} bytes"
            )));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(WireError::InvalidHeader(line.to_string()));
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            let len = value
                .trim()
                .parse::<usize>()
                .map_err(|_| WireError::InvalidHeader(line.to_string()))?;
            if len > MAX_CONTENT_LENGTH {
                return Err(WireError::InvalidHeader(format!(
                    "Content-Length {len} exceeds {MAX_CONTENT_LENGTH}"
                )));
            }
            content_length = Some(len);
        }
    }

    let len = content_length.ok_or(WireError::MissingContentLength)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
