//! Error types for the remote files client.
//!
//! Every public operation returns `RemoteFsResult<T>`. Nothing is retried or
//! swallowed internally; the error a caller receives carries the original
//! HTTP status and message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Convenience alias.
pub type RemoteFsResult<T> = Result<T, RemoteFsError>;

/// Failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteFsErrorKind {
    /// Server URL, username or secret missing. Raised before any network call.
    NotConfigured,
    /// The server answered with a non-success HTTP status.
    TransportError,
    /// Connection-level failure (DNS, TLS, reset, body stream error).
    NetworkError,
    /// The response body could not be parsed as the expected document.
    ParseError,
    /// A single entry was required but the result set was empty.
    NotFound,
    /// Well-formed payload missing a required field.
    InvalidResponse,
}

impl fmt::Display for RemoteFsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured error returned by every public function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFsError {
    pub kind: RemoteFsErrorKind,
    pub message: String,
    /// HTTP status, set for `TransportError`.
    pub status: Option<u16>,
    /// HTTP reason phrase accompanying `status`.
    pub status_text: Option<String>,
}

impl fmt::Display for RemoteFsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RemoteFsError {}

impl RemoteFsError {
    pub fn new(kind: RemoteFsErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            status: None,
            status_text: None,
        }
    }

    pub fn not_configured() -> Self {
        Self::new(
            RemoteFsErrorKind::NotConfigured,
            "remote files client not configured",
        )
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(RemoteFsErrorKind::NetworkError, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(RemoteFsErrorKind::ParseError, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(RemoteFsErrorKind::NotFound, msg)
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(RemoteFsErrorKind::InvalidResponse, msg)
    }

    /// Build a `TransportError` from an HTTP status line.
    ///
    /// The message is `HTTP <status>: <text>` so UIs can show it verbatim.
    pub fn from_status(status: u16, status_text: impl Into<String>) -> Self {
        let status_text = status_text.into();
        Self {
            kind: RemoteFsErrorKind::TransportError,
            message: format!("HTTP {}: {}", status, status_text),
            status: Some(status),
            status_text: Some(status_text),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RemoteFsErrorKind::NotFound
    }
}

/// Reject anything outside 2xx (207 Multi-Status included in the range).
pub fn ensure_success(status: u16, status_text: &str) -> RemoteFsResult<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(RemoteFsError::from_status(status, status_text))
    }
}

impl From<reqwest::Error> for RemoteFsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Self::parse(format!("Response decode error: {}", err))
        } else {
            Self::network(format!("HTTP error: {}", err))
        }
    }
}

impl From<serde_json::Error> for RemoteFsError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON error: {}", err))
    }
}

impl From<quick_xml::Error> for RemoteFsError {
    fn from(err: quick_xml::Error) -> Self {
        Self::parse(format!("XML parse error: {}", err))
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
