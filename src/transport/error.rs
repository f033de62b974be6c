//! Error types for the transport layer.

use thiserror::Error;

/// A remote call that did not produce a usable response.
///
/// Every variant carries the request URL so a single process-wide error handler
/// can tell failures apart without per-call wiring.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The request never produced a response (connection refused, DNS, ...).
    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    /// The response body could not be decoded.
    #[error("Could not parse response from {url}: {reason}")]
    Parse { url: String, reason: String },

    /// The transport gave up waiting.
    #[error("Request to {url} timed out")]
    Timeout { url: String },
}

impl TransportError {
    pub fn url(&self) -> &str {
        match self {
            TransportError::Status { url, .. }
            | TransportError::Network { url, .. }
            | TransportError::Parse { url, .. }
            | TransportError::Timeout { url } => url,
        }
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short textual classification (`"error"`, `"parsererror"`, `"timeout"`).
    pub fn text_status(&self) -> &'static str {
        match self {
            TransportError::Status { .. } | TransportError::Network { .. } => "error",
            TransportError::Parse { .. } => "parsererror",
            TransportError::Timeout { .. } => "timeout",
        }
    }
}
