//! Transport error types

use thiserror::Error;

/// Transport error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Auth, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Server, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidRequest, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::MalformedFrame, message)
    }

    /// Whether the run is over after this error
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        match status {
            401 | 403 => Self::auth(format!("Authentication failed: {body}")),
            408 | 504 => Self::timeout(format!("Request timed out: {body}")),
            400..=499 => Self::invalid_request(format!("Request rejected ({status}): {body}")),
            500..=599 => Self::server_error(format!("Server error ({status}): {body}")),
            _ => Self::network(format!("Unexpected status {status}: {body}")),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(e.to_string())
        } else {
            Self::network(e.to_string())
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused or dropped mid-stream
    Network,
    Timeout,
    /// Bearer token rejected (401, 403)
    Auth,
    /// Server error (5xx)
    Server,
    /// Bad request (4xx)
    InvalidRequest,
    /// One event could not be decoded; the stream goes on
    MalformedFrame,
}

impl TransportErrorKind {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::MalformedFrame)
    }
}
