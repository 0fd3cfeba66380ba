//! Error types for the sheetfeed client.

use thiserror::Error;

use crate::session::SessionState;

/// Errors that can occur while talking to the feed service.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error(transparent)]
    Core(#[from] sheetfeed_core::Error),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{operation} requires {required:?}, session is {actual:?}")]
    InvalidState {
        operation: &'static str,
        required: SessionState,
        actual: SessionState,
    },

    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("Worksheet not found: {0}")]
    WorksheetNotFound(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Gave up after {attempts} attempts, last status {status}: {body}")]
    TransientFailureExhausted {
        attempts: u32,
        status: u16,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{} batch entries failed", .0.len())]
    BatchFailed(Vec<BatchFailure>),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Cancelled")]
    Cancelled,
}

/// A failure below HTTP: DNS, TLS, connection reset, timeout.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// One rejected entry of a batch request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{id}: {code} {reason}")]
pub struct BatchFailure {
    pub id: String,
    pub code: u16,
    pub reason: String,
}

pub type Result<T> = std::result::Result<T, SheetsError>;
