//! Error type for the SDK
//!
//! A single error struct with a kind tag. Only construction fails
//! synchronously (kind Configuration); every other fault is delivered
//! asynchronously through the configured error callback and the offending
//! call becomes a no-op.

use std::sync::Arc;

use thiserror::Error;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, TellError>;

/// Callback invoked with asynchronous errors.
///
/// May be called from the worker thread or any retry thread, so it must be
/// safe for concurrent invocation.
pub type ErrorCallback = Arc<dyn Fn(&TellError) + Send + Sync>;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid config at construction
    Configuration,
    /// Bad input (dropped, reported via callback)
    Validation,
    /// Transport failure (retried)
    Network,
    /// Encoding failure (dropped)
    Serialization,
    /// Reserved; not raised by the current design
    Closed,
    /// System I/O error outside the transport
    Io,
}

/// Error carried to callers and the error callback
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TellError {
    kind: ErrorKind,
    message: String,
    field: String,
    reason: String,
}

impl TellError {
    /// The error kind tag
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Full human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Offending field name (validation errors only, empty otherwise)
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Failure reason (validation errors only, empty otherwise)
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Configuration,
            message: format!("configuration error: {}", msg.into()),
            field: String::new(),
            reason: String::new(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let field = field.into();
        let reason = reason.into();
        Self {
            kind: ErrorKind::Validation,
            message: format!("validation error: {field} {reason}"),
            field,
            reason,
        }
    }

    pub(crate) fn network(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            message: format!("network error: {}", msg.into()),
            field: String::new(),
            reason: String::new(),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn serialization(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            message: format!("serialization error: {}", msg.into()),
            field: String::new(),
            reason: String::new(),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn closed() -> Self {
        Self {
            kind: ErrorKind::Closed,
            message: "client is closed".to_string(),
            field: String::new(),
            reason: String::new(),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn io(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            message: format!("io error: {}", msg.into()),
            field: String::new(),
            reason: String::new(),
        }
    }
}
