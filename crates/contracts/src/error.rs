//! Layered error definitions
//!
//! Categorized by source: config / input / backend / aggregate

use std::sync::Arc;

use thiserror::Error;

/// Shared failure cause.
///
/// A single transport error is attached to every record of the batch it
/// failed, so causes are reference counted rather than owned.
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Input Errors =====
    /// A record failed validation before submission
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    // ===== Backend Errors =====
    /// The whole bulk call failed (network, serialization, bad status)
    #[error("writer '{writer}' transport error: {message}")]
    Transport {
        writer: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend rejected a single record
    #[error("writer '{writer}' rejected record: {message}")]
    WriterFailure { writer: String, message: String },

    /// The backend returned no outcome for a submitted record
    #[error("writer '{writer}' returned no outcome for record at position {position}")]
    MissingResponse { writer: String, position: usize },

    // ===== Aggregate Errors =====
    /// A batch update did not fully succeed
    #[error("{message}")]
    BatchUpdate {
        message: String,
        #[source]
        source: ErrorCause,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create transport error without an underlying source
    pub fn transport(writer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            writer: writer.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create transport error wrapping the error that caused it
    pub fn transport_from<E>(writer: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            writer: writer.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create per-record writer failure
    pub fn writer_failure(writer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriterFailure {
            writer: writer.into(),
            message: message.into(),
        }
    }

    /// Convert into a shareable failure cause
    pub fn into_cause(self) -> ErrorCause {
        Arc::new(self)
    }
}

/// Message of the innermost error in a source chain.
pub fn root_cause_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut current = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
