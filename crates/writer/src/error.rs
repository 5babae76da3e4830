//! Writer error types

use thiserror::Error;

/// Writer-specific errors
#[derive(Debug, Error)]
pub enum WriterError {
    /// Writer creation error
    #[error("failed to create writer '{name}': {message}")]
    Creation { name: String, message: String },

    /// Backend error (from contract)
    #[error("writer error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WriterError {
    /// Create a writer creation error
    pub fn creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Creation {
            name: name.into(),
            message: message.into(),
        }
    }
}
