//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration is well formed but unusable for the selected writer
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Input could not be opened or read
    #[error("Failed to read input {input}: {message}")]
    Input { input: String, message: String },

    /// Writer could not be created
    #[error("Failed to create writer '{writer}': {message}")]
    WriterSetup { writer: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn input(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input {
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn writer_setup(writer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriterSetup {
            writer: writer.into(),
            message: message.into(),
        }
    }
}
