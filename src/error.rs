//! Custom error types for extbackup
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for extbackup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration-related errors (missing file, missing required fields)
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// YAML parse errors in the configuration file
    #[error("YAML error: {0}")]
    Yaml(String),

    /// Validation errors for configuration values
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external program could not be started
    #[error("Failed to launch '{program}': {reason}")]
    Launch { program: String, reason: String },

    /// An external program outlived its deadline and was killed
    #[error("'{program}' timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },

    /// An external program was stopped because the run was cancelled
    #[error("'{0}' was stopped because the backup was cancelled")]
    Cancelled(String),

    /// Signal handler installation errors
    #[error("Signal error: {0}")]
    Signal(String),
}

impl BackupError {
    /// Create a launch error for the given program
    pub fn launch(program: impl Into<String>, reason: impl ToString) -> Self {
        Self::Launch {
            program: program.into(),
            reason: reason.to_string(),
        }
    }

}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for BackupError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Result type alias for extbackup operations
pub type BackupResult<T> = Result<T, BackupError>;
