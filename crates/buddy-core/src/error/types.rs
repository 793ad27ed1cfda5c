//! Core error types and traits

use crate::session::Status;
use thiserror::Error;

/// Result type alias for Coder Buddy operations
pub type BuddyResult<T> = Result<T, BuddyError>;

/// Unified error trait implemented by [`BuddyError`].
///
/// Gives HTTP handlers and the CLI a stable code, a readable message and the
/// originating stage without matching on every variant.
pub trait UnifiedError: std::error::Error + Send + Sync {
    /// Get the error code for programmatic handling
    fn error_code(&self) -> &str;

    /// Get the human-readable error message
    fn message(&self) -> &str;

    /// Name of the stage or step the error originated in, if any
    fn stage(&self) -> Option<&str> {
        None
    }

    /// Check if a caller may reasonably retry the whole request
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Main error type for Coder Buddy
#[derive(Error, Debug, Clone)]
pub enum BuddyError {
    /// Unknown session or step id
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// State machine violation
    #[error("Invalid transition for {target}: {from} -> {to}")]
    InvalidTransition {
        target: String,
        from: Status,
        to: Status,
    },

    /// Model collaborator failed or timed out
    #[error("Model unavailable during {stage}: {message}")]
    ModelUnavailable {
        stage: String,
        message: String,
        timed_out: bool,
    },

    /// Filesystem or persistence failure
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
        stage: Option<String>,
    },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Invalid caller input
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// A collaborator returned output that could not be interpreted
    #[error("Malformed output from {stage}: {message}")]
    MalformedOutput { stage: String, message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },
}
