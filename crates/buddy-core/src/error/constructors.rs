//! Constructor methods for BuddyError

use super::types::BuddyError;
use crate::session::Status;
use std::time::Duration;

impl BuddyError {
    /// Create a not-found error for a resource kind and id
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(target: impl Into<String>, from: Status, to: Status) -> Self {
        Self::InvalidTransition {
            target: target.into(),
            from,
            to,
        }
    }

    /// Create a model failure attributed to a stage
    pub fn model_unavailable(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            stage: stage.into(),
            message: message.into(),
            timed_out: false,
        }
    }

    /// Create a model timeout attributed to a stage
    pub fn model_timeout(stage: impl Into<String>, after: Duration) -> Self {
        Self::ModelUnavailable {
            stage: stage.into(),
            message: format!("model call timed out after {:?}", after),
            timed_out: true,
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
            stage: None,
        }
    }

    /// Create an IO error for a specific path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
            stage: None,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error for a named field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a malformed-output error for a stage
    pub fn malformed(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a new JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }

    /// Attribute this error to a stage, keeping an existing attribution
    ///
    /// Invalid input raised while a stage runs came from a collaborator's
    /// output, so it becomes `MalformedOutput` for that stage.
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        match self {
            Self::InvalidInput { message, .. } => Self::MalformedOutput {
                stage: stage.into(),
                message,
            },
            Self::Io {
                message,
                path,
                stage: None,
            } => Self::Io {
                message,
                path,
                stage: Some(stage.into()),
            },
            Self::ModelUnavailable {
                message, timed_out, ..
            } => Self::ModelUnavailable {
                stage: stage.into(),
                message,
                timed_out,
            },
            other => other,
        }
    }
}
