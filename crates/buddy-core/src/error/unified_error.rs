//! UnifiedError trait implementation for BuddyError

use super::types::{BuddyError, UnifiedError};

impl UnifiedError for BuddyError {
    fn error_code(&self) -> &str {
        match self {
            Self::NotFound { .. } => "BUDDY_NOT_FOUND",
            Self::InvalidTransition { .. } => "BUDDY_INVALID_TRANSITION",
            Self::ModelUnavailable { .. } => "BUDDY_MODEL_UNAVAILABLE",
            Self::Io { .. } => "BUDDY_IO",
            Self::Config { .. } => "BUDDY_CONFIG",
            Self::InvalidInput { .. } => "BUDDY_INVALID_INPUT",
            Self::MalformedOutput { .. } => "BUDDY_MALFORMED_OUTPUT",
            Self::Json { .. } => "BUDDY_JSON",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound { .. } => "Resource not found",
            Self::InvalidTransition { .. } => "Invalid status transition",
            Self::ModelUnavailable { message, .. } => message,
            Self::Io { message, .. } => message,
            Self::Config { message, .. } => message,
            Self::InvalidInput { message, .. } => message,
            Self::MalformedOutput { message, .. } => message,
            Self::Json { message } => message,
        }
    }

    fn stage(&self) -> Option<&str> {
        match self {
            Self::ModelUnavailable { stage, .. } => Some(stage),
            Self::MalformedOutput { stage, .. } => Some(stage),
            Self::Io { stage, .. } => stage.as_deref(),
            Self::InvalidTransition { target, .. } => Some(target),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable { .. } | Self::Io { .. } | Self::MalformedOutput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Status;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BuddyError::not_found("session", "abc").error_code(),
            "BUDDY_NOT_FOUND"
        );
        assert_eq!(
            BuddyError::invalid_input("empty").error_code(),
            "BUDDY_INVALID_INPUT"
        );
    }

    #[test]
    fn test_stage_attribution() {
        let err = BuddyError::model_unavailable("model", "boom").in_stage("architect");
        assert_eq!(err.stage(), Some("architect"));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("architect"));

        let err = BuddyError::io("disk full").in_stage("coder");
        assert_eq!(err.stage(), Some("coder"));

        let err = BuddyError::invalid_field("path", "'../x' escapes").in_stage("coder");
        assert!(matches!(err, BuddyError::MalformedOutput { .. }));
        assert_eq!(err.stage(), Some("coder"));
        assert_eq!(err.to_string(), "Malformed output from coder: '../x' escapes");
    }

    #[test]
    fn test_timeout_message_keeps_millis() {
        let err = BuddyError::model_timeout("qa", std::time::Duration::from_millis(50));
        assert_eq!(err.stage(), Some("qa"));
        assert!(err.to_string().contains("timed out after 50ms"), "{}", err);

        let err: BuddyError = crate::llm::ModelError::Timeout(30).into();
        assert!(err.to_string().contains("timed out after 30s"), "{}", err);
    }

    #[test]
    fn test_usage_errors_not_retryable() {
        let err = BuddyError::invalid_transition("step 0", Status::Completed, Status::Running);
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Invalid transition for step 0: completed -> running"
        );
        assert!(!BuddyError::not_found("session", "x").is_retryable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: BuddyError = io.into();
        assert!(matches!(err, BuddyError::Io { .. }));
    }
}
