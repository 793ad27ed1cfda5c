//! From trait implementations for BuddyError conversions

use super::types::BuddyError;
use std::time::Duration;

impl From<std::io::Error> for BuddyError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for BuddyError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<toml::de::Error> for BuddyError {
    fn from(error: toml::de::Error) -> Self {
        Self::config_with_context(error.to_string(), "toml")
    }
}

impl From<toml::ser::Error> for BuddyError {
    fn from(error: toml::ser::Error) -> Self {
        Self::config_with_context(error.to_string(), "toml")
    }
}

impl From<serde_yaml::Error> for BuddyError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config_with_context(error.to_string(), "yaml")
    }
}

impl From<crate::llm::ModelError> for BuddyError {
    fn from(error: crate::llm::ModelError) -> Self {
        match error {
            crate::llm::ModelError::Timeout(seconds) => {
                Self::model_timeout("model", Duration::from_secs(seconds))
            }
            crate::llm::ModelError::Api(message) => Self::model_unavailable("model", message),
        }
    }
}
