//! Configuration data model

use super::logging_config::LoggingConfig;
use crate::cache::CacheConfig;
use crate::error::{BuddyError, BuddyResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub cache: CacheConfig,
    pub qa: QaConfig,
    pub workflow: WorkflowConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Default page size for session listings
    pub session_list_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            session_list_limit: 20,
        }
    }
}

impl ServerConfig {
    /// `host:port` string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Model collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Only "google" is built in
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Sampling temperature for pipeline stages
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// HTTP request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.3,
            max_output_tokens: 2048,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Q&A service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    /// Upper bound on one model call before the answer fails
    #[serde(with = "humantime_serde")]
    pub model_timeout: Duration,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Answer `warm_up_questions` when the server starts
    pub warm_up_on_start: bool,
    pub warm_up_questions: Vec<String>,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(10),
            temperature: 0.1,
            max_output_tokens: 500,
            warm_up_on_start: false,
            warm_up_questions: [
                "What is Python?",
                "What is JavaScript?",
                "What is React?",
                "What is HTML?",
                "What is CSS?",
                "Difference between Python and JavaScript?",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Root directory generated projects are written under
    pub output_dir: PathBuf,
    /// Use built-in plans for recognised project types
    pub use_templates: bool,
    /// Upper bound on one model call inside a stage
    #[serde(with = "humantime_serde")]
    pub stage_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated_projects"),
            use_templates: true,
            stage_timeout: Duration::from_secs(60),
        }
    }
}

/// Update broadcasting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Per-subscriber queue bound
    pub subscriber_capacity: usize,
    /// SSE keep-alive interval
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 256,
            keep_alive: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Reject settings the runtime cannot work with
    pub fn validate(&self) -> BuddyResult<()> {
        if self.model.model.trim().is_empty() {
            return Err(BuddyError::config("Model name cannot be empty"));
        }
        if self.model.provider != "google" {
            return Err(BuddyError::config_with_context(
                format!("Unsupported model provider '{}'", self.model.provider),
                "model.provider",
            ));
        }
        if self.cache.memory_capacity == 0 {
            return Err(BuddyError::config_with_context(
                "Memory cache capacity must be greater than zero",
                "cache.memory_capacity",
            ));
        }
        if self.cache.enable_disk_cache && self.cache.disk_max_entries == 0 {
            return Err(BuddyError::config_with_context(
                "Disk cache capacity must be greater than zero",
                "cache.disk_max_entries",
            ));
        }
        if self.events.subscriber_capacity == 0 {
            return Err(BuddyError::config_with_context(
                "Subscriber capacity must be greater than zero",
                "events.subscriber_capacity",
            ));
        }
        if self.server.session_list_limit == 0 {
            return Err(BuddyError::config_with_context(
                "Session list limit must be greater than zero",
                "server.session_list_limit",
            ));
        }
        if self.qa.model_timeout.is_zero() || self.workflow.stage_timeout.is_zero() {
            return Err(BuddyError::config("Model timeouts must be greater than zero"));
        }
        if !self.logging.is_valid_level() {
            return Err(BuddyError::config_with_context(
                format!("Unknown log level '{}'", self.logging.level),
                "logging.level",
            ));
        }
        Ok(())
    }
}
