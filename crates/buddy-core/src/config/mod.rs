//! Configuration management for Coder Buddy

mod logging_config;

pub mod loader;
pub mod model;

pub use crate::cache::CacheConfig;
pub use loader::{ConfigLoader, ConfigSource, load_config, load_config_from_file};
pub use logging_config::LoggingConfig;
pub use model::{Config, EventsConfig, ModelConfig, QaConfig, ServerConfig, WorkflowConfig};
