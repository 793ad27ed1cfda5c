//! Configuration loading and management

use super::model::Config;
use crate::error::{BuddyError, BuddyResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Configuration from a file
    File(PathBuf),
    /// Configuration from environment variables
    Environment,
    /// Explicit variables, read like the environment
    Variables(HashMap<String, String>),
    /// Configuration from command line arguments
    CommandLine(HashMap<String, String>),
    /// Default configuration
    Default,
}

/// Configuration loader applying sources in the order they were added
///
/// A file replaces everything before it (missing fields fall back to their
/// defaults); environment and command-line sources override single fields.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a file source
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    /// Add environment variables source
    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    /// Add command line arguments source
    pub fn with_args(self, args: HashMap<String, String>) -> Self {
        self.add_source(ConfigSource::CommandLine(args))
    }

    /// Add default configuration source
    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    /// Load configuration from all sources and validate it
    pub fn load(self) -> BuddyResult<Config> {
        let mut config = Config::default();
        for source in &self.sources {
            apply_source(&mut config, source)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn apply_source(config: &mut Config, source: &ConfigSource) -> BuddyResult<()> {
    match source {
        ConfigSource::File(path) => {
            debug!("Loading config from file: {}", path.display());
            if let Some(loaded) = load_from_file(path)? {
                *config = loaded;
            }
        }
        ConfigSource::Environment => {
            debug!("Loading config from environment");
            apply_variables(config, |name| env::var(name).ok())?;
        }
        ConfigSource::Variables(vars) => {
            apply_variables(config, |name| vars.get(name).cloned())?;
        }
        ConfigSource::CommandLine(args) => {
            debug!("Loading config from command line");
            apply_args(config, args)?;
        }
        ConfigSource::Default => {
            *config = Config::default();
        }
    }
    Ok(())
}

/// Parse a configuration file, choosing the format by extension
///
/// Returns `None` when the file does not exist.
fn load_from_file(path: &Path) -> BuddyResult<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| {
        BuddyError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            BuddyError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Deserializing TOML configuration from '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            BuddyError::config_with_context(
                format!("Failed to parse YAML config: {}", e),
                format!("Deserializing YAML configuration from '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            BuddyError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Deserializing JSON configuration from '{}'", path.display()),
            )
        })?,
    };

    Ok(Some(config))
}

fn apply_variables<F>(config: &mut Config, lookup: F) -> BuddyResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(key) = non_empty("GOOGLE_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")) {
        config.model.api_key = Some(key);
    }
    if let Some(model) = non_empty("BUDDY_MODEL") {
        config.model.model = model;
    }
    if let Some(host) = non_empty("BUDDY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = non_empty("BUDDY_PORT") {
        config.server.port = parse_port(&port)?;
    }
    if let Some(dir) = non_empty("BUDDY_CACHE_DIR") {
        config.cache.disk_cache_dir = PathBuf::from(dir);
    }
    if let Some(dir) = non_empty("BUDDY_OUTPUT_DIR") {
        config.workflow.output_dir = PathBuf::from(dir);
    }
    if let Some(level) = non_empty("BUDDY_LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(())
}

fn apply_args(config: &mut Config, args: &HashMap<String, String>) -> BuddyResult<()> {
    for (key, value) in args {
        match key.as_str() {
            "host" => config.server.host = value.clone(),
            "port" => config.server.port = parse_port(value)?,
            "model" => config.model.model = value.clone(),
            "api_key" => config.model.api_key = Some(value.clone()),
            "cache_dir" => config.cache.disk_cache_dir = PathBuf::from(value),
            "output_dir" => config.workflow.output_dir = PathBuf::from(value),
            "log_level" => config.logging.level = value.clone(),
            "no_templates" => config.workflow.use_templates = value != "true",
            other => debug!("Ignoring unknown command line override '{}'", other),
        }
    }
    Ok(())
}

fn parse_port(value: &str) -> BuddyResult<u16> {
    value.trim().parse().map_err(|_| {
        BuddyError::config_with_context(format!("Invalid port '{}'", value), "server.port")
    })
}

/// Load configuration from defaults, an optional file and the environment
pub fn load_config(config_file: Option<&Path>) -> BuddyResult<Config> {
    let mut loader = ConfigLoader::new().with_defaults();
    if let Some(path) = config_file {
        loader = loader.with_file(path);
    }
    loader.with_env().load()
}

/// Load configuration from a single file without consulting the environment
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> BuddyResult<Config> {
    ConfigLoader::new().with_defaults().with_file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let config = load_config_from_file("/definitely/not/here.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_formats_by_extension() {
        let dir = TempDir::new().unwrap();

        let toml_path = dir.path().join("buddy.toml");
        fs::write(&toml_path, "[workflow]\nuse_templates = false\n").unwrap();
        assert!(!load_config_from_file(&toml_path).unwrap().workflow.use_templates);

        let yaml_path = dir.path().join("buddy.yaml");
        fs::write(&yaml_path, "qa:\n  model_timeout: 3s\n").unwrap();
        assert_eq!(
            load_config_from_file(&yaml_path).unwrap().qa.model_timeout,
            Duration::from_secs(3)
        );

        let json_path = dir.path().join("buddy.json");
        fs::write(&json_path, r#"{"server": {"port": 7070}}"#).unwrap();
        assert_eq!(load_config_from_file(&json_path).unwrap().server.port, 7070);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            load_config_from_file(&path),
            Err(BuddyError::Config { .. })
        ));
    }

    #[test]
    fn test_variables_override_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buddy.toml");
        fs::write(&path, "[server]\nport = 9000\nhost = \"0.0.0.0\"\n").unwrap();

        let config = ConfigLoader::new()
            .with_defaults()
            .with_file(&path)
            .add_source(ConfigSource::Variables(vars(&[
                ("BUDDY_PORT", "9500"),
                ("GEMINI_API_KEY", "secret"),
                ("BUDDY_MODEL", ""),
            ])))
            .load()
            .unwrap();

        assert_eq!(config.server.port, 9500);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.api_key.as_deref(), Some("secret"));
        assert_eq!(config.model.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_google_key_preferred_over_gemini_key() {
        let config = ConfigLoader::new()
            .add_source(ConfigSource::Variables(vars(&[
                ("GOOGLE_API_KEY", "google"),
                ("GEMINI_API_KEY", "gemini"),
            ])))
            .load()
            .unwrap();
        assert_eq!(config.model.api_key.as_deref(), Some("google"));
    }

    #[test]
    fn test_command_line_wins_last() {
        let config = ConfigLoader::new()
            .add_source(ConfigSource::Variables(vars(&[("BUDDY_HOST", "10.0.0.1")])))
            .with_args(vars(&[("host", "localhost"), ("no_templates", "true")]))
            .load()
            .unwrap();
        assert_eq!(config.server.host, "localhost");
        assert!(!config.workflow.use_templates);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = ConfigLoader::new()
            .with_args(vars(&[("port", "eighty")]))
            .load();
        assert!(matches!(result, Err(BuddyError::Config { .. })));
    }
}
