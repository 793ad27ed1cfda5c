//! Configuration management commands

use crate::console::CliConsole;
use anyhow::{Context, bail};
use buddy_core::config::{Config, load_config};
use std::path::Path;

/// Show the effective configuration (file merged with environment)
pub async fn show(config_file: &Path) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration");

    if config_file.exists() {
        console.success(&format!(
            "Loaded configuration from: {}",
            config_file.display()
        ));
    } else {
        console.warn(&format!(
            "Configuration file not found: {}",
            config_file.display()
        ));
        console.info("Using default configuration");
    }

    let mut config = load_config(Some(config_file))?;
    if config.model.api_key.is_some() {
        config.model.api_key = Some("********".to_string());
    }
    println!();
    println!("{}", render(&config, config_file)?);
    Ok(())
}

/// Write a configuration file holding the defaults
pub async fn init(config_file: &Path, force: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Initialization");

    if config_file.exists() && !force {
        console.error(&format!(
            "Configuration file already exists: {}",
            config_file.display()
        ));
        console.info("Use --force to overwrite");
        bail!("configuration file already exists");
    }

    let content = render(&Config::default(), config_file)?;
    tokio::fs::write(config_file, content)
        .await
        .with_context(|| format!("failed to write {}", config_file.display()))?;

    console.success(&format!(
        "Created configuration file: {}",
        config_file.display()
    ));
    console.info("Set GOOGLE_API_KEY (or model.api_key) before running commands");
    Ok(())
}

/// Serialize in the format implied by the file extension
fn render(config: &Config, path: &Path) -> anyhow::Result<String> {
    let rendered = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::to_string(config)?,
        Some("toml") => toml::to_string_pretty(config)?,
        _ => serde_json::to_string_pretty(config)?,
    };
    Ok(rendered)
}
