//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured level when set.

use anyhow::Context;
use buddy_core::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the filter directive for the configured level
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.level.to_ascii_lowercase()
    };
    // keep dependency chatter out of debug output
    format!("{level},hyper=warn,reqwest=warn,h2=warn")
}

fn console_layer(format: &str) -> BoxedLayer {
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    match format {
        "json" => layer.json().boxed(),
        "compact" => layer.compact().boxed(),
        _ => layer.pretty().boxed(),
    }
}

/// Install the global subscriber described by `config`
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(config, verbose)))
        .context("invalid log filter")?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.log_to_console {
        layers.push(console_layer(&config.format));
    }
    if config.log_to_file {
        let path = config
            .log_file
            .clone()
            .unwrap_or_else(|| "coder-buddy.log".into());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
        layers.push(if config.format == "json" {
            layer.json().boxed()
        } else {
            layer.boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("logging already initialised")?;
    Ok(())
}
