//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "buddy.toml";

#[derive(Parser)]
#[command(name = "buddy")]
#[command(about = "Coder Buddy - project generator and cached Q&A assistant")]
#[command(
    long_about = r#"Coder Buddy - project generator and cached Q&A assistant

USAGE:
  buddy serve                    # Start the dashboard API
  buddy run "Build a todo app"   # Generate a project once
  buddy ask "What is Python?"    # Answer one question

UTILITY COMMANDS:
  buddy config init              # Create config file
  buddy config show              # Show effective config"#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (.toml, .yaml or .json)
    #[arg(long, global = true, env = "BUDDY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API used by the dashboard
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long, short)]
        port: Option<u16>,

        /// Answer the configured warm-up questions at startup
        #[arg(long)]
        warm_up: bool,
    },

    /// Generate a project from a prompt and exit
    Run {
        /// What to build
        prompt: String,

        /// Directory generated projects are written under
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Always ask the model for a plan, even for known project types
        #[arg(long)]
        no_templates: bool,
    },

    /// Answer one question and exit
    Ask {
        /// The question
        question: String,

        /// Extra context folded into the prompt and cache key
        #[arg(long)]
        context: Option<String>,
    },

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Display the effective configuration
    Show,

    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// Configuration overrides carried by this command's flags
    pub fn overrides(&self) -> HashMap<String, String> {
        let mut args = HashMap::new();
        match self {
            Commands::Serve { host, port, .. } => {
                if let Some(host) = host {
                    args.insert("host".to_string(), host.clone());
                }
                if let Some(port) = port {
                    args.insert("port".to_string(), port.to_string());
                }
            }
            Commands::Run {
                output_dir,
                no_templates,
                ..
            } => {
                if let Some(dir) = output_dir {
                    args.insert("output_dir".to_string(), dir.display().to_string());
                }
                if *no_templates {
                    args.insert("no_templates".to_string(), "true".to_string());
                }
            }
            Commands::Ask { .. } | Commands::Config { .. } => {}
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["buddy", "serve", "--host", "0.0.0.0", "-p", "9000"]);
        let overrides = cli.command.overrides();
        assert_eq!(overrides["host"], "0.0.0.0");
        assert_eq!(overrides["port"], "9000");
        assert_eq!(cli.config_file, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::parse_from([
            "buddy",
            "run",
            "Build a todo app",
            "--no-templates",
            "--config-file",
            "custom.yaml",
            "-v",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config_file, PathBuf::from("custom.yaml"));
        match &cli.command {
            Commands::Run { prompt, .. } => assert_eq!(prompt, "Build a todo app"),
            _ => panic!("expected run"),
        }
        assert_eq!(cli.command.overrides()["no_templates"], "true");
    }

    #[test]
    fn test_parse_ask_with_context() {
        let cli = Cli::parse_from(["buddy", "ask", "What is a trait?", "--context", "rust"]);
        match cli.command {
            Commands::Ask { question, context } => {
                assert_eq!(question, "What is a trait?");
                assert_eq!(context.as_deref(), Some("rust"));
            }
            _ => panic!("expected ask"),
        }
    }
}
