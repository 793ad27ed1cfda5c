//! Command routing logic for CLI

use crate::args::{Cli, Commands, ConfigAction};
use crate::{commands, logging};
use buddy_core::config::{Config, ConfigLoader};

/// Load configuration, install logging and dispatch the subcommand
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    // config commands report on the file itself, before logging exists
    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Show => commands::config::show(&cli.config_file).await,
            ConfigAction::Init { force } => commands::config::init(&cli.config_file, *force).await,
        };
    }

    let config = load(&cli)?;
    logging::init_logging(&config.logging, cli.verbose)?;
    tracing::debug!("Using configuration file {}", cli.config_file.display());

    match cli.command {
        Commands::Serve { warm_up, .. } => commands::serve::serve(config, warm_up).await,
        Commands::Run { prompt, .. } => commands::run::run(config, &prompt, cli.verbose).await,
        Commands::Ask { question, context } => {
            commands::ask::ask(config, &question, context.as_deref()).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Defaults, then the config file, then the environment, then flags
pub fn load(cli: &Cli) -> anyhow::Result<Config> {
    let config = ConfigLoader::new()
        .with_defaults()
        .with_file(&cli.config_file)
        .with_env()
        .with_args(cli.command.overrides())
        .load()?;
    Ok(config)
}
