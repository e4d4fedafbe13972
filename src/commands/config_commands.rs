//! Configuration commands - show the effective configuration or write defaults

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::commands::CommandStatus;
use crate::infrastructure::config::{AppConfig, ConfigManager};

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &AppConfig) -> Result<CommandStatus> {
    match args.action {
        ConfigAction::Show => {
            eprintln!("# {}", manager.config_path().display());
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Init { force } => {
            if manager.config_path().exists() && !force {
                bail!(
                    "Configuration file {} already exists (use --force to overwrite)",
                    manager.config_path().display()
                );
            }
            manager.save_config(&AppConfig::default()).await?;
            println!("Wrote {}", manager.config_path().display());
        }
    }
    Ok(CommandStatus::Completed)
}
