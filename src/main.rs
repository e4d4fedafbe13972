//! image-reconciler CLI
//!
//! Reconciles the central image mapping against product documents:
//! - Report drift between the two sources
//! - Remove orphan mapping keys behind a backup
//! - Scan for partial or malformed URLs
//! - Sample image URLs for reachability

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use image_reconciler::application::errors::{ReconcileError, StoreState};
use image_reconciler::commands::{self, CommandContext, CommandStatus};
use image_reconciler::infrastructure::config::ConfigManager;
use image_reconciler::infrastructure::logging::init_logging_with_config;

/// image-reconciler - central image mapping reconciliation
#[derive(Parser)]
#[command(name = "image-reconciler")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the document store URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Override the log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or initialize configuration
    Config(commands::config_commands::ConfigArgs),

    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that open the document store
#[derive(Subcommand)]
enum StoreCommand {
    /// Reconcile the mapping against products and report drift
    Report(commands::report::ReportArgs),

    /// Remove orphan keys from the mapping (dry run unless --apply)
    Clean(commands::clean::CleanArgs),

    /// Report partial or malformed image URLs
    Validate(commands::validate::ValidateArgs),

    /// Check a sample of image URLs for reachability
    Probe(commands::probe::ProbeArgs),

    /// List mapping backups
    Backups(commands::backups::BackupsArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            report_failure(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<CommandStatus> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };

    let mut config = manager.load_config()?;
    if let Some(url) = cli.database_url {
        config.store.database_url = url;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging_with_config(&config.logging)?;

    let command = match cli.command {
        Commands::Config(args) => return commands::config_commands::execute(args, &manager, &config).await,
        Commands::Store(command) => command,
    };

    let ctx = CommandContext::open(config).await?;
    let result = match command {
        StoreCommand::Report(args) => commands::report::execute(args, &ctx).await,
        StoreCommand::Clean(args) => commands::clean::execute(args, &ctx).await,
        StoreCommand::Validate(args) => commands::validate::execute(args, &ctx).await,
        StoreCommand::Probe(args) => commands::probe::execute(args, &ctx).await,
        StoreCommand::Backups(args) => commands::backups::execute(args, &ctx).await,
    };
    ctx.close().await;
    result
}

fn report_failure(error: &anyhow::Error) {
    error!("{error:#}");
    eprintln!("Error: {error:#}");

    if let Some(reconcile_error) = error.downcast_ref::<ReconcileError>() {
        match reconcile_error.store_state() {
            StoreState::BackupOnly { backup_id } => {
                eprintln!("The store holds backup '{backup_id}' but the mapping was not corrected.");
                eprintln!("Re-run 'image-reconciler clean --apply' or restore from that backup.");
            }
            StoreState::Untouched => eprintln!("No changes were written."),
            StoreState::NotApplicable => {}
        }
    }
}
