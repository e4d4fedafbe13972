//! Backups command - list stored mapping backups, newest first

use anyhow::Result;
use clap::Args;

use crate::commands::{presenter, CommandContext, CommandStatus};
use crate::domain::repositories::BackupRepository;

/// Arguments for the backups command
#[derive(Args, Debug)]
pub struct BackupsArgs {
    /// Maximum number of backups to list
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

/// Execute the backups command
pub async fn execute(args: BackupsArgs, ctx: &CommandContext) -> Result<CommandStatus> {
    let backups = ctx.store().list_backups(args.limit).await?;
    print!("{}", presenter::render_backups(&backups));
    Ok(CommandStatus::Completed)
}
