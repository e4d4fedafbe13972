//! Clean command - remove orphan keys from the central mapping

use anyhow::Result;
use clap::Args;

use crate::commands::{presenter, CommandContext, CommandStatus};

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Back up the mapping and write the corrected version. Without this flag
    /// the command only reports what would be removed.
    #[arg(long)]
    pub apply: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the clean command
pub async fn execute(args: CleanArgs, ctx: &CommandContext) -> Result<CommandStatus> {
    let summary = ctx.use_cases().clean_orphans(args.apply).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", presenter::render_cleanup(&summary.outcome));
    }

    Ok(CommandStatus::Completed)
}
