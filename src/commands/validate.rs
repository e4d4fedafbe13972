//! Validate command - partial URL scan without reconciliation output

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::application::reconciliation::scan_partials;
use crate::commands::{presenter, CommandContext, CommandStatus};
use crate::domain::url_validator::PartialRecord;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    count: usize,
    partials: &'a [PartialRecord],
}

/// Execute the validate command
pub async fn execute(args: ValidateArgs, ctx: &CommandContext) -> Result<CommandStatus> {
    let (mapping, products) = ctx.use_cases().load_sources().await?;
    let partials = scan_partials(&mapping, &products);

    if args.json {
        let output = ValidateOutput {
            count: partials.len(),
            partials: &partials,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", presenter::render_partials(&partials));
    }

    Ok(CommandStatus::Completed)
}
