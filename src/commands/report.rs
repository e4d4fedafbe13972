//! Report command - reconcile and present drift

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::application::reconciliation::ReconciliationReport;
use crate::commands::{presenter, CommandContext, CommandStatus};
use crate::domain::url_validator::PartialRecord;

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Entries shown per verdict in text output
    #[arg(long)]
    pub limit: Option<usize>,

    /// Exit with status 2 when any drift is found
    #[arg(long)]
    pub fail_on_drift: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportOutput<'a> {
    report: &'a ReconciliationReport,
    orphan_ratio: f64,
    partials: &'a [PartialRecord],
}

/// Execute the report command
pub async fn execute(args: ReportArgs, ctx: &CommandContext) -> Result<CommandStatus> {
    let snapshot = ctx.use_cases().audit().await?;

    if args.json {
        let output = ReportOutput {
            report: &snapshot.report,
            orphan_ratio: snapshot.report.orphan_ratio(),
            partials: &snapshot.partials,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let limit = args.limit.unwrap_or(ctx.config.report.sample_limit);
        print!("{}", presenter::render_report(&snapshot.report, &snapshot.partials, limit));
    }

    if args.fail_on_drift && snapshot.report.has_drift() {
        Ok(CommandStatus::DriftFound)
    } else {
        Ok(CommandStatus::Completed)
    }
}
