//! Probe command - sample image URLs for reachability

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::time::Duration;

use crate::application::reachability::{probe_sample, ProbeResult, ProbeSummary};
use crate::application::use_cases::ProbeSource;
use crate::commands::{presenter, CommandContext, CommandStatus};
use crate::infrastructure::http_client::HttpProbeClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Mapping,
    Products,
}

impl From<SourceArg> for ProbeSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Mapping => ProbeSource::Mapping,
            SourceArg::Products => ProbeSource::Products,
        }
    }
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Where the URLs come from
    #[arg(long, value_enum, default_value_t = SourceArg::Mapping)]
    pub source: SourceArg,

    /// Number of URLs to probe, from the head of the list
    #[arg(long)]
    pub sample: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ProbeOutput<'a> {
    source: ProbeSource,
    summary: ProbeSummary,
    results: &'a [ProbeResult],
}

/// Execute the probe command
pub async fn execute(args: ProbeArgs, ctx: &CommandContext) -> Result<CommandStatus> {
    let source = ProbeSource::from(args.source);
    let pairs = ctx.use_cases().probe_targets(source).await?;

    let sample = args.sample.unwrap_or(ctx.config.probe.sample_size);
    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.probe.timeout());

    let client = HttpProbeClient::new(&ctx.config.probe)?;
    let results = probe_sample(&client, &pairs, sample, timeout).await;
    let summary = ProbeSummary::from_results(&results);

    if args.json {
        let output = ProbeOutput {
            source,
            summary,
            results: &results,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", presenter::render_probe(&results, &summary));
    }

    Ok(CommandStatus::Completed)
}
