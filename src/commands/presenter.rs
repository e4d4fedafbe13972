//! Human-readable rendering for command output
//!
//! Everything renders into a `String` so the text layout can be tested
//! without capturing stdout. JSON output bypasses this module entirely.

use crate::application::mutation_planner::MutationOutcome;
use crate::application::reachability::{ProbeResult, ProbeSummary};
use crate::application::reconciliation::ReconciliationReport;
use crate::domain::image_record::{ConsistencyVerdict, DiffEntry};
use crate::domain::repositories::BackupSummary;
use crate::domain::url_validator::{PartialRecord, UrlSide};

/// Append one line to a `String`.
macro_rules! outln {
    ($out:expr) => {
        $out.push('\n')
    };
    ($out:expr, $($arg:tt)*) => {{
        $out.push_str(&format!($($arg)*));
        $out.push('\n');
    }};
}

const DRIFT_VERDICTS: [ConsistencyVerdict; 4] = [
    ConsistencyVerdict::Different,
    ConsistencyVerdict::CentralMissing,
    ConsistencyVerdict::ProductMissing,
    ConsistencyVerdict::BothMissing,
];

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn side_label(side: UrlSide) -> &'static str {
    match side {
        UrlSide::Central => "central",
        UrlSide::Product => "product",
    }
}

fn write_entry(out: &mut String, entry: &DiffEntry) {
    outln!(
        out,
        "    {:<24} central={}  product={}",
        entry.id,
        or_dash(entry.central_url.as_deref()),
        or_dash(entry.product_url.as_deref())
    );
}

/// Counts, up to `limit` samples per drift verdict, orphans and partials.
pub fn render_report(report: &ReconciliationReport, partials: &[PartialRecord], limit: usize) -> String {
    let mut out = String::new();

    outln!(out, "Image mapping reconciliation");
    outln!(out, "  Mapping keys:        {}", report.mapping_size);
    outln!(out, "  Products:            {}", report.product_count);
    outln!(out, "  Same:                {}", report.same_count);
    outln!(out, "  Different:           {}", report.diff_count);
    outln!(out, "  Missing in central:  {}", report.missing_in_central);
    outln!(out, "  Missing in product:  {}", report.missing_in_product);
    outln!(
        out,
        "  Orphan keys:         {} ({:.1}% of mapping)",
        report.orphan_keys.len(),
        report.orphan_ratio() * 100.0
    );

    for verdict in DRIFT_VERDICTS {
        let total = report.count_of(verdict);
        if total == 0 {
            continue;
        }
        outln!(out);
        outln!(out, "  {verdict} ({total}):");
        for entry in report.entries_with(verdict).take(limit) {
            write_entry(&mut out, entry);
        }
        if total > limit {
            outln!(out, "    ... {} more", total - limit);
        }
    }

    if !partials.is_empty() {
        outln!(out);
        out.push_str(&render_partials(partials));
    }

    if !report.has_drift() && partials.is_empty() {
        outln!(out);
        outln!(out, "  ✓ Mapping and products agree");
    }

    out
}

pub fn render_partials(partials: &[PartialRecord]) -> String {
    let mut out = String::new();
    if partials.is_empty() {
        outln!(out, "No partial or malformed image URLs found");
        return out;
    }

    outln!(out, "  Partial URLs ({}):", partials.len());
    for partial in partials {
        outln!(
            out,
            "    {:<24} {:<8} {:?}",
            partial.id,
            side_label(partial.side),
            partial.value
        );
    }
    out
}

pub fn render_cleanup(outcome: &MutationOutcome) -> String {
    let mut out = String::new();
    match outcome {
        MutationOutcome::NoOp => {
            outln!(out, "No orphan keys. Nothing to clean.");
        }
        MutationOutcome::DryRun { would_remove } => {
            outln!(out, "Dry run: {} orphan key(s) would be removed:", would_remove.len());
            for key in would_remove {
                outln!(out, "    {key}");
            }
            outln!(out, "Re-run with --apply to back up and remove them.");
        }
        MutationOutcome::Applied { backup_id, removed } => {
            outln!(out, "Backup written: {backup_id}");
            outln!(out, "Removed {} orphan key(s):", removed.len());
            for key in removed {
                outln!(out, "    {key}");
            }
        }
    }
    out
}

pub fn render_probe(results: &[ProbeResult], summary: &ProbeSummary) -> String {
    let mut out = String::new();
    for result in results {
        let mark = if result.ok { "✓" } else { "✗" };
        let detail = match (result.status(), result.error()) {
            (Some(status), _) => format!("{status} {}", or_dash(result.content_type())),
            (None, Some(error)) => error.to_string(),
            (None, None) => String::new(),
        };
        outln!(out, "  {mark} {:<24} {detail}  {}", result.id, result.url);
    }
    outln!(
        out,
        "Probed {}: {} reachable, {} unreachable, {} errored",
        results.len(),
        summary.reachable,
        summary.unreachable,
        summary.errored
    );
    out
}

pub fn render_backups(backups: &[BackupSummary]) -> String {
    let mut out = String::new();
    if backups.is_empty() {
        outln!(out, "No backups found");
        return out;
    }

    outln!(out, "{:<36} {:<27} {:>6} {:>8}", "ID", "BACKED UP AT", "KEYS", "ORPHANS");
    for backup in backups {
        outln!(
            out,
            "{:<36} {:<27} {:>6} {:>8}",
            backup.id,
            or_dash(backup.backed_up_at.as_deref()),
            backup.key_count,
            backup.orphan_count
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reachability::{ProbeError, ProbeOutcome};
    use crate::application::reconciliation::reconcile;
    use crate::domain::image_record::{CentralMapping, ProductRecord};

    #[test]
    fn test_report_truncates_samples() {
        let mapping: CentralMapping = (0..5).map(|i| (format!("K{i}"), format!("http://x/{i}.png"))).collect();
        let report = reconcile(&mapping, &[]);

        let text = render_report(&report, &[], 2);

        assert!(text.contains("product_missing (5):"));
        assert!(text.contains("... 3 more"));
        assert!(text.contains("100.0% of mapping"));
    }

    #[test]
    fn test_clean_report_says_so() {
        let mapping: CentralMapping = [("A", "http://x/1.png")].into_iter().collect();
        let products = vec![ProductRecord::new("A", "Lamp", Some("http://x/1.png"))];

        let text = render_report(&reconcile(&mapping, &products), &[], 10);

        assert!(text.contains("Mapping and products agree"));
    }

    #[test]
    fn test_applied_cleanup_names_backup() {
        let text = render_cleanup(&MutationOutcome::Applied {
            backup_id: "backup-20261016T101500-1a2b3c4d".into(),
            removed: vec!["B".into()],
        });
        assert!(text.contains("backup-20261016T101500-1a2b3c4d"));
        assert!(text.contains("Removed 1 orphan key(s)"));
    }

    #[test]
    fn test_probe_lines_show_errors() {
        let results = vec![
            ProbeResult::new(
                "A",
                "http://x/1.png",
                ProbeOutcome::Responded {
                    status: 200,
                    content_type: Some("image/png".into()),
                },
            ),
            ProbeResult::new(
                "B",
                "http://x/2.png",
                ProbeOutcome::Failed {
                    error: ProbeError::Timeout(8000),
                },
            ),
        ];
        let summary = ProbeSummary::from_results(&results);

        let text = render_probe(&results, &summary);

        assert!(text.contains("200 image/png"));
        assert!(text.contains("timed out after 8000ms"));
        assert!(text.contains("1 reachable, 0 unreachable, 1 errored"));
    }

    #[test]
    fn test_backup_table_has_one_line_per_backup() {
        assert_eq!(render_backups(&[]), "No backups found\n");

        let backups = vec![
            BackupSummary {
                id: "backup-20261016T101500-1a2b3c4d".into(),
                backed_up_at: Some("2026-10-16T10:15:00+00:00".into()),
                key_count: 3,
                orphan_count: 1,
            },
            BackupSummary {
                id: "backup-20261015T090000-5e6f7a8b".into(),
                backed_up_at: None,
                key_count: 2,
                orphan_count: 0,
            },
        ];

        let text = render_backups(&backups);
        let lines: Vec<&str> = text.lines().collect();

        assert!(text.ends_with('\n'));
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with("backup-20261016T101500-1a2b3c4d"));
        assert!(lines[2].contains(" - "));
    }
}
