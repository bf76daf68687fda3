//! Human-readable rendering of plans and apply results.

use super::apply::ApplyReport;
use crate::config::PathsConfig;
use crate::metadata::atomic_write_bytes;
use crate::planner::{FileDisposition, Plan};
use crate::validator::ValidationReport;
use crate::Result;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Plain-text dry-run view of a plan.
pub fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let s = &plan.summary;

    let _ = writeln!(
        out,
        "Plan for {} dataset at {}",
        plan.dataset_type.as_str(),
        plan.dataset_root.display()
    );
    let _ = writeln!(
        out,
        "{} files: {} matched, {} unmatched, {} excluded ({} renamed to avoid collisions)",
        s.total_files, s.matched, s.unmatched, s.excluded, s.collisions_resolved
    );
    out.push('\n');

    for op in &plan.operations {
        let _ = writeln!(out, "  {} -> {}", op.source.display(), op.destination.display());
    }
    for op in &plan.auxiliary {
        let _ = writeln!(
            out,
            "  {} -> {} (side folder)",
            op.source.display(),
            op.destination.display()
        );
    }

    let skipped: Vec<_> = plan.unmatched().chain(plan.excluded()).collect();
    if !skipped.is_empty() {
        out.push_str("\nNot organized:\n");
        for account in skipped {
            let _ = writeln!(
                out,
                "  {}: {}",
                account.source.display(),
                describe(&account.disposition)
            );
        }
    }
    out
}

impl ApplyReport {
    /// Plain-text summary of an apply run.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {} planned, {} created, {} skipped, {} failed",
            self.mode.as_str(),
            self.planned,
            self.created_paths.len(),
            self.skipped.len(),
            self.n_failed()
        );
        if self.cancelled {
            out.push_str("Run was cancelled; remaining operations were not applied.\n");
        }
        for failure in &self.errors {
            let _ = writeln!(out, "  FAILED {}: {}", failure.destination.display(), failure.message);
        }
        for artifact in &self.artifacts {
            let _ = writeln!(out, "  wrote {}", artifact.display());
        }
        out
    }
}

/// Markdown operation log.
pub fn render_report(
    plan: &Plan,
    report: &ApplyReport,
    validation: Option<&ValidationReport>,
) -> String {
    let mut out = String::from("# BIDS Lite Organizer Report\n\n");

    out.push_str("## Validation Issues\n\n");
    match validation {
        None => out.push_str("- None (not provided to report)\n"),
        Some(v) if v.is_clean() => out.push_str("- None\n"),
        Some(v) => {
            for (level, issues) in [("ERROR", &v.errors), ("WARN", &v.warnings)] {
                for issue in issues {
                    let _ = writeln!(
                        out,
                        "- **{} {}**: {}",
                        level,
                        issue.code.as_str(),
                        issue.message
                    );
                }
            }
        }
    }

    out.push_str("\n## Operations Summary\n\n");
    let _ = writeln!(out, "- Dataset type: {}", plan.dataset_type.as_str());
    if let Some(pipeline) = &plan.pipeline_name {
        let _ = writeln!(out, "- Pipeline: {}", pipeline);
    }
    let _ = writeln!(out, "- Transfer mode: {}", report.mode.as_str());
    let _ = writeln!(out, "- Planned operations: {}", report.planned);
    let _ = writeln!(out, "- Created: {}", report.created_paths.len());
    let _ = writeln!(out, "- Skipped (already in place): {}", report.skipped.len());
    let _ = writeln!(out, "- Failed: {}", report.n_failed());
    let _ = writeln!(out, "- Unmatched input files: {}", plan.summary.unmatched);
    let _ = writeln!(out, "- Excluded input files: {}", plan.summary.excluded);
    if report.cancelled {
        out.push_str("- Cancelled before completion\n");
    }

    if !report.errors.is_empty() {
        out.push_str("\n### Operation Errors\n\n");
        for failure in &report.errors {
            let _ = writeln!(out, "- {}: {}", failure.destination.display(), failure.message);
        }
    }

    let skipped: Vec<_> = plan.unmatched().chain(plan.excluded()).collect();
    if !skipped.is_empty() {
        out.push_str("\n## Files Not Organized\n\n");
        for account in skipped {
            let _ = writeln!(
                out,
                "- {}: {}",
                account.source.display(),
                describe(&account.disposition)
            );
        }
    }

    out.push_str("\n## Planned Operations\n\n");
    for op in &plan.operations {
        let _ = writeln!(
            out,
            "- {} -> {}",
            op.source.display(),
            op.destination.display()
        );
    }
    for op in &plan.auxiliary {
        let _ = writeln!(
            out,
            "- {} -> {}",
            op.source.display(),
            op.destination.display()
        );
    }

    out
}

/// Write the operation log to `{output_root}/logs/report.md`.
pub fn write_report(
    output_root: &Path,
    plan: &Plan,
    report: &ApplyReport,
    validation: Option<&ValidationReport>,
) -> Result<PathBuf> {
    let path = output_root
        .join(PathsConfig::LOGS_DIR_NAME)
        .join(PathsConfig::REPORT_FILENAME);
    atomic_write_bytes(&path, render_report(plan, report, validation).as_bytes())?;
    Ok(path)
}

fn describe(disposition: &FileDisposition) -> String {
    match disposition {
        FileDisposition::Matched { destination } => format!("-> {}", destination.display()),
        FileDisposition::Unmatched => "no participant id matched".to_string(),
        FileDisposition::Excluded { reason } => reason.to_string(),
    }
}
