//! Applying a plan to disk.

use super::artifacts::{write_dataset_description, write_participants_tsv, write_readme};
use super::report::write_report;
use super::{hash_file, TransferMode};
use crate::cancel::CancellationToken;
use crate::config::PathsConfig;
use crate::metadata::temp_path_for;
use crate::planner::Plan;
use crate::validator::ValidationReport;
use crate::{BidsError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Why an operation wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The destination already holds the same bytes.
    Identical,
    /// The source is gone and the destination exists: a move that already ran.
    AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOp {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub reason: SkipReason,
}

/// A failed transfer or artifact write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub destination: PathBuf,
    pub message: String,
}

/// What one apply run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub mode: TransferMode,
    /// Operations (transfers and side-folder copies) in the plan.
    pub planned: usize,
    pub created_paths: Vec<PathBuf>,
    pub skipped: Vec<SkippedOp>,
    pub errors: Vec<ApplyFailure>,
    /// Descriptor, participants table, README and log written by this run.
    pub artifacts: Vec<PathBuf>,
    pub cancelled: bool,
}

impl ApplyReport {
    /// Operations that left the destination complete.
    pub fn n_ok(&self) -> usize {
        self.created_paths.len() + self.skipped.len()
    }

    pub fn n_failed(&self) -> usize {
        self.errors.len()
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }

    fn record_failure(&mut self, source: Option<&Path>, destination: &Path, error: &BidsError) {
        warn!("Failed to write {}: {}", destination.display(), error);
        self.errors.push(ApplyFailure {
            source: source.map(Path::to_path_buf),
            destination: destination.to_path_buf(),
            message: error.to_string(),
        });
    }
}

/// Outcome of a single transfer.
enum Transfer {
    Created,
    Skipped(SkipReason),
}

/// Executes plans.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    readme_template: Option<PathBuf>,
    validation: Option<ValidationReport>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given file as README content instead of the built-in text.
    pub fn readme_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.readme_template = Some(path.into());
        self
    }

    /// Include validation findings in the operation log.
    pub fn validation_report(mut self, report: ValidationReport) -> Self {
        self.validation = Some(report);
        self
    }

    /// Apply `plan`.
    ///
    /// Refuses plans that fail their invariant check. Otherwise per-file
    /// failures are collected into the report and the run continues. The
    /// token is checked before every operation; a cancelled run writes only
    /// the operation log.
    pub fn apply(
        &self,
        plan: &Plan,
        mode: TransferMode,
        cancel: &CancellationToken,
    ) -> Result<ApplyReport> {
        plan.check_invariants()?;

        let mut report = ApplyReport {
            mode,
            planned: plan.operations.len() + plan.auxiliary.len(),
            ..Default::default()
        };

        info!(
            "Applying {} operations ({}) to {}",
            report.planned,
            mode.as_str(),
            plan.output_root.display()
        );

        // Side-folder files are always copied, whatever the mode.
        let transfers = plan
            .operations
            .iter()
            .map(|op| (&op.source, &op.destination, mode))
            .chain(
                plan.auxiliary
                    .iter()
                    .map(|op| (&op.source, &op.destination, TransferMode::Copy)),
            );

        for (source, destination, mode) in transfers {
            if cancel.is_cancelled() {
                warn!("Apply cancelled after {} operations", report.n_ok() + report.n_failed());
                report.cancelled = true;
                break;
            }

            match transfer(source, destination, mode) {
                Ok(Transfer::Created) => {
                    debug!("{} {} -> {}", mode.as_str(), source.display(), destination.display());
                    report.created_paths.push(destination.clone());
                }
                Ok(Transfer::Skipped(reason)) => {
                    debug!("Skipped {} ({:?})", destination.display(), reason);
                    report.skipped.push(SkippedOp {
                        source: source.clone(),
                        destination: destination.clone(),
                        reason,
                    });
                }
                Err(e) => report.record_failure(Some(source.as_path()), destination, &e),
            }
        }

        if !report.cancelled {
            self.write_artifacts(plan, &mut report);
        }

        match write_report(&plan.output_root, plan, &report, self.validation.as_ref()) {
            Ok(path) => report.artifacts.push(path),
            Err(e) => {
                let destination = plan.output_root.join(PathsConfig::LOGS_DIR_NAME);
                report.record_failure(None, &destination, &e);
            }
        }

        info!(
            "Apply finished: {} created, {} skipped, {} failed",
            report.created_paths.len(),
            report.skipped.len(),
            report.n_failed()
        );
        Ok(report)
    }

    fn write_artifacts(&self, plan: &Plan, report: &mut ApplyReport) {
        let root = &plan.dataset_root;

        match write_dataset_description(root, &plan.descriptor) {
            Ok(path) => report.artifacts.push(path),
            Err(e) => report.record_failure(None, root, &e),
        }

        if let Some(table) = &plan.participants {
            match write_participants_tsv(root, table) {
                Ok(path) => report.artifacts.push(path),
                Err(e) => report.record_failure(None, root, &e),
            }
        }

        match write_readme(root, self.readme_template.as_deref()) {
            Ok(Some(path)) => report.artifacts.push(path),
            Ok(None) => debug!("README already present in {}", root.display()),
            Err(e) => report.record_failure(None, root, &e),
        }
    }
}

fn transfer(source: &Path, destination: &Path, mode: TransferMode) -> Result<Transfer> {
    if !source.exists() {
        if destination.exists() {
            return Ok(Transfer::Skipped(SkipReason::AlreadyApplied));
        }
        return Err(BidsError::FileNotFound(source.to_path_buf()));
    }

    if destination.exists() && hash_file(source)? == hash_file(destination)? {
        if mode == TransferMode::Move {
            // Finish a move interrupted between copy and source removal.
            fs::remove_file(source).map_err(|e| BidsError::io_with_path(e, source))?;
        }
        return Ok(Transfer::Skipped(SkipReason::Identical));
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| BidsError::io_with_path(e, parent))?;
    }

    match mode {
        TransferMode::Copy => copy_atomic(source, destination)?,
        TransferMode::Move => {
            if let Err(e) = fs::rename(source, destination) {
                debug!(
                    "Rename {} failed ({}), falling back to copy",
                    source.display(),
                    e
                );
                copy_atomic(source, destination)?;
                fs::remove_file(source).map_err(|e| BidsError::io_with_path(e, source))?;
            }
        }
    }

    Ok(Transfer::Created)
}

/// Copy into a synced temp file next to `destination`, then rename over it.
fn copy_atomic(source: &Path, destination: &Path) -> Result<()> {
    let temp_path = temp_path_for(destination);

    let copied = (|| -> std::io::Result<()> {
        fs::copy(source, &temp_path)?;
        fs::File::open(&temp_path)?.sync_all()?;
        fs::rename(&temp_path, destination)
    })();

    if let Err(e) = copied {
        let _ = fs::remove_file(&temp_path);
        return Err(BidsError::Io {
            message: format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                destination.display(),
                e
            ),
            path: Some(destination.to_path_buf()),
            source: Some(e),
        });
    }
    Ok(())
}
