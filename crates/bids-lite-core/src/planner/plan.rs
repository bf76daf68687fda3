//! The plan: everything the writer needs, computed before any file is touched.

use super::types::{
    AuxiliaryOp, DatasetDescriptor, DatasetType, FileAccount, FileDisposition, MatchedPair,
    ParticipantsTable, PlanSummary, TransformOp,
};
use crate::metadata::{atomic_read_json, atomic_write_json};
use crate::{BidsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

/// Version of the plan interchange format.
pub const PLAN_FORMAT_VERSION: u32 = 1;

/// A complete, reviewable organize plan.
///
/// Plans serialize to pretty-printed JSON so they can be reviewed and
/// re-applied later without re-running matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub format_version: u32,
    pub dataset_type: DatasetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
    pub output_root: PathBuf,
    /// `output_root` for raw data, `output_root/derivatives/<pipeline>` otherwise.
    pub dataset_root: PathBuf,
    pub operations: Vec<TransformOp>,
    /// One entry per listed input file.
    pub accounting: Vec<FileAccount>,
    #[serde(default)]
    pub auxiliary: Vec<AuxiliaryOp>,
    /// Rows for `participants.tsv`; absent for derivatives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<ParticipantsTable>,
    pub descriptor: DatasetDescriptor,
    pub summary: PlanSummary,
}

impl Plan {
    /// Persist the plan as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)?;
        info!(
            "Saved plan with {} operations to {}",
            self.operations.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a saved plan and re-check its invariants.
    pub fn load(path: &Path) -> Result<Self> {
        let plan: Plan =
            atomic_read_json(path)?.ok_or_else(|| BidsError::FileNotFound(path.to_path_buf()))?;

        if plan.format_version != PLAN_FORMAT_VERSION {
            return Err(BidsError::config(format!(
                "Plan {} has format version {}, expected {}",
                path.display(),
                plan.format_version,
                PLAN_FORMAT_VERSION
            )));
        }

        plan.check_invariants()?;
        Ok(plan)
    }

    /// Verify destination uniqueness and per-file accounting.
    ///
    /// Destinations are compared case-insensitively so a plan stays valid on
    /// case-insensitive filesystems.
    pub fn check_invariants(&self) -> Result<()> {
        let mut destinations = HashSet::new();
        let all_destinations = self
            .operations
            .iter()
            .map(|op| &op.destination)
            .chain(self.auxiliary.iter().map(|op| &op.destination));
        for destination in all_destinations {
            if !destinations.insert(destination_key(destination)) {
                return Err(BidsError::PlanningConflict {
                    destination: destination.clone(),
                    message: "destination is written by more than one operation".into(),
                });
            }
        }

        let mut matched: HashMap<&Path, &Path> = HashMap::new();
        let mut sources = HashSet::new();
        for account in &self.accounting {
            if !sources.insert(account.source.as_path()) {
                return Err(accounting_error(format!(
                    "{} is accounted for more than once",
                    account.source.display()
                )));
            }
            if let FileDisposition::Matched { destination } = &account.disposition {
                matched.insert(account.source.as_path(), destination.as_path());
            }
        }

        if matched.len() != self.operations.len() {
            return Err(accounting_error(format!(
                "{} matched files but {} operations",
                matched.len(),
                self.operations.len()
            )));
        }
        for op in &self.operations {
            if matched.get(op.source.as_path()) != Some(&op.destination.as_path()) {
                return Err(accounting_error(format!(
                    "operation for {} has no matching accounting entry",
                    op.source.display()
                )));
            }
        }

        Ok(())
    }

    /// Group operations by the metadata row they were bound to.
    pub fn matched_pairs(&self) -> Vec<MatchedPair> {
        let mut pairs: Vec<MatchedPair> = Vec::new();
        for op in &self.operations {
            match pairs.iter_mut().find(|p| p.metadata_row == op.metadata_row) {
                Some(pair) => pair.sources.push(op.source.clone()),
                None => pairs.push(MatchedPair {
                    participant_id: op.participant_id.clone(),
                    session_id: op.session_id.clone(),
                    metadata_row: op.metadata_row,
                    sources: vec![op.source.clone()],
                }),
            }
        }
        pairs
    }

    /// Destination paths of every operation, in plan order.
    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.operations.iter().map(|op| op.destination.as_path())
    }

    /// Files no participant id matched.
    pub fn unmatched(&self) -> impl Iterator<Item = &FileAccount> {
        self.accounting
            .iter()
            .filter(|a| matches!(a.disposition, FileDisposition::Unmatched))
    }

    pub fn excluded(&self) -> impl Iterator<Item = &FileAccount> {
        self.accounting
            .iter()
            .filter(|a| matches!(a.disposition, FileDisposition::Excluded { .. }))
    }
}

/// Key used for destination uniqueness checks.
pub(crate) fn destination_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

fn accounting_error(message: String) -> BidsError {
    BidsError::Validation {
        field: "accounting".into(),
        message,
    }
}
