//! Planner input and output types.

use crate::naming::{CategoryGroup, IdPolicy, NormalizedId};
use crate::metadata::MetadataTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of dataset being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetType {
    /// Original acquisitions; every participant gets a session folder.
    #[default]
    Raw,
    /// Processed outputs under `derivatives/<pipeline>/`; sessions optional.
    Derivatives,
}

impl DatasetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::Raw => "raw",
            DatasetType::Derivatives => "derivatives",
        }
    }

    pub fn role(&self) -> DatasetRole {
        match self {
            DatasetType::Raw => DatasetRole::Raw,
            DatasetType::Derivatives => DatasetRole::Derivative,
        }
    }
}

/// Role of a single planned file within the output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetRole {
    Raw,
    Derivative,
}

/// Rule binding metadata rows to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Every file matched to a participant is kept, whatever its modality.
    #[default]
    AllModalities,
    /// A file is kept only if its category equals a modality declared on one
    /// of its participant's rows.
    SpecifiedOnly,
}

/// Handling of raw files whose category cannot be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownPolicy {
    /// Keep under `sourcedata/` with the original filename.
    #[default]
    Retain,
    /// Record as excluded; no operation is planned.
    Exclude,
}

/// Options steering one planning call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanOptions {
    pub dataset_type: DatasetType,
    pub pipeline_name: Option<String>,
    pub match_policy: MatchPolicy,
    pub unknown_policy: UnknownPolicy,
    pub ids: IdPolicy,
}

/// Files copied verbatim into side folders, outside participant matching.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuxiliaryFiles {
    pub phenotype: Vec<PathBuf>,
    pub publications: Vec<PathBuf>,
}

/// Everything the planner needs for one run.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub metadata: &'a MetadataTable,
    pub listing: &'a [PathBuf],
    pub output_root: &'a Path,
    pub options: PlanOptions,
    pub auxiliary: AuxiliaryFiles,
}

/// One planned source → destination transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOp {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub participant_id: NormalizedId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<NormalizedId>,
    /// Category label written into the filename (`T1w`, `lesion`, `unknown`).
    pub category: String,
    pub group: CategoryGroup,
    pub dataset_role: DatasetRole,
    /// 1-based metadata row the file was bound to.
    pub metadata_row: usize,
}

/// Why a discovered file produced no operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExclusionReason {
    /// No keyword matched and the unknown policy excludes such files.
    UnknownCategory,
    /// Under specified-only matching, no row of the participant declares the
    /// file's category.
    ModalityNotDeclared { category: String },
    /// The filename names a session none of the participant's rows has.
    SessionMismatch { session: String },
    /// Two different participant ids match equally well.
    AmbiguousParticipant { candidates: Vec<NormalizedId> },
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::UnknownCategory => write!(f, "category could not be inferred"),
            ExclusionReason::ModalityNotDeclared { category } => {
                write!(f, "category {} is not declared for this participant", category)
            }
            ExclusionReason::SessionMismatch { session } => {
                write!(f, "session {} is not listed for this participant", session)
            }
            ExclusionReason::AmbiguousParticipant { candidates } => {
                let ids: Vec<&str> = candidates.iter().map(NormalizedId::as_str).collect();
                write!(f, "matches several participants equally: {}", ids.join(", "))
            }
        }
    }
}

/// Outcome for one discovered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FileDisposition {
    Matched { destination: PathBuf },
    Unmatched,
    Excluded { reason: ExclusionReason },
}

/// Accounting entry: every listed file appears exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAccount {
    pub source: PathBuf,
    #[serde(flatten)]
    pub disposition: FileDisposition,
}

/// Side-folder kinds for auxiliary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuxiliaryKind {
    Phenotype,
    Publication,
}

/// A verbatim copy into a side folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryOp {
    pub kind: AuxiliaryKind,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Rows of `participants.tsv`, already rendered as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ParticipantsTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Pipeline block of a derivatives descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineDescription {
    pub name: String,
    pub version: String,
}

/// Generator entry of a dataset descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneratedBy {
    pub name: String,
    pub version: String,
}

/// Fields of `dataset_description.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetDescriptor {
    pub name: String,
    #[serde(rename = "BIDSVersion")]
    pub bids_version: String,
    pub dataset_type: DatasetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_description: Option<PipelineDescription>,
    pub generated_by: Vec<GeneratedBy>,
    /// Filled in by the writer; planning is independent of the clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Summary counts of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlanSummary {
    pub total_files: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub excluded: usize,
    pub operations: usize,
    pub collisions_resolved: usize,
    pub auxiliary: usize,
}

/// Files bound to one participant/session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub participant_id: NormalizedId,
    pub session_id: Option<NormalizedId>,
    pub metadata_row: usize,
    pub sources: Vec<PathBuf>,
}
