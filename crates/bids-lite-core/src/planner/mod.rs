//! Transformation planning.
//!
//! The planner matches input files to metadata rows, infers each file's
//! category, and synthesizes unique BIDS destinations. Its output, [`Plan`],
//! is the only value that crosses into the writer, and it can be saved to
//! JSON for review and applied later.

mod matcher;
mod paths;
mod plan;
#[allow(clippy::module_inception)]
mod planner;
mod types;

pub use matcher::{best_participant, CandidateFile, MatchStrength, ParticipantMatch};
pub use paths::split_extension;
pub use plan::{Plan, PLAN_FORMAT_VERSION};
pub use planner::Planner;
pub use types::{
    AuxiliaryFiles, AuxiliaryKind, AuxiliaryOp, DatasetDescriptor, DatasetRole, DatasetType,
    ExclusionReason, FileAccount, FileDisposition, GeneratedBy, MatchPolicy, MatchedPair,
    ParticipantsTable, PipelineDescription, PlanOptions, PlanRequest, PlanSummary, TransformOp,
    UnknownPolicy,
};
