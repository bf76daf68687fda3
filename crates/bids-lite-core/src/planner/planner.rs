//! The planning engine.
//!
//! `Planner::plan` is pure: it reads nothing beyond its request and writes
//! nothing. Given the same metadata, listing and options it returns the same
//! plan, whatever order the listing arrived in.

use super::matcher::{best_participant, CandidateFile, ParticipantMatch};
use super::paths;
use super::plan::{destination_key, Plan, PLAN_FORMAT_VERSION};
use super::types::{
    AuxiliaryKind, AuxiliaryOp, DatasetDescriptor, DatasetType, ExclusionReason, FileAccount,
    FileDisposition, GeneratedBy, MatchPolicy, ParticipantsTable, PipelineDescription,
    PlanRequest, PlanSummary, TransformOp, UnknownPolicy,
};
use crate::config::BidsConfig;
use crate::metadata::{
    MetadataTable, MODALITY_COLUMN, PARTICIPANT_ID_COLUMN, SESSION_ID_COLUMN,
};
use crate::naming::{Category, IdNormalizer, IdPolicy, NamingSpec, NormalizedId};
use crate::{BidsError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cell value written for blank participant attributes.
const MISSING_VALUE: &str = "n/a";

/// Builds plans from metadata and a file listing.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    spec: NamingSpec,
}

/// A metadata row with its identifiers normalized once.
#[derive(Debug)]
struct BoundRow {
    /// 1-based row number.
    number: usize,
    participant: NormalizedId,
    /// Session declared in the metadata. `None` when the row has none.
    session: Option<NormalizedId>,
    declared: Option<Category>,
}

/// Where one file ends up.
enum Placement {
    Op(TransformOp),
    Skip(FileDisposition),
}

impl Planner {
    pub fn new(spec: NamingSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &NamingSpec {
        &self.spec
    }

    /// Compute the plan for one run.
    ///
    /// Fails without producing a plan on configuration errors (missing
    /// pipeline name for derivatives, publications for raw data), on
    /// metadata that lacks usable identifiers, and on destination conflicts
    /// that numeric suffixes cannot resolve.
    pub fn plan(&self, request: &PlanRequest<'_>) -> Result<Plan> {
        let options = &request.options;
        let pipeline_name = check_pipeline(options.dataset_type, options.pipeline_name.as_deref())?;
        if options.dataset_type == DatasetType::Raw && !request.auxiliary.publications.is_empty() {
            return Err(BidsError::config(
                "publication files require a derivatives dataset",
            ));
        }

        let rows = self.bind_rows(request.metadata, &options.ids)?;
        let default_session = match options.dataset_type {
            DatasetType::Raw => Some(
                options
                    .ids
                    .session
                    .normalize(BidsConfig::DEFAULT_RAW_SESSION)?,
            ),
            DatasetType::Derivatives => None,
        };
        let mut participants: Vec<NormalizedId> = Vec::new();
        for row in &rows {
            if !participants.contains(&row.participant) {
                participants.push(row.participant.clone());
            }
        }

        let dataset_root =
            paths::dataset_root(request.output_root, options.dataset_type, pipeline_name);

        let mut listing: Vec<&PathBuf> = request.listing.iter().collect();
        listing.sort();
        listing.dedup();

        info!(
            "Planning {} files against {} participants ({} dataset)",
            listing.len(),
            participants.len(),
            options.dataset_type.as_str()
        );

        let mut taken: HashSet<String> = HashSet::new();
        let mut operations = Vec::new();
        let mut accounting = Vec::with_capacity(listing.len());
        let mut collisions_resolved = 0;

        for source in listing {
            let file = CandidateFile::new(source, &self.spec);
            let placement = self.place(
                &file,
                &rows,
                &participants,
                default_session.as_ref(),
                &dataset_root,
                request,
            );
            let disposition = match placement {
                Placement::Op(mut op) => {
                    let (destination, renamed) = claim_destination(&mut taken, &op.destination)?;
                    if renamed {
                        collisions_resolved += 1;
                        debug!(
                            "Destination {} taken, using {}",
                            op.destination.display(),
                            destination.display()
                        );
                    }
                    op.destination = destination.clone();
                    operations.push(op);
                    FileDisposition::Matched { destination }
                }
                Placement::Skip(disposition) => {
                    debug!("{}: {:?}", source.display(), disposition);
                    disposition
                }
            };
            accounting.push(FileAccount {
                source: source.clone(),
                disposition,
            });
        }

        let auxiliary = plan_auxiliary(request, &dataset_root, pipeline_name, &mut taken)?;

        let participants_table = match options.dataset_type {
            DatasetType::Raw => Some(participants_table(request.metadata, &rows)),
            DatasetType::Derivatives => None,
        };

        let summary = summarize(&accounting, &operations, auxiliary.len(), collisions_resolved);
        if summary.unmatched > 0 {
            warn!("{} files matched no participant", summary.unmatched);
        }
        info!(
            "Planned {} operations ({} unmatched, {} excluded, {} renamed to avoid collisions)",
            summary.operations, summary.unmatched, summary.excluded, summary.collisions_resolved
        );

        Ok(Plan {
            format_version: PLAN_FORMAT_VERSION,
            dataset_type: options.dataset_type,
            pipeline_name: pipeline_name.map(str::to_string),
            output_root: request.output_root.to_path_buf(),
            dataset_root,
            operations,
            accounting,
            auxiliary,
            participants: participants_table,
            descriptor: descriptor(options.dataset_type, pipeline_name),
            summary,
        })
    }

    fn bind_rows(
        &self,
        metadata: &MetadataTable,
        ids: &IdPolicy,
    ) -> Result<Vec<BoundRow>> {
        if !metadata.has_column(PARTICIPANT_ID_COLUMN) {
            return Err(BidsError::Validation {
                field: PARTICIPANT_ID_COLUMN.into(),
                message: "metadata has no participant_id column".into(),
            });
        }

        metadata
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| -> Result<BoundRow> {
                let number = index + 1;
                let participant = ids.participant.normalize(&row.participant_id).map_err(|_| {
                    BidsError::Validation {
                        field: PARTICIPANT_ID_COLUMN.into(),
                        message: format!("row {} has an empty participant id", number),
                    }
                })?;

                let session = match &row.session_id {
                    Some(raw) => Some(ids.session.normalize(raw).map_err(|_| {
                        BidsError::Validation {
                            field: SESSION_ID_COLUMN.into(),
                            message: format!("row {} has an unusable session id {:?}", number, raw),
                        }
                    })?),
                    None => None,
                };

                let declared = row
                    .modality()
                    .and_then(|value| self.spec.resolve_declared(value))
                    .cloned();

                Ok(BoundRow {
                    number,
                    participant,
                    session,
                    declared,
                })
            })
            .collect()
    }

    fn place(
        &self,
        file: &CandidateFile,
        rows: &[BoundRow],
        participants: &[NormalizedId],
        default_session: Option<&NormalizedId>,
        dataset_root: &Path,
        request: &PlanRequest<'_>,
    ) -> Placement {
        let options = &request.options;
        let ids = &options.ids;

        let participant = match best_participant(file, participants, &ids.participant) {
            ParticipantMatch::Matched(participant) => participant,
            ParticipantMatch::Unmatched => return Placement::Skip(FileDisposition::Unmatched),
            ParticipantMatch::Ambiguous(candidates) => {
                return excluded(ExclusionReason::AmbiguousParticipant { candidates })
            }
        };

        let mut candidates: Vec<&BoundRow> = rows
            .iter()
            .filter(|row| row.participant == participant)
            .filter(|row| file.fits_row_session(row.session.as_ref(), &ids.session))
            .collect();
        if candidates.is_empty() {
            let session = file.session.clone().unwrap_or_default();
            return excluded(ExclusionReason::SessionMismatch { session });
        }

        let inferred = file
            .category
            .clone()
            .or_else(|| match options.dataset_type {
                DatasetType::Derivatives => Some(self.spec.derivative_fallback().clone()),
                DatasetType::Raw => None,
            });

        if options.match_policy == MatchPolicy::SpecifiedOnly {
            let label = inferred
                .as_ref()
                .map(|c| c.label.clone())
                .unwrap_or_else(|| Category::UNKNOWN_LABEL.to_string());
            candidates.retain(|row| {
                row.declared
                    .as_ref()
                    .is_some_and(|declared| declared.label == label)
            });
            if candidates.is_empty() {
                return excluded(ExclusionReason::ModalityNotDeclared { category: label });
            }
        }

        let row = candidates[0];
        let session = resolve_session(row, file, default_session, &ids.session);
        let session = session.as_ref();

        let (category, destination) = match inferred {
            Some(category) => {
                let destination = paths::bids_destination(
                    dataset_root,
                    &row.participant,
                    session,
                    &category,
                    &file.extension,
                );
                (category, destination)
            }
            None => match options.unknown_policy {
                UnknownPolicy::Exclude => return excluded(ExclusionReason::UnknownCategory),
                UnknownPolicy::Retain => {
                    let destination = paths::sourcedata_destination(
                        dataset_root,
                        &row.participant,
                        session,
                        &file.file_name,
                    );
                    (Category::unknown(), destination)
                }
            },
        };

        Placement::Op(TransformOp {
            source: file.path.clone(),
            destination,
            participant_id: row.participant.clone(),
            session_id: session.cloned(),
            category: category.label,
            group: category.group,
            dataset_role: options.dataset_type.role(),
            metadata_row: row.number,
        })
    }
}

/// Session written into the destination.
///
/// A declared row session always wins. Otherwise raw files keep the session
/// their own name carries and fall back to the default; derivatives without a
/// declared session get none.
fn resolve_session(
    row: &BoundRow,
    file: &CandidateFile,
    default_session: Option<&NormalizedId>,
    normalizer: &IdNormalizer,
) -> Option<NormalizedId> {
    if let Some(session) = &row.session {
        return Some(session.clone());
    }
    let default_session = default_session?;
    file.session
        .as_deref()
        .and_then(|raw| normalizer.normalize(raw).ok())
        .or_else(|| Some(default_session.clone()))
}

fn excluded(reason: ExclusionReason) -> Placement {
    Placement::Skip(FileDisposition::Excluded { reason })
}

/// The pipeline name for derivatives, which must be a single path segment.
fn check_pipeline(dataset_type: DatasetType, pipeline_name: Option<&str>) -> Result<Option<&str>> {
    match dataset_type {
        DatasetType::Raw => Ok(None),
        DatasetType::Derivatives => {
            let name = pipeline_name.map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return Err(BidsError::config(
                    "a pipeline name is required for derivatives datasets",
                ));
            }
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(BidsError::config(format!(
                    "pipeline name {:?} must be a single folder name",
                    name
                )));
            }
            Ok(Some(name))
        }
    }
}

/// Reserve `destination`, appending `_2`, `_3`, ... to the stem until free.
fn claim_destination(taken: &mut HashSet<String>, destination: &Path) -> Result<(PathBuf, bool)> {
    if taken.insert(destination_key(destination)) {
        return Ok((destination.to_path_buf(), false));
    }

    for n in 2..=BidsConfig::MAX_COLLISION_SUFFIX {
        let candidate = paths::with_collision_suffix(destination, n);
        if taken.insert(destination_key(&candidate)) {
            return Ok((candidate, true));
        }
    }

    Err(BidsError::PlanningConflict {
        destination: destination.to_path_buf(),
        message: format!(
            "no free name after {} numeric suffixes",
            BidsConfig::MAX_COLLISION_SUFFIX
        ),
    })
}

fn plan_auxiliary(
    request: &PlanRequest<'_>,
    dataset_root: &Path,
    pipeline_name: Option<&str>,
    taken: &mut HashSet<String>,
) -> Result<Vec<AuxiliaryOp>> {
    let mut phenotype: Vec<&PathBuf> = request.auxiliary.phenotype.iter().collect();
    phenotype.sort();
    phenotype.dedup();
    let mut publications: Vec<&PathBuf> = request.auxiliary.publications.iter().collect();
    publications.sort();
    publications.dedup();

    let phenotype_dir = paths::phenotype_dir(dataset_root);
    let publications_dir = pipeline_name.map(|p| paths::publications_dir(request.output_root, p));

    let sources = phenotype
        .into_iter()
        .map(|source| (AuxiliaryKind::Phenotype, source, &phenotype_dir))
        .chain(publications.into_iter().filter_map(|source| {
            publications_dir
                .as_ref()
                .map(|dir| (AuxiliaryKind::Publication, source, dir))
        }));

    let mut ops = Vec::new();
    for (kind, source, dir) in sources {
        let file_name = source.file_name().ok_or_else(|| {
            BidsError::config(format!("{} is not a file path", source.display()))
        })?;
        let (destination, _) = claim_destination(taken, &dir.join(file_name))?;
        ops.push(AuxiliaryOp {
            kind,
            source: source.clone(),
            destination,
        });
    }
    Ok(ops)
}

/// One row per participant, in metadata order, with optional attributes.
///
/// A participant listed on several rows takes the first non-blank value of
/// each column.
fn participants_table(metadata: &MetadataTable, rows: &[BoundRow]) -> ParticipantsTable {
    let attributes: Vec<&String> = metadata
        .columns()
        .iter()
        .filter(|c| {
            !matches!(
                c.as_str(),
                PARTICIPANT_ID_COLUMN | SESSION_ID_COLUMN | MODALITY_COLUMN
            )
        })
        .collect();

    let mut columns = vec![PARTICIPANT_ID_COLUMN.to_string()];
    columns.extend(attributes.iter().map(|c| c.to_string()));

    let mut seen: Vec<&NormalizedId> = Vec::new();
    let mut table_rows = Vec::new();
    for row in rows {
        if seen.contains(&&row.participant) {
            continue;
        }
        seen.push(&row.participant);

        let sources: Vec<_> = rows
            .iter()
            .filter(|r| r.participant == row.participant)
            .map(|r| &metadata.rows()[r.number - 1])
            .collect();

        let mut cells = vec![format!("sub-{}", row.participant)];
        for column in &attributes {
            let value = sources
                .iter()
                .filter_map(|r| r.get(column))
                .find(|v| !v.trim().is_empty())
                .unwrap_or(MISSING_VALUE);
            cells.push(value.to_string());
        }
        table_rows.push(cells);
    }

    ParticipantsTable {
        columns,
        rows: table_rows,
    }
}

fn descriptor(dataset_type: DatasetType, pipeline_name: Option<&str>) -> DatasetDescriptor {
    let generated_by = vec![GeneratedBy {
        name: BidsConfig::GENERATOR_NAME.to_string(),
        version: BidsConfig::GENERATOR_VERSION.to_string(),
    }];

    match (dataset_type, pipeline_name) {
        (DatasetType::Derivatives, Some(pipeline)) => DatasetDescriptor {
            name: pipeline.to_string(),
            bids_version: BidsConfig::BIDS_VERSION.to_string(),
            dataset_type,
            pipeline_description: Some(PipelineDescription {
                name: pipeline.to_string(),
                version: BidsConfig::GENERATOR_VERSION.to_string(),
            }),
            generated_by,
            date: None,
        },
        _ => DatasetDescriptor {
            name: BidsConfig::RAW_DATASET_NAME.to_string(),
            bids_version: BidsConfig::BIDS_VERSION.to_string(),
            dataset_type,
            pipeline_description: None,
            generated_by,
            date: None,
        },
    }
}

fn summarize(
    accounting: &[FileAccount],
    operations: &[TransformOp],
    auxiliary: usize,
    collisions_resolved: usize,
) -> PlanSummary {
    let mut summary = PlanSummary {
        total_files: accounting.len(),
        operations: operations.len(),
        collisions_resolved,
        auxiliary,
        ..Default::default()
    };
    for account in accounting {
        match account.disposition {
            FileDisposition::Matched { .. } => summary.matched += 1,
            FileDisposition::Unmatched => summary.unmatched += 1,
            FileDisposition::Excluded { .. } => summary.excluded += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataRow;
    use crate::planner::{AuxiliaryFiles, PlanOptions};

    fn plan_for(
        metadata: &MetadataTable,
        files: &[&str],
        options: PlanOptions,
    ) -> Result<Plan> {
        let listing: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
        let request = PlanRequest {
            metadata,
            listing: &listing,
            output_root: Path::new("/out"),
            options,
            auxiliary: AuxiliaryFiles::default(),
        };
        Planner::default().plan(&request)
    }

    fn raw() -> PlanOptions {
        PlanOptions::default()
    }

    fn derivatives(pipeline: &str) -> PlanOptions {
        PlanOptions {
            dataset_type: DatasetType::Derivatives,
            pipeline_name: Some(pipeline.to_string()),
            ..Default::default()
        }
    }

    fn destinations(plan: &Plan) -> Vec<String> {
        plan.destinations()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_raw_layout_with_default_session() {
        let metadata = MetadataTable::with_participants(&["001", "002"]);
        let plan = plan_for(
            &metadata,
            &["/in/patient_001/T1w.nii.gz", "/in/patient_002/FLAIR.nii.gz"],
            raw(),
        )
        .unwrap();

        assert_eq!(
            destinations(&plan),
            vec![
                "/out/sub-001/ses-01/anat/sub-001_ses-01_T1w.nii.gz",
                "/out/sub-002/ses-01/anat/sub-002_ses-01_FLAIR.nii.gz",
            ]
        );
        assert_eq!(plan.summary.matched, 2);
        plan.check_invariants().unwrap();
    }

    #[test]
    fn test_missing_pipeline_name_is_configuration_error() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let options = PlanOptions {
            dataset_type: DatasetType::Derivatives,
            ..Default::default()
        };
        let result = plan_for(&metadata, &["/in/001_T1w.nii"], options);
        assert!(matches!(result, Err(BidsError::Configuration { .. })));
    }

    #[test]
    fn test_pipeline_name_must_be_single_segment() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let result = plan_for(&metadata, &["/in/001_T1w.nii"], derivatives("a/b"));
        assert!(matches!(result, Err(BidsError::Configuration { .. })));
    }

    #[test]
    fn test_empty_participant_id_blocks_planning() {
        let metadata = MetadataTable::from_rows(vec![MetadataRow::new("001"), MetadataRow::new("  ")]);
        let result = plan_for(&metadata, &["/in/001_T1w.nii"], raw());
        assert!(matches!(result, Err(BidsError::Validation { .. })));
    }

    #[test]
    fn test_collisions_get_numeric_suffixes_in_listing_order() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let plan = plan_for(
            &metadata,
            &["/in/001/t1_b.nii.gz", "/in/001/t1_a.nii.gz"],
            raw(),
        )
        .unwrap();

        assert_eq!(
            destinations(&plan),
            vec![
                "/out/sub-001/ses-01/anat/sub-001_ses-01_T1w.nii.gz",
                "/out/sub-001/ses-01/anat/sub-001_ses-01_T1w_2.nii.gz",
            ]
        );
        // t1_a sorts first and keeps the plain name
        assert_eq!(plan.operations[0].source, PathBuf::from("/in/001/t1_a.nii.gz"));
        assert_eq!(plan.summary.collisions_resolved, 1);
    }

    #[test]
    fn test_listing_order_does_not_change_plan() {
        let metadata = MetadataTable::with_participants(&["001", "002"]);
        let files = ["/in/002_flair.nii", "/in/001_t1w.nii", "/in/001_t1w_rerun.nii"];
        let mut reversed = files;
        reversed.reverse();

        let a = plan_for(&metadata, &files, raw()).unwrap();
        let b = plan_for(&metadata, &reversed, raw()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_explicit_session_selects_row() {
        let metadata = MetadataTable::from_rows(vec![
            MetadataRow::new("001").with_session("1"),
            MetadataRow::new("001").with_session("2"),
        ]);
        let plan = plan_for(
            &metadata,
            &["/in/sub-001_ses-02_T1w.nii", "/in/sub-001_ses-03_T1w.nii"],
            raw(),
        )
        .unwrap();

        assert_eq!(
            destinations(&plan),
            vec!["/out/sub-001/ses-02/anat/sub-001_ses-02_T1w.nii"]
        );
        assert_eq!(plan.operations[0].metadata_row, 2);
        assert!(matches!(
            &plan.accounting[1].disposition,
            FileDisposition::Excluded {
                reason: ExclusionReason::SessionMismatch { session }
            } if session == "03"
        ));
    }

    #[test]
    fn test_derivative_session_token_without_session_column() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let plan = plan_for(
            &metadata,
            &["/in/sub-001_ses-01_lesion.nii.gz"],
            derivatives("lesion_analysis"),
        )
        .unwrap();

        assert_eq!(
            destinations(&plan),
            vec!["/out/derivatives/lesion_analysis/sub-001/anat/sub-001_lesion.nii.gz"]
        );
        assert_eq!(plan.operations[0].session_id, None);
    }

    #[test]
    fn test_raw_file_keeps_its_session_without_session_column() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let plan = plan_for(
            &metadata,
            &["/in/sub-001_ses-02_T1w.nii.gz", "/in/sub-001_T1w.nii.gz"],
            raw(),
        )
        .unwrap();

        assert_eq!(
            destinations(&plan),
            vec![
                "/out/sub-001/ses-01/anat/sub-001_ses-01_T1w.nii.gz",
                "/out/sub-001/ses-02/anat/sub-001_ses-02_T1w.nii.gz",
            ]
        );
        assert_eq!(plan.summary.excluded, 0);
    }

    #[test]
    fn test_default_session_follows_session_pad_width() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let options = PlanOptions {
            ids: IdPolicy::new(3, 3),
            ..Default::default()
        };
        let plan = plan_for(
            &metadata,
            &["/in/sub-001_ses-01_T1w.nii", "/in/sub-001_FLAIR.nii"],
            options,
        )
        .unwrap();

        assert_eq!(
            destinations(&plan),
            vec![
                "/out/sub-001/ses-001/anat/sub-001_ses-001_FLAIR.nii",
                "/out/sub-001/ses-001/anat/sub-001_ses-001_T1w.nii",
            ]
        );
    }

    #[test]
    fn test_specified_only_filters_by_declared_modality() {
        let metadata = MetadataTable::from_rows(vec![
            MetadataRow::new("001").with_field("modality", "T1w"),
        ]);
        let options = PlanOptions {
            match_policy: MatchPolicy::SpecifiedOnly,
            ..Default::default()
        };
        let plan = plan_for(
            &metadata,
            &["/in/001/flair.nii", "/in/001/mprage.nii", "/in/001/notes.nii"],
            options,
        )
        .unwrap();

        assert_eq!(
            destinations(&plan),
            vec!["/out/sub-001/ses-01/anat/sub-001_ses-01_T1w.nii"]
        );
        assert_eq!(plan.summary.excluded, 2);
    }

    #[test]
    fn test_unknown_category_retained_or_excluded() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let plan = plan_for(&metadata, &["/in/001/notes.nii"], raw()).unwrap();
        assert_eq!(
            destinations(&plan),
            vec!["/out/sourcedata/sub-001/ses-01/notes.nii"]
        );
        assert_eq!(plan.operations[0].category, "unknown");

        let options = PlanOptions {
            unknown_policy: UnknownPolicy::Exclude,
            ..Default::default()
        };
        let plan = plan_for(&metadata, &["/in/001/notes.nii"], options).unwrap();
        assert!(plan.operations.is_empty());
        assert_eq!(plan.summary.excluded, 1);
    }

    #[test]
    fn test_derivative_without_keyword_uses_fallback() {
        let metadata = MetadataTable::with_participants(&["Ross1981-case2"]);
        let plan = plan_for(
            &metadata,
            &["/in/Ross1981-case2.nii.gz"],
            derivatives("lesion_analysis"),
        )
        .unwrap();

        assert_eq!(
            destinations(&plan),
            vec!["/out/derivatives/lesion_analysis/sub-ross1981ucase2/anat/sub-ross1981ucase2_lesion.nii.gz"]
        );
        assert!(plan.participants.is_none());
        assert_eq!(plan.dataset_root, PathBuf::from("/out/derivatives/lesion_analysis"));
    }

    #[test]
    fn test_participants_table_merges_rows() {
        let metadata = MetadataTable::from_rows(vec![
            MetadataRow::new("1")
                .with_session("1")
                .with_field("age", "")
                .with_field("modality", "T1w"),
            MetadataRow::new("001")
                .with_session("2")
                .with_field("age", "34")
                .with_field("modality", "FLAIR"),
            MetadataRow::new("2").with_session("1").with_field("age", ""),
        ]);
        let plan = plan_for(&metadata, &[], raw()).unwrap();
        let table = plan.participants.unwrap();

        assert_eq!(table.columns, vec!["participant_id", "age"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["sub-001".to_string(), "34".to_string()],
                vec!["sub-002".to_string(), "n/a".to_string()],
            ]
        );
    }

    #[test]
    fn test_publications_require_derivatives() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let request = PlanRequest {
            metadata: &metadata,
            listing: &[],
            output_root: Path::new("/out"),
            options: raw(),
            auxiliary: AuxiliaryFiles {
                phenotype: vec![],
                publications: vec![PathBuf::from("/docs/paper.pdf")],
            },
        };
        let result = Planner::default().plan(&request);
        assert!(matches!(result, Err(BidsError::Configuration { .. })));
    }

    #[test]
    fn test_auxiliary_side_folders() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let request = PlanRequest {
            metadata: &metadata,
            listing: &[],
            output_root: Path::new("/out"),
            options: derivatives("lesion_analysis"),
            auxiliary: AuxiliaryFiles {
                phenotype: vec![PathBuf::from("/docs/scores.tsv")],
                publications: vec![PathBuf::from("/docs/paper.pdf")],
            },
        };
        let plan = Planner::default().plan(&request).unwrap();

        let destinations: Vec<&Path> = plan.auxiliary.iter().map(|a| a.destination.as_path()).collect();
        assert_eq!(
            destinations,
            vec![
                Path::new("/out/derivatives/lesion_analysis/phenotype/scores.tsv"),
                Path::new("/out/derivatives/publications/lesion_analysis/paper.pdf"),
            ]
        );
        assert_eq!(plan.summary.auxiliary, 2);
    }

    #[test]
    fn test_descriptor_fields() {
        let metadata = MetadataTable::with_participants(&["001"]);
        let plan = plan_for(&metadata, &[], derivatives("lesion_analysis")).unwrap();
        assert_eq!(plan.descriptor.name, "lesion_analysis");
        assert_eq!(
            plan.descriptor.pipeline_description.as_ref().map(|p| p.name.as_str()),
            Some("lesion_analysis")
        );
        assert!(plan.descriptor.date.is_none());
    }
}
