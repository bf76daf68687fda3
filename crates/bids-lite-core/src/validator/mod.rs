//! Metadata and input validation.
//!
//! Validation is advisory except for errors: a report with errors must stop
//! the run before planning, while warnings are shown to the user, who decides
//! whether to go on.
//!
//! Checks, in order:
//! 1. required columns present, every participant id non-empty
//! 2. duplicate participant/session/modality rows
//! 3. at least one input file per row
//! 4. out-of-vocabulary `sex` and `modality` values
//! 5. identifiers that are still not filesystem-safe after normalization

mod checklist;

pub use checklist::Checklist;

use crate::metadata::{MetadataTable, SEX_COLUMN};
use crate::naming::{is_filesystem_safe, IdPolicy, NamingSpec, NormalizedId};
use crate::planner::CandidateFile;
use crate::{BidsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Kind of validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    MissingColumn,
    EmptyIdentifier,
    DuplicateRow,
    FileMissing,
    BadSex,
    BadModality,
    IllegalCharacter,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingColumn => "MISSING_COLUMN",
            IssueCode::EmptyIdentifier => "EMPTY_IDENTIFIER",
            IssueCode::DuplicateRow => "DUPLICATE_ROW",
            IssueCode::FileMissing => "FILE_MISSING",
            IssueCode::BadSex => "BAD_SEX",
            IssueCode::BadModality => "BAD_MODALITY",
            IssueCode::IllegalCharacter => "ILLEGAL_CHARACTER",
        }
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    /// 1-based metadata row, when the finding concerns one row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}

impl ValidationIssue {
    fn new(code: IssueCode, message: impl Into<String>, row: Option<usize>) -> Self {
        Self {
            code,
            message: message.into(),
            row,
        }
    }
}

/// Outcome of validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// All findings with the given code, errors first.
    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(move |issue| issue.code == code)
    }

    /// Turn a report with errors into a `BidsError::Validation`.
    pub fn ensure_valid(&self) -> Result<()> {
        match self.errors.first() {
            None => Ok(()),
            Some(first) => Err(BidsError::Validation {
                field: first.code.as_str().to_string(),
                message: if self.errors.len() > 1 {
                    format!("{} (and {} more errors)", first.message, self.errors.len() - 1)
                } else {
                    first.message.clone()
                },
            }),
        }
    }

    /// Plain-text rendering, one finding per line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.is_clean() {
            out.push_str("Validation passed with no issues.\n");
            return out;
        }
        for (level, issues) in [("ERROR", &self.errors), ("WARN", &self.warnings)] {
            for issue in issues {
                let _ = write!(out, "{:<5} [{}] {}", level, issue.code.as_str(), issue.message);
                if let Some(row) = issue.row {
                    let _ = write!(out, " (row {})", row);
                }
                out.push('\n');
            }
        }
        let _ = writeln!(
            out,
            "{} errors, {} warnings",
            self.errors.len(),
            self.warnings.len()
        );
        out
    }

    fn error(&mut self, code: IssueCode, message: impl Into<String>, row: Option<usize>) {
        self.errors.push(ValidationIssue::new(code, message, row));
    }

    fn warn(&mut self, code: IssueCode, message: impl Into<String>, row: Option<usize>) {
        self.warnings.push(ValidationIssue::new(code, message, row));
    }
}

/// Inputs that steer validation besides the table and listing.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub checklist: Checklist,
    pub ids: IdPolicy,
    pub spec: NamingSpec,
}

/// Validate a metadata table against the input listing.
pub fn validate(
    table: &MetadataTable,
    listing: &[PathBuf],
    context: &ValidationContext,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for column in &context.checklist.required_columns {
        if !table.has_column(column) {
            report.error(
                IssueCode::MissingColumn,
                format!("Missing required column: {}", column),
                None,
            );
        }
    }
    if report.has_errors() {
        return report;
    }

    // Normalized ids per row; `None` where the participant id is unusable.
    let mut normalized: Vec<Option<(NormalizedId, Option<NormalizedId>)>> =
        Vec::with_capacity(table.len());
    for (index, row) in table.rows().iter().enumerate() {
        let number = index + 1;
        let Ok(participant) = context.ids.participant.normalize(&row.participant_id) else {
            report.error(
                IssueCode::EmptyIdentifier,
                format!("participant_id {:?} is empty", row.participant_id),
                Some(number),
            );
            normalized.push(None);
            continue;
        };

        let session = match &row.session_id {
            Some(raw) => match context.ids.session.normalize(raw) {
                Ok(session) => Some(session),
                Err(_) => {
                    report.error(
                        IssueCode::EmptyIdentifier,
                        format!("session_id {:?} is empty after normalization", raw),
                        Some(number),
                    );
                    normalized.push(None);
                    continue;
                }
            },
            None => None,
        };

        for id in std::iter::once(&participant).chain(session.as_ref()) {
            if !is_filesystem_safe(id.as_str()) {
                report.error(
                    IssueCode::IllegalCharacter,
                    format!("identifier {:?} is not filesystem-safe", id.as_str()),
                    Some(number),
                );
            }
        }

        normalized.push(Some((participant, session)));
    }
    if report.has_errors() {
        return report;
    }

    check_duplicates(table, &normalized, &mut report);
    check_files(table, listing, &normalized, context, &mut report);
    check_vocabularies(table, context, &mut report);

    if report.has_errors() {
        warn!("Validation found {} errors", report.errors.len());
    }
    debug!(
        "Validation finished: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );
    report
}

type RowIds = Option<(NormalizedId, Option<NormalizedId>)>;

/// Rows differing only in declared modality are how several modalities are
/// declared for one participant, so modality is part of the key.
fn check_duplicates(table: &MetadataTable, normalized: &[RowIds], report: &mut ValidationReport) {
    let mut first_seen: HashMap<(NormalizedId, Option<NormalizedId>, String), usize> =
        HashMap::new();

    for (index, (row, ids)) in table.rows().iter().zip(normalized).enumerate() {
        let Some((participant, session)) = ids else {
            continue;
        };
        let modality = row.modality().unwrap_or_default().trim().to_lowercase();
        let key = (participant.clone(), session.clone(), modality);
        match first_seen.get(&key) {
            Some(first) => report.warn(
                IssueCode::DuplicateRow,
                format!(
                    "participant={} duplicates row {}",
                    row.participant_id, first
                ),
                Some(index + 1),
            ),
            None => {
                first_seen.insert(key, index + 1);
            }
        }
    }
}

fn check_files(
    table: &MetadataTable,
    listing: &[PathBuf],
    normalized: &[RowIds],
    context: &ValidationContext,
    report: &mut ValidationReport,
) {
    let candidates: Vec<CandidateFile> = listing
        .iter()
        .map(|path| CandidateFile::new(path, &context.spec))
        .collect();

    for (index, (row, ids)) in table.rows().iter().zip(normalized).enumerate() {
        let Some((participant, session)) = ids else {
            continue;
        };

        let found = candidates.iter().any(|file| {
            file.match_participant(participant, &context.ids.participant)
                .is_some()
                && file.fits_row_session(session.as_ref(), &context.ids.session)
        });

        if !found {
            let message = match &row.session_id {
                Some(session) => format!(
                    "No file found matching participant={}, session={}",
                    row.participant_id, session
                ),
                None => format!("No file found matching participant={}", row.participant_id),
            };
            report.warn(IssueCode::FileMissing, message, Some(index + 1));
        }
    }
}

fn check_vocabularies(table: &MetadataTable, context: &ValidationContext, report: &mut ValidationReport) {
    for (index, row) in table.rows().iter().enumerate() {
        if let Some(sex) = row.get(SEX_COLUMN) {
            if !context.checklist.is_allowed_sex(sex) {
                report.warn(
                    IssueCode::BadSex,
                    format!(
                        "sex value {:?} is not in the standard vocabulary ({})",
                        sex,
                        context.checklist.allowed_sex.join(", ")
                    ),
                    Some(index + 1),
                );
            }
        }

        if let Some(modality) = row.modality() {
            if context.spec.resolve_declared(modality).is_none() {
                report.warn(
                    IssueCode::BadModality,
                    format!("modality {:?} matches no known category", modality),
                    Some(index + 1),
                );
            }
        }
    }
}
