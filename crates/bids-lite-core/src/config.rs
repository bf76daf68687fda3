//! Centralized configuration for the organizer.
//!
//! Constant holders for the layout conventions plus `OrganizerOptions`, the
//! bundle of run inputs supplied by a shell (CLI, GUI) or a JSON config file.

use crate::metadata::atomic_read_json;
use crate::naming::IdPolicy;
use crate::planner::{DatasetType, MatchPolicy, UnknownPolicy};
use crate::writer::TransferMode;
use crate::{BidsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// BIDS conventions and generator identity.
pub struct BidsConfig;

impl BidsConfig {
    pub const BIDS_VERSION: &'static str = "1.9.0";
    pub const GENERATOR_NAME: &'static str = "BIDS Lite";
    pub const GENERATOR_VERSION: &'static str = env!("CARGO_PKG_VERSION");
    pub const RAW_DATASET_NAME: &'static str = "BIDS Lite Dataset";
    /// Session assigned to raw data when the metadata has none.
    pub const DEFAULT_RAW_SESSION: &'static str = "01";
    /// Character that replaces separator runs inside identifiers.
    pub const FILLER: char = 'u';
    pub const DEFAULT_PARTICIPANT_PAD_WIDTH: usize = 3;
    pub const DEFAULT_SESSION_PAD_WIDTH: usize = 2;
    /// Highest numeric suffix tried before a collision is declared unresolvable.
    pub const MAX_COLLISION_SUFFIX: usize = 9999;
}

/// Directory and file names of the output layout.
pub struct PathsConfig;

impl PathsConfig {
    pub const DERIVATIVES_DIR_NAME: &'static str = "derivatives";
    pub const PHENOTYPE_DIR_NAME: &'static str = "phenotype";
    pub const PUBLICATIONS_DIR_NAME: &'static str = "publications";
    pub const SOURCEDATA_DIR_NAME: &'static str = "sourcedata";
    pub const LOGS_DIR_NAME: &'static str = "logs";
    pub const DATASET_DESCRIPTION_FILENAME: &'static str = "dataset_description.json";
    pub const PARTICIPANTS_FILENAME: &'static str = "participants.tsv";
    pub const README_FILENAME: &'static str = "README.md";
    pub const REPORT_FILENAME: &'static str = "report.md";
    pub const TEMP_SUFFIX: &'static str = ".tmp";
}

/// Input discovery settings.
pub struct ScanConfig;

impl ScanConfig {
    /// NIfTI containers, plain and gzip-compressed.
    pub const DEFAULT_EXTENSIONS: &'static [&'static str] = &[".nii", ".nii.gz"];
}

/// Run inputs for one organize invocation.
///
/// Every field has a default so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct OrganizerOptions {
    pub dataset_type: DatasetType,
    pub pipeline_name: Option<String>,
    pub match_policy: MatchPolicy,
    pub unknown_policy: UnknownPolicy,
    pub transfer_mode: TransferMode,
    pub participant_pad_width: usize,
    pub session_pad_width: usize,
    pub extensions: Vec<String>,
}

impl Default for OrganizerOptions {
    fn default() -> Self {
        Self {
            dataset_type: DatasetType::Raw,
            pipeline_name: None,
            match_policy: MatchPolicy::AllModalities,
            unknown_policy: UnknownPolicy::Retain,
            transfer_mode: TransferMode::Copy,
            participant_pad_width: BidsConfig::DEFAULT_PARTICIPANT_PAD_WIDTH,
            session_pad_width: BidsConfig::DEFAULT_SESSION_PAD_WIDTH,
            extensions: ScanConfig::DEFAULT_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl OrganizerOptions {
    /// Load options from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        atomic_read_json(path)?.ok_or_else(|| BidsError::FileNotFound(path.to_path_buf()))
    }

    /// Identifier normalizers for this run.
    pub fn id_policy(&self) -> IdPolicy {
        IdPolicy::new(self.participant_pad_width, self.session_pad_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let options = OrganizerOptions::default();
        assert_eq!(options.dataset_type, DatasetType::Raw);
        assert_eq!(options.match_policy, MatchPolicy::AllModalities);
        assert_eq!(options.transfer_mode, TransferMode::Copy);
        assert_eq!(options.extensions, vec![".nii", ".nii.gz"]);
        assert!(options.pipeline_name.is_none());
    }

    #[test]
    fn test_load_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("organizer.json");
        std::fs::write(
            &path,
            r#"{"dataset_type": "derivatives", "pipeline_name": "lesion_analysis"}"#,
        )
        .unwrap();

        let options = OrganizerOptions::load(&path).unwrap();
        assert_eq!(options.dataset_type, DatasetType::Derivatives);
        assert_eq!(options.pipeline_name.as_deref(), Some("lesion_analysis"));
        assert_eq!(options.participant_pad_width, 3);
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let result = OrganizerOptions::load(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(BidsError::FileNotFound(_))));
    }
}
