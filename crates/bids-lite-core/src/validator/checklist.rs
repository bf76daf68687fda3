//! Minimal metadata checklist.

use crate::metadata::PARTICIPANT_ID_COLUMN;
use serde::{Deserialize, Serialize};

/// Sex values accepted without a warning. The empty string covers blank cells.
const ALLOWED_SEX: &[&str] = &[
    "M", "F", "Male", "Female", "f", "m", "male", "female", "NA", "na", "N/A", "",
];

/// Columns and vocabularies the validator checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    /// Only `participant_id` is required; sessions, age and sex are optional.
    pub required_columns: Vec<String>,
    pub allowed_sex: Vec<String>,
}

impl Checklist {
    pub fn minimal() -> Self {
        Self {
            required_columns: vec![PARTICIPANT_ID_COLUMN.to_string()],
            allowed_sex: ALLOWED_SEX.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Case-sensitive, like the vocabulary itself.
    pub fn is_allowed_sex(&self, value: &str) -> bool {
        self.allowed_sex.iter().any(|allowed| allowed == value.trim())
    }
}

impl Default for Checklist {
    fn default() -> Self {
        Self::minimal()
    }
}
