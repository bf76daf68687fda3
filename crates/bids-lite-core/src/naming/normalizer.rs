//! Participant and session identifier normalization.
//!
//! Free-text identifiers from a metadata table ("Smith-2023 A", "patient_001",
//! "  1 ") become stable, filesystem-safe tokens usable inside `sub-<id>` and
//! `ses-<id>` entities.

use crate::config::BidsConfig;
use crate::{BidsError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Runs of identifier separators (whitespace, hyphen, underscore).
static SEPARATOR_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-_]+").unwrap());

/// Token boundaries in file and folder names. Dots split too, so leftover
/// extension fragments never glue onto a neighbouring token.
static TOKEN_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-_.]+").unwrap());

/// A canonical identifier: lowercase ASCII alphanumerics only.
///
/// The filler character is itself alphanumeric, so the invariant is simply
/// `[a-z0-9]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedId(String);

impl NormalizedId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_numeric(&self) -> bool {
        self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for NormalizedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier normalizer with a minimum width for purely numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdNormalizer {
    pad_width: usize,
}

impl IdNormalizer {
    pub fn new(pad_width: usize) -> Self {
        Self { pad_width }
    }

    pub fn pad_width(&self) -> usize {
        self.pad_width
    }

    /// Normalize a raw identifier.
    ///
    /// # Rules Applied
    /// 1. Trim surrounding whitespace
    /// 2. Convert to lowercase
    /// 3. Replace each run of whitespace, `-` and `_` with a single filler (`u`)
    /// 4. Remove every character outside `[a-z0-9]`
    /// 5. Left-pad purely numeric results with `0` to the configured width
    ///
    /// Applying the function to its own output returns the output unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use bids_lite_core::naming::IdNormalizer;
    ///
    /// let normalizer = IdNormalizer::new(3);
    /// assert_eq!(normalizer.normalize("Ross1981-case2").unwrap().as_str(), "ross1981ucase2");
    /// assert_eq!(normalizer.normalize("1").unwrap().as_str(), "001");
    /// ```
    pub fn normalize(&self, raw: &str) -> Result<NormalizedId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BidsError::InvalidIdentifier {
                raw: raw.to_string(),
            });
        }

        let lowered = trimmed.to_lowercase();
        let filled = SEPARATOR_RUNS.replace_all(&lowered, BidsConfig::FILLER.to_string().as_str());
        let mut result: String = filled
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();

        if result.is_empty() {
            return Err(BidsError::InvalidIdentifier {
                raw: raw.to_string(),
            });
        }

        if result.len() < self.pad_width && result.bytes().all(|b| b.is_ascii_digit()) {
            result = format!("{:0>width$}", result, width = self.pad_width);
        }

        Ok(NormalizedId(result))
    }
}

/// The pair of normalizers used for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdPolicy {
    pub participant: IdNormalizer,
    pub session: IdNormalizer,
}

impl IdPolicy {
    pub fn new(participant_pad_width: usize, session_pad_width: usize) -> Self {
        Self {
            participant: IdNormalizer::new(participant_pad_width),
            session: IdNormalizer::new(session_pad_width),
        }
    }
}

impl Default for IdPolicy {
    fn default() -> Self {
        Self::new(
            BidsConfig::DEFAULT_PARTICIPANT_PAD_WIDTH,
            BidsConfig::DEFAULT_SESSION_PAD_WIDTH,
        )
    }
}

/// Whether a string is safe to embed in a BIDS entity.
pub fn is_filesystem_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Whether two adjacent bytes switch between digits and non-digits.
pub(crate) fn is_class_boundary(a: u8, b: u8) -> bool {
    a.is_ascii_digit() != b.is_ascii_digit()
}

/// Split a file or folder name into lowercase tokens on separators and dots.
pub fn split_tokens(name: &str) -> Vec<String> {
    TOKEN_SPLIT
        .split(name)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn norm(raw: &str) -> String {
        IdNormalizer::new(3).normalize(raw).unwrap().to_string()
    }

    #[test]
    fn test_normalize_spaces_and_case() {
        assert_eq!(norm("  Ab 1 "), "abu1");
        // A run of separators collapses into one filler
        assert_eq!(norm("S  02"), "su02");
        assert_eq!(norm("a -_ b"), "aub");
    }

    #[test]
    fn test_normalize_special_chars() {
        assert_eq!(norm("Smith-2023_A"), "smithu2023ua");
        assert_eq!(norm("Smith-2023 A"), "smithu2023ua");
        assert_eq!(norm("patient_001"), "patientu001");
        assert_eq!(norm("Ross1981-case2"), "ross1981ucase2");
        assert_eq!(norm("case#7/b"), "case7b");
    }

    #[test]
    fn test_numeric_padding() {
        assert_eq!(norm("1"), "001");
        assert_eq!(norm("01"), "001");
        assert_eq!(norm("001"), "001");
        assert_eq!(norm("12"), "012");
        assert_eq!(norm("1234"), "1234");
        assert_eq!(norm("1"), norm("001"));
    }

    #[test]
    fn test_padding_width_is_configurable() {
        let session = IdNormalizer::new(2);
        assert_eq!(session.normalize("1").unwrap().as_str(), "01");
        assert_eq!(session.normalize("01").unwrap().as_str(), "01");
        assert_eq!(session.normalize("001").unwrap().as_str(), "001");
    }

    #[test]
    fn test_alphanumeric_not_padded() {
        assert_eq!(norm("a1"), "a1");
        assert_eq!(norm("Ahmed"), "ahmed");
    }

    #[test]
    fn test_empty_is_invalid() {
        let normalizer = IdNormalizer::new(3);
        assert!(matches!(
            normalizer.normalize("   "),
            Err(BidsError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            normalizer.normalize("###"),
            Err(BidsError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_split_tokens() {
        assert_eq!(
            split_tokens("sub-001_ses-01_T1w"),
            vec!["sub", "001", "ses", "01", "t1w"]
        );
        assert_eq!(split_tokens("patient 002"), vec!["patient", "002"]);
        assert!(split_tokens("__").is_empty());
    }

    #[test]
    fn test_filesystem_safe() {
        assert!(is_filesystem_safe("ross1981ucase2"));
        assert!(!is_filesystem_safe("sub-01"));
        assert!(!is_filesystem_safe(""));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in "\\PC{0,24}", width in 0usize..5) {
            let normalizer = IdNormalizer::new(width);
            if let Ok(once) = normalizer.normalize(&raw) {
                let twice = normalizer.normalize(once.as_str()).unwrap();
                prop_assert_eq!(once, twice);
            }
        }

        #[test]
        fn prop_output_is_filesystem_safe(raw in "[ A-Za-z0-9_\\-.#/]{1,24}") {
            if let Ok(id) = IdNormalizer::new(3).normalize(&raw) {
                prop_assert!(is_filesystem_safe(id.as_str()));
            }
        }
    }
}
