//! Category keyword table.
//!
//! Maps filename keywords to the BIDS suffix written into destination names
//! and the modality folder that receives the file. The table is an immutable
//! value handed to the planner; nothing reads it from global state.

use super::normalizer::is_class_boundary;
use serde::{Deserialize, Serialize};

/// Category group of a file, which decides the modality folder family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryGroup {
    Anatomical,
    Functional,
    Diffusion,
    Perfusion,
    DerivativeOther,
    Unknown,
}

impl CategoryGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryGroup::Anatomical => "anatomical",
            CategoryGroup::Functional => "functional",
            CategoryGroup::Diffusion => "diffusion",
            CategoryGroup::Perfusion => "perfusion",
            CategoryGroup::DerivativeOther => "derivative-other",
            CategoryGroup::Unknown => "unknown",
        }
    }
}

/// The resolved category of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Suffix written into the destination filename (`T1w`, `FLAIR`, `lesion`).
    pub label: String,
    pub group: CategoryGroup,
    /// Modality folder (`anat`, `func`, ...). `None` for unknown files.
    pub folder: Option<String>,
}

impl Category {
    pub const UNKNOWN_LABEL: &'static str = "unknown";

    pub fn new(label: &str, group: CategoryGroup, folder: &str) -> Self {
        Self {
            label: label.to_string(),
            group,
            folder: Some(folder.to_string()),
        }
    }

    pub fn unknown() -> Self {
        Self {
            label: Self::UNKNOWN_LABEL.to_string(),
            group: CategoryGroup::Unknown,
            folder: None,
        }
    }
}

/// One keyword of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Lowercase keyword searched for in name tokens.
    pub keyword: String,
    pub category: Category,
}

/// How a keyword hit a token. Exact beats prefix beats embedded at equal
/// keyword length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum KeywordHit {
    /// Inside a token between digit/letter transitions, as in `001t1w`.
    Embedded,
    Prefix,
    Exact,
}

/// Keywords shorter than this only match whole tokens.
const MIN_PREFIX_KEYWORD_LEN: usize = 3;

/// The immutable keyword table for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingSpec {
    rules: Vec<CategoryRule>,
    derivative_fallback: Category,
}

impl NamingSpec {
    /// Build a table from explicit rules. Keywords are lower-cased.
    pub fn new(rules: Vec<CategoryRule>, derivative_fallback: Category) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                rule.keyword = rule.keyword.to_lowercase();
                rule
            })
            .collect();
        Self {
            rules,
            derivative_fallback,
        }
    }

    /// The default table: common anatomical, functional, diffusion and
    /// perfusion keywords plus lesion and connectivity derivatives.
    pub fn standard() -> Self {
        use CategoryGroup::*;

        let table: &[(&str, &str, CategoryGroup, &str)] = &[
            ("t1w", "T1w", Anatomical, "anat"),
            ("t1", "T1w", Anatomical, "anat"),
            ("mprage", "T1w", Anatomical, "anat"),
            ("t2w", "T2w", Anatomical, "anat"),
            ("t2", "T2w", Anatomical, "anat"),
            ("t2starw", "T2starw", Anatomical, "anat"),
            ("t2star", "T2starw", Anatomical, "anat"),
            ("flair", "FLAIR", Anatomical, "anat"),
            ("pdw", "PDw", Anatomical, "anat"),
            ("pd", "PDw", Anatomical, "anat"),
            ("bold", "bold", Functional, "func"),
            ("fmri", "bold", Functional, "func"),
            ("rest", "bold", Functional, "func"),
            ("dwi", "dwi", Diffusion, "dwi"),
            ("dti", "dwi", Diffusion, "dwi"),
            ("asl", "asl", Perfusion, "perf"),
            ("lesion", "lesion", Anatomical, "anat"),
            ("mask", "lesion", Anatomical, "anat"),
            ("roi", "lesion", Anatomical, "anat"),
            ("connectivity", "connectivity", DerivativeOther, "connectivity"),
            ("conn", "connectivity", DerivativeOther, "connectivity"),
        ];

        let rules = table
            .iter()
            .map(|&(keyword, label, group, folder)| CategoryRule {
                keyword: keyword.to_string(),
                category: Category::new(label, group, folder),
            })
            .collect();

        Self::new(rules, Category::new("lesion", Anatomical, "anat"))
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Whether `token` (lowercase) is exactly one of the keywords.
    pub fn is_keyword(&self, token: &str) -> bool {
        self.rules.iter().any(|rule| rule.keyword == token)
    }

    /// Category given to derivative files that match no keyword.
    pub fn derivative_fallback(&self) -> &Category {
        &self.derivative_fallback
    }

    /// Infer a category from name tokens.
    ///
    /// `primary` (filename tokens) is searched before `secondary` (parent
    /// folder tokens). Within one token list the longest keyword wins and an
    /// exact token match beats a prefix match of the same length; remaining
    /// ties go to the earlier rule.
    pub fn infer(&self, primary: &[String], secondary: &[String]) -> Option<&Category> {
        self.best_match(primary)
            .or_else(|| self.best_match(secondary))
    }

    fn best_match(&self, tokens: &[String]) -> Option<&Category> {
        let mut best: Option<((usize, KeywordHit), &CategoryRule)> = None;

        for rule in &self.rules {
            let Some(hit) = tokens.iter().filter_map(|t| keyword_hit(&rule.keyword, t)).max() else {
                continue;
            };
            let score = (rule.keyword.len(), hit);
            if best.as_ref().map_or(true, |(current, _)| score > *current) {
                best = Some((score, rule));
            }
        }

        best.map(|(_, rule)| &rule.category)
    }

    /// Resolve a declared modality value from the metadata table
    /// (`"T1w"`, `"t1"`, `"FLAIR"`) to a category.
    pub fn resolve_declared(&self, value: &str) -> Option<&Category> {
        let wanted: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if wanted.is_empty() {
            return None;
        }

        self.rules
            .iter()
            .find(|rule| rule.keyword == wanted)
            .or_else(|| {
                self.rules
                    .iter()
                    .find(|rule| rule.category.label.to_lowercase() == wanted)
            })
            .map(|rule| &rule.category)
    }
}

impl Default for NamingSpec {
    fn default() -> Self {
        Self::standard()
    }
}

fn keyword_hit(keyword: &str, token: &str) -> Option<KeywordHit> {
    if token == keyword {
        Some(KeywordHit::Exact)
    } else if keyword.len() >= MIN_PREFIX_KEYWORD_LEN && token.starts_with(keyword) {
        Some(KeywordHit::Prefix)
    } else if embedded_at_boundary(keyword, token) {
        Some(KeywordHit::Embedded)
    } else {
        None
    }
}

/// The keyword starts after a digit/letter transition and ends at the token
/// end or another transition.
fn embedded_at_boundary(keyword: &str, token: &str) -> bool {
    let bytes = token.as_bytes();
    token.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        start > 0
            && is_class_boundary(bytes[start - 1], bytes[start])
            && (end == bytes.len() || is_class_boundary(bytes[end - 1], bytes[end]))
    })
}
