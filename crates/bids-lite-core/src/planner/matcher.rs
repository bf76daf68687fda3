//! Matching discovered files to participant and session identifiers.
//!
//! Filenames in the wild carry ids in every shape: `patient_001/T1w.nii.gz`,
//! `sub-001_ses-01_T1w.nii.gz`, `Ross1981-case2.nii.gz`, `scan1.nii`. The
//! matcher tokenizes the file name and its parent folder and scores each known
//! participant id against those tokens.
//!
//! # Ranking
//!
//! A longer id beats a shorter one, so `101` wins over `01` inside
//! `case_101`. At equal length a whole-token match beats an occurrence at an
//! alpha/digit boundary, which beats a plain substring. Purely numeric ids
//! only match whole digit runs at a token edge, after padding: `1`, `01` and
//! `001` all match the id `001`, while `1001`, `0012` and `t1w` do not.
//! Tokens that are category keywords (`t1`, `t2`) never carry a numeric id.

use super::paths::split_extension;
use crate::naming::{
    is_class_boundary, split_tokens, Category, IdNormalizer, NamingSpec, NormalizedId,
};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Glued session entities such as `ses01` or `session2`.
static GLUED_SESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ses(?:sion)?(\d+)$").unwrap());

/// Tokens that introduce a session value in the next token.
const SESSION_KEYS: &[&str] = &["ses", "session"];

/// Longest token accepted as a separated session value.
const MAX_SESSION_VALUE_LEN: usize = 8;

/// How strongly an id matched a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrength {
    /// Inside a token with no boundary on at least one side.
    Substring,
    /// Inside a token, bounded by letter/digit transitions or token edges.
    Boundary,
    /// A whole token, or a run of consecutive tokens joined by the filler.
    Token,
}

/// A discovered input file with its name split into tokens.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub file_name: String,
    pub extension: String,
    /// Filename tokens (extension removed), session entities removed.
    pub name_tokens: Vec<String>,
    /// Parent folder tokens, session entities removed.
    pub parent_tokens: Vec<String>,
    /// Explicit session value found in the filename or parent folder.
    pub session: Option<String>,
    /// Tokens that are exactly a category keyword.
    pub keyword_tokens: Vec<String>,
    /// Category inferred from the keyword table, if any keyword hit.
    pub category: Option<Category>,
}

impl CandidateFile {
    pub fn new(path: &Path, spec: &NamingSpec) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, extension) = split_extension(&file_name);
        let extension = extension.to_string();

        let (name_tokens, name_session) = strip_sessions(split_tokens(stem));

        let parent_name = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (parent_tokens, parent_session) = strip_sessions(split_tokens(&parent_name));

        let keyword_tokens = name_tokens
            .iter()
            .chain(&parent_tokens)
            .filter(|t| spec.is_keyword(t))
            .cloned()
            .collect();
        let category = spec.infer(&name_tokens, &parent_tokens).cloned();

        Self {
            path: path.to_path_buf(),
            file_name,
            extension,
            name_tokens,
            parent_tokens,
            session: name_session.or(parent_session),
            keyword_tokens,
            category,
        }
    }

    /// Whether the file names a session explicitly.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the explicit session (if any) equals `session` after
    /// normalization. Files without a session accept any session.
    pub fn accepts_session(&self, session: &NormalizedId, normalizer: &IdNormalizer) -> bool {
        match &self.session {
            None => true,
            Some(raw) => normalizer
                .normalize(raw)
                .map(|s| &s == session)
                .unwrap_or(false),
        }
    }

    /// Whether this file may bind to a row declaring `declared` as its
    /// session. Rows without a declared session accept every file, whatever
    /// session its name carries.
    pub fn fits_row_session(
        &self,
        declared: Option<&NormalizedId>,
        normalizer: &IdNormalizer,
    ) -> bool {
        match declared {
            None => true,
            Some(session) => self.accepts_session(session, normalizer),
        }
    }

    /// Score a participant id against this file's tokens.
    pub fn match_participant(
        &self,
        participant: &NormalizedId,
        normalizer: &IdNormalizer,
    ) -> Option<MatchStrength> {
        let in_name = self.match_tokens(&self.name_tokens, participant, normalizer);
        let in_parent = self.match_tokens(&self.parent_tokens, participant, normalizer);
        in_name.max(in_parent)
    }

    fn match_tokens(
        &self,
        tokens: &[String],
        participant: &NormalizedId,
        normalizer: &IdNormalizer,
    ) -> Option<MatchStrength> {
        if tokens.is_empty() {
            return None;
        }
        if token_run_matches(tokens, participant, normalizer) {
            return Some(MatchStrength::Token);
        }

        tokens
            .iter()
            .filter_map(|token| {
                if participant.is_numeric() {
                    if self.keyword_tokens.contains(token) {
                        return None;
                    }
                    match_digit_runs(token, participant, normalizer)
                } else {
                    match_inside_token(token, participant.as_str())
                }
            })
            .max()
    }
}

/// Result of choosing one participant for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantMatch {
    Matched(NormalizedId),
    Unmatched,
    Ambiguous(Vec<NormalizedId>),
}

/// Pick the best participant for `file` among `participants`.
///
/// Ranking key is `(id length, strength)`. Distinct ids tying on the key make
/// the file ambiguous rather than picking one arbitrarily.
pub fn best_participant(
    file: &CandidateFile,
    participants: &[NormalizedId],
    normalizer: &IdNormalizer,
) -> ParticipantMatch {
    let mut best_key: Option<(usize, MatchStrength)> = None;
    let mut best: Vec<NormalizedId> = Vec::new();

    for participant in participants {
        let Some(strength) = file.match_participant(participant, normalizer) else {
            continue;
        };
        let key = (participant.as_str().len(), strength);
        match best_key {
            Some(current) if key < current => {}
            Some(current) if key == current => {
                if !best.contains(participant) {
                    best.push(participant.clone());
                }
            }
            _ => {
                best_key = Some(key);
                best = vec![participant.clone()];
            }
        }
    }

    match best.len() {
        0 => ParticipantMatch::Unmatched,
        1 => ParticipantMatch::Matched(best.remove(0)),
        _ => ParticipantMatch::Ambiguous(best),
    }
}

/// Remove session entities from a token list, returning the session value.
fn strip_sessions(tokens: Vec<String>) -> (Vec<String>, Option<String>) {
    let mut kept = Vec::with_capacity(tokens.len());
    let mut session = None;
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if SESSION_KEYS.contains(&token.as_str()) {
            if let Some(value) = iter.next_if(|v| looks_like_session(v)) {
                session.get_or_insert(value);
                continue;
            }
            kept.push(token);
            continue;
        }
        if let Some(caps) = GLUED_SESSION.captures(&token) {
            session.get_or_insert(caps[1].to_string());
            continue;
        }
        kept.push(token);
    }

    (kept, session)
}

/// Session values are short and start with a digit (`01`, `2`, `1b`), so
/// `session_T1w` keeps `t1w` as a name token.
fn looks_like_session(token: &str) -> bool {
    token.len() <= MAX_SESSION_VALUE_LEN
        && token.bytes().next().is_some_and(|b| b.is_ascii_digit())
}

/// A single token or a run of consecutive tokens normalizing to the id.
fn token_run_matches(
    tokens: &[String],
    participant: &NormalizedId,
    normalizer: &IdNormalizer,
) -> bool {
    // Joining k tokens inserts k-1 fillers, so longer runs cannot match.
    let max_run = participant.as_str().matches('u').count() + 1;

    for run in 1..=max_run.min(tokens.len()) {
        for window in tokens.windows(run) {
            let joined = window.join("-");
            if let Ok(candidate) = normalizer.normalize(&joined) {
                if &candidate == participant {
                    return true;
                }
            }
        }
    }
    false
}

/// Numeric ids match maximal digit runs at either end of a token, after
/// padding. Runs enclosed by letters (`t1w`, `t2starw`) never match.
fn match_digit_runs(
    token: &str,
    participant: &NormalizedId,
    normalizer: &IdNormalizer,
) -> Option<MatchStrength> {
    let bytes = token.as_bytes();
    let mut start = 0;

    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let at_edge = start == 0 || end == bytes.len();
        if let Ok(run) = normalizer.normalize(&token[start..end]) {
            if at_edge && &run == participant {
                return Some(MatchStrength::Boundary);
            }
        }
        start = end;
    }
    None
}

/// Occurrences of an alphanumeric id inside a token.
fn match_inside_token(token: &str, participant: &str) -> Option<MatchStrength> {
    let cleaned: String = token.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let bytes = cleaned.as_bytes();

    cleaned
        .match_indices(participant)
        .map(|(start, matched)| {
            let end = start + matched.len();
            let left = start == 0 || is_class_boundary(bytes[start - 1], bytes[start]);
            let right = end == bytes.len() || is_class_boundary(bytes[end - 1], bytes[end]);
            if left && right {
                MatchStrength::Boundary
            } else {
                MatchStrength::Substring
            }
        })
        .max()
}
