//! Error types for the BIDS Lite organizer.
//!
//! Configuration, validation and planning failures are fatal and block any
//! filesystem mutation. Per-file apply failures never surface here; the writer
//! aggregates them into its report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the organizer.
#[derive(Debug, Error)]
pub enum BidsError {
    // Run configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // Metadata validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid identifier: {raw:?} is empty after normalization")]
    InvalidIdentifier { raw: String },

    // Planning errors
    #[error("Unresolvable destination conflict at {destination}: {message}")]
    PlanningConflict {
        destination: PathBuf,
        message: String,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Metadata table error: {message}")]
    Csv {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },
}

/// Result type alias for organizer operations.
pub type Result<T> = std::result::Result<T, BidsError>;

impl From<std::io::Error> for BidsError {
    fn from(err: std::io::Error) -> Self {
        BidsError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BidsError {
    fn from(err: serde_json::Error) -> Self {
        BidsError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<csv::Error> for BidsError {
    fn from(err: csv::Error) -> Self {
        BidsError::Csv {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BidsError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BidsError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        BidsError::Configuration {
            message: message.into(),
        }
    }

    /// Convert to a process exit code for the command-line shell.
    ///
    /// - 1: validation error (bad metadata, empty identifier)
    /// - 2: configuration error (e.g. derivatives without a pipeline name)
    /// - 3: unresolvable planning conflict
    /// - 4: anything else (I/O, serialization)
    pub fn exit_code(&self) -> i32 {
        match self {
            BidsError::Validation { .. } | BidsError::InvalidIdentifier { .. } => 1,
            BidsError::Configuration { .. } => 2,
            BidsError::PlanningConflict { .. } => 3,
            _ => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BidsError::config("pipeline name is required for derivatives");
        assert_eq!(
            err.to_string(),
            "Configuration error: pipeline name is required for derivatives"
        );

        let err = BidsError::InvalidIdentifier { raw: "  ".into() };
        assert!(err.to_string().contains("empty after normalization"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            BidsError::Validation {
                field: "participant_id".into(),
                message: "missing".into()
            }
            .exit_code(),
            1
        );
        assert_eq!(BidsError::config("x").exit_code(), 2);
        assert_eq!(
            BidsError::PlanningConflict {
                destination: PathBuf::from("/out/a.nii"),
                message: "too many".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(BidsError::FileNotFound(PathBuf::from("/missing")).exit_code(), 4);
    }
}
