//! Plan execution and layout artifacts.
//!
//! This module provides:
//! - [`Writer`], which applies a [`Plan`](crate::planner::Plan) to disk
//! - Atomic file transfers (temp file in the destination directory, then rename)
//! - The dataset descriptor, `participants.tsv`, README and the operation log
//! - Text rendering of plans and apply reports

mod apply;
mod artifacts;
mod report;

pub use apply::{ApplyFailure, ApplyReport, SkipReason, SkippedOp, Writer};
pub use artifacts::{
    render_participants_tsv, write_dataset_description, write_participants_tsv, write_readme,
};
pub use report::{render_plan, render_report, write_report};

use crate::{BidsError, Result};
use blake3::Hasher as Blake3Hasher;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Read buffer for hashing (1MB).
const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// How files reach their destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TransferMode {
    /// Leave the source untouched.
    #[default]
    Copy,
    /// Remove the source once the destination is complete.
    Move,
}

impl TransferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Copy => "copy",
            TransferMode::Move => "move",
        }
    }
}

/// BLAKE3 digest of a file as lowercase hex.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| BidsError::io_with_path(e, path))?;
    let mut hasher = Blake3Hasher::new();

    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| BidsError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
