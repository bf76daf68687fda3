//! Metadata tables and persistence.
//!
//! This module provides:
//! - The metadata table model (one required id column, open optional columns)
//! - A CSV/TSV reader producing that model
//! - Atomic JSON/byte writes used for plans and layout artifacts

mod atomic;
mod reader;
mod table;

pub(crate) use atomic::temp_path_for;
pub use atomic::{atomic_read_json, atomic_write_bytes, atomic_write_json};
pub use reader::{read_metadata, read_metadata_from};
pub use table::{
    MetadataRow, MetadataTable, MODALITY_COLUMN, PARTICIPANT_ID_COLUMN, SESSION_ID_COLUMN,
    SEX_COLUMN,
};
