//! Layout-defining files: descriptor, participants table, README.

use crate::config::PathsConfig;
use crate::metadata::{atomic_write_bytes, atomic_write_json};
use crate::planner::{DatasetDescriptor, ParticipantsTable};
use crate::{BidsError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_README: &str = "# BIDS Lite Dataset\n\n\
This dataset was organized using BIDS Lite.\n\n\
You can edit this README to add study-specific information.\n";

/// Write `dataset_description.json`, stamping today's date.
pub fn write_dataset_description(
    dataset_root: &Path,
    descriptor: &DatasetDescriptor,
) -> Result<PathBuf> {
    let mut descriptor = descriptor.clone();
    descriptor.date = Some(chrono::Local::now().format("%Y-%m-%d").to_string());

    let path = dataset_root.join(PathsConfig::DATASET_DESCRIPTION_FILENAME);
    atomic_write_json(&path, &descriptor)?;
    Ok(path)
}

/// Render the participants table as tab-separated text.
pub fn render_participants_tsv(table: &ParticipantsTable) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }

    writer.into_inner().map_err(|e| BidsError::Csv {
        message: format!("Failed to finish participants table: {}", e.error()),
        source: None,
    })
}

pub fn write_participants_tsv(dataset_root: &Path, table: &ParticipantsTable) -> Result<PathBuf> {
    let path = dataset_root.join(PathsConfig::PARTICIPANTS_FILENAME);
    atomic_write_bytes(&path, &render_participants_tsv(table)?)?;
    Ok(path)
}

/// Write `README.md` unless one exists. Returns the path when a file was written.
pub fn write_readme(dataset_root: &Path, template: Option<&Path>) -> Result<Option<PathBuf>> {
    let path = dataset_root.join(PathsConfig::README_FILENAME);
    if path.exists() {
        return Ok(None);
    }

    let text = match template {
        Some(template) => {
            fs::read_to_string(template).map_err(|e| BidsError::io_with_path(e, template))?
        }
        None => DEFAULT_README.to_string(),
    };

    atomic_write_bytes(&path, text.as_bytes())?;
    Ok(Some(path))
}
