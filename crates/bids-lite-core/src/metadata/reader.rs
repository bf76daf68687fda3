//! CSV/TSV metadata provider.

use super::table::MetadataTable;
use crate::{BidsError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Read a metadata table from disk.
///
/// `.tsv` files are tab-separated, `.csv` files comma-separated; anything
/// else is sniffed from its first line.
pub fn read_metadata(path: &Path) -> Result<MetadataTable> {
    if !path.exists() {
        return Err(BidsError::FileNotFound(path.to_path_buf()));
    }

    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let delimiter = match suffix.as_str() {
        "tsv" => b'\t',
        "csv" => b',',
        _ => sniff_delimiter(path)?,
    };

    let file = File::open(path).map_err(|e| BidsError::io_with_path(e, path))?;
    read_metadata_from(file, delimiter).map_err(|e| match e {
        BidsError::Csv { message, source } => BidsError::Csv {
            message: format!("{}: {}", path.display(), message),
            source,
        },
        other => other,
    })
}

/// Read a metadata table from any reader with the given delimiter.
pub fn read_metadata_from<R: Read>(reader: R, delimiter: u8) -> Result<MetadataTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(MetadataTable::from_records(headers, records))
}

fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).map_err(|e| BidsError::io_with_path(e, path))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|e| BidsError::io_with_path(e, path))?;

    if first_line.contains('\t') && !first_line.contains(',') {
        Ok(b'\t')
    } else {
        Ok(b',')
    }
}
