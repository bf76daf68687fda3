//! In-memory metadata table.
//!
//! One record shape for every row: the required participant id, an optional
//! session id, and an open map for whatever other columns the table carries.

use std::collections::BTreeMap;

pub const PARTICIPANT_ID_COLUMN: &str = "participant_id";
pub const SESSION_ID_COLUMN: &str = "session_id";
pub const MODALITY_COLUMN: &str = "modality";
pub const SEX_COLUMN: &str = "sex";

/// One row of the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRow {
    /// Raw participant id as written in the table. May be empty; the
    /// validator reports that.
    pub participant_id: String,
    /// Raw session id, `None` when the column is absent or the cell is blank.
    pub session_id: Option<String>,
    /// Every other column, keyed by lower-cased header.
    pub extra: BTreeMap<String, String>,
}

impl MetadataRow {
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_field(mut self, column: &str, value: impl Into<String>) -> Self {
        self.extra.insert(column.to_lowercase(), value.into());
        self
    }

    /// Look up an optional column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.extra.get(column).map(String::as_str)
    }

    /// Declared modality, if the row has a non-blank one.
    pub fn modality(&self) -> Option<&str> {
        self.get(MODALITY_COLUMN)
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// The metadata table: header order plus rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataTable {
    columns: Vec<String>,
    rows: Vec<MetadataRow>,
}

impl MetadataTable {
    /// Build a table from rows, deriving the header list from their contents.
    pub fn from_rows(rows: Vec<MetadataRow>) -> Self {
        let mut columns = vec![PARTICIPANT_ID_COLUMN.to_string()];
        if rows.iter().any(|r| r.session_id.is_some()) {
            columns.push(SESSION_ID_COLUMN.to_string());
        }
        for row in &rows {
            for key in row.extra.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Build a table from raw header and record cells.
    ///
    /// Headers are trimmed and lower-cased. Short records are padded with
    /// blanks. A missing `participant_id` header yields rows with empty ids.
    pub fn from_records(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let columns: Vec<String> = headers
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
            .collect();

        let rows = records
            .into_iter()
            .map(|record| {
                let mut row = MetadataRow::default();
                for (index, column) in columns.iter().enumerate() {
                    let value = record.get(index).map(|v| v.trim()).unwrap_or("");
                    match column.as_str() {
                        PARTICIPANT_ID_COLUMN => row.participant_id = value.to_string(),
                        SESSION_ID_COLUMN => {
                            row.session_id = (!value.is_empty()).then(|| value.to_string());
                        }
                        _ => {
                            row.extra.insert(column.clone(), value.to_string());
                        }
                    }
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Shorthand for a table with only participant ids.
    pub fn with_participants(ids: &[&str]) -> Self {
        Self::from_rows(ids.iter().map(|id| MetadataRow::new(*id)).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[MetadataRow] {
        &self.rows
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
