//! Raw CSV sources and their diagnostics.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::TableKind;

/// One CSV source held in memory as header plus string rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    /// Table the source feeds.
    pub kind: TableKind,
    /// Header names, trimmed.
    pub headers: Vec<String>,
    /// Data rows, one string per header column.
    pub rows: Vec<Vec<String>>,
}

impl SourceTable {
    /// Read a CSV file.
    pub fn read(kind: TableKind, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingSource {
                table: kind.name(),
                path: path.to_path_buf(),
            });
        }
        let reader = std::fs::File::open(path)?;
        Self::from_reader(kind, reader)
    }

    /// Read CSV data from any reader.
    pub fn from_reader<R: Read>(kind: TableKind, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();

        for column in kind.def().columns {
            if !headers.iter().any(|h| h == column.name) {
                return Err(Error::MissingColumn {
                    table: kind.name(),
                    column: column.name,
                });
            }
        }

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Self {
            kind,
            headers,
            rows,
        })
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the source has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Count of empty cells per column. Columns with none are omitted.
    pub fn missing_values(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (idx, header) in self.headers.iter().enumerate() {
            let missing = self
                .rows
                .iter()
                .filter(|row| row.get(idx).map_or(true, |cell| cell.trim().is_empty()))
                .count();
            if missing > 0 {
                counts.insert(header.clone(), missing);
            }
        }
        counts
    }

    /// Number of rows identical to an earlier row.
    pub fn duplicate_rows(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.rows.len());
        self.rows.iter().filter(|row| !seen.insert(*row)).count()
    }

    /// Diagnostics for this source.
    pub fn diagnostics(&self) -> SourceDiagnostics {
        SourceDiagnostics {
            table: self.kind,
            rows: self.len(),
            missing_values: self.missing_values(),
            duplicate_rows: self.duplicate_rows(),
            contacts_normalized: 0,
        }
    }
}

/// Per-source findings. Informational only; nothing here blocks a load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDiagnostics {
    pub table: TableKind,
    pub rows: usize,
    /// Empty cells per column.
    pub missing_values: BTreeMap<String, usize>,
    pub duplicate_rows: usize,
    /// Contact cells rewritten by normalization.
    pub contacts_normalized: usize,
}

impl SourceDiagnostics {
    /// Total empty cells across all columns.
    pub fn missing_total(&self) -> usize {
        self.missing_values.values().sum()
    }
}
