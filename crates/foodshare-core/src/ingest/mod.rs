//! CSV ingestion pipeline.
//!
//! Loads the four sources into the store, replacing whatever was there:
//!
//! 1. check every source file exists, then read them
//! 2. diagnose missing values and duplicate rows
//! 3. normalize contacts and parse typed columns
//! 4. check referential integrity
//! 5. replace table contents in one transaction
//! 6. verify stored row counts
//!
//! Missing files, missing columns and unparseable values abort the run.
//! Integrity violations and count mismatches are reported and logged, never
//! rolled back.

mod integrity;
mod load;
mod normalize;
mod source;

pub use integrity::IntegrityViolation;
pub use load::RowCountCheck;
pub use normalize::{normalize_contact, parse_date, parse_datetime, PreparedTable};
pub use source::{SourceDiagnostics, SourceTable};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::schema::TableKind;
use crate::store::Store;

/// Everything learned while ingesting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IngestReport {
    /// Per-source diagnostics, in load order.
    pub sources: Vec<SourceDiagnostics>,
    /// Dangling foreign-key values.
    pub integrity: Vec<IntegrityViolation>,
    /// Post-load row count verification.
    pub row_counts: Vec<RowCountCheck>,
}

impl IngestReport {
    /// Total empty cells across all sources.
    pub fn missing_value_warnings(&self) -> usize {
        self.sources.iter().map(SourceDiagnostics::missing_total).sum()
    }

    /// Total stored rows across all tables.
    pub fn rows_loaded(&self) -> usize {
        self.row_counts.iter().map(|c| c.stored_rows).sum()
    }

    /// No missing values, no integrity violations, and all counts match.
    pub fn is_clean(&self) -> bool {
        self.missing_value_warnings() == 0
            && self.integrity.is_empty()
            && self.row_counts.iter().all(RowCountCheck::matches)
    }
}

/// Runs one ingestion against a borrowed store.
pub struct IngestPipeline<'a> {
    store: &'a mut Store,
    sources: &'a SourceConfig,
}

impl<'a> IngestPipeline<'a> {
    /// Create a pipeline reading from `sources` into `store`.
    pub fn new(store: &'a mut Store, sources: &'a SourceConfig) -> Self {
        Self { store, sources }
    }

    /// Run every stage and return the report.
    pub fn run(self) -> Result<IngestReport> {
        for kind in TableKind::ALL {
            let path = self.sources.path_for(kind);
            if !path.exists() {
                return Err(Error::MissingSource {
                    table: kind.name(),
                    path,
                });
            }
        }

        let mut tables = Vec::with_capacity(TableKind::ALL.len());
        for kind in TableKind::ALL {
            let path = self.sources.path_for(kind);
            let table = SourceTable::read(kind, &path)?;
            info!(table = kind.name(), path = %path.display(), rows = table.len(), "read source");
            tables.push(table);
        }

        Self::load_tables(self.store, &tables)
    }

    /// Run the stages after reading on sources already in memory.
    pub fn load_tables(store: &mut Store, tables: &[SourceTable]) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        let mut prepared = Vec::with_capacity(tables.len());
        for table in tables {
            let mut diagnostics = table.diagnostics();
            log_diagnostics(&diagnostics);

            let converted = normalize::prepare(table)?;
            diagnostics.contacts_normalized = converted.contacts_normalized;
            if converted.contacts_normalized > 0 {
                info!(
                    table = %table.kind,
                    count = converted.contacts_normalized,
                    "normalized contact values"
                );
            }

            report.sources.push(diagnostics);
            prepared.push(converted);
        }

        report.integrity = integrity::check(&prepared);
        for violation in &report.integrity {
            warn!(
                table = %violation.table,
                column = violation.column,
                references = %violation.references,
                missing = violation.missing_ids.len(),
                ids = ?violation.missing_ids,
                "referential integrity violation"
            );
        }

        load::replace_all(store, &prepared)?;
        report.row_counts = load::verify(store, &prepared)?;

        info!(
            tables = prepared.len(),
            rows = report.rows_loaded(),
            violations = report.integrity.len(),
            "ingestion complete"
        );

        Ok(report)
    }
}

fn log_diagnostics(diagnostics: &SourceDiagnostics) {
    for (column, count) in &diagnostics.missing_values {
        warn!(table = %diagnostics.table, column = %column, count, "missing values");
    }
    if diagnostics.duplicate_rows > 0 {
        warn!(
            table = %diagnostics.table,
            count = diagnostics.duplicate_rows,
            "duplicate rows"
        );
    }
}
