//! Core error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Foodshare errors.
#[derive(Debug, Error)]
pub enum Error {
    /// An expected source file is absent. Fatal at ingestion.
    #[error("missing source for {table}: {path} does not exist")]
    MissingSource {
        /// Table the source feeds.
        table: &'static str,
        /// Path that was looked up.
        path: PathBuf,
    },

    /// A source file's header lacks a column the schema declares.
    #[error("source for {table} has no column {column}")]
    MissingColumn {
        /// Table the source feeds.
        table: &'static str,
        /// Column that was expected.
        column: &'static str,
    },

    /// A source cell could not be parsed into its column type.
    #[error("invalid value {value:?} in {table}.{column} at row {row}")]
    InvalidValue {
        /// Table the source feeds.
        table: &'static str,
        /// Column holding the value.
        column: &'static str,
        /// 1-based data row (header excluded).
        row: usize,
        /// The raw cell contents.
        value: String,
    },

    /// A mutation referenced a key that does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The missing identifier.
        id: i64,
    },

    /// A claim status outside Pending / Completed / Cancelled.
    #[error("invalid claim status: {0:?} (expected Pending, Completed or Cancelled)")]
    InvalidStatus(String),

    /// Unknown catalog query, missing parameter, or a rejected ad-hoc statement.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// SQLite error.
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
