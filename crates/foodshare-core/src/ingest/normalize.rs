//! Cell normalization and typed parsing of source rows.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rusqlite::types::Value as SqlValue;

use super::source::SourceTable;
use crate::error::{Error, Result};
use crate::model::{ClaimStatus, DATETIME_FORMAT, DATE_FORMAT};
use crate::schema::{ColumnType, TableKind};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// A source converted to storage values in schema column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTable {
    pub kind: TableKind,
    pub rows: Vec<Vec<SqlValue>>,
    pub contacts_normalized: usize,
}

impl PreparedTable {
    /// Integer values of one column, skipping NULLs.
    pub fn integer_column(&self, column: &str) -> Vec<i64> {
        let Some(idx) = self.kind.def().column_index(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| match row.get(idx) {
                Some(SqlValue::Integer(i)) => Some(*i),
                _ => None,
            })
            .collect()
    }
}

/// Normalize contact text: trim, collapse a scientific rendering to its
/// mantissa, drop an integral `.0` suffix, and strip dots.
pub fn normalize_contact(raw: &str) -> String {
    let mut value = raw.trim();

    if value.parse::<f64>().is_ok() {
        if let Some(pos) = value.find(['e', 'E']) {
            value = &value[..pos];
        } else if let Some(whole) = value.strip_suffix(".0") {
            value = whole;
        }
    }

    value.replace('.', "")
}

/// Parse a calendar date in ISO or US month-first form. A trailing time is
/// accepted and discarded.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

/// Parse a timestamp in ISO or US month-first form, truncated to seconds.
/// A bare date reads as midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .and_then(|dt| dt.with_nanosecond(0))
}

/// Parse an integer, accepting an integral float rendering such as `12.0`.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Some(i);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Convert every source row to storage values in schema column order.
///
/// Fails on the first cell that is present but cannot be parsed as its
/// column type, or on a row with an empty primary key.
pub fn prepare(source: &SourceTable) -> Result<PreparedTable> {
    let def = source.kind.def();

    let mut positions = Vec::with_capacity(def.columns.len());
    for column in def.columns {
        let idx = source
            .column_index(column.name)
            .ok_or(Error::MissingColumn {
                table: def.name,
                column: column.name,
            })?;
        positions.push(idx);
    }

    let mut rows = Vec::with_capacity(source.len());
    let mut contacts_normalized = 0;

    for (row_idx, row) in source.rows.iter().enumerate() {
        let mut values = Vec::with_capacity(def.columns.len());

        for (column, &pos) in def.columns.iter().zip(&positions) {
            let raw = row.get(pos).map(String::as_str).unwrap_or("");
            let invalid = || Error::InvalidValue {
                table: def.name,
                column: column.name,
                row: row_idx + 1,
                value: raw.to_string(),
            };

            // Empty cells load as NULL and surface in the diagnostics. A row
            // without a key cannot be stored.
            if raw.trim().is_empty() {
                if column.name == def.primary_key {
                    return Err(invalid());
                }
                values.push(SqlValue::Null);
                continue;
            }

            let value = match column.ty {
                ColumnType::Text => SqlValue::Text(raw.to_string()),
                ColumnType::Contact => {
                    let normalized = normalize_contact(raw);
                    if normalized != raw {
                        contacts_normalized += 1;
                    }
                    SqlValue::Text(normalized)
                }
                ColumnType::Integer => SqlValue::Integer(parse_integer(raw).ok_or_else(invalid)?),
                ColumnType::Date => {
                    let date = parse_date(raw).ok_or_else(invalid)?;
                    SqlValue::Text(date.format(DATE_FORMAT).to_string())
                }
                ColumnType::DateTime => {
                    let ts = parse_datetime(raw).ok_or_else(invalid)?;
                    SqlValue::Text(ts.format(DATETIME_FORMAT).to_string())
                }
                ColumnType::Status => {
                    let status: ClaimStatus = raw.trim().parse().map_err(|_| invalid())?;
                    SqlValue::Text(status.as_str().to_string())
                }
            };
            values.push(value);
        }

        rows.push(values);
    }

    Ok(PreparedTable {
        kind: source.kind,
        rows,
        contacts_normalized,
    })
}
