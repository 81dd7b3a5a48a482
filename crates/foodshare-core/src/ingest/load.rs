//! Bulk replacement of table contents and post-load verification.

use rusqlite::params_from_iter;
use serde::Serialize;
use tracing::{info, warn};

use super::normalize::PreparedTable;
use crate::error::Result;
use crate::schema::TableKind;
use crate::store::Store;

/// Stored row count compared with the source row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowCountCheck {
    pub table: TableKind,
    pub source_rows: usize,
    pub stored_rows: usize,
}

impl RowCountCheck {
    /// Check if every source row landed in the store.
    pub fn matches(&self) -> bool {
        self.source_rows == self.stored_rows
    }
}

/// Replace the contents of every table in `tables` inside one transaction.
pub fn replace_all(store: &mut Store, tables: &[PreparedTable]) -> Result<()> {
    let tx = store.connection_mut().transaction()?;

    for table in tables {
        let def = table.kind.def();
        tx.execute_batch(&def.create_sql())?;
        let cleared = tx.execute(&def.delete_all_sql(), [])?;

        let mut stmt = tx.prepare(&def.insert_sql())?;
        for row in &table.rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }

        info!(
            table = def.name,
            cleared,
            inserted = table.rows.len(),
            "replaced table contents"
        );
    }

    tx.commit()?;
    Ok(())
}

/// Compare stored row counts with source row counts.
pub fn verify(store: &Store, tables: &[PreparedTable]) -> Result<Vec<RowCountCheck>> {
    let mut checks = Vec::with_capacity(tables.len());

    for table in tables {
        let check = RowCountCheck {
            table: table.kind,
            source_rows: table.rows.len(),
            stored_rows: store.row_count(table.kind)?,
        };
        if !check.matches() {
            warn!(
                table = %check.table,
                source_rows = check.source_rows,
                stored_rows = check.stored_rows,
                "row count mismatch"
            );
        }
        checks.push(check);
    }

    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value as SqlValue;

    fn receivers(ids: &[i64]) -> PreparedTable {
        PreparedTable {
            kind: TableKind::Receivers,
            rows: ids
                .iter()
                .map(|&id| {
                    vec![
                        SqlValue::Integer(id),
                        SqlValue::Text(format!("Receiver {id}")),
                        SqlValue::Text("NGO".into()),
                        SqlValue::Text("Pune".into()),
                        SqlValue::Null,
                    ]
                })
                .collect(),
            contacts_normalized: 0,
        }
    }

    #[test]
    fn test_replace_discards_previous_rows() {
        let mut store = Store::open_in_memory().unwrap();

        replace_all(&mut store, &[receivers(&[1, 2, 3])]).unwrap();
        replace_all(&mut store, &[receivers(&[7])]).unwrap();

        assert_eq!(store.row_count(TableKind::Receivers).unwrap(), 1);
        assert!(store.exists(TableKind::Receivers, 7).unwrap());
    }

    #[test]
    fn test_repeated_key_keeps_last_row_and_fails_count_check() {
        let mut store = Store::open_in_memory().unwrap();
        let mut table = receivers(&[1, 1]);
        table.rows[1][1] = SqlValue::Text("Second".into());

        replace_all(&mut store, std::slice::from_ref(&table)).unwrap();
        let checks = verify(&store, &[table]).unwrap();

        assert_eq!(checks[0].source_rows, 2);
        assert_eq!(checks[0].stored_rows, 1);
        assert!(!checks[0].matches());

        let name: String = store
            .connection()
            .query_row("SELECT Name FROM receivers WHERE Receiver_ID = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "Second");
    }
}
