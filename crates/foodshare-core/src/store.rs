//! The relational store: one owned SQLite connection.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Params, Row};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::model::Claim;
use crate::query::{ResultTable, Value};
use crate::schema::TableKind;

/// Owner of the single SQLite connection.
///
/// Opened once and closed once; every other component borrows it.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open the store described by `config`.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        match &config.path {
            Some(path) => Self::open_path(path),
            None => Self::open_in_memory(),
        }
    }

    /// Open (or create) a store file.
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened store");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("opened in-memory store");
        Ok(Self { conn, path: None })
    }

    /// Path of the store file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Borrow the connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Borrow the connection mutably, for transactions.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Create the four tables if they do not exist.
    pub fn create_tables(&self) -> Result<()> {
        let ddl: Vec<String> = TableKind::ALL
            .iter()
            .map(|kind| format!("{};", kind.def().create_sql()))
            .collect();
        self.conn.execute_batch(&ddl.join("\n"))?;
        Ok(())
    }

    /// Number of rows in a table.
    pub fn row_count(&self, kind: TableKind) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&kind.def().count_sql(), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether a row with primary key `id` exists.
    pub fn exists(&self, kind: TableKind, id: i64) -> Result<bool> {
        exists_in(&self.conn, kind, id)
    }

    /// Run a statement and collect every row as dynamically typed values.
    pub fn query_table<P: Params>(&self, sql: &str, params: P) -> Result<ResultTable> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query(params)?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(Value::from(row.get_ref(idx)?));
            }
            rows.push(values);
        }

        Ok(ResultTable::new(columns, rows))
    }

    /// Run a single caller-supplied statement, refusing anything that writes.
    ///
    /// SQLite reports transaction control and `ATTACH`/`DETACH` as read-only,
    /// so a statement must also produce result columns.
    pub fn query_readonly(&self, sql: &str) -> Result<ResultTable> {
        if sql.trim().is_empty() {
            return Err(Error::InvalidQuery("empty statement".into()));
        }

        let stmt = self.conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(Error::InvalidQuery(
                "only read-only statements are allowed".into(),
            ));
        }
        if stmt.column_count() == 0 {
            return Err(Error::InvalidQuery("statement returns no rows".into()));
        }
        drop(stmt);

        self.query_table(sql, [])
    }

    /// Load a claim by id.
    pub fn claim(&self, claim_id: i64) -> Result<Option<Claim>> {
        let sql = format!("{} WHERE Claim_ID = ?1", select_columns(TableKind::Claims));
        let claim = self
            .conn
            .query_row(&sql, [claim_id], Claim::from_row)
            .optional()?;
        Ok(claim)
    }

    /// Load every row of a table in key order.
    pub fn load_all<T>(
        &self,
        kind: TableKind,
        decode: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(&kind.def().select_all_sql())?;
        let rows = stmt
            .query_map([], decode)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Sqlite(e))?;
        debug!("closed store");
        Ok(())
    }
}

/// Primary-key existence check usable inside a transaction.
pub(crate) fn exists_in(conn: &Connection, kind: TableKind, id: i64) -> Result<bool> {
    let def = kind.def();
    let sql = format!(
        "SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1",
        def.name, def.primary_key
    );
    let found = conn
        .query_row(&sql, [id], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}

/// `SELECT <columns> FROM <table>` in declaration order.
pub(crate) fn select_columns(kind: TableKind) -> String {
    let def = kind.def();
    let names: Vec<&str> = def.columns.iter().map(|c| c.name).collect();
    format!("SELECT {} FROM {}", names.join(", "), def.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.create_tables().unwrap();
        store
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let store = store();
        store.create_tables().unwrap();
        for kind in TableKind::ALL {
            assert_eq!(store.row_count(kind).unwrap(), 0);
        }
    }

    #[test]
    fn test_query_table_columns_and_types() {
        let store = store();
        let table = store
            .query_table("SELECT 1 AS a, 2.5 AS b, 'x' AS c, NULL AS d", [])
            .unwrap();

        assert_eq!(table.columns, vec!["a", "b", "c", "d"]);
        assert_eq!(
            table.rows[0],
            vec![
                Value::Integer(1),
                Value::Real(2.5),
                Value::Text("x".into()),
                Value::Null
            ]
        );
    }

    #[test]
    fn test_query_readonly_rejects_writes() {
        let store = store();

        let err = store
            .query_readonly("DELETE FROM claims")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));

        let err = store.query_readonly("   ").unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));

        let table = store.query_readonly("SELECT COUNT(*) AS n FROM claims").unwrap();
        assert_eq!(table.get(0, "n"), Some(&Value::Integer(0)));
    }

    #[test]
    fn test_query_readonly_rejects_transaction_control() {
        let store = store();

        for sql in [
            "BEGIN",
            "COMMIT",
            "SAVEPOINT s1",
            "ATTACH DATABASE ':memory:' AS extra",
        ] {
            let err = store.query_readonly(sql).unwrap_err();
            assert!(matches!(err, Error::InvalidQuery(_)), "{sql} was accepted");
        }

        assert!(store.connection().is_autocommit());
    }

    #[test]
    fn test_exists_and_claim_lookup() {
        let store = store();
        store
            .connection()
            .execute(
                "INSERT INTO claims (Claim_ID, Food_ID, Receiver_ID, Status, Timestamp) \
                 VALUES (3, 1, 1, 'Pending', '2025-03-05T10:00:00')",
                [],
            )
            .unwrap();

        assert!(store.exists(TableKind::Claims, 3).unwrap());
        assert!(!store.exists(TableKind::Claims, 4).unwrap());

        let claim = store.claim(3).unwrap().unwrap();
        assert_eq!(claim.claim_id, 3);
        assert!(store.claim(4).unwrap().is_none());
    }
}
