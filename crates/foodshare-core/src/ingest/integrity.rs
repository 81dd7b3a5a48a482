//! Foreign-key checks over prepared sources.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::normalize::PreparedTable;
use crate::schema::TableKind;

/// Referencing values with no matching key in the referenced table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityViolation {
    /// Referencing table.
    pub table: TableKind,
    /// Referencing column.
    pub column: &'static str,
    /// Referenced table.
    pub references: TableKind,
    /// Referenced column.
    pub references_column: &'static str,
    /// Distinct dangling values, ascending.
    pub missing_ids: Vec<i64>,
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}: {} missing id(s) {:?}",
            self.table,
            self.column,
            self.references,
            self.references_column,
            self.missing_ids.len(),
            self.missing_ids
        )
    }
}

/// Check every declared foreign key among `tables`.
///
/// A key whose referencing or referenced table is absent from `tables` is
/// skipped.
pub fn check(tables: &[PreparedTable]) -> Vec<IntegrityViolation> {
    let find = |kind: TableKind| tables.iter().find(|t| t.kind == kind);
    let mut violations = Vec::new();

    for table in tables {
        for fk in table.kind.def().foreign_keys {
            let Some(referenced) = find(fk.references) else {
                continue;
            };

            let keys: HashSet<i64> = referenced
                .integer_column(fk.references_column)
                .into_iter()
                .collect();

            let missing: BTreeSet<i64> = table
                .integer_column(fk.column)
                .into_iter()
                .filter(|id| !keys.contains(id))
                .collect();

            if !missing.is_empty() {
                violations.push(IntegrityViolation {
                    table: table.kind,
                    column: fk.column,
                    references: fk.references,
                    references_column: fk.references_column,
                    missing_ids: missing.into_iter().collect(),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value as SqlValue;

    fn table(kind: TableKind, rows: Vec<Vec<i64>>) -> PreparedTable {
        let width = kind.def().columns.len();
        PreparedTable {
            kind,
            rows: rows
                .into_iter()
                .map(|ints| {
                    let mut row: Vec<SqlValue> = ints.into_iter().map(SqlValue::Integer).collect();
                    row.resize(width, SqlValue::Null);
                    row
                })
                .collect(),
            contacts_normalized: 0,
        }
    }

    #[test]
    fn test_orphan_listing_is_reported() {
        let providers = table(TableKind::Providers, vec![vec![1], vec![2]]);
        // Food_ID, Food_Name, Quantity, Expiry_Date, Provider_ID
        let listings = PreparedTable {
            rows: vec![
                vec![
                    SqlValue::Integer(10),
                    SqlValue::Null,
                    SqlValue::Integer(1),
                    SqlValue::Null,
                    SqlValue::Integer(2),
                ],
                vec![
                    SqlValue::Integer(11),
                    SqlValue::Null,
                    SqlValue::Integer(1),
                    SqlValue::Null,
                    SqlValue::Integer(9),
                ],
                vec![
                    SqlValue::Integer(12),
                    SqlValue::Null,
                    SqlValue::Integer(1),
                    SqlValue::Null,
                    SqlValue::Integer(9),
                ],
            ],
            ..table(TableKind::FoodListings, vec![])
        };

        let violations = check(&[providers, listings]);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].table, TableKind::FoodListings);
        assert_eq!(violations[0].references, TableKind::Providers);
        assert_eq!(violations[0].missing_ids, vec![9]);
        assert!(violations[0].to_string().contains("food_listings.Provider_ID"));
    }

    #[test]
    fn test_clean_sources_have_no_violations() {
        let receivers = table(TableKind::Receivers, vec![vec![1]]);
        let listings = table(TableKind::FoodListings, vec![vec![5]]);
        let claims = table(TableKind::Claims, vec![vec![1, 5, 1]]);

        assert!(check(&[receivers, listings, claims]).is_empty());
    }

    #[test]
    fn test_claim_violations_per_key() {
        let receivers = table(TableKind::Receivers, vec![vec![1]]);
        let listings = table(TableKind::FoodListings, vec![vec![5]]);
        let claims = table(TableKind::Claims, vec![vec![1, 6, 2], vec![2, 5, 3]]);

        let violations = check(&[receivers, listings, claims]);
        let columns: Vec<&str> = violations.iter().map(|v| v.column).collect();
        assert_eq!(columns, vec!["Food_ID", "Receiver_ID"]);
        assert_eq!(violations[1].missing_ids, vec![2, 3]);
    }
}
