//! Table definitions for the four relations.
//!
//! Each table is described once, statically, and every piece of SQL the
//! ingestion pipeline issues (DDL, bulk insert, row counts) is derived from
//! these definitions.

use serde::Serialize;

/// The four relations of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Food donors.
    Providers,
    /// Organisations and individuals claiming food.
    Receivers,
    /// Offered food items.
    FoodListings,
    /// Receiver requests against listings.
    Claims,
}

impl TableKind {
    /// All tables, in load order (referenced tables first).
    pub const ALL: [TableKind; 4] = [
        TableKind::Providers,
        TableKind::Receivers,
        TableKind::FoodListings,
        TableKind::Claims,
    ];

    /// Static definition for this table.
    pub fn def(self) -> &'static TableDef {
        match self {
            TableKind::Providers => &PROVIDERS,
            TableKind::Receivers => &RECEIVERS,
            TableKind::FoodListings => &FOOD_LISTINGS,
            TableKind::Claims => &CLAIMS,
        }
    }

    /// SQL table name.
    pub fn name(self) -> &'static str {
        self.def().name
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer.
    Integer,
    /// Free text.
    Text,
    /// Phone/contact text, normalized on ingest.
    Contact,
    /// Calendar date, stored as `YYYY-MM-DD`.
    Date,
    /// Date and time, stored as `YYYY-MM-DDTHH:MM:SS`.
    DateTime,
    /// Claim status, one of `Pending`, `Completed`, `Cancelled`.
    Status,
}

impl ColumnType {
    /// SQLite declared type.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text | ColumnType::Contact | ColumnType::Status => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
        }
    }
}

/// A column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name, identical in the CSV header and the store.
    pub name: &'static str,
    /// Value type.
    pub ty: ColumnType,
}

impl ColumnDef {
    const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

/// A foreign-key reference from one column to another table's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing column in the owning table.
    pub column: &'static str,
    /// Referenced table.
    pub references: TableKind,
    /// Referenced column.
    pub references_column: &'static str,
}

impl ForeignKey {
    const fn new(
        column: &'static str,
        references: TableKind,
        references_column: &'static str,
    ) -> Self {
        Self {
            column,
            references,
            references_column,
        }
    }
}

/// Static description of one relation.
#[derive(Debug)]
pub struct TableDef {
    /// Which relation this is.
    pub kind: TableKind,
    /// SQL table name.
    pub name: &'static str,
    /// Default CSV file name the table is loaded from.
    pub source_file: &'static str,
    /// Columns in declaration order.
    pub columns: &'static [ColumnDef],
    /// Primary key column.
    pub primary_key: &'static str,
    /// Foreign keys declared on this table.
    pub foreign_keys: &'static [ForeignKey],
}

pub static PROVIDERS: TableDef = TableDef {
    kind: TableKind::Providers,
    name: "providers",
    source_file: "providers_data.csv",
    columns: &[
        ColumnDef::new("Provider_ID", ColumnType::Integer),
        ColumnDef::new("Name", ColumnType::Text),
        ColumnDef::new("Type", ColumnType::Text),
        ColumnDef::new("Address", ColumnType::Text),
        ColumnDef::new("City", ColumnType::Text),
        ColumnDef::new("Contact", ColumnType::Contact),
    ],
    primary_key: "Provider_ID",
    foreign_keys: &[],
};

pub static RECEIVERS: TableDef = TableDef {
    kind: TableKind::Receivers,
    name: "receivers",
    source_file: "receivers_data.csv",
    columns: &[
        ColumnDef::new("Receiver_ID", ColumnType::Integer),
        ColumnDef::new("Name", ColumnType::Text),
        ColumnDef::new("Type", ColumnType::Text),
        ColumnDef::new("City", ColumnType::Text),
        ColumnDef::new("Contact", ColumnType::Contact),
    ],
    primary_key: "Receiver_ID",
    foreign_keys: &[],
};

pub static FOOD_LISTINGS: TableDef = TableDef {
    kind: TableKind::FoodListings,
    name: "food_listings",
    source_file: "food_listings_data.csv",
    columns: &[
        ColumnDef::new("Food_ID", ColumnType::Integer),
        ColumnDef::new("Food_Name", ColumnType::Text),
        ColumnDef::new("Quantity", ColumnType::Integer),
        ColumnDef::new("Expiry_Date", ColumnType::Date),
        ColumnDef::new("Provider_ID", ColumnType::Integer),
        ColumnDef::new("Provider_Type", ColumnType::Text),
        ColumnDef::new("Location", ColumnType::Text),
        ColumnDef::new("Food_Type", ColumnType::Text),
        ColumnDef::new("Meal_Type", ColumnType::Text),
    ],
    primary_key: "Food_ID",
    foreign_keys: &[ForeignKey::new(
        "Provider_ID",
        TableKind::Providers,
        "Provider_ID",
    )],
};

pub static CLAIMS: TableDef = TableDef {
    kind: TableKind::Claims,
    name: "claims",
    source_file: "claims_data.csv",
    columns: &[
        ColumnDef::new("Claim_ID", ColumnType::Integer),
        ColumnDef::new("Food_ID", ColumnType::Integer),
        ColumnDef::new("Receiver_ID", ColumnType::Integer),
        ColumnDef::new("Status", ColumnType::Status),
        ColumnDef::new("Timestamp", ColumnType::DateTime),
    ],
    primary_key: "Claim_ID",
    foreign_keys: &[
        ForeignKey::new("Food_ID", TableKind::FoodListings, "Food_ID"),
        ForeignKey::new("Receiver_ID", TableKind::Receivers, "Receiver_ID"),
    ],
};

impl TableDef {
    /// Position of a column, if declared.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement.
    ///
    /// Only the primary key is constrained; missing source cells are loaded as
    /// NULL and reported by the ingestion diagnostics instead. Foreign keys are
    /// declared but SQLite leaves them unenforced unless `PRAGMA foreign_keys`
    /// is switched on, which the store never does.
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if c.name == self.primary_key {
                    format!("    {} {} PRIMARY KEY", c.name, c.ty.sql_type())
                } else {
                    format!("    {} {}", c.name, c.ty.sql_type())
                }
            })
            .collect();

        for fk in self.foreign_keys {
            parts.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.column,
                fk.references.name(),
                fk.references_column
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.name,
            parts.join(",\n")
        )
    }

    /// Bulk insert statement with one positional parameter per column.
    ///
    /// A repeated primary key replaces the earlier row.
    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders.join(", ")
        )
    }

    /// Statement clearing all rows.
    pub fn delete_all_sql(&self) -> String {
        format!("DELETE FROM {}", self.name)
    }

    /// Statement counting all rows.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.name)
    }

    /// Full-table select in key order.
    pub fn select_all_sql(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        format!(
            "SELECT {} FROM {} ORDER BY {}",
            names.join(", "),
            self.name,
            self.primary_key
        )
    }
}
