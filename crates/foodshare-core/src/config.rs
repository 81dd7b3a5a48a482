//! Store and source configuration.

use std::path::{Path, PathBuf};

use crate::schema::TableKind;

/// Default path of the database file.
pub const DEFAULT_DATABASE_PATH: &str = "food_waste_management.db";

/// Where the relational store lives and how it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database file. `None` opens a private in-memory store.
    pub path: Option<PathBuf>,

    /// Memoize report results between writes.
    pub cache_enabled: bool,
}

impl DatabaseConfig {
    /// File-backed store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            cache_enabled: true,
        }
    }

    /// Private in-memory store, discarded on close.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cache_enabled: true,
        }
    }

    /// Disable the result cache.
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Check if the store is in memory.
    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_PATH)
    }
}

/// Locations of the four CSV sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Directory the file names are resolved against.
    pub dir: PathBuf,
    pub providers: String,
    pub receivers: String,
    pub food_listings: String,
    pub claims: String,
}

impl SourceConfig {
    /// Default file names inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            providers: TableKind::Providers.def().source_file.to_string(),
            receivers: TableKind::Receivers.def().source_file.to_string(),
            food_listings: TableKind::FoodListings.def().source_file.to_string(),
            claims: TableKind::Claims.def().source_file.to_string(),
        }
    }

    /// Override the file name for one table.
    pub fn with_file(mut self, kind: TableKind, name: impl Into<String>) -> Self {
        let name = name.into();
        match kind {
            TableKind::Providers => self.providers = name,
            TableKind::Receivers => self.receivers = name,
            TableKind::FoodListings => self.food_listings = name,
            TableKind::Claims => self.claims = name,
        }
        self
    }

    /// Full path of the source for one table.
    pub fn path_for(&self, kind: TableKind) -> PathBuf {
        let name = match kind {
            TableKind::Providers => &self.providers,
            TableKind::Receivers => &self.receivers,
            TableKind::FoodListings => &self.food_listings,
            TableKind::Claims => &self.claims,
        };
        self.dir.join(name)
    }

    /// Directory the sources are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
