//! Foodshare Core - ingestion, reporting, and claim management.
//!
//! This crate loads the provider, receiver, food listing, and claim datasets
//! into a SQLite store, serves a fixed catalog of aggregate reports over it,
//! and implements the two claim write operations.

pub mod config;
pub mod database;
pub mod error;
pub mod ingest;
pub mod model;
pub mod mutation;
pub mod query;
pub mod schema;
pub mod store;

pub use config::{DatabaseConfig, SourceConfig, DEFAULT_DATABASE_PATH};
pub use database::{Database, DashboardSummary, ListingFilter};
pub use error::{Error, Result};
pub use ingest::{
    IngestPipeline, IngestReport, IntegrityViolation, RowCountCheck, SourceDiagnostics,
    SourceTable,
};
pub use model::{Claim, ClaimDetail, ClaimStatus, FoodListing, ListingDetail, Provider, Receiver};
pub use mutation::MutationExecutor;
pub use query::{
    CacheKey, CacheStats, CatalogQuery, QueryCache, QueryCatalog, QueryParam, QueryParams,
    ResultTable, Value,
};
pub use schema::{ColumnDef, ColumnType, ForeignKey, TableDef, TableKind};
pub use store::Store;
