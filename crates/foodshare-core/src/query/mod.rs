//! Read side of the store.
//!
//! Reports are served from a closed [`QueryCatalog`] of named, parameterized
//! SQL statements and come back as dynamically typed [`ResultTable`]s, so
//! reports with unioned, heterogeneous rows need no per-entity schema.
//! Results are memoized in a [`QueryCache`] that every write invalidates.

mod cache;
mod catalog;
mod result;

pub use cache::{CacheKey, CacheStats, QueryCache};
pub use catalog::{CatalogQuery, QueryCatalog, QueryParam, QueryParams};
pub use result::{ResultTable, Value};
