//! Result cache for report queries.
//!
//! Entries are keyed by query text plus the parameter values the query
//! actually binds, and tagged with the store generation they were computed
//! at. Any write bumps the generation, so a stale entry is never served.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use super::catalog::{CatalogQuery, QueryParam, QueryParams};
use super::result::ResultTable;

/// Cache lookup key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CacheKey {
    text: String,
    city: Option<String>,
    today: Option<NaiveDate>,
}

impl CacheKey {
    /// Key for a catalog query. Parameters the query does not bind are left out,
    /// so a city filter does not split the cache of a city-independent report.
    pub fn catalog(query: &CatalogQuery, params: &QueryParams) -> Self {
        Self {
            text: query.name.to_string(),
            city: if query.binds(QueryParam::City) {
                params.city.clone()
            } else {
                None
            },
            today: query.binds(QueryParam::Today).then_some(params.today),
        }
    }

    /// Key for ad-hoc SQL, with whitespace runs collapsed.
    pub fn sql(text: &str) -> Self {
        Self {
            text: text.split_whitespace().collect::<Vec<_>>().join(" "),
            city: None,
            today: None,
        }
    }
}

#[derive(Debug)]
struct CachedResult {
    table: ResultTable,
    generation: u64,
}

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    /// Get hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }

    /// Get miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }

    /// Get invalidation count.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(AtomicOrdering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Thread-safe memo of report results.
pub struct QueryCache {
    entries: RwLock<HashMap<CacheKey, CachedResult>>,
    generation: AtomicU64,
    enabled: bool,
    stats: CacheStats,
}

impl QueryCache {
    /// Create an empty cache. A disabled cache never stores anything.
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            enabled,
            stats: CacheStats::default(),
        }
    }

    /// Whether results are being memoized.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current store generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(AtomicOrdering::SeqCst)
    }

    /// Get a cached result computed at the current generation.
    pub fn get(&self, key: &CacheKey) -> Option<ResultTable> {
        if !self.enabled {
            return None;
        }

        let current = self.generation();
        let guard = self.entries.read();

        if let Some(cached) = guard.get(key) {
            if cached.generation == current {
                self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
                debug!(query = %key.text, "query cache hit");
                return Some(cached.table.clone());
            }
        }

        self.stats.misses.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(query = %key.text, "query cache miss");
        None
    }

    /// Store a result computed at `generation`. Results computed before the
    /// latest invalidation are dropped.
    pub fn insert(&self, key: CacheKey, table: ResultTable, generation: u64) {
        if !self.enabled || generation != self.generation() {
            return;
        }
        self.entries
            .write()
            .insert(key, CachedResult { table, generation });
    }

    /// Return the cached result for `key`, or compute, store and return it.
    pub fn get_or_try_insert_with<E, F>(&self, key: CacheKey, compute: F) -> Result<ResultTable, E>
    where
        F: FnOnce() -> Result<ResultTable, E>,
    {
        if let Some(table) = self.get(&key) {
            return Ok(table);
        }

        let generation = self.generation();
        let table = compute()?;
        self.insert(key, table.clone(), generation);
        Ok(table)
    }

    /// Drop every entry and advance the generation.
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        self.entries.write().clear();
        self.stats.invalidations.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(generation, "query cache invalidated");
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Get the current number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(true)
    }
}
