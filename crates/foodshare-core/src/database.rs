//! Database facade combining the store, the report catalog and the result cache.

use chrono::NaiveDateTime;
use rusqlite::named_params;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{DatabaseConfig, SourceConfig};
use crate::error::Result;
use crate::ingest::{IngestPipeline, IngestReport};
use crate::model::{Claim, ClaimDetail, FoodListing, ListingDetail, Provider, Receiver};
use crate::mutation::MutationExecutor;
use crate::query::{
    CacheKey, CacheStats, CatalogQuery, QueryCache, QueryCatalog, QueryParams, ResultTable,
};
use crate::schema::TableKind;
use crate::store::Store;

/// Optional filters over the listing browse view. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub city: Option<String>,
    pub food_type: Option<String>,
    pub meal_type: Option<String>,
}

impl ListingFilter {
    /// Restrict to one city.
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Restrict to one food type.
    pub fn with_food_type(mut self, food_type: impl Into<String>) -> Self {
        self.food_type = Some(food_type.into());
        self
    }

    /// Restrict to one meal type.
    pub fn with_meal_type(mut self, meal_type: impl Into<String>) -> Self {
        self.meal_type = Some(meal_type.into());
        self
    }
}

/// Headline figures for the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub providers: i64,
    pub provider_cities: i64,
    pub receivers: i64,
    pub receiver_cities: i64,
    pub listings: i64,
    pub total_quantity: i64,
    pub claims: i64,
    pub completed_claims: i64,
    /// Completed claims as a percentage of all claims, `None` with no claims.
    pub success_rate: Option<f64>,
}

/// Database wrapper that owns the store and the result cache.
pub struct Database {
    store: Store,
    cache: QueryCache,
    config: DatabaseConfig,
}

impl Database {
    /// Open the database described by `config`, creating missing tables.
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let store = Store::open(&config)?;
        store.create_tables()?;

        Ok(Self {
            store,
            cache: QueryCache::new(config.cache_enabled),
            config,
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(DatabaseConfig::in_memory())
    }

    /// Configuration the database was opened with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Replace the store contents with the given sources.
    pub fn ingest(&mut self, sources: &SourceConfig) -> Result<IngestReport> {
        info!(dir = %sources.dir().display(), "starting ingestion");
        let result = IngestPipeline::new(&mut self.store, sources).run();
        // A run can fail after the replace has committed.
        self.cache.invalidate();
        result
    }

    /// The report catalog.
    pub fn catalog(&self) -> &'static [CatalogQuery] {
        QueryCatalog::all()
    }

    /// Run a catalog report, serving repeated calls from the cache.
    pub fn run_query(&self, name: &str, params: &QueryParams) -> Result<ResultTable> {
        let query = QueryCatalog::get(name)?;
        let key = CacheKey::catalog(query, params);
        self.cache
            .get_or_try_insert_with(key, || query.execute(&self.store, params))
    }

    /// Run one read-only SQL statement. Statements that would write are rejected.
    pub fn query_sql(&self, sql: &str) -> Result<ResultTable> {
        self.cache
            .get_or_try_insert_with(CacheKey::sql(sql), || self.store.query_readonly(sql))
    }

    /// Submit a new claim stamped with the current local time.
    pub fn submit_claim(&mut self, food_id: i64, receiver_id: i64) -> Result<Claim> {
        let claim = MutationExecutor::new(&mut self.store).submit_claim(food_id, receiver_id)?;
        self.cache.invalidate();
        Ok(claim)
    }

    /// Submit a new claim with an explicit timestamp.
    pub fn submit_claim_at(
        &mut self,
        food_id: i64,
        receiver_id: i64,
        timestamp: NaiveDateTime,
    ) -> Result<Claim> {
        let claim = MutationExecutor::new(&mut self.store)
            .submit_claim_at(food_id, receiver_id, timestamp)?;
        self.cache.invalidate();
        Ok(claim)
    }

    /// Change a claim's status.
    pub fn update_claim_status(&mut self, claim_id: i64, new_status: &str) -> Result<Claim> {
        let claim =
            MutationExecutor::new(&mut self.store).update_claim_status(claim_id, new_status)?;
        self.cache.invalidate();
        Ok(claim)
    }

    /// Look up one claim.
    pub fn claim(&self, claim_id: i64) -> Result<Option<Claim>> {
        self.store.claim(claim_id)
    }

    /// Every provider, in id order.
    pub fn load_providers(&self) -> Result<Vec<Provider>> {
        self.store.load_all(TableKind::Providers, Provider::from_row)
    }

    /// Every receiver, in id order.
    pub fn load_receivers(&self) -> Result<Vec<Receiver>> {
        self.store.load_all(TableKind::Receivers, Receiver::from_row)
    }

    /// Every food listing, in id order.
    pub fn load_food_listings(&self) -> Result<Vec<FoodListing>> {
        self.store.load_all(TableKind::FoodListings, FoodListing::from_row)
    }

    /// Every claim, in id order.
    pub fn load_claims(&self) -> Result<Vec<Claim>> {
        self.store.load_all(TableKind::Claims, Claim::from_row)
    }

    /// Providers, optionally restricted to one type.
    pub fn providers(&self, provider_type: Option<&str>) -> Result<Vec<Provider>> {
        let mut stmt = self.store.connection().prepare(
            "SELECT Provider_ID, Name, Type, Address, City, Contact
             FROM providers
             WHERE (:type IS NULL OR Type = :type)
             ORDER BY Provider_ID",
        )?;
        let rows = stmt
            .query_map(named_params! { ":type": provider_type }, Provider::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Receivers, optionally restricted to one type.
    pub fn receivers(&self, receiver_type: Option<&str>) -> Result<Vec<Receiver>> {
        let mut stmt = self.store.connection().prepare(
            "SELECT Receiver_ID, Name, Type, City, Contact
             FROM receivers
             WHERE (:type IS NULL OR Type = :type)
             ORDER BY Receiver_ID",
        )?;
        let rows = stmt
            .query_map(named_params! { ":type": receiver_type }, Receiver::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Listings joined with their provider, filtered by `filter`.
    pub fn listings(&self, filter: &ListingFilter) -> Result<Vec<ListingDetail>> {
        let mut stmt = self.store.connection().prepare(
            "SELECT f.Food_ID, f.Food_Name, f.Quantity, f.Expiry_Date, f.Provider_ID,
                    f.Provider_Type, f.Location, f.Food_Type, f.Meal_Type,
                    p.Name, p.Contact
             FROM food_listings f
             LEFT JOIN providers p ON f.Provider_ID = p.Provider_ID
             WHERE (:city IS NULL OR f.Location = :city)
               AND (:food_type IS NULL OR f.Food_Type = :food_type)
               AND (:meal_type IS NULL OR f.Meal_Type = :meal_type)
             ORDER BY f.Expiry_Date, f.Food_ID",
        )?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":city": filter.city,
                    ":food_type": filter.food_type,
                    ":meal_type": filter.meal_type,
                },
                |row| {
                    Ok(ListingDetail {
                        listing: FoodListing::from_row(row)?,
                        provider_name: row.get(9)?,
                        provider_contact: row.get(10)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(rows = rows.len(), "listings view");
        Ok(rows)
    }

    /// Claims joined with the claimed food and the receiver, newest first.
    pub fn claim_details(&self) -> Result<Vec<ClaimDetail>> {
        let mut stmt = self.store.connection().prepare(
            "SELECT c.Claim_ID, f.Food_Name, f.Quantity, r.Name, c.Status, c.Timestamp
             FROM claims c
             JOIN food_listings f ON c.Food_ID = f.Food_ID
             JOIN receivers r ON c.Receiver_ID = r.Receiver_ID
             ORDER BY c.Timestamp DESC, c.Claim_ID DESC",
        )?;
        let rows = stmt
            .query_map([], ClaimDetail::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Headline counts over all four tables.
    pub fn dashboard(&self) -> Result<DashboardSummary> {
        let summary = self.store.connection().query_row(
            "SELECT
                (SELECT COUNT(*) FROM providers),
                (SELECT COUNT(DISTINCT City) FROM providers),
                (SELECT COUNT(*) FROM receivers),
                (SELECT COUNT(DISTINCT City) FROM receivers),
                (SELECT COUNT(*) FROM food_listings),
                (SELECT COALESCE(SUM(Quantity), 0) FROM food_listings),
                (SELECT COUNT(*) FROM claims),
                (SELECT COUNT(*) FROM claims WHERE Status = 'Completed')",
            [],
            |row| {
                let claims: i64 = row.get(6)?;
                let completed_claims: i64 = row.get(7)?;
                Ok(DashboardSummary {
                    providers: row.get(0)?,
                    provider_cities: row.get(1)?,
                    receivers: row.get(2)?,
                    receiver_cities: row.get(3)?,
                    listings: row.get(4)?,
                    total_quantity: row.get(5)?,
                    claims,
                    completed_claims,
                    success_rate: (claims > 0)
                        .then(|| completed_claims as f64 * 100.0 / claims as f64),
                })
            },
        )?;
        Ok(summary)
    }

    /// Result cache statistics.
    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Drop every cached result.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Close the store.
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}
