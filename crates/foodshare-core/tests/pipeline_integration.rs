//! Integration tests for ingestion, reports and claim writes.

use chrono::NaiveDate;
use foodshare_core::{
    ClaimStatus, Database, DatabaseConfig, Error, ListingFilter, QueryParams, SourceConfig,
    TableKind, Value,
};

const PROVIDERS: &str = "\
Provider_ID,Name,Type,Address,City,Contact
1,Fresh Bites,Restaurant,12 Main St,Pune,9.87e+09
2,Green Grocer,Grocery Store,4 Market Rd,Mumbai,555-0102
3,Daily Bread,Supermarket,9 Hill Ave,Pune,555.0103
";

const RECEIVERS: &str = "\
Receiver_ID,Name,Type,City,Contact
1,Hope Shelter,Shelter,Pune,555-0201
2,Food For All,NGO,Mumbai,555-0202
3,Community Kitchen,Charity,Pune,555-0203
";

const LISTINGS: &str = "\
Food_ID,Food_Name,Quantity,Expiry_Date,Provider_ID,Provider_Type,Location,Food_Type,Meal_Type
1,Rice,40,3/18/2025,1,Restaurant,Pune,Vegetarian,Lunch
2,Bread,25,2025-03-20,3,Supermarket,Pune,Vegan,Breakfast
3,Apples,30,3/30/2025,2,Grocery Store,Mumbai,Vegan,Snacks
4,Soup,10,2025-03-16,1,Restaurant,Pune,Vegetarian,Dinner
5,Pasta,15,2025-04-10,2,Grocery Store,Mumbai,Non-Vegetarian,Dinner
";

const CLAIMS: &str = "\
Claim_ID,Food_ID,Receiver_ID,Status,Timestamp
1,1,1,Completed,3/5/2025 5:26
2,2,2,Completed,2025-03-06 10:00:00
3,1,3,Pending,3/7/2025 9:15
4,3,1,Cancelled,2025-03-08T12:00:00
";

const CLAIMS_HEADER: &str = "Claim_ID,Food_ID,Receiver_ID,Status,Timestamp\n";

struct TestContext {
    db: Database,
    sources: SourceConfig,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self::with_files(PROVIDERS, RECEIVERS, LISTINGS, CLAIMS)
    }

    fn with_files(providers: &str, receivers: &str, listings: &str, claims: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sources = SourceConfig::new(dir.path());
        for (kind, contents) in [
            (TableKind::Providers, providers),
            (TableKind::Receivers, receivers),
            (TableKind::FoodListings, listings),
            (TableKind::Claims, claims),
        ] {
            std::fs::write(sources.path_for(kind), contents).unwrap();
        }

        let db = Database::open(DatabaseConfig::new(dir.path().join("food.db"))).unwrap();

        Self {
            db,
            sources,
            _dir: dir,
        }
    }

    fn ingested() -> Self {
        let mut ctx = Self::new();
        ctx.db.ingest(&ctx.sources).unwrap();
        ctx
    }
}

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn text(value: &Value) -> &str {
    value.as_str().unwrap()
}

#[test]
fn test_clean_sources_report_no_warnings() {
    let mut ctx = TestContext::new();
    let report = ctx.db.ingest(&ctx.sources).unwrap();

    assert_eq!(report.missing_value_warnings(), 0);
    assert!(report.integrity.is_empty());
    assert!(report.is_clean());
    assert_eq!(report.rows_loaded(), 3 + 3 + 5 + 4);

    let providers = &report.sources[0];
    assert_eq!(providers.table, TableKind::Providers);
    assert_eq!(providers.contacts_normalized, 2);
}

#[test]
fn test_round_trip_row_counts() {
    let ctx = TestContext::ingested();

    assert_eq!(ctx.db.load_providers().unwrap().len(), 3);
    assert_eq!(ctx.db.load_receivers().unwrap().len(), 3);
    assert_eq!(ctx.db.load_claims().unwrap().len(), 4);

    let listings = ctx.db.load_food_listings().unwrap();
    assert_eq!(listings.len(), 5);
    assert_eq!(listings[0].expiry_date, Some(march(18)));

    let providers = ctx.db.load_providers().unwrap();
    assert_eq!(providers[0].contact, "987");
    assert_eq!(providers[2].contact, "5550103");
}

#[test]
fn test_orphan_listing_is_reported_and_loaded() {
    let listings = format!("{LISTINGS}6,Milk,5,2025-03-19,9,Dairy,Pune,Vegetarian,Breakfast\n");
    let mut ctx = TestContext::with_files(PROVIDERS, RECEIVERS, &listings, CLAIMS);

    let report = ctx.db.ingest(&ctx.sources).unwrap();

    assert_eq!(report.integrity.len(), 1);
    let violation = &report.integrity[0];
    assert_eq!(violation.table, TableKind::FoodListings);
    assert_eq!(violation.column, "Provider_ID");
    assert_eq!(violation.missing_ids, vec![9]);
    assert!(!report.is_clean());

    // Every stored Provider_ID either resolves or was reported.
    let provider_ids: Vec<i64> = ctx
        .db
        .load_providers()
        .unwrap()
        .iter()
        .map(|p| p.provider_id)
        .collect();
    for listing in ctx.db.load_food_listings().unwrap() {
        let provider_id = listing.provider_id.unwrap();
        assert!(
            provider_ids.contains(&provider_id) || violation.missing_ids.contains(&provider_id)
        );
    }
}

#[test]
fn test_empty_typed_cells_load_as_null() {
    let listings = format!("{LISTINGS}6,Milk,,2025-03-19,3,Supermarket,Pune,Vegetarian,Breakfast\n");
    let claims = format!("{CLAIMS}5,2,3,Pending,\n");
    let mut ctx = TestContext::with_files(PROVIDERS, RECEIVERS, &listings, &claims);

    let report = ctx.db.ingest(&ctx.sources).unwrap();

    assert_eq!(report.missing_value_warnings(), 2);
    assert_eq!(report.sources[2].missing_values.get("Quantity"), Some(&1));
    assert_eq!(report.sources[3].missing_values.get("Timestamp"), Some(&1));
    assert!(report.row_counts.iter().all(|c| c.matches()));

    let listings = ctx.db.load_food_listings().unwrap();
    assert_eq!(listings.len(), 6);
    assert_eq!(listings[5].quantity, None);
    assert_eq!(listings[5].expiry_date, Some(march(19)));

    let claims = ctx.db.load_claims().unwrap();
    assert_eq!(claims.len(), 5);
    assert_eq!(claims[4].status, Some(ClaimStatus::Pending));
    assert_eq!(claims[4].timestamp, None);

    let totals = ctx.db.run_query("total_food_quantity", &QueryParams::new()).unwrap();
    assert_eq!(totals.rows, vec![vec![Value::Integer(6), Value::Integer(120)]]);
    assert_eq!(ctx.db.claim_details().unwrap().len(), 5);
}

#[test]
fn test_failed_ingest_clears_cached_reports() {
    let mut ctx = TestContext::ingested();
    let params = QueryParams::new();
    ctx.db.run_query("claim_status_counts", &params).unwrap();
    let invalidations = ctx.db.cache_stats().invalidations();

    let bad_claims = format!("{CLAIMS}5,1,1,Pending,not a time\n");
    std::fs::write(ctx.sources.path_for(TableKind::Claims), bad_claims).unwrap();
    let err = ctx.db.ingest(&ctx.sources).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { column: "Timestamp", .. }));

    assert_eq!(ctx.db.cache_stats().invalidations(), invalidations + 1);
    ctx.db.run_query("claim_status_counts", &params).unwrap();
    assert_eq!(ctx.db.cache_stats().hits(), 0);
}

#[test]
fn test_header_only_source_loads_zero_rows() {
    let mut ctx = TestContext::with_files(PROVIDERS, RECEIVERS, LISTINGS, CLAIMS_HEADER);
    let report = ctx.db.ingest(&ctx.sources).unwrap();

    assert!(report.row_counts.iter().all(|c| c.matches()));
    assert!(ctx.db.load_claims().unwrap().is_empty());

    let status = ctx
        .db
        .run_query("claim_status_distribution", &QueryParams::new())
        .unwrap();
    assert!(status.is_empty());

    let overview = ctx.db.run_query("wastage_overview", &QueryParams::new()).unwrap();
    let wasted = overview.find_row("Metric", "Unclaimed/Wasted").unwrap();
    assert_eq!(wasted[1], Value::Integer(5));
}

#[test]
fn test_missing_source_leaves_store_untouched() {
    let mut ctx = TestContext::ingested();
    let broken = ctx.sources.clone().with_file(TableKind::Claims, "absent.csv");

    let err = ctx.db.ingest(&broken).unwrap_err();
    assert!(matches!(err, Error::MissingSource { table: "claims", .. }));

    assert_eq!(ctx.db.load_claims().unwrap().len(), 4);
    assert_eq!(ctx.db.load_food_listings().unwrap().len(), 5);
}

#[test]
fn test_unparseable_date_aborts() {
    let listings = format!("{LISTINGS}6,Milk,5,next week,1,Restaurant,Pune,Vegan,Lunch\n");
    let mut ctx = TestContext::with_files(PROVIDERS, RECEIVERS, &listings, CLAIMS);

    let err = ctx.db.ingest(&ctx.sources).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidValue {
            column: "Expiry_Date",
            row: 6,
            ..
        }
    ));
    assert!(ctx.db.load_food_listings().unwrap().is_empty());
}

#[test]
fn test_claim_status_distribution() {
    let ctx = TestContext::ingested();
    let table = ctx
        .db
        .run_query("claim_status_distribution", &QueryParams::new())
        .unwrap();

    assert_eq!(table.columns, vec!["Status", "Count", "Percentage"]);
    let rows: Vec<(&str, i64, f64)> = table
        .rows
        .iter()
        .map(|r| (text(&r[0]), r[1].as_i64().unwrap(), r[2].as_f64().unwrap()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Completed", 2, 50.0),
            ("Cancelled", 1, 25.0),
            ("Pending", 1, 25.0),
        ]
    );
}

#[test]
fn test_wastage_rules() {
    let ctx = TestContext::ingested();

    let by_location = ctx
        .db
        .run_query("wastage_by_location", &QueryParams::new())
        .unwrap();
    assert_eq!(by_location.len(), 2);

    let mumbai = by_location.find_row("Location", "Mumbai").unwrap();
    assert_eq!(mumbai[1], Value::Integer(2));
    assert_eq!(mumbai[2], Value::Integer(45));
    assert_eq!(mumbai[3].as_f64(), Some(22.5));

    // Rice has a completed and a pending claim, Bread a completed one: both excluded.
    let pune = by_location.find_row("Location", "Pune").unwrap();
    assert_eq!(pune[1], Value::Integer(1));
    assert_eq!(pune[2], Value::Integer(10));

    let overview = ctx.db.run_query("wastage_overview", &QueryParams::new()).unwrap();
    let metrics: Vec<(&str, i64, i64)> = overview
        .rows
        .iter()
        .map(|r| (text(&r[0]), r[1].as_i64().unwrap(), r[2].as_i64().unwrap()))
        .collect();
    assert_eq!(
        metrics,
        vec![
            ("Total Food Listed", 5, 120),
            ("Successfully Claimed", 2, 65),
            ("Unclaimed/Wasted", 3, 55),
        ]
    );
}

#[test]
fn test_pending_only_listing_counts_as_wasted() {
    let listings = "\
Food_ID,Food_Name,Quantity,Expiry_Date,Provider_ID,Provider_Type,Location,Food_Type,Meal_Type
1,Rice,5,2025-03-18,1,Restaurant,Pune,Vegetarian,Lunch
";
    let claims = format!("{CLAIMS_HEADER}1,1,1,Pending,2025-03-05 10:00:00\n");
    let mut ctx = TestContext::with_files(PROVIDERS, RECEIVERS, listings, &claims);
    ctx.db.ingest(&ctx.sources).unwrap();

    let overview = ctx.db.run_query("wastage_overview", &QueryParams::new()).unwrap();
    let metrics: Vec<(&str, i64, i64)> = overview
        .rows
        .iter()
        .map(|r| (text(&r[0]), r[1].as_i64().unwrap(), r[2].as_i64().unwrap()))
        .collect();
    assert_eq!(
        metrics,
        vec![
            ("Total Food Listed", 1, 5),
            ("Successfully Claimed", 0, 0),
            ("Unclaimed/Wasted", 1, 5),
        ]
    );

    let by_location = ctx
        .db
        .run_query("wastage_by_location", &QueryParams::new())
        .unwrap();
    let pune = by_location.find_row("Location", "Pune").unwrap();
    assert_eq!(pune[1], Value::Integer(1));
}

#[test]
fn test_expiry_window_uses_reference_date() {
    let ctx = TestContext::ingested();
    let params = QueryParams::new().with_today(march(15));

    let table = ctx.db.run_query("expiring_within_week", &params).unwrap();
    let ids: Vec<i64> = table
        .column_values("Food_ID")
        .unwrap()
        .into_iter()
        .filter_map(Value::as_i64)
        .collect();
    assert_eq!(ids, vec![4, 1, 2]);
    assert_eq!(table.get(0, "Expiry_Date"), Some(&Value::Text("2025-03-16".into())));
    assert_eq!(table.get(0, "Provider_Contact"), Some(&Value::Text("987".into())));

    let later = ctx
        .db
        .run_query("expiring_within_week", &params.clone().with_today(march(25)))
        .unwrap();
    assert_eq!(later.len(), 1);
}

#[test]
fn test_city_scoped_report() {
    let ctx = TestContext::ingested();

    let table = ctx
        .db
        .run_query("provider_contacts", &QueryParams::new().with_city("Pune"))
        .unwrap();
    let names: Vec<&str> = table
        .column_values("Name")
        .unwrap()
        .into_iter()
        .map(text)
        .collect();
    assert_eq!(names, vec!["Daily Bread", "Fresh Bites"]);

    let err = ctx
        .db
        .run_query("provider_contacts", &QueryParams::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn test_rankings_and_totals() {
    let ctx = TestContext::ingested();
    let params = QueryParams::new();

    let totals = ctx.db.run_query("total_food_quantity", &params).unwrap();
    assert_eq!(totals.rows, vec![vec![Value::Integer(5), Value::Integer(120)]]);

    let receivers = ctx.db.run_query("top_receivers_by_claims", &params).unwrap();
    assert_eq!(receivers.get(0, "Name"), Some(&Value::Text("Hope Shelter".into())));
    assert_eq!(receivers.get(0, "Total_Claims"), Some(&Value::Integer(2)));

    let by_city = ctx.db.run_query("providers_by_city", &params).unwrap();
    assert_eq!(by_city.get(0, "City"), Some(&Value::Text("Pune".into())));
    assert_eq!(by_city.get(0, "Total_Providers"), Some(&Value::Integer(2)));

    let performance = ctx.db.run_query("provider_performance", &params).unwrap();
    assert_eq!(performance.len(), 2);
}

#[test]
fn test_every_report_runs_on_loaded_data() {
    let ctx = TestContext::ingested();
    let params = QueryParams::new().with_city("Pune").with_today(march(15));

    for query in ctx.db.catalog() {
        let table = ctx.db.run_query(query.name, &params).unwrap();
        assert!(!table.is_empty(), "{} returned no rows", query.name);
    }
}

#[test]
fn test_submit_allocates_next_id() {
    let mut ctx = TestContext::ingested();

    let claim = ctx.db.submit_claim(5, 2).unwrap();
    assert_eq!(claim.claim_id, 5);
    assert_eq!(claim.status, Some(ClaimStatus::Pending));
    assert_eq!(ctx.db.claim(5).unwrap(), Some(claim));

    let err = ctx.db.submit_claim(99, 2).unwrap_err();
    assert!(matches!(err, Error::NotFound { id: 99, .. }));
}

#[test]
fn test_invalid_status_update_is_rejected() {
    let mut ctx = TestContext::ingested();

    let err = ctx.db.update_claim_status(3, "Done").unwrap_err();
    assert!(matches!(err, Error::InvalidStatus(ref s) if s == "Done"));
    assert_eq!(
        ctx.db.claim(3).unwrap().and_then(|c| c.status),
        Some(ClaimStatus::Pending)
    );

    let updated = ctx.db.update_claim_status(3, "Completed").unwrap();
    assert_eq!(updated.status, Some(ClaimStatus::Completed));

    let err = ctx.db.update_claim_status(40, "Completed").unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "claim", id: 40 }));
}

#[test]
fn test_cache_is_invalidated_by_writes() {
    let mut ctx = TestContext::ingested();
    let params = QueryParams::new();

    let before = ctx.db.run_query("claim_status_counts", &params).unwrap();
    let again = ctx.db.run_query("claim_status_counts", &params).unwrap();
    assert_eq!(before, again);
    assert_eq!(ctx.db.cache_stats().hits(), 1);

    ctx.db.submit_claim(4, 3).unwrap();

    let after = ctx.db.run_query("claim_status_counts", &params).unwrap();
    assert_eq!(ctx.db.cache_stats().hits(), 1);
    let pending = after.find_row("Status", "Pending").unwrap();
    assert_eq!(pending[1], Value::Integer(2));
}

#[test]
fn test_query_sql_rejects_writes() {
    let mut ctx = TestContext::ingested();

    for sql in [
        "DROP TABLE claims",
        "UPDATE claims SET Status = 'Pending'",
        "INSERT INTO claims VALUES (9, 1, 1, 'Pending', '2025-03-01T00:00:00')",
        "BEGIN",
        "SAVEPOINT s1",
        "ATTACH DATABASE ':memory:' AS extra",
    ] {
        let err = ctx.db.query_sql(sql).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)), "{sql} was not rejected");
    }
    assert_eq!(ctx.db.load_claims().unwrap().len(), 4);

    // No transaction was left open.
    let claim = ctx.db.submit_claim(1, 1).unwrap();
    assert_eq!(claim.claim_id, 5);

    let table = ctx
        .db
        .query_sql("SELECT Food_Name FROM food_listings WHERE Quantity > 25 ORDER BY Food_ID")
        .unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn test_browse_views() {
    let ctx = TestContext::ingested();

    let pune_vegan = ctx
        .db
        .listings(&ListingFilter::default().with_city("Pune").with_food_type("Vegan"))
        .unwrap();
    assert_eq!(pune_vegan.len(), 1);
    assert_eq!(pune_vegan[0].listing.food_name, "Bread");
    assert_eq!(pune_vegan[0].provider_name.as_deref(), Some("Daily Bread"));

    assert_eq!(ctx.db.listings(&ListingFilter::default()).unwrap().len(), 5);
    assert_eq!(ctx.db.providers(Some("Restaurant")).unwrap().len(), 1);
    assert_eq!(ctx.db.receivers(None).unwrap().len(), 3);

    let details = ctx.db.claim_details().unwrap();
    assert_eq!(details.len(), 4);
    assert_eq!(details[0].claim_id, 4);
    assert_eq!(details[0].receiver_name, "Hope Shelter");

    let summary = ctx.db.dashboard().unwrap();
    assert_eq!(summary.providers, 3);
    assert_eq!(summary.provider_cities, 2);
    assert_eq!(summary.total_quantity, 120);
    assert_eq!(summary.completed_claims, 2);
    assert_eq!(summary.success_rate, Some(50.0));
}

#[test]
fn test_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.db");
    let sources = SourceConfig::new(dir.path());
    for (kind, contents) in [
        (TableKind::Providers, PROVIDERS),
        (TableKind::Receivers, RECEIVERS),
        (TableKind::FoodListings, LISTINGS),
        (TableKind::Claims, CLAIMS),
    ] {
        std::fs::write(sources.path_for(kind), contents).unwrap();
    }

    let mut db = Database::open(DatabaseConfig::new(&path)).unwrap();
    db.ingest(&sources).unwrap();
    db.update_claim_status(3, "Cancelled").unwrap();
    db.close().unwrap();

    let db = Database::open(DatabaseConfig::new(&path)).unwrap();
    assert_eq!(
        db.claim(3).unwrap().and_then(|c| c.status),
        Some(ClaimStatus::Cancelled)
    );
}
