//! The closed catalog of named report queries.

use chrono::{Local, NaiveDate};
use rusqlite::ToSql;
use tracing::debug;

use super::result::ResultTable;
use crate::error::{Error, Result};
use crate::model::DATE_FORMAT;
use crate::store::Store;

/// A parameter a catalog query binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParam {
    /// `:city`, required and supplied by the caller.
    City,
    /// `:today`, the reference date for expiry windows.
    Today,
}

impl QueryParam {
    /// SQL placeholder name.
    pub fn placeholder(self) -> &'static str {
        match self {
            QueryParam::City => ":city",
            QueryParam::Today => ":today",
        }
    }
}

/// Caller-supplied parameter values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// City filter for city-scoped reports.
    pub city: Option<String>,
    /// Reference date; defaults to the local current date.
    pub today: NaiveDate,
}

impl QueryParams {
    /// Parameters with no city and today's date.
    pub fn new() -> Self {
        Self {
            city: None,
            today: Local::now().date_naive(),
        }
    }

    /// Set the city.
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Set the reference date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::new()
    }
}

/// One named report.
#[derive(Debug)]
pub struct CatalogQuery {
    /// Stable identifier used to request the report.
    pub name: &'static str,
    /// Human-readable title.
    pub title: &'static str,
    /// SQL text.
    pub sql: &'static str,
    /// Parameters bound by `sql`.
    pub params: &'static [QueryParam],
}

impl CatalogQuery {
    /// Whether this query binds the given parameter.
    pub fn binds(&self, param: QueryParam) -> bool {
        self.params.contains(&param)
    }

    /// Run against the store, binding only the parameters this query declares.
    pub fn execute(&self, store: &Store, params: &QueryParams) -> Result<ResultTable> {
        let today = params.today.format(DATE_FORMAT).to_string();
        let mut bound: Vec<(&str, &dyn ToSql)> = Vec::with_capacity(self.params.len());

        for param in self.params {
            match param {
                QueryParam::City => {
                    let city = params.city.as_ref().ok_or_else(|| {
                        Error::InvalidQuery(format!(
                            "query '{}' requires a city parameter",
                            self.name
                        ))
                    })?;
                    bound.push((param.placeholder(), city as &dyn ToSql));
                }
                QueryParam::Today => bound.push((param.placeholder(), &today as &dyn ToSql)),
            }
        }

        debug!(query = self.name, params = bound.len(), "executing catalog query");
        store.query_table(self.sql, bound.as_slice())
    }
}

/// Lookup over the fixed set of reports.
pub struct QueryCatalog;

impl QueryCatalog {
    /// Every report, in presentation order.
    pub fn all() -> &'static [CatalogQuery] {
        CATALOG
    }

    /// Find a report by name.
    pub fn get(name: &str) -> Result<&'static CatalogQuery> {
        CATALOG
            .iter()
            .find(|q| q.name == name)
            .ok_or_else(|| Error::InvalidQuery(format!("unknown query '{name}'")))
    }

    /// Look up and run a report.
    pub fn run(store: &Store, name: &str, params: &QueryParams) -> Result<ResultTable> {
        Self::get(name)?.execute(store, params)
    }
}

// A listing counts as wasted when no claim against it has completed.
static CATALOG: &[CatalogQuery] = &[
    CatalogQuery {
        name: "providers_by_city",
        title: "Providers by city",
        sql: "SELECT City, COUNT(*) AS Total_Providers
              FROM providers
              GROUP BY City
              ORDER BY Total_Providers DESC, City ASC",
        params: &[],
    },
    CatalogQuery {
        name: "receivers_by_city",
        title: "Receivers by city",
        sql: "SELECT City, COUNT(*) AS Total_Receivers
              FROM receivers
              GROUP BY City
              ORDER BY Total_Receivers DESC, City ASC",
        params: &[],
    },
    CatalogQuery {
        name: "provider_type_contributions",
        title: "Food contributed by provider type",
        sql: "SELECT p.Type AS Provider_Type,
                     COUNT(f.Food_ID) AS Total_Food_Items,
                     SUM(f.Quantity) AS Total_Quantity
              FROM providers p
              JOIN food_listings f ON p.Provider_ID = f.Provider_ID
              GROUP BY p.Type
              ORDER BY Total_Quantity DESC, Provider_Type ASC",
        params: &[],
    },
    CatalogQuery {
        name: "provider_contacts",
        title: "Provider contacts in a city",
        sql: "SELECT Provider_ID, Name, Type, Contact
              FROM providers
              WHERE City = :city
              ORDER BY Name ASC, Provider_ID ASC
              LIMIT 5",
        params: &[QueryParam::City],
    },
    CatalogQuery {
        name: "top_receivers_by_claims",
        title: "Receivers with the most claims",
        sql: "SELECT r.Receiver_ID, r.Name, r.Type, r.City,
                     COUNT(c.Claim_ID) AS Total_Claims
              FROM receivers r
              JOIN claims c ON r.Receiver_ID = c.Receiver_ID
              GROUP BY r.Receiver_ID, r.Name, r.Type, r.City
              ORDER BY Total_Claims DESC, r.Receiver_ID ASC
              LIMIT 5",
        params: &[],
    },
    CatalogQuery {
        name: "total_food_quantity",
        title: "Total food available",
        sql: "SELECT Total_Food_Items, Total_Quantity
              FROM (SELECT COUNT(Food_ID) AS Total_Food_Items,
                           SUM(Quantity) AS Total_Quantity
                    FROM food_listings)
              WHERE Total_Food_Items > 0",
        params: &[],
    },
    CatalogQuery {
        name: "listings_by_city",
        title: "Food listings by city",
        sql: "SELECT Location AS City,
                     COUNT(Food_ID) AS Total_Listings,
                     SUM(Quantity) AS Total_Quantity
              FROM food_listings
              GROUP BY Location
              ORDER BY Total_Listings DESC, City ASC",
        params: &[],
    },
    CatalogQuery {
        name: "food_type_distribution",
        title: "Most common food types",
        sql: "SELECT Food_Type,
                     COUNT(Food_ID) AS Food_Count,
                     SUM(Quantity) AS Total_Quantity
              FROM food_listings
              GROUP BY Food_Type
              ORDER BY Food_Count DESC, Food_Type ASC",
        params: &[],
    },
    CatalogQuery {
        name: "meal_type_distribution",
        title: "Listings by meal type",
        sql: "SELECT Meal_Type,
                     COUNT(Food_ID) AS Meal_Count,
                     SUM(Quantity) AS Total_Quantity
              FROM food_listings
              GROUP BY Meal_Type
              ORDER BY Meal_Count DESC, Meal_Type ASC",
        params: &[],
    },
    CatalogQuery {
        name: "claims_per_food_item",
        title: "Claims per food item",
        sql: "SELECT f.Food_ID, f.Food_Name, f.Food_Type, f.Meal_Type,
                     COUNT(c.Claim_ID) AS Total_Claims
              FROM food_listings f
              LEFT JOIN claims c ON f.Food_ID = c.Food_ID
              GROUP BY f.Food_ID, f.Food_Name, f.Food_Type, f.Meal_Type
              ORDER BY Total_Claims DESC, f.Food_ID ASC
              LIMIT 10",
        params: &[],
    },
    CatalogQuery {
        name: "top_providers_by_successful_claims",
        title: "Providers with the most completed claims",
        sql: "SELECT p.Provider_ID, p.Name, p.Type, p.City,
                     COUNT(c.Claim_ID) AS Successful_Claims
              FROM providers p
              JOIN food_listings f ON p.Provider_ID = f.Provider_ID
              JOIN claims c ON f.Food_ID = c.Food_ID
              WHERE c.Status = 'Completed'
              GROUP BY p.Provider_ID, p.Name, p.Type, p.City
              ORDER BY Successful_Claims DESC, p.Provider_ID ASC
              LIMIT 5",
        params: &[],
    },
    CatalogQuery {
        name: "claim_status_distribution",
        title: "Claim status breakdown",
        sql: "SELECT Status,
                     COUNT(Claim_ID) AS Count,
                     ROUND(COUNT(Claim_ID) * 100.0
                           / NULLIF((SELECT COUNT(*) FROM claims), 0), 2) AS Percentage
              FROM claims
              GROUP BY Status
              ORDER BY Count DESC, Status ASC",
        params: &[],
    },
    CatalogQuery {
        name: "avg_quantity_per_receiver",
        title: "Average quantity per completed claim, by receiver",
        sql: "SELECT r.Receiver_ID, r.Name, r.Type,
                     COUNT(c.Claim_ID) AS Total_Claims,
                     ROUND(AVG(f.Quantity), 2) AS Avg_Quantity_Per_Claim
              FROM receivers r
              JOIN claims c ON r.Receiver_ID = c.Receiver_ID
              JOIN food_listings f ON c.Food_ID = f.Food_ID
              WHERE c.Status = 'Completed'
              GROUP BY r.Receiver_ID, r.Name, r.Type
              ORDER BY Avg_Quantity_Per_Claim DESC, r.Receiver_ID ASC
              LIMIT 5",
        params: &[],
    },
    CatalogQuery {
        name: "meal_type_claims",
        title: "Most claimed meal types",
        sql: "SELECT f.Meal_Type,
                     COUNT(c.Claim_ID) AS Total_Claims,
                     SUM(f.Quantity) AS Total_Quantity_Claimed
              FROM food_listings f
              JOIN claims c ON f.Food_ID = c.Food_ID
              GROUP BY f.Meal_Type
              ORDER BY Total_Claims DESC, f.Meal_Type ASC",
        params: &[],
    },
    CatalogQuery {
        name: "top_donors_by_quantity",
        title: "Total donations by provider",
        sql: "SELECT p.Provider_ID, p.Name, p.Type, p.City,
                     COUNT(f.Food_ID) AS Total_Items,
                     SUM(f.Quantity) AS Total_Quantity_Donated
              FROM providers p
              JOIN food_listings f ON p.Provider_ID = f.Provider_ID
              GROUP BY p.Provider_ID, p.Name, p.Type, p.City
              ORDER BY Total_Quantity_Donated DESC, p.Provider_ID ASC
              LIMIT 10",
        params: &[],
    },
    CatalogQuery {
        name: "expiring_within_week",
        title: "Food expiring in the next 7 days",
        sql: "SELECT f.Food_ID, f.Food_Name, f.Quantity, f.Expiry_Date, f.Location,
                     p.Name AS Provider_Name, p.Contact AS Provider_Contact
              FROM food_listings f
              LEFT JOIN providers p ON f.Provider_ID = p.Provider_ID
              WHERE date(f.Expiry_Date) BETWEEN date(:today) AND date(:today, '+7 days')
              ORDER BY f.Expiry_Date ASC, f.Food_ID ASC
              LIMIT 10",
        params: &[QueryParam::Today],
    },
    CatalogQuery {
        name: "earliest_expiring",
        title: "Earliest expiring food",
        sql: "SELECT f.Food_ID, f.Food_Name, f.Quantity, f.Expiry_Date, f.Location,
                     p.Name AS Provider_Name, f.Food_Type, f.Meal_Type
              FROM food_listings f
              LEFT JOIN providers p ON f.Provider_ID = p.Provider_ID
              ORDER BY f.Expiry_Date ASC, f.Food_ID ASC
              LIMIT 10",
        params: &[],
    },
    CatalogQuery {
        name: "wastage_by_location",
        title: "Locations with the most wasted food",
        sql: "SELECT f.Location,
                     COUNT(f.Food_ID) AS Unclaimed_Items,
                     SUM(f.Quantity) AS Wasted_Quantity,
                     ROUND(AVG(f.Quantity), 2) AS Avg_Waste_Per_Item
              FROM food_listings f
              WHERE NOT EXISTS (SELECT 1 FROM claims c
                                WHERE c.Food_ID = f.Food_ID AND c.Status = 'Completed')
              GROUP BY f.Location
              ORDER BY Wasted_Quantity DESC, f.Location ASC",
        params: &[],
    },
    CatalogQuery {
        name: "wastage_overview",
        title: "Listed, claimed, and wasted food",
        sql: "WITH overview (Ord, Metric, Count, Total_Quantity) AS (
                  SELECT 1, 'Total Food Listed', COUNT(f.Food_ID), COALESCE(SUM(f.Quantity), 0)
                  FROM food_listings f
                  UNION ALL
                  SELECT 2, 'Successfully Claimed', COUNT(f.Food_ID), COALESCE(SUM(f.Quantity), 0)
                  FROM food_listings f
                  WHERE EXISTS (SELECT 1 FROM claims c
                                WHERE c.Food_ID = f.Food_ID AND c.Status = 'Completed')
                  UNION ALL
                  SELECT 3, 'Unclaimed/Wasted', COUNT(f.Food_ID), COALESCE(SUM(f.Quantity), 0)
                  FROM food_listings f
                  WHERE NOT EXISTS (SELECT 1 FROM claims c
                                    WHERE c.Food_ID = f.Food_ID AND c.Status = 'Completed')
              )
              SELECT Metric, Count, Total_Quantity
              FROM overview
              WHERE EXISTS (SELECT 1 FROM food_listings)
              ORDER BY Ord",
        params: &[],
    },
    CatalogQuery {
        name: "claim_status_counts",
        title: "Claims by status",
        sql: "SELECT Status, COUNT(*) AS Count
              FROM claims
              GROUP BY Status
              ORDER BY Count DESC, Status ASC",
        params: &[],
    },
    CatalogQuery {
        name: "provider_performance",
        title: "Provider performance",
        sql: "SELECT p.Name, COUNT(c.Claim_ID) AS Successful_Claims
              FROM providers p
              JOIN food_listings f ON p.Provider_ID = f.Provider_ID
              JOIN claims c ON f.Food_ID = c.Food_ID
              WHERE c.Status = 'Completed'
              GROUP BY p.Provider_ID, p.Name
              ORDER BY Successful_Claims DESC, p.Provider_ID ASC
              LIMIT 10",
        params: &[],
    },
];
