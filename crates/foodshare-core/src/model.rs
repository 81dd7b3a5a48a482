//! Typed rows for the four relations.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::Serialize;

use crate::error::Error;

/// Storage format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for timestamps.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Lifecycle status of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClaimStatus {
    /// Submitted, not yet resolved.
    Pending,
    /// Food was handed over.
    Completed,
    /// Claim was withdrawn or rejected.
    Cancelled,
}

impl ClaimStatus {
    /// All permitted statuses.
    pub const ALL: [ClaimStatus; 3] = [
        ClaimStatus::Pending,
        ClaimStatus::Completed,
        ClaimStatus::Cancelled,
    ];

    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Completed => "Completed",
            ClaimStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = Error;

    /// Exact, case-sensitive match on the stored representation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }
}

/// A food donor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provider {
    pub provider_id: i64,
    pub name: String,
    pub provider_type: String,
    pub address: String,
    pub city: String,
    pub contact: String,
}

impl Provider {
    /// Decode from a `providers` row in declaration order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            provider_id: row.get(0)?,
            name: text(row, 1)?,
            provider_type: text(row, 2)?,
            address: text(row, 3)?,
            city: text(row, 4)?,
            contact: text(row, 5)?,
        })
    }
}

/// A receiver of donated food.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receiver {
    pub receiver_id: i64,
    pub name: String,
    pub receiver_type: String,
    pub city: String,
    pub contact: String,
}

impl Receiver {
    /// Decode from a `receivers` row in declaration order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            receiver_id: row.get(0)?,
            name: text(row, 1)?,
            receiver_type: text(row, 2)?,
            city: text(row, 3)?,
            contact: text(row, 4)?,
        })
    }
}

/// A quantity of one food item offered by a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodListing {
    pub food_id: i64,
    pub food_name: String,
    pub quantity: Option<i64>,
    pub expiry_date: Option<NaiveDate>,
    pub provider_id: Option<i64>,
    pub provider_type: String,
    pub location: String,
    pub food_type: String,
    pub meal_type: String,
}

impl FoodListing {
    /// Decode from a `food_listings` row in declaration order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            food_id: row.get(0)?,
            food_name: text(row, 1)?,
            quantity: row.get(2)?,
            expiry_date: date(row, 3)?,
            provider_id: row.get(4)?,
            provider_type: text(row, 5)?,
            location: text(row, 6)?,
            food_type: text(row, 7)?,
            meal_type: text(row, 8)?,
        })
    }
}

/// A receiver's request against one listing.
///
/// Claims written through the store always carry every field; ingested
/// claims may have gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claim {
    pub claim_id: i64,
    pub food_id: Option<i64>,
    pub receiver_id: Option<i64>,
    pub status: Option<ClaimStatus>,
    pub timestamp: Option<NaiveDateTime>,
}

impl Claim {
    /// Decode from a `claims` row in declaration order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            claim_id: row.get(0)?,
            food_id: row.get(1)?,
            receiver_id: row.get(2)?,
            status: status(row, 3)?,
            timestamp: datetime(row, 4)?,
        })
    }
}

/// A listing joined with its provider's name and contact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: FoodListing,
    pub provider_name: Option<String>,
    pub provider_contact: Option<String>,
}

/// A claim joined with the claimed food and the receiver's name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimDetail {
    pub claim_id: i64,
    pub food_name: String,
    pub quantity: Option<i64>,
    pub receiver_name: String,
    pub status: Option<ClaimStatus>,
    pub timestamp: Option<NaiveDateTime>,
}

impl ClaimDetail {
    /// Decode from `claim_id, food_name, quantity, receiver_name, status, timestamp`.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            claim_id: row.get(0)?,
            food_name: text(row, 1)?,
            quantity: row.get(2)?,
            receiver_name: text(row, 3)?,
            status: status(row, 4)?,
            timestamp: datetime(row, 5)?,
        })
    }
}

/// Nullable text column; NULL reads as an empty string.
pub(crate) fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let Some(raw) = row.get::<_, Option<String>>(idx)? else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map(Some)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let Some(raw) = row.get::<_, Option<String>>(idx)? else {
        return Ok(None);
    };
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT)
        .map(Some)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn status(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<ClaimStatus>> {
    let Some(raw) = row.get::<_, Option<String>>(idx)? else {
        return Ok(None);
    };
    raw.parse()
        .map(Some)
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in ClaimStatus::ALL {
            assert_eq!(status.as_str().parse::<ClaimStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_is_case_sensitive() {
        assert!(matches!(
            "pending".parse::<ClaimStatus>(),
            Err(Error::InvalidStatus(s)) if s == "pending"
        ));
        assert!("Done".parse::<ClaimStatus>().is_err());
        assert!("".parse::<ClaimStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_as_stored_name() {
        let json = serde_json::to_string(&ClaimStatus::Cancelled).unwrap();
        assert_eq!(json, "\"Cancelled\"");
    }
}
