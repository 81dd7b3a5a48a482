//! Mutation executor for the two claim write operations.

use chrono::{Local, NaiveDateTime, Timelike};
use rusqlite::params;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{Claim, ClaimStatus, DATETIME_FORMAT};
use crate::schema::TableKind;
use crate::store::{exists_in, Store};

/// Executes claim writes against the store.
///
/// Callers holding a query cache must invalidate it after every successful
/// call; [`crate::Database`] does this automatically.
pub struct MutationExecutor<'a> {
    store: &'a mut Store,
}

impl<'a> MutationExecutor<'a> {
    /// Create a new mutation executor.
    pub fn new(store: &'a mut Store) -> Self {
        Self { store }
    }

    /// Submit a new `Pending` claim stamped with the local current time.
    pub fn submit_claim(&mut self, food_id: i64, receiver_id: i64) -> Result<Claim> {
        self.submit_claim_at(food_id, receiver_id, Local::now().naive_local())
    }

    /// Submit a new `Pending` claim with an explicit timestamp.
    ///
    /// Both referenced rows must exist. The new id is one more than the current
    /// maximum, or 1 when there are no claims.
    pub fn submit_claim_at(
        &mut self,
        food_id: i64,
        receiver_id: i64,
        timestamp: NaiveDateTime,
    ) -> Result<Claim> {
        let timestamp = timestamp.with_nanosecond(0).unwrap_or(timestamp);
        let tx = self.store.connection_mut().transaction()?;

        if !exists_in(&tx, TableKind::FoodListings, food_id)? {
            return Err(Error::NotFound {
                entity: "food listing",
                id: food_id,
            });
        }
        if !exists_in(&tx, TableKind::Receivers, receiver_id)? {
            return Err(Error::NotFound {
                entity: "receiver",
                id: receiver_id,
            });
        }

        let claim_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(Claim_ID), 0) + 1 FROM claims",
            [],
            |row| row.get(0),
        )?;

        let status = ClaimStatus::Pending;
        tx.execute(
            "INSERT INTO claims (Claim_ID, Food_ID, Receiver_ID, Status, Timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                claim_id,
                food_id,
                receiver_id,
                status.as_str(),
                timestamp.format(DATETIME_FORMAT).to_string(),
            ],
        )?;
        tx.commit()?;

        let claim = Claim {
            claim_id,
            food_id: Some(food_id),
            receiver_id: Some(receiver_id),
            status: Some(status),
            timestamp: Some(timestamp),
        };

        info!(
            claim_id = claim.claim_id,
            food_id,
            receiver_id,
            "claim submitted"
        );
        Ok(claim)
    }

    /// Set a claim's status from its textual form.
    ///
    /// The status is validated before the store is touched.
    pub fn update_claim_status(&mut self, claim_id: i64, new_status: &str) -> Result<Claim> {
        let status: ClaimStatus = new_status.parse()?;
        self.set_claim_status(claim_id, status)
    }

    /// Set a claim's status.
    pub fn set_claim_status(&mut self, claim_id: i64, status: ClaimStatus) -> Result<Claim> {
        let updated = self.store.connection().execute(
            "UPDATE claims SET Status = ?1 WHERE Claim_ID = ?2",
            params![status.as_str(), claim_id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound {
                entity: "claim",
                id: claim_id,
            });
        }

        info!(claim_id, status = %status, "claim status updated");

        self.store.claim(claim_id)?.ok_or(Error::NotFound {
            entity: "claim",
            id: claim_id,
        })
    }
}
