use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Coll;

/// The well-known ID of the candidate ID counter.
pub const CANDIDATE_ID_COUNTER_ID: &str = "candidate_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u64,
}

impl Counter {
    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u64> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! {"_id": id}, update, options)
            .await?
            .ok_or_else(|| Error::not_found(format!("Counter '{}'", id)))?;
        Ok(counter.next)
    }
}

/// Ensure the global candidate ID counter exists, without resetting it if it
/// already does. Idempotent and safe under concurrent first access.
pub async fn ensure_candidate_id_counter_exists(
    counters: &Coll<Counter>,
) -> std::result::Result<(), DbError> {
    let update = doc! {
        "$setOnInsert": {
            "next": 1_i64,
        }
    };
    let options = UpdateOptions::builder().upsert(true).build();
    counters
        .update_one(doc! {"_id": CANDIDATE_ID_COUNTER_ID}, update, options)
        .await?;
    Ok(())
}
