use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, DateTime as BsonDateTime},
    error::Error as DbError,
    options::UpdateOptions,
};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Coll;

/// The well-known ID of the single voting status record.
pub const VOTING_CONFIG_ID: &str = "global";

/// The global voting status singleton.
///
/// There is exactly one of these per database, created idempotently at
/// startup. Readers treat an absent record as closed, so a read never fails
/// and never needs to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingConfig {
    #[serde(rename = "_id")]
    pub id: String,
    pub is_open: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub last_modified: DateTime<Utc>,
}

impl VotingConfig {
    /// The implicit state before any record exists: closed.
    pub fn closed() -> Self {
        Self {
            id: VOTING_CONFIG_ID.to_string(),
            is_open: false,
            last_modified: Utc::now(),
        }
    }
}

/// The open/closed state as broadcast to dashboards. The `Display` strings
/// are the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotingStatus {
    Open,
    Closed,
}

impl VotingStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl From<bool> for VotingStatus {
    fn from(is_open: bool) -> Self {
        if is_open {
            Self::Open
        } else {
            Self::Closed
        }
    }
}

impl Display for VotingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Pure read of the global flag; an absent record reads as closed.
pub async fn voting_is_open(configs: &Coll<VotingConfig>) -> Result<bool, DbError> {
    let config = configs
        .find_one(doc! {"_id": VOTING_CONFIG_ID}, None)
        .await?;
    Ok(config.map(|c| c.is_open).unwrap_or(false))
}

/// Upsert the global flag, stamping `last_modified`.
pub async fn set_voting_open(
    configs: &Coll<VotingConfig>,
    open: bool,
) -> Result<VotingStatus, DbError> {
    let update = doc! {
        "$set": {
            "is_open": open,
            "last_modified": BsonDateTime::from_chrono(Utc::now()),
        }
    };
    let options = UpdateOptions::builder().upsert(true).build();
    configs
        .update_one(doc! {"_id": VOTING_CONFIG_ID}, update, options)
        .await?;
    Ok(VotingStatus::from(open))
}

/// Create the voting status record (closed) if it does not already exist.
/// Idempotent; the unique `_id` makes this safe under concurrent first access.
pub async fn ensure_voting_config_exists(configs: &Coll<VotingConfig>) -> Result<(), DbError> {
    let update = doc! {
        "$setOnInsert": {
            "is_open": false,
            "last_modified": BsonDateTime::from_chrono(Utc::now()),
        }
    };
    let options = UpdateOptions::builder().upsert(true).build();
    configs
        .update_one(doc! {"_id": VOTING_CONFIG_ID}, update, options)
        .await?;
    Ok(())
}
