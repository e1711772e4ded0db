use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{db::candidate::CandidateId, mongodb::Id};

/// Core provisional vote data, as stored in the database.
///
/// A vote is created non-final by a cast, may be evicted by the quota
/// replacement policy or removed by an explicit clear while non-final, and is
/// never mutated again once `is_final` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter_id: Id,
    pub candidate_id: CandidateId,
    /// Denormalised from the candidate so quota checks need no join.
    pub position: String,
    /// Creation time; the quota replacement policy evicts the oldest.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    pub is_final: bool,
}

/// A provisional vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Vote {
    /// Create a fresh, non-final vote timestamped now.
    pub fn new(voter_id: Id, candidate_id: CandidateId, position: String) -> Self {
        Self {
            id: Id::new(),
            vote: VoteCore {
                voter_id,
                candidate_id,
                position,
                timestamp: Utc::now(),
                is_final: false,
            },
        }
    }
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}
