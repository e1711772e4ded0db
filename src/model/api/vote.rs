use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::{candidate::CandidateId, Vote};

/// Payload for casting a provisional vote.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub candidate_id: CandidateId,
}

/// Payload for clearing provisional votes.
/// Exactly one of the two discriminators must be populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearVoteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<CandidateId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Successful cast confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteResponse {
    pub message: String,
    pub position: String,
    pub candidate_name: String,
}

/// Successful ballot submission confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBallotResponse {
    pub message: String,
}

/// Outcome of a clear request. Clearing nothing is not an error, just
/// `success: false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearVoteResponse {
    pub success: bool,
    pub removed: u64,
    pub message: String,
}

/// A voter's in-progress selection, for the ballot preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDesc {
    pub candidate_id: CandidateId,
    pub position: String,
    pub timestamp: DateTime<Utc>,
    pub is_final: bool,
}

impl From<Vote> for VoteDesc {
    fn from(vote: Vote) -> Self {
        Self {
            candidate_id: vote.candidate_id,
            position: vote.vote.position,
            timestamp: vote.vote.timestamp,
            is_final: vote.vote.is_final,
        }
    }
}
