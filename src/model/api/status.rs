use serde::{Deserialize, Serialize};

/// The voting status read, shaped for dashboard polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingStatusResponse {
    pub is_voting_open: bool,
}

/// Generic confirmation for admin actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminActionResponse {
    pub success: bool,
    pub message: String,
}

impl AdminActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Turnout overview for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingStatistics {
    pub total_candidates: u64,
    pub total_votes: u64,
    pub total_voters: u64,
    pub voted_voters: u64,
    pub vote_percentage: f64,
}

impl VotingStatistics {
    /// Turnout as a percentage of approved voters, 0 when there are none.
    pub fn percentage(voted: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (voted as f64 / total as f64) * 100.0
        }
    }
}
