use serde::{Deserialize, Serialize};

use crate::model::db::{Candidate, CandidateId};

/// Admin-supplied candidate details. The vote count is never accepted from
/// the wire; it starts at zero and is owned by ballot finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub description: String,
}

/// A candidate as exposed to dashboards, tally included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDesc {
    pub id: CandidateId,
    pub name: String,
    pub position: String,
    pub description: String,
    pub vote_count: u64,
}

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.candidate.name,
            position: candidate.candidate.position,
            description: candidate.candidate.description,
            vote_count: candidate.candidate.vote_count,
        }
    }
}
