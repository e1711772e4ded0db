use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

/// Candidates are keyed by small sequential IDs allocated from a counter,
/// so dashboards can refer to them stably.
pub type CandidateId = u32;

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    /// The position this candidate is standing for.
    pub position: String,
    pub description: String,
    /// Permanent tally. Only ever incremented, and only by ballot finalization.
    pub vote_count: u64,
}

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Candidate {
        pub fn example1() -> Self {
            Self {
                id: 1,
                candidate: CandidateCore {
                    name: "Ann Chovy".to_string(),
                    position: "President".to_string(),
                    description: "Third-year, incumbent treasurer".to_string(),
                    vote_count: 0,
                },
            }
        }

        pub fn example2() -> Self {
            Self {
                id: 2,
                candidate: CandidateCore {
                    name: "Basil Rathbone".to_string(),
                    position: "Secretary".to_string(),
                    description: "Second-year".to_string(),
                    vote_count: 0,
                },
            }
        }
    }
}
