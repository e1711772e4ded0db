use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core voter data, as stored in the database.
///
/// Voters are created by the registration/approval flow, which is outside the
/// scope of this crate; the voting core only ever reads them and flips
/// `has_voted`. Once true, `has_voted` never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// The identity a vote request resolves against.
    pub username: String,
    /// Set exactly once, when the voter's ballot is finalized.
    pub has_voted: bool,
    /// Owned by the directory, not the voting core.
    pub requested_role: String,
    /// Owned by the directory, not the voting core.
    pub approved: bool,
}

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}
