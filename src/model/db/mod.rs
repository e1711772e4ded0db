//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod candidate;
pub use candidate::{Candidate, CandidateCore, CandidateId};

pub mod position;
pub use position::{PositionSetting, PositionSettingCore, DEFAULT_VOTES_ALLOWED};

pub mod vote;
pub use vote::{Vote, VoteCore};

pub mod voter;
pub use voter::{Voter, VoterCore};

pub mod voting_config;
pub use voting_config::{VotingConfig, VotingStatus};
