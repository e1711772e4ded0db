//! Wire-format (camelCase JSON) types, kept separate from the DB types.

pub mod candidate;
pub use candidate::{CandidateDesc, CandidateSpec};

pub mod status;
pub use status::{AdminActionResponse, VotingStatistics, VotingStatusResponse};

pub mod vote;
pub use vote::{
    CastVoteResponse, ClearVoteRequest, ClearVoteResponse, SubmitBallotResponse, VoteDesc,
    VoteRequest,
};
