//! The ballot engine: the rules governing how a voter's in-progress
//! selections are recorded, limited, replaced, and finalized into immutable
//! tallies.
//!
//! Every operation here is serialised per voter via [`VoterLocks`] and
//! commits its multi-document mutations inside a session transaction, so two
//! concurrent requests for the same voter can never both observe
//! "under quota" or both finalize. Operations on different voters proceed in
//! parallel.

use std::collections::{BTreeSet, HashMap};

use mongodb::{bson::doc, Client};
use rocket::futures::TryStreamExt;

use crate::{
    error::{Error, Result},
    model::{
        api::{CastVoteResponse, ClearVoteRequest, ClearVoteResponse, SubmitBallotResponse},
        db::{
            candidate::CandidateId, voting_config::voting_is_open, Candidate, PositionSetting,
            Vote, Voter, VotingConfig,
        },
        mongodb::{u32_id_filter, Coll},
    },
};

mod locks;
pub use locks::VoterLocks;

pub mod validate;
use validate::{oldest_vote, validate_ballot};

/// What an explicit clear should remove: one candidate's vote, or every vote
/// for a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearSelector {
    Candidate(CandidateId),
    Position(String),
}

impl ClearSelector {
    /// Enforce the exactly-one-discriminator rule on the wire payload.
    pub fn from_request(request: ClearVoteRequest) -> Result<Self> {
        match (request.candidate_id, request.position) {
            (Some(candidate_id), None) => Ok(Self::Candidate(candidate_id)),
            (None, Some(position)) if !position.is_empty() => Ok(Self::Position(position)),
            _ => Err(Error::BadRequest(
                "Specify exactly one of candidateId or position".to_string(),
            )),
        }
    }
}

/// All the state a ballot operation touches.
pub struct BallotContext<'a> {
    pub db_client: &'a Client,
    pub locks: &'a VoterLocks,
    pub configs: &'a Coll<VotingConfig>,
    pub voters: &'a Coll<Voter>,
    pub candidates: &'a Coll<Candidate>,
    pub votes: &'a Coll<Vote>,
    pub settings: &'a Coll<PositionSetting>,
}

impl BallotContext<'_> {
    /// Resolve a voter by identity, or fail with `Unauthenticated`.
    async fn voter_by_username(&self, username: &str) -> Result<Voter> {
        self.voters
            .find_one(doc! {"username": username}, None)
            .await?
            .ok_or_else(|| Error::Unauthenticated(format!("Voter '{}' not found", username)))
    }

    /// Re-read a locked voter by ID for a fresh `has_voted`; the initial
    /// username lookup happens before the lock is held.
    async fn locked_voter(&self, voter: &Voter) -> Result<Voter> {
        self.voters
            .find_one(voter.id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::Unauthenticated(format!("Voter '{}' not found", voter.username)))
    }

    /// All quota rows, as a position -> votes_allowed map.
    async fn quota_map(&self) -> Result<HashMap<String, u32>> {
        let settings: Vec<PositionSetting> =
            self.settings.find(None, None).await?.try_collect().await?;
        Ok(settings
            .into_iter()
            .map(|s| (s.setting.position, s.setting.votes_allowed))
            .collect())
    }

    /// The set of positions with at least one candidate defined.
    async fn catalog_positions(&self) -> Result<BTreeSet<String>> {
        let positions = self.candidates.distinct("position", None, None).await?;
        Ok(positions
            .iter()
            .filter_map(|p| p.as_str().map(str::to_string))
            .collect())
    }

    /// A voter's current non-final votes, optionally restricted to one position.
    async fn provisional_votes(&self, voter: &Voter, position: Option<&str>) -> Result<Vec<Vote>> {
        let mut filter = doc! {
            "voter_id": voter.id,
            "is_final": false,
        };
        if let Some(position) = position {
            filter.insert("position", position);
        }
        Ok(self.votes.find(filter, None).await?.try_collect().await?)
    }
}

/// Record a provisional vote for a candidate, evicting the voter's oldest
/// vote for that position if they are already at quota. Never touches
/// candidate tallies.
pub async fn cast_vote(
    ctx: &BallotContext<'_>,
    username: &str,
    candidate_id: CandidateId,
) -> Result<CastVoteResponse> {
    if !voting_is_open(ctx.configs).await? {
        return Err(Error::VotingClosed(
            "Voting is currently closed. You cannot cast votes at this time.".to_string(),
        ));
    }

    let voter = ctx.voter_by_username(username).await?;
    let _guard = ctx.locks.acquire(voter.id).await;
    let voter = ctx.locked_voter(&voter).await?;
    if voter.has_voted {
        return Err(Error::AlreadyVoted(
            "You have already submitted your final vote.".to_string(),
        ));
    }

    let candidate = ctx
        .candidates
        .find_one(u32_id_filter(candidate_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{}'", candidate_id)))?;
    let position = candidate.position.clone();

    let quota = ctx
        .settings
        .find_one(doc! {"position": &position}, None)
        .await?
        .map(|s| s.votes_allowed)
        .unwrap_or(crate::model::db::DEFAULT_VOTES_ALLOWED);

    let existing = ctx.provisional_votes(&voter, Some(&position)).await?;
    let vote = Vote::new(voter.id, candidate_id, position.clone());

    let at_quota = existing.len() >= quota as usize;
    if let Some(evicted) = oldest_vote(&existing).filter(|_| at_quota).map(|v| v.id) {
        // At quota: replace-oldest, not reject. Evict + insert atomically.
        let mut session = ctx.db_client.start_session(None).await?;
        session.start_transaction(None).await?;
        ctx.votes
            .delete_one_with_session(evicted.as_doc(), None, &mut session)
            .await?;
        ctx.votes
            .insert_one_with_session(&vote, None, &mut session)
            .await?;
        session.commit_transaction().await?;
        debug!(
            "Voter {} replaced their oldest vote for {} (quota {})",
            voter.username, position, quota
        );
    } else {
        ctx.votes.insert_one(&vote, None).await?;
    }

    info!(
        "Voter {} holds a provisional vote for {} ({})",
        voter.username, candidate.name, position
    );
    Ok(CastVoteResponse {
        message: format!("Vote for {} ({}) recorded!", candidate.name, position),
        position,
        candidate_name: candidate.candidate.name,
    })
}

/// Finalize the voter's ballot: validate full coverage and quotas, then in
/// one transaction mark every vote final, bump each candidate's tally, and
/// set the terminal `has_voted` flag.
pub async fn submit_ballot(
    ctx: &BallotContext<'_>,
    username: &str,
) -> Result<SubmitBallotResponse> {
    if !voting_is_open(ctx.configs).await? {
        return Err(Error::VotingClosed(
            "Voting is currently closed. You cannot submit your ballot at this time.".to_string(),
        ));
    }

    let voter = ctx.voter_by_username(username).await?;
    let _guard = ctx.locks.acquire(voter.id).await;
    let voter = ctx.locked_voter(&voter).await?;
    if voter.has_voted {
        return Err(Error::AlreadyVoted(
            "You have already submitted your ballot.".to_string(),
        ));
    }

    // Validation happens wholly before any mutation.
    let votes = ctx.provisional_votes(&voter, None).await?;
    let catalog = ctx.catalog_positions().await?;
    let quotas = ctx.quota_map().await?;
    validate_ballot(&catalog, &votes, &quotas).map_err(Error::Validation)?;

    // One increment per finalized vote, grouped per candidate.
    let mut per_candidate: HashMap<CandidateId, i64> = HashMap::new();
    for vote in &votes {
        *per_candidate.entry(vote.candidate_id).or_insert(0) += 1;
    }

    let mut session = ctx.db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    ctx.votes
        .update_many_with_session(
            doc! {"voter_id": voter.id, "is_final": false},
            doc! {"$set": {"is_final": true}},
            None,
            &mut session,
        )
        .await?;

    for (candidate_id, count) in per_candidate {
        ctx.candidates
            .update_one_with_session(
                u32_id_filter(candidate_id),
                doc! {"$inc": {"vote_count": count}},
                None,
                &mut session,
            )
            .await?;
    }

    // Guarded flip: a concurrent submit that lost the race matches zero
    // documents here, and the whole transaction rolls back.
    let result = ctx
        .voters
        .update_one_with_session(
            doc! {"_id": voter.id, "has_voted": false},
            doc! {"$set": {"has_voted": true}},
            None,
            &mut session,
        )
        .await?;
    if result.modified_count != 1 {
        session.abort_transaction().await?;
        return Err(Error::AlreadyVoted(
            "You have already submitted your ballot.".to_string(),
        ));
    }

    session.commit_transaction().await?;

    info!(
        "Voter {} finalized their ballot with {} vote(s)",
        voter.username,
        votes.len()
    );
    Ok(SubmitBallotResponse {
        message: "Your ballot has been submitted successfully! Thank you for voting.".to_string(),
    })
}

/// Delete the matching non-final vote(s). Finalized ballots are immutable:
/// a clear after finalization is rejected, and final votes never match the
/// deletion filter.
pub async fn clear_votes(
    ctx: &BallotContext<'_>,
    username: &str,
    selector: ClearSelector,
) -> Result<ClearVoteResponse> {
    let voter = ctx.voter_by_username(username).await?;
    let _guard = ctx.locks.acquire(voter.id).await;
    let voter = ctx.locked_voter(&voter).await?;
    if voter.has_voted {
        return Err(Error::AlreadyVoted(
            "Your ballot is already finalized and cannot be changed.".to_string(),
        ));
    }

    let (removed, cleared_message) = match &selector {
        ClearSelector::Candidate(candidate_id) => {
            let filter = doc! {
                "voter_id": voter.id,
                "candidate_id": *candidate_id,
                "is_final": false,
            };
            let result = ctx.votes.delete_one(filter, None).await?;
            (result.deleted_count, "Vote removed successfully")
        }
        ClearSelector::Position(position) => {
            let filter = doc! {
                "voter_id": voter.id,
                "position": position,
                "is_final": false,
            };
            let result = ctx.votes.delete_many(filter, None).await?;
            (result.deleted_count, "All votes cleared for position")
        }
    };

    if removed > 0 {
        debug!(
            "Voter {} cleared {} provisional vote(s) via {:?}",
            voter.username, removed, selector
        );
        Ok(ClearVoteResponse {
            success: true,
            removed,
            message: cleared_message.to_string(),
        })
    } else {
        Ok(ClearVoteResponse {
            success: false,
            removed: 0,
            message: "No votes found to remove".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_selector_requires_exactly_one_discriminator() {
        let both = ClearVoteRequest {
            candidate_id: Some(3),
            position: Some("President".to_string()),
        };
        assert!(ClearSelector::from_request(both).is_err());

        let neither = ClearVoteRequest {
            candidate_id: None,
            position: None,
        };
        assert!(ClearSelector::from_request(neither).is_err());

        let empty_position = ClearVoteRequest {
            candidate_id: None,
            position: Some(String::new()),
        };
        assert!(ClearSelector::from_request(empty_position).is_err());
    }

    #[test]
    fn clear_selector_accepts_each_discriminator() {
        let by_candidate = ClearVoteRequest {
            candidate_id: Some(3),
            position: None,
        };
        assert_eq!(
            ClearSelector::from_request(by_candidate).unwrap(),
            ClearSelector::Candidate(3)
        );

        let by_position = ClearVoteRequest {
            candidate_id: None,
            position: Some("Senator".to_string()),
        };
        assert_eq!(
            ClearSelector::from_request(by_position).unwrap(),
            ClearSelector::Position("Senator".to_string())
        );
    }
}
