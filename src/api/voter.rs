use mongodb::{bson::doc, Client};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::ballot::{self, BallotContext, ClearSelector, VoterLocks};
use crate::broadcast::DashboardBroadcaster;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        CastVoteResponse, ClearVoteRequest, ClearVoteResponse, SubmitBallotResponse, VoteDesc,
        VoteRequest,
    },
    db::{Candidate, PositionSetting, Vote, Voter, VotingConfig},
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, submit_ballot, clear_votes, current_votes]
}

#[post("/voter/<username>/votes", data = "<request>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn cast_vote(
    username: &str,
    request: Json<VoteRequest>,
    db_client: &State<Client>,
    locks: &State<VoterLocks>,
    broadcaster: &State<DashboardBroadcaster>,
    configs: Coll<VotingConfig>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    settings: Coll<PositionSetting>,
) -> Result<Json<CastVoteResponse>> {
    let ctx = BallotContext {
        db_client: db_client.inner(),
        locks: locks.inner(),
        configs: &configs,
        voters: &voters,
        candidates: &candidates,
        votes: &votes,
        settings: &settings,
    };
    let response = ballot::cast_vote(&ctx, username, request.0.candidate_id).await?;

    // The mutation is committed; dashboards can re-fetch.
    broadcaster.notify_update();
    Ok(Json(response))
}

#[post("/voter/<username>/ballot")]
#[allow(clippy::too_many_arguments)]
async fn submit_ballot(
    username: &str,
    db_client: &State<Client>,
    locks: &State<VoterLocks>,
    broadcaster: &State<DashboardBroadcaster>,
    configs: Coll<VotingConfig>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    settings: Coll<PositionSetting>,
) -> Result<Json<SubmitBallotResponse>> {
    let ctx = BallotContext {
        db_client: db_client.inner(),
        locks: locks.inner(),
        configs: &configs,
        voters: &voters,
        candidates: &candidates,
        votes: &votes,
        settings: &settings,
    };
    let response = ballot::submit_ballot(&ctx, username).await?;

    broadcaster.notify_update();
    Ok(Json(response))
}

#[post("/voter/<username>/votes/clear", data = "<request>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn clear_votes(
    username: &str,
    request: Json<ClearVoteRequest>,
    db_client: &State<Client>,
    locks: &State<VoterLocks>,
    broadcaster: &State<DashboardBroadcaster>,
    configs: Coll<VotingConfig>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    settings: Coll<PositionSetting>,
) -> Result<Json<ClearVoteResponse>> {
    let selector = ClearSelector::from_request(request.0)?;
    let ctx = BallotContext {
        db_client: db_client.inner(),
        locks: locks.inner(),
        configs: &configs,
        voters: &voters,
        candidates: &candidates,
        votes: &votes,
        settings: &settings,
    };
    let response = ballot::clear_votes(&ctx, username, selector).await?;

    // Nothing changed if nothing was removed; don't wake the dashboards.
    if response.removed > 0 {
        broadcaster.notify_update();
    }
    Ok(Json(response))
}

/// A voter's ballot preview: every vote they currently hold, final or not.
#[get("/voter/<username>/votes")]
async fn current_votes(
    username: &str,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
) -> Result<Json<Vec<VoteDesc>>> {
    let voter = voters
        .find_one(doc! {"username": username}, None)
        .await?
        .ok_or_else(|| Error::Unauthenticated(format!("Voter '{}' not found", username)))?;

    let votes: Vec<Vote> = votes
        .find(doc! {"voter_id": voter.id}, None)
        .await?
        .try_collect()
        .await?;

    Ok(Json(votes.into_iter().map(VoteDesc::from).collect()))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use rocket::{
        futures::TryStreamExt,
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::error::ErrorResponse;
    use crate::model::db::voting_config::set_voting_open;

    use super::*;

    async fn seed(
        voters: &Coll<Voter>,
        candidates: &Coll<Candidate>,
        configs: &Coll<VotingConfig>,
        open: bool,
    ) {
        voters.insert_one(Voter::example(), None).await.unwrap();
        candidates
            .insert_many([Candidate::example1(), Candidate::example2()], None)
            .await
            .unwrap();
        if open {
            set_voting_open(configs, true).await.unwrap();
        }
    }

    async fn cast(client: &Client, username: &str, candidate_id: u32) -> Status {
        client
            .post(format!("/voter/{username}/votes"))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "candidateId": candidate_id }).to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test]
    async fn cast_submit_happy_path(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        votes: Coll<Vote>,
        configs: Coll<VotingConfig>,
    ) {
        seed(&voters, &candidates, &configs, true).await;

        // Cast one vote per position.
        let response = client
            .post(uri!(cast_vote("alice")))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "candidateId": 1 }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: CastVoteResponse = response.into_json().await.unwrap();
        assert_eq!(body.message, "Vote for Ann Chovy (President) recorded!");
        assert_eq!(body.position, "President");

        assert_eq!(cast(&client, "alice", 2).await, Status::Ok);

        // Provisional votes never touch the permanent tallies.
        let tallied: Vec<Candidate> =
            candidates.find(None, None).await.unwrap().try_collect().await.unwrap();
        assert!(tallied.iter().all(|c| c.vote_count == 0));

        // Submit the ballot.
        let response = client.post(uri!(submit_ballot("alice"))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: SubmitBallotResponse = response.into_json().await.unwrap();
        assert_eq!(
            body.message,
            "Your ballot has been submitted successfully! Thank you for voting."
        );

        // Everything finalized exactly once.
        let voter = voters
            .find_one(doc! {"username": "alice"}, None)
            .await
            .unwrap()
            .unwrap();
        assert!(voter.has_voted);
        let final_votes = votes
            .count_documents(doc! {"is_final": true}, None)
            .await
            .unwrap();
        assert_eq!(final_votes, 2);
        let tallied: Vec<Candidate> =
            candidates.find(None, None).await.unwrap().try_collect().await.unwrap();
        assert!(tallied.iter().all(|c| c.vote_count == 1));
    }

    #[backend_test]
    async fn closed_voting_rejects_casts(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        votes: Coll<Vote>,
        configs: Coll<VotingConfig>,
    ) {
        seed(&voters, &candidates, &configs, false).await;

        let response = client
            .post(uri!(cast_vote("alice")))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "candidateId": 1 }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(
            body.message,
            "Voting is currently closed. You cannot cast votes at this time."
        );
        assert_eq!(votes.count_documents(None, None).await.unwrap(), 0);

        let response = client.post(uri!(submit_ballot("alice"))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn incomplete_ballot_is_rejected(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        configs: Coll<VotingConfig>,
    ) {
        seed(&voters, &candidates, &configs, true).await;

        // Vote for President only; Secretary is missing.
        assert_eq!(cast(&client, "alice", 1).await, Status::Ok);

        let response = client.post(uri!(submit_ballot("alice"))).dispatch().await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(
            body.message,
            "Please vote for all positions. Missing: Secretary"
        );
        assert_eq!(body.missing_positions.unwrap(), vec!["Secretary"]);

        // The voter can still fix their ballot.
        let voter = voters
            .find_one(doc! {"username": "alice"}, None)
            .await
            .unwrap()
            .unwrap();
        assert!(!voter.has_voted);
    }

    #[backend_test]
    async fn at_quota_cast_replaces_oldest(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        votes: Coll<Vote>,
        configs: Coll<VotingConfig>,
    ) {
        seed(&voters, &candidates, &configs, true).await;
        // A second candidate for President.
        candidates
            .insert_one(
                Candidate {
                    id: 3,
                    candidate: crate::model::db::CandidateCore {
                        name: "Carla Ramirez".to_string(),
                        position: "President".to_string(),
                        description: String::new(),
                        vote_count: 0,
                    },
                },
                None,
            )
            .await
            .unwrap();

        // Default quota is 1: the second cast replaces the first.
        assert_eq!(cast(&client, "alice", 1).await, Status::Ok);
        assert_eq!(cast(&client, "alice", 3).await, Status::Ok);

        let remaining: Vec<Vote> =
            votes.find(None, None).await.unwrap().try_collect().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].candidate_id, 3);
    }

    #[backend_test]
    async fn quota_of_two_evicts_only_the_oldest(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        votes: Coll<Vote>,
        configs: Coll<VotingConfig>,
        settings: Coll<PositionSetting>,
    ) {
        seed(&voters, &candidates, &configs, true).await;

        let senator = |id, name: &str| Candidate {
            id,
            candidate: crate::model::db::CandidateCore {
                name: name.to_string(),
                position: "Senator".to_string(),
                description: String::new(),
                vote_count: 0,
            },
        };
        candidates
            .insert_many(
                [
                    senator(10, "Dan Delion"),
                    senator(11, "Eve Ning"),
                    senator(12, "Flo Rence"),
                ],
                None,
            )
            .await
            .unwrap();
        settings
            .insert_one(
                PositionSetting {
                    id: crate::model::mongodb::Id::new(),
                    setting: crate::model::db::PositionSettingCore {
                        position: "Senator".to_string(),
                        votes_allowed: 2,
                    },
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(cast(&client, "alice", 10).await, Status::Ok);
        assert_eq!(cast(&client, "alice", 11).await, Status::Ok);
        assert_eq!(cast(&client, "alice", 12).await, Status::Ok);

        // The third cast evicted the first; the two newest survive.
        let remaining: Vec<Vote> = votes
            .find(doc! {"position": "Senator"}, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let mut remaining: Vec<u32> = remaining.iter().map(|v| v.candidate_id).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![11, 12]);
    }

    #[backend_test]
    async fn finalized_ballot_is_immutable(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        configs: Coll<VotingConfig>,
    ) {
        seed(&voters, &candidates, &configs, true).await;
        assert_eq!(cast(&client, "alice", 1).await, Status::Ok);
        assert_eq!(cast(&client, "alice", 2).await, Status::Ok);
        assert_eq!(
            client.post(uri!(submit_ballot("alice"))).dispatch().await.status(),
            Status::Ok
        );

        // No further casts, submissions, or clears.
        assert_eq!(cast(&client, "alice", 1).await, Status::BadRequest);

        let response = client.post(uri!(submit_ballot("alice"))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.message, "You have already submitted your ballot.");

        let response = client
            .post(uri!(clear_votes("alice")))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "candidateId": 1 }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Exactly-once finalization: tallies are still 1 each.
        let candidate = candidates
            .find_one(doc! {"_id": 1}, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(candidate.vote_count, 1);
    }

    #[backend_test]
    async fn clear_by_candidate_and_position(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        votes: Coll<Vote>,
        configs: Coll<VotingConfig>,
    ) {
        seed(&voters, &candidates, &configs, true).await;
        assert_eq!(cast(&client, "alice", 1).await, Status::Ok);
        assert_eq!(cast(&client, "alice", 2).await, Status::Ok);

        // Clear the President vote by candidate.
        let response = client
            .post(uri!(clear_votes("alice")))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "candidateId": 1 }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: ClearVoteResponse = response.into_json().await.unwrap();
        assert!(body.success);
        assert_eq!(body.removed, 1);
        assert_eq!(body.message, "Vote removed successfully");

        // Clear the Secretary vote by position.
        let response = client
            .post(uri!(clear_votes("alice")))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "position": "Secretary" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: ClearVoteResponse = response.into_json().await.unwrap();
        assert!(body.success);
        assert_eq!(body.message, "All votes cleared for position");
        assert_eq!(votes.count_documents(None, None).await.unwrap(), 0);

        // Clearing again finds nothing.
        let response = client
            .post(uri!(clear_votes("alice")))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "position": "Secretary" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: ClearVoteResponse = response.into_json().await.unwrap();
        assert!(!body.success);
        assert_eq!(body.message, "No votes found to remove");

        // Both discriminators at once is malformed.
        let response = client
            .post(uri!(clear_votes("alice")))
            .header(ContentType::JSON)
            .body(
                serde_json::json!({ "candidateId": 1, "position": "Secretary" }).to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn unknown_identities_are_rejected(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        configs: Coll<VotingConfig>,
    ) {
        seed(&voters, &candidates, &configs, true).await;

        // Unknown voter.
        assert_eq!(cast(&client, "mallory", 1).await, Status::Unauthorized);

        // Unknown candidate.
        assert_eq!(cast(&client, "alice", 99).await, Status::NotFound);
    }

    #[backend_test]
    async fn ballot_preview_lists_current_votes(
        client: Client,
        voters: Coll<Voter>,
        candidates: Coll<Candidate>,
        configs: Coll<VotingConfig>,
    ) {
        seed(&voters, &candidates, &configs, true).await;
        assert_eq!(cast(&client, "alice", 1).await, Status::Ok);

        let response = client.get(uri!(current_votes("alice"))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let preview: Vec<VoteDesc> = response.into_json().await.unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].candidate_id, 1);
        assert_eq!(preview[0].position, "President");
        assert!(!preview[0].is_final);
    }
}
