use std::collections::HashMap;

use mongodb::{bson::doc, options::UpdateOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::broadcast::DashboardBroadcaster;
use crate::error::{Error, Result};
use crate::model::{
    api::{AdminActionResponse, CandidateDesc, CandidateSpec, VotingStatistics},
    db::{
        position::{quota_in_bounds, MAX_VOTES_ALLOWED, MIN_VOTES_ALLOWED},
        voting_config::set_voting_open,
        Candidate, CandidateCore, CandidateId, PositionSetting, Vote, Voter, VotingConfig,
    },
    mongodb::{u32_id_filter, Coll, Counter, CANDIDATE_ID_COUNTER_ID},
};

pub fn routes() -> Vec<Route> {
    routes![
        open_voting,
        close_voting,
        set_quotas,
        get_candidates,
        create_candidate,
        update_candidate,
        delete_candidate,
        statistics,
    ]
}

#[post("/admin/voting/open")]
async fn open_voting(
    broadcaster: &State<DashboardBroadcaster>,
    configs: Coll<VotingConfig>,
) -> Result<Json<AdminActionResponse>> {
    let status = set_voting_open(&configs, true).await?;
    info!("Voting opened");
    broadcaster.notify_status_change(status);
    Ok(Json(AdminActionResponse::ok("Voting is now open")))
}

#[post("/admin/voting/close")]
async fn close_voting(
    broadcaster: &State<DashboardBroadcaster>,
    configs: Coll<VotingConfig>,
) -> Result<Json<AdminActionResponse>> {
    let status = set_voting_open(&configs, false).await?;
    info!("Voting closed");
    broadcaster.notify_status_change(status);
    Ok(Json(AdminActionResponse::ok("Voting is now closed")))
}

/// Upsert position quotas. The whole request is validated before any row is
/// written, so a bad entry rejects the lot.
#[put("/admin/quotas", data = "<quotas>", format = "json")]
async fn set_quotas(
    quotas: Json<HashMap<String, u32>>,
    broadcaster: &State<DashboardBroadcaster>,
    settings: Coll<PositionSetting>,
) -> Result<Json<AdminActionResponse>> {
    for (position, &votes_allowed) in quotas.0.iter() {
        if !quota_in_bounds(votes_allowed) {
            return Err(Error::BadRequest(format!(
                "votesAllowed for '{}' must be between {} and {}",
                position, MIN_VOTES_ALLOWED, MAX_VOTES_ALLOWED
            )));
        }
    }

    let upsert = UpdateOptions::builder().upsert(true).build();
    for (position, votes_allowed) in quotas.0 {
        settings
            .update_one(
                doc! {"position": &position},
                doc! {"$set": {"votes_allowed": votes_allowed}},
                upsert.clone(),
            )
            .await?;
        debug!("Quota for {position} set to {votes_allowed}");
    }

    broadcaster.notify_config_update();
    Ok(Json(AdminActionResponse::ok("Position settings updated")))
}

#[get("/admin/candidates")]
async fn get_candidates(candidates: Coll<Candidate>) -> Result<Json<Vec<CandidateDesc>>> {
    let mut all: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
    all.sort_by_key(|c| c.id);
    Ok(Json(all.into_iter().map(CandidateDesc::from).collect()))
}

/// Create a candidate. The ID comes from the global counter and the tally
/// always starts at zero, whatever the request says.
#[post("/admin/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    spec: Json<CandidateSpec>,
    broadcaster: &State<DashboardBroadcaster>,
    candidates: Coll<Candidate>,
    counters: Coll<Counter>,
) -> Result<Json<CandidateDesc>> {
    let spec = spec.0;
    if spec.name.is_empty() || spec.position.is_empty() {
        return Err(Error::BadRequest(
            "Candidate name and position must not be empty".to_string(),
        ));
    }

    let id = Counter::next(&counters, CANDIDATE_ID_COUNTER_ID).await? as CandidateId;
    let candidate = Candidate {
        id,
        candidate: CandidateCore {
            name: spec.name,
            position: spec.position,
            description: spec.description,
            vote_count: 0,
        },
    };
    candidates.insert_one(&candidate, None).await?;
    info!("Created candidate {} ({})", candidate.name, candidate.id);

    broadcaster.notify_update();
    Ok(Json(candidate.into()))
}

/// Update a candidate's details. The tally is owned by ballot finalization
/// and cannot be edited here; provisional votes follow a position change.
#[put("/admin/candidates/<candidate_id>", data = "<spec>", format = "json")]
async fn update_candidate(
    candidate_id: CandidateId,
    spec: Json<CandidateSpec>,
    broadcaster: &State<DashboardBroadcaster>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<CandidateDesc>> {
    let spec = spec.0;
    let update = doc! {
        "$set": {
            "name": &spec.name,
            "position": &spec.position,
            "description": &spec.description,
        }
    };
    let result = candidates
        .update_one(u32_id_filter(candidate_id), update, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!(
            "Candidate with ID '{}'",
            candidate_id
        )));
    }

    // Keep the denormalised position on provisional votes consistent.
    votes
        .update_many(
            doc! {"candidate_id": candidate_id, "is_final": false},
            doc! {"$set": {"position": &spec.position}},
            None,
        )
        .await?;

    let candidate = candidates
        .find_one(u32_id_filter(candidate_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{}'", candidate_id)))?;

    broadcaster.notify_update();
    Ok(Json(candidate.into()))
}

/// Delete a candidate along with any provisional votes for them. Finalized
/// votes are immutable history and stay put.
#[delete("/admin/candidates/<candidate_id>")]
async fn delete_candidate(
    candidate_id: CandidateId,
    broadcaster: &State<DashboardBroadcaster>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<AdminActionResponse>> {
    let result = candidates
        .delete_one(u32_id_filter(candidate_id), None)
        .await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!(
            "Candidate with ID '{}'",
            candidate_id
        )));
    }

    let removed = votes
        .delete_many(
            doc! {"candidate_id": candidate_id, "is_final": false},
            None,
        )
        .await?;
    info!(
        "Deleted candidate {} and {} provisional vote(s)",
        candidate_id, removed.deleted_count
    );

    broadcaster.notify_update();
    Ok(Json(AdminActionResponse::ok("Candidate deleted")))
}

#[get("/admin/statistics")]
async fn statistics(
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    voters: Coll<Voter>,
) -> Result<Json<VotingStatistics>> {
    let total_candidates = candidates.count_documents(None, None).await?;
    let total_votes = votes
        .count_documents(doc! {"is_final": true}, None)
        .await?;
    let total_voters = voters
        .count_documents(doc! {"approved": true}, None)
        .await?;
    let voted_voters = voters
        .count_documents(doc! {"has_voted": true}, None)
        .await?;

    Ok(Json(VotingStatistics {
        total_candidates,
        total_votes,
        total_voters,
        voted_voters,
        vote_percentage: VotingStatistics::percentage(voted_voters, total_voters),
    }))
}
