use std::collections::BTreeMap;

use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{CandidateDesc, VotingStatusResponse},
    db::{
        voting_config::voting_is_open, Candidate, PositionSetting, VotingConfig,
        DEFAULT_VOTES_ALLOWED,
    },
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![status, results, quotas]
}

/// The global voting flag. An absent record reads as closed, so this never
/// fails on a fresh database.
#[get("/status")]
async fn status(configs: Coll<VotingConfig>) -> Result<Json<VotingStatusResponse>> {
    Ok(Json(VotingStatusResponse {
        is_voting_open: voting_is_open(&configs).await?,
    }))
}

/// The live results view: candidates grouped by position, highest tally
/// first. Only finalized ballots contribute to `vote_count`.
#[get("/results")]
async fn results(
    candidates: Coll<Candidate>,
) -> Result<Json<BTreeMap<String, Vec<CandidateDesc>>>> {
    let all: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;

    let mut grouped: BTreeMap<String, Vec<CandidateDesc>> = BTreeMap::new();
    for candidate in all {
        grouped
            .entry(candidate.position.clone())
            .or_default()
            .push(candidate.into());
    }
    for group in grouped.values_mut() {
        group.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    Ok(Json(grouped))
}

/// The effective quota for every position in the catalog: configured rows
/// merged over the default of 1.
#[get("/quotas")]
async fn quotas(
    candidates: Coll<Candidate>,
    settings: Coll<PositionSetting>,
) -> Result<Json<BTreeMap<String, u32>>> {
    let positions = candidates.distinct("position", None, None).await?;
    let mut quotas: BTreeMap<String, u32> = positions
        .iter()
        .filter_map(|p| p.as_str())
        .map(|p| (p.to_string(), DEFAULT_VOTES_ALLOWED))
        .collect();

    let configured: Vec<PositionSetting> = settings.find(None, None).await?.try_collect().await?;
    for setting in configured {
        quotas.insert(setting.setting.position, setting.setting.votes_allowed);
    }

    Ok(Json(quotas))
}
