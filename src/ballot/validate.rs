//! Pure ballot validation: all checks happen on already-fetched data, before
//! any mutation is attempted.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::BallotErrors;
use crate::model::db::{position::DEFAULT_VOTES_ALLOWED, Vote};

/// Look up a position's quota, defaulting to 1 where no row is configured.
/// Quota lookup never fails the caller; absence is a valid default.
pub fn quota_for(quotas: &HashMap<String, u32>, position: &str) -> u32 {
    quotas
        .get(position)
        .copied()
        .unwrap_or(DEFAULT_VOTES_ALLOWED)
}

/// The vote the replacement policy evicts: the oldest non-final vote.
/// Ties on timestamp break by ID so the choice is deterministic.
pub fn oldest_vote(votes: &[Vote]) -> Option<&Vote> {
    votes
        .iter()
        .filter(|v| !v.is_final)
        .min_by_key(|v| (v.timestamp, v.id))
}

/// Count a voter's non-final votes per position.
pub fn position_counts(votes: &[Vote]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for vote in votes.iter().filter(|v| !v.is_final) {
        *counts.entry(vote.position.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Validate a ballot for finalization: every catalog position covered, no
/// position over quota. Performed wholly before any mutation; the error
/// carries the full machine-readable lists.
pub fn validate_ballot(
    catalog_positions: &BTreeSet<String>,
    votes: &[Vote],
    quotas: &HashMap<String, u32>,
) -> Result<(), BallotErrors> {
    let counts = position_counts(votes);

    let missing_positions: Vec<String> = catalog_positions
        .iter()
        .filter(|position| !counts.contains_key(position.as_str()))
        .cloned()
        .collect();
    if !missing_positions.is_empty() {
        return Err(BallotErrors {
            missing_positions,
            violations: vec![],
        });
    }

    // Quota changes can race earlier casts; re-checked here at finalize time.
    let violations: Vec<String> = counts
        .iter()
        .filter_map(|(position, &count)| {
            let quota = quota_for(quotas, position);
            (count > quota as usize)
                .then(|| format!("{} (max {} vote(s))", position, quota))
        })
        .collect();
    if !violations.is_empty() {
        return Err(BallotErrors {
            missing_positions: vec![],
            violations,
        });
    }

    Ok(())
}
