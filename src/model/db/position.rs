use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A position with no settings row gets this quota.
pub const DEFAULT_VOTES_ALLOWED: u32 = 1;

/// Configurable quota bounds.
pub const MIN_VOTES_ALLOWED: u32 = 1;
pub const MAX_VOTES_ALLOWED: u32 = 10;

/// Core per-position configuration, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSettingCore {
    /// Unique per position.
    pub position: String,
    /// How many simultaneous selections a voter may hold for this position.
    pub votes_allowed: u32,
}

/// A position setting from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSetting {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub setting: PositionSettingCore,
}

impl Deref for PositionSetting {
    type Target = PositionSettingCore;

    fn deref(&self) -> &Self::Target {
        &self.setting
    }
}

impl DerefMut for PositionSetting {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.setting
    }
}

/// Is the given quota value acceptable for configuration?
pub fn quota_in_bounds(votes_allowed: u32) -> bool {
    (MIN_VOTES_ALLOWED..=MAX_VOTES_ALLOWED).contains(&votes_allowed)
}
