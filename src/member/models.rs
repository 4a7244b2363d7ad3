use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::rating::RatingSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub Uuid);

impl TeamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A player's participation in one team, with the stats earned there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub team_id: TeamId,
    pub username: String,
    #[serde(flatten)]
    pub stats: RatingSnapshot,
}

impl Member {
    pub fn new(team_id: TeamId, username: impl Into<String>, starting_exp: i32) -> Self {
        Self {
            id: MemberId::new(),
            team_id,
            username: username.into(),
            stats: RatingSnapshot::baseline(starting_exp),
        }
    }

    pub fn exp(&self) -> i32 {
        self.stats.exp
    }

    pub fn with_stats(mut self, stats: RatingSnapshot) -> Self {
        self.stats = stats;
        self
    }

    /// The same member with every counter cleared and the rating set to `starting_exp`.
    pub fn reset(&self, starting_exp: i32) -> Self {
        self.clone().with_stats(RatingSnapshot::baseline(starting_exp))
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.stats.exp)
    }
}
