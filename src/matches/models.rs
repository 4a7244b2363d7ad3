use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::member::{Member, MemberId, TeamId};
use crate::rating::{Lineup, Outcome, Score, Side, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub Uuid);

impl MatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A match as submitted, before any points are known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInput {
    pub lineup: Lineup<MemberId>,
    pub score: Score,
    /// Rating volatility; the configured default applies when absent
    #[serde(default)]
    pub k_factor: Option<i32>,
    #[serde(default)]
    pub played_at: Option<DateTime<Utc>>,
}

impl MatchInput {
    pub fn new(lineup: Lineup<MemberId>, red_score: i32, blue_score: i32) -> Self {
        Self {
            lineup,
            score: Score::new(red_score, blue_score),
            k_factor: None,
            played_at: None,
        }
    }

    pub fn with_k_factor(mut self, k_factor: i32) -> Self {
        self.k_factor = Some(k_factor);
        self
    }

    pub fn played_at(mut self, played_at: DateTime<Utc>) -> Self {
        self.played_at = Some(played_at);
        self
    }
}

impl From<&MatchRecord> for MatchInput {
    fn from(record: &MatchRecord) -> Self {
        Self {
            lineup: record.lineup,
            score: record.score,
            k_factor: Some(record.k_factor),
            played_at: Some(record.played_at),
        }
    }
}

/// A settled match. Immutable once stored; removal goes through reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub lineup: Lineup<MemberId>,
    pub score: Score,
    pub k_factor: i32,
    /// Positive points favour red
    pub points: i32,
    pub outcome: Outcome,
    pub played_at: DateTime<Utc>,
    /// Commit order assigned by the repository, zero until stored
    #[serde(default)]
    pub seq: u64,
}

impl MatchRecord {
    /// Replay position: timestamp first, commit order among equal timestamps
    pub fn replay_key(&self) -> (DateTime<Utc>, u64) {
        (self.played_at, self.seq)
    }

    pub fn involves(&self, member: MemberId) -> bool {
        self.lineup.iter().any(|(_, id)| *id == member)
    }

    /// Rating change applied to whoever played in `slot`.
    pub fn delta_for(&self, slot: Slot) -> i32 {
        match slot.side() {
            Side::Red => self.points,
            Side::Blue => -self.points,
        }
    }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Match {} [{}] {} points ({})",
            self.id, self.score, self.points, self.outcome
        )
    }
}

/// One member's rating right after one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpHistoryEntry {
    pub member_id: MemberId,
    pub match_id: MatchId,
    pub played_at: DateTime<Utc>,
    pub exp: i32,
    /// Matches the member had played once this one was counted
    pub matches_played: u32,
}

/// What each pair stands to win from a decisive 10-0 result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsPreview {
    pub red: i32,
    pub blue: i32,
}

/// Typed match query. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilter {
    /// Only matches where all four members belong to this team
    pub team: Option<TeamId>,
    /// Only matches where any slot is held by this username
    pub username: Option<String>,
}

impl MatchFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn team(team: TeamId) -> Self {
        Self {
            team: Some(team),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn matches(&self, members: &Lineup<&Member>) -> bool {
        let team_ok = self
            .team
            .map_or(true, |team| members.iter().all(|(_, m)| m.team_id == team));
        let username_ok = self
            .username
            .as_deref()
            .map_or(true, |name| members.iter().any(|(_, m)| m.username == name));
        team_ok && username_ok
    }
}
