use serde::{Deserialize, Serialize};

use crate::matches::MatchId;
use crate::member::TeamId;
use crate::rating::{Outcome, Score};

/// Facts about committed changes to a team's ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LadderEvent {
    /// A new match was settled and stored
    MatchSettled {
        team_id: TeamId,
        match_id: MatchId,
        score: Score,
        points: i32,
        outcome: Outcome,
    },

    /// A match was deleted and its rating exchange undone
    MatchReversed {
        team_id: TeamId,
        match_id: MatchId,
        points: i32,
        stale_derived_stats: bool,
    },

    /// Stats were recomputed from the match log
    StatsRebuilt {
        team_id: TeamId,
        matches_replayed: usize,
    },
}

impl LadderEvent {
    pub fn team_id(&self) -> TeamId {
        match self {
            LadderEvent::MatchSettled { team_id, .. }
            | LadderEvent::MatchReversed { team_id, .. }
            | LadderEvent::StatsRebuilt { team_id, .. } => *team_id,
        }
    }
}
