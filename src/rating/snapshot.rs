use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Rating every member starts from, and returns to on a full rebuild
pub const STARTING_EXP: i32 = 1000;

/// Sub-position a member plays in a match
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Offence,
    Defence,
}

/// How a single match went for a single member
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberResult {
    Won,
    Lost,
    Tied,
}

/// Rating-relevant state of one member at a point in time.
///
/// Transitions are value-returning: [`RatingSnapshot::apply_match_outcome`] never touches
/// `self`, so a settlement can stage all four updates and discard them on failure.
///
/// Invariants kept by every transition:
/// - `lowest_exp <= exp <= highest_exp`
/// - `win_streak >= curr_win_streak` and `lose_streak >= curr_lose_streak`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub exp: i32,
    pub offence_played: u32,
    pub offence_won: u32,
    pub defence_played: u32,
    pub defence_won: u32,
    pub win_streak: u32,
    pub curr_win_streak: u32,
    pub lose_streak: u32,
    pub curr_lose_streak: u32,
    pub lowest_exp: i32,
    pub highest_exp: i32,
}

impl Default for RatingSnapshot {
    fn default() -> Self {
        Self::baseline(STARTING_EXP)
    }
}

impl RatingSnapshot {
    /// A member with no matches behind them, rated `exp`.
    pub fn baseline(exp: i32) -> Self {
        Self {
            exp,
            offence_played: 0,
            offence_won: 0,
            defence_played: 0,
            defence_won: 0,
            win_streak: 0,
            curr_win_streak: 0,
            lose_streak: 0,
            curr_lose_streak: 0,
            lowest_exp: exp,
            highest_exp: exp,
        }
    }

    pub fn played(&self) -> u32 {
        self.offence_played + self.defence_played
    }

    pub fn won(&self) -> u32 {
        self.offence_won + self.defence_won
    }

    pub fn lost(&self) -> u32 {
        self.played().saturating_sub(self.won())
    }

    pub fn att_ratio(&self) -> f64 {
        ratio(self.offence_won, self.offence_played)
    }

    pub fn def_ratio(&self) -> f64 {
        ratio(self.defence_won, self.defence_played)
    }

    pub fn win_ratio(&self) -> f64 {
        ratio(self.won(), self.played())
    }

    /// State after playing one match in `role` with the given result and rating change.
    ///
    /// A tie leaves both current streaks alone but still counts as played.
    pub fn apply_match_outcome(&self, role: Role, result: MemberResult, delta: i32) -> Self {
        let mut next = *self;
        next.exp = next.exp.saturating_add(delta);

        match role {
            Role::Offence => next.offence_played += 1,
            Role::Defence => next.defence_played += 1,
        }

        match result {
            MemberResult::Won => {
                next.curr_win_streak += 1;
                next.curr_lose_streak = 0;
                match role {
                    Role::Offence => next.offence_won += 1,
                    Role::Defence => next.defence_won += 1,
                }
            }
            MemberResult::Lost => {
                next.curr_win_streak = 0;
                next.curr_lose_streak += 1;
            }
            MemberResult::Tied => {}
        }

        next.win_streak = next.win_streak.max(next.curr_win_streak);
        next.lose_streak = next.lose_streak.max(next.curr_lose_streak);
        next.lowest_exp = next.lowest_exp.min(next.exp);
        next.highest_exp = next.highest_exp.max(next.exp);
        next
    }

    /// Undoes the rating change and role counters of one match.
    ///
    /// Streaks and extremes stay as they are; they depend on the whole history.
    /// Returns `None` when a counter would go below zero.
    pub fn revert_match_outcome(&self, role: Role, result: MemberResult, delta: i32) -> Option<Self> {
        let mut prev = *self;
        prev.exp = prev.exp.saturating_sub(delta);

        let (played, won) = match role {
            Role::Offence => (&mut prev.offence_played, &mut prev.offence_won),
            Role::Defence => (&mut prev.defence_played, &mut prev.defence_won),
        };
        *played = played.checked_sub(1)?;
        if result == MemberResult::Won {
            *won = won.checked_sub(1)?;
        }
        if *won > *played {
            return None;
        }

        prev.lowest_exp = prev.lowest_exp.min(prev.exp);
        prev.highest_exp = prev.highest_exp.max(prev.exp);
        Some(prev)
    }
}

/// Share of games won, rounded to two decimals; zero when nothing was played.
fn ratio(won: u32, played: u32) -> f64 {
    if played == 0 {
        return 0.0;
    }
    (f64::from(won) / f64::from(played) * 100.0).round() / 100.0
}
