use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::debug;

use super::{Lineup, MemberResult, RatingError, Score, Side};

/// K-factor used when a match does not carry its own
pub const DEFAULT_K_FACTOR: i32 = 20;

/// Team-level result of a match
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    RedWin,
    BlueWin,
    Tie,
}

impl Outcome {
    pub fn from_score(score: Score) -> Self {
        if score.red == score.blue {
            Outcome::Tie
        } else if score.red > score.blue {
            Outcome::RedWin
        } else {
            Outcome::BlueWin
        }
    }

    pub fn result_for(self, side: Side) -> MemberResult {
        match (self, side) {
            (Outcome::Tie, _) => MemberResult::Tied,
            (Outcome::RedWin, Side::Red) | (Outcome::BlueWin, Side::Blue) => MemberResult::Won,
            _ => MemberResult::Lost,
        }
    }

    /// Actual score of the red pair in Elo terms
    fn red_actual(self) -> f64 {
        match self {
            Outcome::RedWin => 1.0,
            Outcome::BlueWin => 0.0,
            Outcome::Tie => 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsOutcome {
    /// Points gained by each red player and lost by each blue player
    pub points: i32,
    pub outcome: Outcome,
}

/// Elo-style point exchange between two pairs, scaled by the goal difference.
///
/// ```text
/// G  = (11 + |red - blue|) / 8
/// dr = (red_att + red_def) - (blue_att + blue_def)
/// We = 1 / (10^(-dr / 400) + 1)
/// W  = 1, 0.5 or 0 for a red win, tie or red loss
/// points = trunc(K * G * (W - We))
/// ```
///
/// The blowout scaling is uncapped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointsCalculator;

impl PointsCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(
        &self,
        ratings: &Lineup<i32>,
        score: Score,
        k_factor: i32,
    ) -> Result<PointsOutcome, RatingError> {
        if score.is_negative() {
            return Err(RatingError::InvalidScore {
                red: score.red,
                blue: score.blue,
            });
        }

        let outcome = Outcome::from_score(score);
        let dr = ratings.red_total() - ratings.blue_total();

        // Always evaluate from the side that is not rated lower so that swapping the pairs
        // negates the result exactly.
        let points = if dr < 0 {
            -exchange(-dr, score.swapped(), k_factor)
        } else {
            exchange(dr, score, k_factor)
        };

        debug!(
            dr,
            score = %score,
            k_factor,
            points,
            outcome = %outcome,
            "Computed match points"
        );

        Ok(PointsOutcome { points, outcome })
    }
}

fn exchange(dr: i64, score: Score, k_factor: i32) -> i32 {
    let margin = (11 + score.goal_difference()) as f64 / 8.0;
    let expected = 1.0 / (10f64.powf(-(dr as f64) / 400.0) + 1.0);
    let actual = Outcome::from_score(score).red_actual();
    // `as` truncates toward zero and saturates at the i32 bounds
    (f64::from(k_factor) * margin * (actual - expected)) as i32
}
