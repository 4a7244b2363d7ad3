use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::{Clock, SettlementError};
use crate::config::LadderConfig;
use crate::matches::{ExpHistoryEntry, MatchId, MatchInput, MatchRecord, PointsPreview};
use crate::member::{Member, MemberId};
use crate::rating::{Lineup, Outcome, PointsCalculator, PointsOutcome, RatingError, Score};

/// Everything one settled match changes, staged and ready to commit as a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub record: MatchRecord,
    pub members: Lineup<Member>,
    /// One entry per slot, in lineup order
    pub history: Vec<ExpHistoryEntry>,
}

/// The effect of removing a settled match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reversal {
    pub record: MatchRecord,
    pub members: Lineup<Member>,
    /// Streaks and rating extremes may still reflect the removed match until the
    /// team's stats are rebuilt
    pub stale_derived_stats: bool,
}

/// Turns a match score into rating and counter updates for the four players.
///
/// Pure apart from the clock: callers hand in the members, get staged copies back
/// and decide whether to persist them.
#[derive(Clone)]
pub struct MatchSettlement {
    calculator: PointsCalculator,
    clock: Arc<dyn Clock>,
    default_k_factor: i32,
}

impl MatchSettlement {
    pub fn new(clock: Arc<dyn Clock>, config: &LadderConfig) -> Self {
        Self {
            calculator: PointsCalculator::new(),
            clock,
            default_k_factor: config.default_k_factor,
        }
    }

    pub fn default_k_factor(&self) -> i32 {
        self.default_k_factor
    }

    /// Checks the input alone and returns the K-factor that will apply.
    pub fn validate(&self, input: &MatchInput) -> Result<i32, SettlementError> {
        let score = input.score;
        if score.is_negative() {
            return Err(RatingError::InvalidScore {
                red: score.red,
                blue: score.blue,
            }
            .into());
        }
        if score.is_degenerate() {
            return Err(SettlementError::DegenerateScore);
        }

        let k_factor = input.k_factor.unwrap_or(self.default_k_factor);
        if k_factor <= 0 {
            return Err(SettlementError::InvalidKFactor(k_factor));
        }

        if let Some(member) = find_duplicate(&input.lineup) {
            return Err(SettlementError::DuplicateMember { member });
        }

        Ok(k_factor)
    }

    pub fn settle(
        &self,
        input: &MatchInput,
        members: Lineup<Member>,
    ) -> Result<Settlement, SettlementError> {
        self.settle_as(MatchId::new(), input, members)
    }

    /// Settles under a known match id; used when replaying stored matches.
    pub(crate) fn settle_as(
        &self,
        id: MatchId,
        input: &MatchInput,
        members: Lineup<Member>,
    ) -> Result<Settlement, SettlementError> {
        let k_factor = self.validate(input)?;
        check_members(&input.lineup, &members)?;

        let ratings = members.as_ref().map(|_, member| member.exp());
        let PointsOutcome { points, outcome } =
            self.calculator.compute(&ratings, input.score, k_factor)?;

        let record = MatchRecord {
            id,
            lineup: input.lineup,
            score: input.score,
            k_factor,
            points,
            outcome,
            played_at: input.played_at.unwrap_or_else(|| self.clock.now()),
            seq: 0,
        };

        let members = members.map(|slot, member| {
            let stats = member.stats.apply_match_outcome(
                slot.role(),
                outcome.result_for(slot.side()),
                record.delta_for(slot),
            );
            member.with_stats(stats)
        });

        let history = members
            .iter()
            .map(|(_, member)| ExpHistoryEntry {
                member_id: member.id,
                match_id: record.id,
                played_at: record.played_at,
                exp: member.stats.exp,
                matches_played: member.stats.played(),
            })
            .collect();

        debug!(match_id = %record.id, points, outcome = %outcome, "Settled match");

        Ok(Settlement {
            record,
            members,
            history,
        })
    }

    /// Undoes `record` for the members that played it.
    ///
    /// Takes the record by value: a match can be reversed once.
    pub fn reverse(
        &self,
        record: MatchRecord,
        members: Lineup<Member>,
    ) -> Result<Reversal, SettlementError> {
        if let Some(member) = find_duplicate(&record.lineup) {
            return Err(SettlementError::DuplicateMember { member });
        }
        check_members(&record.lineup, &members)?;

        let reverted = members.map(|slot, member| {
            let id = member.id;
            let result = record.outcome.result_for(slot.side());
            match member
                .stats
                .revert_match_outcome(slot.role(), result, record.delta_for(slot))
            {
                Some(stats) => Ok(member.with_stats(stats)),
                None => Err(SettlementError::CounterUnderflow {
                    match_id: record.id,
                    member: id,
                }),
            }
        });
        let members = Lineup {
            red_att: reverted.red_att?,
            red_def: reverted.red_def?,
            blue_att: reverted.blue_att?,
            blue_def: reverted.blue_def?,
        };

        let stale_derived_stats = !(record.outcome == Outcome::Tie && record.points == 0);
        debug!(match_id = %record.id, points = record.points, "Reversed match");

        Ok(Reversal {
            record,
            members,
            stale_derived_stats,
        })
    }

    /// Absolute stakes of a 0-10 (blue) and a 10-0 (red) result.
    pub fn preview(&self, ratings: &Lineup<i32>) -> Result<PointsPreview, SettlementError> {
        let k_factor = self.default_k_factor;
        let blue = self
            .calculator
            .compute(ratings, Score::new(0, 10), k_factor)?
            .points
            .abs();
        let red = self
            .calculator
            .compute(ratings, Score::new(10, 0), k_factor)?
            .points
            .abs();
        Ok(PointsPreview { red, blue })
    }
}

fn check_members(ids: &Lineup<MemberId>, members: &Lineup<Member>) -> Result<(), SettlementError> {
    match ids.iter().find(|(slot, id)| members.get(*slot).id != **id) {
        Some((slot, _)) => Err(SettlementError::MemberResolution { slot }),
        None => Ok(()),
    }
}

fn find_duplicate(ids: &Lineup<MemberId>) -> Option<MemberId> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|(_, id)| *id)
        .find(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::TeamId;
    use crate::rating::{RatingSnapshot, Slot};
    use crate::settlement::FixedClock;
    use chrono::{TimeZone, Utc};

    fn engine() -> MatchSettlement {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        MatchSettlement::new(Arc::new(clock), &LadderConfig::default())
    }

    fn members_at(exps: [i32; 4]) -> Lineup<Member> {
        let team = TeamId::new();
        let names = ["ra", "rd", "ba", "bd"];
        let [ra, rd, ba, bd] = [0usize, 1, 2, 3].map(|i| {
            let member = Member::new(team, names[i], 1000);
            let stats = RatingSnapshot::baseline(exps[i]);
            member.with_stats(stats)
        });
        Lineup::new(ra, rd, ba, bd)
    }

    fn input_for(members: &Lineup<Member>, red: i32, blue: i32) -> MatchInput {
        MatchInput::new(members.as_ref().map(|_, m| m.id), red, blue)
    }

    #[test]
    fn settles_even_blowout_zero_sum() {
        let members = members_at([1000; 4]);
        let input = input_for(&members, 10, 0);

        let settlement = engine().settle(&input, members).unwrap();

        assert_eq!(settlement.record.points, 26);
        assert_eq!(settlement.record.outcome, Outcome::RedWin);
        assert_eq!(settlement.record.k_factor, 20);
        assert_eq!(settlement.members.red_att.exp(), 1026);
        assert_eq!(settlement.members.red_def.exp(), 1026);
        assert_eq!(settlement.members.blue_att.exp(), 974);
        assert_eq!(settlement.members.blue_def.exp(), 974);

        let total: i32 = settlement.members.iter().map(|(_, m)| m.exp()).sum();
        assert_eq!(total, 4000);
    }

    #[test]
    fn attributes_results_to_roles() {
        let members = members_at([1000; 4]);
        let input = input_for(&members, 4, 10);

        let settled = engine().settle(&input, members).unwrap().members;

        assert_eq!(settled.red_att.stats.offence_played, 1);
        assert_eq!(settled.red_att.stats.offence_won, 0);
        assert_eq!(settled.red_att.stats.curr_lose_streak, 1);
        assert_eq!(settled.red_def.stats.defence_played, 1);
        assert_eq!(settled.blue_att.stats.offence_won, 1);
        assert_eq!(settled.blue_def.stats.defence_won, 1);
        assert_eq!(settled.blue_def.stats.curr_win_streak, 1);
        assert_eq!(settled.blue_def.stats.highest_exp, settled.blue_def.exp());
        assert_eq!(settled.red_def.stats.lowest_exp, settled.red_def.exp());
    }

    #[test]
    fn tie_updates_played_but_not_streaks() {
        let members = members_at([1100, 1000, 950, 980]);
        let input = input_for(&members, 7, 7);

        let settlement = engine().settle(&input, members).unwrap();

        assert_eq!(settlement.record.outcome, Outcome::Tie);
        for (slot, member) in settlement.members.iter() {
            assert_eq!(member.stats.played(), 1, "{slot}");
            assert_eq!(member.stats.won(), 0);
            assert_eq!(member.stats.curr_win_streak, 0);
            assert_eq!(member.stats.curr_lose_streak, 0);
        }
        assert!(settlement.record.points < 0);
    }

    #[test]
    fn rejects_degenerate_score_before_touching_members() {
        let members = members_at([1000; 4]);
        let input = input_for(&members, 0, 0);

        let result = engine().settle(&input, members);
        assert!(matches!(result, Err(SettlementError::DegenerateScore)));
    }

    #[test]
    fn rejects_negative_score() {
        let members = members_at([1000; 4]);
        let input = input_for(&members, -1, 10);

        let result = engine().settle(&input, members);
        assert!(matches!(
            result,
            Err(SettlementError::Rating(RatingError::InvalidScore { red: -1, blue: 10 }))
        ));
    }

    #[test]
    fn rejects_non_positive_k_factor() {
        let members = members_at([1000; 4]);
        let input = input_for(&members, 10, 3).with_k_factor(0);

        let result = engine().settle(&input, members);
        assert!(matches!(result, Err(SettlementError::InvalidKFactor(0))));
    }

    #[test]
    fn rejects_member_in_two_slots() {
        let members = members_at([1000; 4]);
        let mut input = input_for(&members, 10, 3);
        input.lineup.blue_def = input.lineup.red_att;

        let result = engine().settle(&input, members);
        assert!(matches!(result, Err(SettlementError::DuplicateMember { .. })));
    }

    #[test]
    fn rejects_members_not_matching_lineup() {
        let members = members_at([1000; 4]);
        let mut input = input_for(&members, 10, 3);
        input.lineup.blue_att = MemberId::new();

        let result = engine().settle(&input, members);
        assert!(matches!(
            result,
            Err(SettlementError::MemberResolution {
                slot: Slot::BlueAtt
            })
        ));
    }

    #[test]
    fn stamps_missing_timestamp_from_clock() {
        let members = members_at([1000; 4]);
        let stamped = engine()
            .settle(&input_for(&members, 10, 3), members.clone())
            .unwrap();
        assert_eq!(
            stamped.record.played_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );

        let played_at = Utc.with_ymd_and_hms(2023, 11, 5, 18, 30, 0).unwrap();
        let kept = engine()
            .settle(&input_for(&members, 10, 3).played_at(played_at), members)
            .unwrap();
        assert_eq!(kept.record.played_at, played_at);
    }

    #[test]
    fn emits_history_per_member() {
        let members = members_at([1000; 4]);
        let settlement = engine()
            .settle(&input_for(&members, 10, 8), members)
            .unwrap();

        assert_eq!(settlement.history.len(), 4);
        for (entry, (_, member)) in settlement.history.iter().zip(settlement.members.iter()) {
            assert_eq!(entry.member_id, member.id);
            assert_eq!(entry.match_id, settlement.record.id);
            assert_eq!(entry.exp, member.exp());
            assert_eq!(entry.matches_played, 1);
        }
    }

    #[test]
    fn reverse_restores_ratings_and_counters() {
        let original = members_at([1040, 990, 1010, 960]);
        let settlement = engine()
            .settle(&input_for(&original, 10, 6), original.clone())
            .unwrap();

        let reversal = engine()
            .reverse(settlement.record, settlement.members)
            .unwrap();

        for (slot, member) in reversal.members.iter() {
            let before = original.get(slot);
            assert_eq!(member.exp(), before.exp(), "{slot}");
            assert_eq!(member.stats.played(), 0);
            assert_eq!(member.stats.won(), 0);
        }
        assert!(reversal.stale_derived_stats);
    }

    #[test]
    fn reverse_refuses_counters_below_zero() {
        let members = members_at([1000; 4]);
        let settlement = engine()
            .settle(&input_for(&members, 10, 6), members.clone())
            .unwrap();

        // members that never had the match applied
        let result = engine().reverse(settlement.record, members);
        assert!(matches!(
            result,
            Err(SettlementError::CounterUnderflow { .. })
        ));
    }

    #[test]
    fn preview_of_equal_ratings_is_symmetric() {
        let preview = engine().preview(&Lineup::new(1000, 1000, 1000, 1000)).unwrap();
        assert_eq!(preview, PointsPreview { red: 26, blue: 26 });
    }

    #[test]
    fn preview_favours_underdogs() {
        let preview = engine().preview(&Lineup::new(1200, 1100, 950, 900)).unwrap();
        assert!(preview.blue > preview.red);
    }
}
