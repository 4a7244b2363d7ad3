use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::RecalcError;
use crate::matches::{ExpHistoryEntry, MatchInput, MatchRecord};
use crate::member::{Member, MemberId};
use crate::settlement::MatchSettlement;

/// Derived state recomputed from a match log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebuild {
    /// Every member handed in, in input order, with replayed stats
    pub members: Vec<Member>,
    /// Matches in replay order, with recomputed points and outcome
    pub matches: Vec<MatchRecord>,
    pub history: Vec<ExpHistoryEntry>,
}

/// Replays match history from a clean baseline.
///
/// This is the authoritative repair path for drift between stored counters and the
/// match log. The same members and matches always produce the same [`Rebuild`].
#[derive(Clone)]
pub struct StatsRecalculator {
    settlement: MatchSettlement,
    starting_exp: i32,
}

impl StatsRecalculator {
    pub fn new(settlement: MatchSettlement, starting_exp: i32) -> Self {
        Self {
            settlement,
            starting_exp,
        }
    }

    /// Resets `members` and replays `matches` in ascending `played_at` order.
    ///
    /// Matches sharing a timestamp replay in commit order (`seq`), then input order.
    /// Any match that cannot be replayed aborts the whole rebuild.
    pub fn rebuild(
        &self,
        members: Vec<Member>,
        matches: Vec<MatchRecord>,
    ) -> Result<Rebuild, RecalcError> {
        let mut order: Vec<MemberId> = Vec::with_capacity(members.len());
        let mut seen = HashSet::new();
        let mut roster: HashMap<MemberId, Member> = HashMap::with_capacity(members.len());
        for member in members {
            if seen.insert(member.id) {
                order.push(member.id);
            }
            roster.insert(member.id, member.reset(self.starting_exp));
        }

        let mut ordered = matches;
        ordered.sort_by_key(MatchRecord::replay_key);

        let mut replayed = Vec::with_capacity(ordered.len());
        let mut history = Vec::with_capacity(ordered.len() * 4);

        for record in ordered {
            let players = record
                .lineup
                .as_ref()
                .map(|_, id| roster.get(id).cloned())
                .transpose()
                .map_err(|slot| RecalcError::UnknownMember {
                    match_id: record.id,
                    member_id: *record.lineup.get(slot),
                })?;

            let mut settlement = self
                .settlement
                .settle_as(record.id, &MatchInput::from(&record), players)
                .map_err(|source| RecalcError::Settlement {
                    match_id: record.id,
                    source,
                })?;
            settlement.record.seq = record.seq;

            if settlement.record.points != record.points {
                debug!(
                    match_id = %record.id,
                    stored = record.points,
                    replayed = settlement.record.points,
                    "Replayed points differ from stored points"
                );
            }

            for (_, member) in settlement.members.into_array() {
                roster.insert(member.id, member);
            }
            history.extend(settlement.history);
            replayed.push(settlement.record);
        }

        let members: Vec<Member> = order
            .iter()
            .filter_map(|id| roster.remove(id))
            .collect();

        info!(
            members = members.len(),
            matches = replayed.len(),
            "Rebuilt stats from match history"
        );

        Ok(Rebuild {
            members,
            matches: replayed,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LadderConfig;
    use crate::matches::MatchId;
    use crate::member::TeamId;
    use crate::rating::{Lineup, Outcome, RatingSnapshot, Score};
    use crate::settlement::{FixedClock, SettlementError};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()
    }

    fn recalculator() -> StatsRecalculator {
        let config = LadderConfig::default();
        let settlement = MatchSettlement::new(Arc::new(FixedClock(start())), &config);
        StatsRecalculator::new(settlement, config.starting_exp)
    }

    fn roster(count: usize) -> Vec<Member> {
        let team = TeamId::new();
        (0..count)
            .map(|i| Member::new(team, format!("player{i}"), 1000))
            .collect()
    }

    fn record(members: &[Member], slots: [usize; 4], red: i32, blue: i32, minute: i64) -> MatchRecord {
        sequenced(members, slots, red, blue, minute, 0)
    }

    fn sequenced(
        members: &[Member],
        slots: [usize; 4],
        red: i32,
        blue: i32,
        minute: i64,
        seq: u64,
    ) -> MatchRecord {
        MatchRecord {
            id: MatchId::new(),
            lineup: Lineup::new(
                members[slots[0]].id,
                members[slots[1]].id,
                members[slots[2]].id,
                members[slots[3]].id,
            ),
            score: Score::new(red, blue),
            k_factor: 20,
            // deliberately stale, the rebuild recomputes it
            points: 0,
            outcome: Outcome::Tie,
            played_at: start() + Duration::minutes(minute),
            seq,
        }
    }

    fn drifted(members: Vec<Member>) -> Vec<Member> {
        members
            .into_iter()
            .map(|m| {
                m.with_stats(RatingSnapshot {
                    exp: 1337,
                    offence_played: 40,
                    win_streak: 9,
                    ..RatingSnapshot::default()
                })
            })
            .collect()
    }

    #[test]
    fn replays_from_baseline() {
        let members = roster(4);
        let matches = vec![record(&members, [0, 1, 2, 3], 10, 0, 0)];

        let rebuild = recalculator().rebuild(drifted(members), matches).unwrap();

        assert_eq!(rebuild.matches[0].points, 26);
        assert_eq!(rebuild.matches[0].outcome, Outcome::RedWin);
        let exps: Vec<i32> = rebuild.members.iter().map(|m| m.exp()).collect();
        assert_eq!(exps, vec![1026, 1026, 974, 974]);
        assert_eq!(rebuild.members[0].stats.offence_played, 1);
        assert_eq!(rebuild.members[0].stats.win_streak, 1);
        assert_eq!(rebuild.history.len(), 4);
    }

    #[test]
    fn replays_in_timestamp_order() {
        let members = roster(4);
        let first = record(&members, [0, 1, 2, 3], 10, 0, 0);
        let second = record(&members, [0, 1, 2, 3], 3, 10, 30);

        let shuffled = recalculator()
            .rebuild(members.clone(), vec![second.clone(), first.clone()])
            .unwrap();
        let ordered = recalculator()
            .rebuild(members, vec![first.clone(), second])
            .unwrap();

        assert_eq!(shuffled, ordered);
        assert_eq!(ordered.matches[0].id, first.id);

        let red_att = &ordered.members[0].stats;
        assert_eq!(red_att.curr_lose_streak, 1);
        assert_eq!(red_att.win_streak, 1);
        assert_eq!(red_att.highest_exp, 1026);
    }

    #[test]
    fn equal_timestamps_replay_in_commit_order() {
        let members = roster(4);
        let first = sequenced(&members, [0, 1, 2, 3], 10, 0, 0, 1);
        let second = sequenced(&members, [0, 1, 2, 3], 2, 10, 0, 2);
        let third = sequenced(&members, [2, 1, 0, 3], 10, 9, 0, 3);

        let shuffled = recalculator()
            .rebuild(
                members.clone(),
                vec![third.clone(), first.clone(), second.clone()],
            )
            .unwrap();
        let ordered = recalculator()
            .rebuild(members, vec![first.clone(), second, third])
            .unwrap();

        assert_eq!(shuffled, ordered);
        assert_eq!(ordered.matches[0].id, first.id);
        let seqs: Vec<u64> = ordered.matches.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn untouched_members_return_to_baseline() {
        let members = roster(6);
        let matches = vec![record(&members, [0, 1, 2, 3], 10, 8, 0)];

        let rebuild = recalculator().rebuild(drifted(members), matches).unwrap();

        assert_eq!(rebuild.members.len(), 6);
        assert_eq!(rebuild.members[4].stats, RatingSnapshot::baseline(1000));
        assert_eq!(rebuild.members[5].stats, RatingSnapshot::baseline(1000));
    }

    #[test]
    fn is_idempotent() {
        let members = roster(5);
        let matches = vec![
            record(&members, [0, 1, 2, 3], 10, 4, 0),
            record(&members, [4, 1, 0, 3], 7, 10, 10),
            record(&members, [2, 3, 4, 0], 10, 10, 20),
            record(&members, [1, 4, 3, 2], 10, 1, 20),
        ];

        let once = recalculator().rebuild(members, matches.clone()).unwrap();
        let twice = recalculator()
            .rebuild(once.members.clone(), once.matches.clone())
            .unwrap();

        assert_eq!(once, twice);
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn aborts_on_unknown_member() {
        let members = roster(4);
        let mut orphan = record(&members, [0, 1, 2, 3], 10, 2, 0);
        let missing = MemberId::new();
        orphan.lineup.blue_def = missing;

        let result = recalculator().rebuild(members, vec![orphan.clone()]);
        match result {
            Err(RecalcError::UnknownMember {
                match_id,
                member_id,
            }) => {
                assert_eq!(match_id, orphan.id);
                assert_eq!(member_id, missing);
            }
            other => panic!("expected UnknownMember, got {other:?}"),
        }
    }

    #[test]
    fn aborts_on_unplayable_match() {
        let members = roster(4);
        let matches = vec![
            record(&members, [0, 1, 2, 3], 10, 2, 0),
            record(&members, [0, 1, 2, 3], 0, 0, 5),
        ];

        let result = recalculator().rebuild(members, matches);
        assert!(matches!(
            result,
            Err(RecalcError::Settlement {
                source: SettlementError::DegenerateScore,
                ..
            })
        ));
    }
}
