use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{LadderRepository, Ledger, RepositoryError};
use crate::matches::{ExpHistoryEntry, MatchFilter, MatchId, MatchRecord};
use crate::member::{Member, MemberId, TeamId};
use crate::recalc::Rebuild;
use crate::settlement::{Reversal, Settlement};

#[derive(Debug, Default)]
struct LadderData {
    members: HashMap<MemberId, Member>,
    matches: HashMap<MatchId, MatchRecord>,
    /// Insertion order doubles as tie-break for equal timestamps
    history: Vec<ExpHistoryEntry>,
    /// Last commit sequence handed to a match
    last_seq: u64,
}

impl LadderData {
    fn ensure_members<'a>(
        &self,
        mut ids: impl Iterator<Item = &'a MemberId>,
    ) -> Result<(), RepositoryError> {
        match ids.find(|id| !self.members.contains_key(*id)) {
            Some(id) => Err(RepositoryError::NotFound(format!("member {id}"))),
            None => Ok(()),
        }
    }
}

/// In-memory implementation of LadderRepository for development and testing
///
/// All data sits behind one lock, which makes every write a single atomic step.
#[derive(Debug, Default)]
pub struct InMemoryLadderRepository {
    data: Arc<RwLock<LadderData>>,
}

impl InMemoryLadderRepository {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LadderData::default())),
        }
    }

    /// Creates a repository pre-populated from a ledger dump
    ///
    /// Matches without a commit sequence get one in file order, after every
    /// sequence already present.
    pub fn from_ledger(ledger: Ledger) -> Self {
        let mut last_seq = ledger.matches.iter().map(|m| m.seq).max().unwrap_or(0);
        let matches = ledger
            .matches
            .into_iter()
            .map(|mut record| {
                if record.seq == 0 {
                    last_seq += 1;
                    record.seq = last_seq;
                }
                (record.id, record)
            })
            .collect();

        let data = LadderData {
            members: ledger.members.into_iter().map(|m| (m.id, m)).collect(),
            matches,
            history: ledger.history,
            last_seq,
        };
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Dumps the current state with members by username and matches oldest first
    pub async fn ledger(&self) -> Ledger {
        let data = self.data.read().await;

        let mut members: Vec<Member> = data.members.values().cloned().collect();
        members.sort_by(|a, b| (&a.username, a.id).cmp(&(&b.username, b.id)));

        let mut matches: Vec<MatchRecord> = data.matches.values().cloned().collect();
        matches.sort_by_key(|m| (m.replay_key(), m.id));

        Ledger {
            members,
            matches,
            history: data.history.clone(),
        }
    }

    pub async fn match_count(&self) -> usize {
        self.data.read().await.matches.len()
    }
}

#[async_trait]
impl LadderRepository for InMemoryLadderRepository {
    #[instrument(skip(self, member), fields(member_id = %member.id))]
    async fn insert_member(&self, member: Member) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if data.members.contains_key(&member.id) {
            warn!("Member already exists in memory");
            return Err(RepositoryError::Conflict(format!(
                "member {} already exists",
                member.id
            )));
        }
        debug!(username = %member.username, "Inserting member in memory");
        data.members.insert(member.id, member);
        Ok(())
    }

    async fn get_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        Ok(self.data.read().await.members.get(&id).cloned())
    }

    async fn list_members(&self, team: Option<TeamId>) -> Result<Vec<Member>, RepositoryError> {
        let data = self.data.read().await;
        let mut members: Vec<Member> = data
            .members
            .values()
            .filter(|m| team.map_or(true, |team| m.team_id == team))
            .cloned()
            .collect();
        members.sort_by(|a, b| (&a.username, a.id).cmp(&(&b.username, b.id)));
        Ok(members)
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<MatchRecord>, RepositoryError> {
        Ok(self.data.read().await.matches.get(&id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_matches(
        &self,
        filter: &MatchFilter,
    ) -> Result<Vec<MatchRecord>, RepositoryError> {
        let data = self.data.read().await;
        let unfiltered = *filter == MatchFilter::all();

        let mut matches = Vec::new();
        for record in data.matches.values() {
            if !unfiltered {
                let members = record.lineup.as_ref().map(|_, id| data.members.get(id));
                // dangling lineups are an error, never filtered out
                let members = members.transpose().map_err(|slot| {
                    warn!(match_id = %record.id, %slot, "Match references a missing member");
                    RepositoryError::NotFound(format!(
                        "member {} of match {}",
                        record.lineup.get(slot),
                        record.id
                    ))
                })?;
                if !filter.matches(&members) {
                    continue;
                }
            }
            matches.push(record.clone());
        }
        matches.sort_by(|a, b| (b.replay_key(), b.id).cmp(&(a.replay_key(), a.id)));

        debug!(count = matches.len(), "Listed matches");
        Ok(matches)
    }

    async fn exp_history(
        &self,
        member: MemberId,
    ) -> Result<Vec<ExpHistoryEntry>, RepositoryError> {
        let data = self.data.read().await;
        let mut entries: Vec<ExpHistoryEntry> = data
            .history
            .iter()
            .filter(|entry| entry.member_id == member)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.played_at);
        Ok(entries)
    }

    #[instrument(skip(self, settlement), fields(match_id = %settlement.record.id))]
    async fn record_settlement(&self, settlement: &Settlement) -> Result<u64, RepositoryError> {
        let mut data = self.data.write().await;

        if data.matches.contains_key(&settlement.record.id) {
            return Err(RepositoryError::Conflict(format!(
                "match {} already recorded",
                settlement.record.id
            )));
        }
        data.ensure_members(settlement.members.iter().map(|(_, m)| &m.id))?;

        for (_, member) in settlement.members.iter() {
            data.members.insert(member.id, member.clone());
        }
        data.last_seq += 1;
        let seq = data.last_seq;
        data.matches.insert(
            settlement.record.id,
            MatchRecord {
                seq,
                ..settlement.record.clone()
            },
        );
        data.history.extend(settlement.history.iter().cloned());

        debug!(seq, "Recorded settlement in memory");
        Ok(seq)
    }

    #[instrument(skip(self, reversal), fields(match_id = %reversal.record.id))]
    async fn record_reversal(&self, reversal: &Reversal) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        let match_id = reversal.record.id;

        if !data.matches.contains_key(&match_id) {
            return Err(RepositoryError::NotFound(format!("match {match_id}")));
        }
        data.ensure_members(reversal.members.iter().map(|(_, m)| &m.id))?;

        data.matches.remove(&match_id);
        data.history.retain(|entry| entry.match_id != match_id);
        for (_, member) in reversal.members.iter() {
            data.members.insert(member.id, member.clone());
        }

        debug!("Recorded reversal in memory");
        Ok(())
    }

    #[instrument(skip(self, rebuild), fields(members = rebuild.members.len(), matches = rebuild.matches.len()))]
    async fn replace_stats(&self, rebuild: &Rebuild) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;

        data.ensure_members(rebuild.members.iter().map(|m| &m.id))?;
        if let Some(record) = rebuild
            .matches
            .iter()
            .find(|record| !data.matches.contains_key(&record.id))
        {
            return Err(RepositoryError::NotFound(format!("match {}", record.id)));
        }

        let rebuilt: HashSet<MemberId> = rebuild.members.iter().map(|m| m.id).collect();
        for member in &rebuild.members {
            data.members.insert(member.id, member.clone());
        }
        for record in &rebuild.matches {
            data.matches.insert(record.id, record.clone());
        }
        data.history
            .retain(|entry| !rebuilt.contains(&entry.member_id));
        data.history.extend(rebuild.history.iter().cloned());

        debug!("Replaced stats in memory");
        Ok(())
    }
}
