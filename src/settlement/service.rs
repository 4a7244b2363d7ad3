use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};
use tracing::{info, instrument, warn};

use super::{MatchSettlement, Reversal, Settlement, SettlementError};
use crate::event::{EventBus, LadderEvent};
use crate::matches::{
    ExpHistoryEntry, MatchFilter, MatchId, MatchInput, MatchRecord, PointsPreview,
};
use crate::member::{Member, MemberId, TeamId};
use crate::rating::{Lineup, Slot};
use crate::repository::{LadderRepository, RepositoryError};

/// Records and deletes matches against stored members.
///
/// At most one settlement or reversal touches a given member at a time. Every
/// change is staged by [`MatchSettlement`] and stored with a single repository call.
pub struct SettlementService {
    repository: Arc<dyn LadderRepository>,
    engine: MatchSettlement,
    event_bus: Option<EventBus>,
    member_locks: Arc<RwLock<HashMap<MemberId, Arc<AsyncMutex<()>>>>>,
}

impl SettlementService {
    pub fn new(repository: Arc<dyn LadderRepository>, engine: MatchSettlement) -> Self {
        Self {
            repository,
            engine,
            event_bus: None,
            member_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    #[instrument(skip(self, input), fields(score = %input.score))]
    pub async fn record_match(&self, input: MatchInput) -> Result<Settlement, SettlementError> {
        if let Err(err) = self.engine.validate(&input) {
            warn!(%err, "Rejected match submission");
            return Err(err);
        }

        let guards = self.lock_members(&input.lineup).await;
        let committed = self.commit_settlement(&input).await;
        drop(guards);
        self.prune_locks(&input.lineup).await;
        let settlement = committed?;

        let record = &settlement.record;
        info!(
            match_id = %record.id,
            seq = record.seq,
            points = record.points,
            outcome = %record.outcome,
            "Match settled"
        );

        for team_id in teams(&settlement.members) {
            self.publish(LadderEvent::MatchSettled {
                team_id,
                match_id: record.id,
                score: record.score,
                points: record.points,
                outcome: record.outcome,
            })
            .await;
        }

        Ok(settlement)
    }

    /// Removes a match and undoes its rating exchange.
    ///
    /// A second deletion of the same match fails with `MatchNotFound`.
    #[instrument(skip(self))]
    pub async fn delete_match(&self, id: MatchId) -> Result<Reversal, SettlementError> {
        let lineup = self
            .repository
            .get_match(id)
            .await?
            .ok_or(SettlementError::MatchNotFound(id))?
            .lineup;

        let guards = self.lock_members(&lineup).await;
        let committed = self.commit_reversal(id).await;
        drop(guards);
        self.prune_locks(&lineup).await;
        let reversal = committed?;

        if reversal.stale_derived_stats {
            warn!(
                match_id = %id,
                "Streaks and rating extremes keep the deleted match until the team is rebuilt"
            );
        }
        info!(match_id = %id, points = reversal.record.points, "Match deleted");

        for team_id in teams(&reversal.members) {
            self.publish(LadderEvent::MatchReversed {
                team_id,
                match_id: id,
                points: reversal.record.points,
                stale_derived_stats: reversal.stale_derived_stats,
            })
            .await;
        }

        Ok(reversal)
    }

    /// Stakes of a prospective match. Slots may name the same member more than once.
    #[instrument(skip(self))]
    pub async fn preview_points(
        &self,
        lineup: Lineup<Option<MemberId>>,
    ) -> Result<PointsPreview, SettlementError> {
        let lineup = lineup
            .transpose()
            .map_err(|slot| SettlementError::MemberResolution { slot })?;
        let members = self.resolve(&lineup).await?;
        self.engine
            .preview(&members.as_ref().map(|_, member| member.exp()))
    }

    /// Matches passing `filter`, newest first.
    pub async fn list_matches(
        &self,
        filter: &MatchFilter,
    ) -> Result<Vec<MatchRecord>, SettlementError> {
        Ok(self.repository.list_matches(filter).await?)
    }

    /// Rating series of one member, oldest first.
    pub async fn exp_history(
        &self,
        member: MemberId,
    ) -> Result<Vec<ExpHistoryEntry>, SettlementError> {
        if self.repository.get_member(member).await?.is_none() {
            return Err(RepositoryError::NotFound(format!("member {member}")).into());
        }
        Ok(self.repository.exp_history(member).await?)
    }

    /// Settles and stores one match. Callers hold the member locks.
    async fn commit_settlement(&self, input: &MatchInput) -> Result<Settlement, SettlementError> {
        let members = self.resolve(&input.lineup).await?;
        let mut settlement = self.engine.settle(input, members)?;
        settlement.record.seq = self.repository.record_settlement(&settlement).await?;
        Ok(settlement)
    }

    /// Reverses and stores one match. Callers hold the member locks.
    async fn commit_reversal(&self, id: MatchId) -> Result<Reversal, SettlementError> {
        // a concurrent delete may have won the race for the locks
        let record = self
            .repository
            .get_match(id)
            .await?
            .ok_or(SettlementError::MatchNotFound(id))?;
        let members = self.resolve(&record.lineup).await?;
        let reversal = self.engine.reverse(record, members)?;

        self.repository
            .record_reversal(&reversal)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound(_) => SettlementError::MatchNotFound(id),
                other => other.into(),
            })?;
        Ok(reversal)
    }

    async fn resolve(&self, lineup: &Lineup<MemberId>) -> Result<Lineup<Member>, SettlementError> {
        Ok(Lineup {
            red_att: self.fetch(Slot::RedAtt, lineup.red_att).await?,
            red_def: self.fetch(Slot::RedDef, lineup.red_def).await?,
            blue_att: self.fetch(Slot::BlueAtt, lineup.blue_att).await?,
            blue_def: self.fetch(Slot::BlueDef, lineup.blue_def).await?,
        })
    }

    async fn fetch(&self, slot: Slot, id: MemberId) -> Result<Member, SettlementError> {
        match self.repository.get_member(id).await? {
            Some(member) => Ok(member),
            None => {
                warn!(%slot, member_id = %id, "Member could not be resolved");
                Err(SettlementError::MemberResolution { slot })
            }
        }
    }

    /// Locks every distinct member of the lineup, in id order so that two overlapping
    /// settlements cannot deadlock.
    async fn lock_members(&self, lineup: &Lineup<MemberId>) -> Vec<OwnedMutexGuard<()>> {
        let ids: BTreeSet<MemberId> = lineup.iter().map(|(_, id)| *id).collect();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.member_lock(id).await.lock_owned().await);
        }
        guards
    }

    async fn member_lock(&self, id: MemberId) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.member_locks.read().await;
            if let Some(lock) = guard.get(&id) {
                return lock.clone();
            }
        }

        let mut guard = self.member_locks.write().await;
        guard
            .entry(id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops the lock entries of `lineup` that nobody else is holding or waiting on.
    async fn prune_locks(&self, lineup: &Lineup<MemberId>) {
        let mut guard = self.member_locks.write().await;
        for (_, id) in lineup.iter() {
            // the map holds the only reference once every guard and waiter is gone
            if guard.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                guard.remove(id);
            }
        }
    }

    async fn publish(&self, event: LadderEvent) {
        if let Some(event_bus) = &self.event_bus {
            event_bus.emit_to_team(event.team_id(), event).await;
        }
    }
}

/// Every team with a member in the lineup, each once
fn teams(members: &Lineup<Member>) -> BTreeSet<TeamId> {
    members.iter().map(|(_, member)| member.team_id).collect()
}
