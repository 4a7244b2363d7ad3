use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{Rebuild, RecalcError, StatsRecalculator};
use crate::event::{EventBus, LadderEvent};
use crate::matches::{MatchFilter, MatchRecord};
use crate::member::{Member, TeamId};
use crate::repository::LadderRepository;

/// Administrative entry point for rebuilding stored stats.
///
/// Run it while no settlements are in flight for the affected members; it does not
/// take the per-member locks of the settlement service.
pub struct RecalcService {
    repository: Arc<dyn LadderRepository>,
    recalculator: StatsRecalculator,
    event_bus: Option<EventBus>,
}

impl RecalcService {
    pub fn new(repository: Arc<dyn LadderRepository>, recalculator: StatsRecalculator) -> Self {
        Self {
            repository,
            recalculator,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Rebuilds one team from the matches played entirely within it.
    #[instrument(skip(self))]
    pub async fn rebuild_team(&self, team: TeamId) -> Result<Rebuild, RecalcError> {
        let members = self.repository.list_members(Some(team)).await?;
        let matches = self.repository.list_matches(&MatchFilter::team(team)).await?;
        self.rebuild(members, matches).await
    }

    /// Rebuilds every member from the full match log.
    #[instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<Rebuild, RecalcError> {
        let members = self.repository.list_members(None).await?;
        let matches = self.repository.list_matches(&MatchFilter::all()).await?;
        self.rebuild(members, matches).await
    }

    async fn rebuild(
        &self,
        members: Vec<Member>,
        matches: Vec<MatchRecord>,
    ) -> Result<Rebuild, RecalcError> {
        let rebuild = self.recalculator.rebuild(members, matches)?;
        self.repository.replace_stats(&rebuild).await?;

        info!(
            members = rebuild.members.len(),
            matches = rebuild.matches.len(),
            "Stored rebuilt stats"
        );

        if let Some(event_bus) = &self.event_bus {
            let teams: BTreeSet<TeamId> = rebuild.members.iter().map(|m| m.team_id).collect();
            for team_id in teams {
                event_bus
                    .emit_to_team(
                        team_id,
                        LadderEvent::StatsRebuilt {
                            team_id,
                            matches_replayed: rebuild.matches.len(),
                        },
                    )
                    .await;
            }
        }

        Ok(rebuild)
    }
}
