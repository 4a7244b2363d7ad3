use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::LadderEvent;
use crate::member::TeamId;

const TEAM_CHANNEL_CAPACITY: usize = 100;

/// Distributes ladder events to per-team subscribers
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    /// Team-specific event channels: team_id -> sender
    team_channels: Arc<RwLock<HashMap<TeamId, broadcast::Sender<LadderEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            team_channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Emits an event to all subscribers of a team
    pub async fn emit_to_team(&self, team_id: TeamId, event: LadderEvent) {
        let sender = self.sender(team_id).await;
        match sender.send(event) {
            Ok(receivers) => {
                debug!(%team_id, receivers, "Ladder event emitted");
            }
            Err(_) => {
                debug!(%team_id, "Ladder event emitted with no receivers");
            }
        }
    }

    /// Subscribe to events for a team
    pub async fn subscribe_to_team(&self, team_id: TeamId) -> broadcast::Receiver<LadderEvent> {
        self.sender(team_id).await.subscribe()
    }

    async fn sender(&self, team_id: TeamId) -> broadcast::Sender<LadderEvent> {
        {
            let channels = self.team_channels.read().await;
            if let Some(sender) = channels.get(&team_id) {
                return sender.clone();
            }
        }

        debug!(%team_id, "Creating team channel");
        let mut channels = self.team_channels.write().await;
        channels
            .entry(team_id)
            .or_insert_with(|| broadcast::channel(TEAM_CHANNEL_CAPACITY).0)
            .clone()
    }
}
