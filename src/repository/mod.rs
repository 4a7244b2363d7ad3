mod errors;
pub mod in_memory;

pub use errors::RepositoryError;
pub use in_memory::InMemoryLadderRepository;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::matches::{ExpHistoryEntry, MatchFilter, MatchId, MatchRecord};
use crate::member::{Member, MemberId, TeamId};
use crate::recalc::Rebuild;
use crate::settlement::{Reversal, Settlement};

/// Persistence collaborator for members, matches and rating history.
///
/// Each `record_*`/`replace_*` call is one unit of work: it applies every change it
/// carries or none of them.
#[async_trait]
pub trait LadderRepository: Send + Sync {
    async fn insert_member(&self, member: Member) -> Result<(), RepositoryError>;
    async fn get_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError>;
    /// Members of `team`, or of every team when `None`
    async fn list_members(&self, team: Option<TeamId>) -> Result<Vec<Member>, RepositoryError>;

    async fn get_match(&self, id: MatchId) -> Result<Option<MatchRecord>, RepositoryError>;
    /// Matching records, newest first. Fails with `NotFound` when a filter has to
    /// inspect a match whose members no longer exist.
    async fn list_matches(&self, filter: &MatchFilter)
        -> Result<Vec<MatchRecord>, RepositoryError>;
    /// Rating history of one member, oldest first
    async fn exp_history(&self, member: MemberId)
        -> Result<Vec<ExpHistoryEntry>, RepositoryError>;

    /// Stores a new match with its four member updates and history rows.
    ///
    /// Returns the commit sequence given to the match; it orders matches that share
    /// a timestamp.
    async fn record_settlement(&self, settlement: &Settlement) -> Result<u64, RepositoryError>;
    /// Removes a match and its history rows and stores the reverted members.
    async fn record_reversal(&self, reversal: &Reversal) -> Result<(), RepositoryError>;
    /// Overwrites the rebuilt members and matches and replaces their members' history.
    async fn replace_stats(&self, rebuild: &Rebuild) -> Result<(), RepositoryError>;
}

/// Plain dump of a ladder, used by the offline rebuild tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub members: Vec<Member>,
    pub matches: Vec<MatchRecord>,
    #[serde(default)]
    pub history: Vec<ExpHistoryEntry>,
}
