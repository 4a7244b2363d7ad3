use thiserror::Error;

use crate::matches::MatchId;
use crate::member::MemberId;
use crate::repository::RepositoryError;
use crate::settlement::SettlementError;

#[derive(Debug, Error)]
pub enum RecalcError {
    #[error("Match {match_id} references unknown member {member_id}")]
    UnknownMember {
        match_id: MatchId,
        member_id: MemberId,
    },

    #[error("Match {match_id} cannot be replayed: {source}")]
    Settlement {
        match_id: MatchId,
        #[source]
        source: SettlementError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
