use thiserror::Error;

use crate::matches::MatchId;
use crate::member::MemberId;
use crate::rating::{RatingError, Slot};
use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Rating(#[from] RatingError),

    #[error("Score 0-0 is not a valid result, did you mean to record this match?")]
    DegenerateScore,

    #[error("Players have not been provided: no member for {slot}")]
    MemberResolution { slot: Slot },

    #[error("Member {member} is listed in more than one slot")]
    DuplicateMember { member: MemberId },

    #[error("K-factor must be positive, got {0}")]
    InvalidKFactor(i32),

    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Reverting match {match_id} would leave member {member} with negative counters")]
    CounterUnderflow { match_id: MatchId, member: MemberId },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
