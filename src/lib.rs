// Library crate for the foosball ladder rating engine
// This file exposes the public API for the batch tool and integration tests

pub mod config;
pub mod event;
pub mod matches;
pub mod member;
pub mod rating;
pub mod recalc;
pub mod repository;
pub mod settlement;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use config::LadderConfig;
pub use event::{EventBus, LadderEvent};
pub use matches::{MatchFilter, MatchId, MatchInput, MatchRecord};
pub use member::{Member, MemberId, TeamId};
pub use rating::{Lineup, PointsCalculator, RatingSnapshot, Score, Slot};
pub use recalc::{RecalcService, StatsRecalculator};
pub use repository::{InMemoryLadderRepository, LadderRepository, Ledger};
pub use settlement::{MatchSettlement, SettlementError, SettlementService};
pub use shared::{AppError, LadderState};
