// Match settlement: staging rating exchanges and committing them through the repository

mod clock;
mod engine;
mod errors;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{MatchSettlement, Reversal, Settlement};
pub use errors::SettlementError;
pub use service::SettlementService;
