mod calculator;
mod errors;
mod lineup;
mod snapshot;

pub use calculator::{Outcome, PointsCalculator, PointsOutcome, DEFAULT_K_FACTOR};
pub use errors::RatingError;
pub use lineup::{Lineup, Score, Side, Slot};
pub use snapshot::{MemberResult, RatingSnapshot, Role, STARTING_EXP};
