pub mod models;

pub use models::{ExpHistoryEntry, MatchFilter, MatchId, MatchInput, MatchRecord, PointsPreview};
