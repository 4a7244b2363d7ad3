pub mod models;

pub use models::{Member, MemberId, TeamId};
