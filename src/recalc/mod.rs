mod errors;
pub mod rebuild;
pub mod service;

pub use errors::RecalcError;
pub use rebuild::{Rebuild, StatsRecalculator};
pub use service::RecalcService;
