use crate::rating::{DEFAULT_K_FACTOR, STARTING_EXP};

/// Ladder-wide rating constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderConfig {
    /// Rating of a new member, and of every member after a rebuild
    pub starting_exp: i32,
    /// K-factor for matches submitted without one
    pub default_k_factor: i32,
}

impl LadderConfig {
    pub fn from_env() -> Self {
        // Both fall back to the standard constants when unset or unparsable
        let starting_exp = std::env::var("LADDER_STARTING_EXP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(STARTING_EXP);
        let default_k_factor = std::env::var("LADDER_DEFAULT_K_FACTOR")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|k: &i32| *k > 0)
            .unwrap_or(DEFAULT_K_FACTOR);

        Self {
            starting_exp,
            default_k_factor,
        }
    }
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            starting_exp: STARTING_EXP,
            default_k_factor: DEFAULT_K_FACTOR,
        }
    }
}
