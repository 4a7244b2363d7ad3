use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("Invalid score {red}-{blue}: scores cannot be negative")]
    InvalidScore { red: i32, blue: i32 },
}
