//! Error types for the scoreboard engine and the command layer

use thiserror::Error;

/// Result type for engine operations
pub type ScoreboardResult<T> = Result<T, ScoreboardError>;

/// Failures reported by the engine. None of them leave partial state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreboardError {
    #[error("competition has already started")]
    AlreadyStarted,

    #[error("duplicated team name: {0}")]
    DuplicateName(String),

    #[error("scoreboard has already been frozen")]
    AlreadyFrozen,

    #[error("scoreboard has not been frozen")]
    NotFrozen,

    #[error("unknown team: {0}")]
    UnknownTeam(String),
}

/// Failures while turning a text line into a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command keyword {0}")]
    UnknownCommand(String),

    #[error("missing {0}")]
    MissingToken(&'static str),

    #[error("expected keyword {expected}, found {found}")]
    UnexpectedKeyword {
        expected: &'static str,
        found: String,
    },

    #[error("invalid number {0}")]
    InvalidNumber(String),

    #[error("invalid problem id {0}")]
    InvalidProblem(String),

    #[error("invalid judging outcome {0}")]
    InvalidOutcome(String),

    #[error("malformed condition: {0}")]
    InvalidCondition(String),
}
