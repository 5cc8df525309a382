//! Error types shared across the Fitness Tracker crates

use thiserror::Error;

/// Failure to parse one of the closed string enums used in the API
/// and in persisted records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown difficulty: {0}")]
    Difficulty(String),

    #[error("Unknown muscle group: {0}")]
    MuscleGroup(String),

    #[error("Unknown role: {0}")]
    Role(String),

    #[error("Unknown unit: {0}")]
    Unit(String),

    #[error("Unknown inbox status: {0}")]
    InboxStatus(String),

    #[error("Unknown {kind}: {value}")]
    Other { kind: &'static str, value: String },
}
