// Error types for domain validation

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, DomainError>;

/// Invariant violations detected while building or mutating domain records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A required text field was empty or whitespace only
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A session cannot end before it started
    #[error("end_time {end} is earlier than start_time {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The session already has an end time
    #[error("session already ended at {0}")]
    AlreadyEnded(DateTime<Utc>),
}

impl DomainError {
    /// Create an empty field error
    pub fn empty(field: &'static str) -> Self {
        DomainError::EmptyField(field)
    }
}
