// Session domain types
//
// A session groups the events of one user interaction. The identifier and
// start time are assigned by the server; the end time and summary are set
// when the session is closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::{DomainError, Result};

/// Session metadata record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Session {
    /// Server-generated identifier (UUID v7), immutable once assigned.
    pub session_id: Uuid,
    /// Owning user.
    #[cfg_attr(feature = "openapi", schema(example = "user-42"))]
    pub user_id: String,
    /// When the session was created.
    pub start_time: DateTime<Utc>,
    /// When the session ended, if it has.
    pub end_time: Option<DateTime<Utc>>,
    /// Free-text summary of the session.
    pub summary: Option<String>,
}

impl Session {
    /// Whether the session has been closed
    pub fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }

    /// Check an update against this session's invariants without applying it.
    pub fn check_update(&self, update: &SessionUpdate) -> Result<()> {
        if let Some(end) = update.end_time {
            if let Some(existing) = self.end_time {
                if existing != end {
                    return Err(DomainError::AlreadyEnded(existing));
                }
            }
            if end < self.start_time {
                return Err(DomainError::EndBeforeStart {
                    start: self.start_time,
                    end,
                });
            }
        }
        Ok(())
    }
}

/// Validated input for creating a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub user_id: String,
    pub summary: Option<String>,
}

impl NewSession {
    pub fn new(user_id: impl Into<String>, summary: Option<String>) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(DomainError::empty("user_id"));
        }
        Ok(Self { user_id, summary })
    }
}

/// Changes applied to an existing session. Only provided fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub end_time: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.end_time.is_none() && self.summary.is_none()
    }
}
