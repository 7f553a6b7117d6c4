// Event domain types
//
// Events are typed, timestamped records within a session. Within a session
// they are always read back in ascending timestamp order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::{DomainError, Result};

/// Event log record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Event {
    /// Server-generated identifier (UUID v7).
    pub event_id: Uuid,
    /// Session this event belongs to.
    pub session_id: Uuid,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Free-text type tag (e.g. "page_view", "message").
    #[cfg_attr(feature = "openapi", schema(example = "message"))]
    pub event_type: String,
    /// Arbitrary structured payload.
    pub event_data: serde_json::Value,
}

/// Validated input for recording an event
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub session_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
}

impl NewEvent {
    pub fn new(
        session_id: Uuid,
        event_type: impl Into<String>,
        event_data: serde_json::Value,
    ) -> Result<Self> {
        let event_type = event_type.into();
        if event_type.trim().is_empty() {
            return Err(DomainError::empty("event_type"));
        }
        Ok(Self {
            session_id,
            event_type,
            event_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event_requires_type() {
        let err = NewEvent::new(Uuid::now_v7(), "", json!({})).unwrap_err();
        assert_eq!(err, DomainError::EmptyField("event_type"));
    }

    #[test]
    fn test_new_event_keeps_nested_payload() {
        let data = json!({"page": {"path": "/home", "ms": [1, 2, 3]}});
        let event = NewEvent::new(Uuid::now_v7(), "page_view", data.clone()).unwrap();
        assert_eq!(event.event_data, data);
        assert_eq!(event.event_type, "page_view");
    }
}
