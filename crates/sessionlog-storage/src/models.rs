// Database models (internal, converted to core records by the service layer)

use chrono::{DateTime, Utc};
use sessionlog_core::{Event, Session};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================
// Sessions (session_metadata table)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub session_id: Uuid,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateSessionRow {
    pub user_id: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSessionRow {
    pub end_time: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            session_id: row.session_id,
            user_id: row.user_id,
            start_time: row.start_time,
            end_time: row.end_time,
            summary: row.summary,
        }
    }
}

// ============================================
// Events (event_log table)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub event_id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub event_data: sqlx::types::JsonValue,
}

#[derive(Debug, Clone)]
pub struct CreateEventRow {
    pub session_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            event_id: row.event_id,
            session_id: row.session_id,
            timestamp: row.timestamp,
            event_type: row.event_type,
            event_data: row.event_data,
        }
    }
}
