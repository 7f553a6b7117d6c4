// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// Mirrors the PostgreSQL repository, including the cascade from sessions to
// their events, so the API behaves the same without a database.

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::*;

/// In-memory database for dev mode
/// All data is stored in memory and lost on restart
#[derive(Default)]
pub struct InMemoryDatabase {
    sessions: RwLock<HashMap<Uuid, SessionRow>>,
    events: RwLock<HashMap<Uuid, EventRow>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================
    // Sessions
    // ============================================

    pub async fn create_session(&self, input: CreateSessionRow) -> Result<SessionRow> {
        let row = SessionRow {
            session_id: Uuid::now_v7(),
            user_id: input.user_id,
            start_time: Utc::now(),
            end_time: None,
            summary: input.summary,
        };
        self.sessions.write().insert(row.session_id, row.clone());
        Ok(row)
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Option<SessionRow>> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    pub async fn update_session(
        &self,
        id: Uuid,
        input: UpdateSessionRow,
    ) -> Result<Option<SessionRow>> {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(&id) {
            if let Some(end_time) = input.end_time {
                session.end_time = Some(end_time);
            }
            if let Some(summary) = input.summary {
                session.summary = Some(summary);
            }
            return Ok(Some(session.clone()));
        }
        Ok(None)
    }

    pub async fn delete_session(&self, id: Uuid) -> Result<bool> {
        // Lock order: sessions before events, same as create_event
        let mut sessions = self.sessions.write();
        if sessions.remove(&id).is_none() {
            return Ok(false);
        }
        self.events.write().retain(|_, e| e.session_id != id);
        Ok(true)
    }

    // ============================================
    // Events
    // ============================================

    pub async fn create_event(&self, input: CreateEventRow) -> Result<Option<EventRow>> {
        let sessions = self.sessions.read();
        if !sessions.contains_key(&input.session_id) {
            return Ok(None);
        }
        let row = EventRow {
            event_id: Uuid::now_v7(),
            session_id: input.session_id,
            timestamp: Utc::now(),
            event_type: input.event_type,
            event_data: input.event_data,
        };
        self.events.write().insert(row.event_id, row.clone());
        Ok(Some(row))
    }

    pub async fn list_events(&self, session_id: Uuid) -> Result<Vec<EventRow>> {
        let mut rows: Vec<EventRow> = self
            .events
            .read()
            .values()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        Ok(rows)
    }
}
