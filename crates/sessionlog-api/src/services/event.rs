// Event service for business logic

use anyhow::Result;
use sessionlog_core::{Event, NewEvent};
use sessionlog_storage::{CreateEventRow, StorageBackend};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::events::CreateEventRequest;

pub struct EventService {
    db: Arc<StorageBackend>,
}

impl EventService {
    pub fn new(db: Arc<StorageBackend>) -> Self {
        Self { db }
    }

    /// Record an event. `None` when the session does not exist.
    pub async fn create(&self, req: CreateEventRequest) -> Result<Option<Event>> {
        let input = NewEvent::new(req.session_id, req.event_type, req.event_data)?;
        let row = self
            .db
            .create_event(CreateEventRow {
                session_id: input.session_id,
                event_type: input.event_type,
                event_data: input.event_data,
            })
            .await?;
        if let Some(row) = &row {
            tracing::debug!(
                session_id = %row.session_id,
                event_id = %row.event_id,
                event_type = %row.event_type,
                "Event recorded"
            );
        }
        Ok(row.map(Event::from))
    }

    /// Events of a session, oldest first. Empty for unknown sessions.
    pub async fn list(&self, session_id: Uuid) -> Result<Vec<Event>> {
        let rows = self.db.list_events(session_id).await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionlog_storage::CreateSessionRow;
    use serde_json::json;

    async fn setup() -> (EventService, Uuid) {
        let db = Arc::new(StorageBackend::in_memory());
        let session = db
            .create_session(CreateSessionRow {
                user_id: "user-1".to_string(),
                summary: None,
            })
            .await
            .unwrap();
        (EventService::new(db), session.session_id)
    }

    fn req(session_id: Uuid, event_type: &str, n: i64) -> CreateEventRequest {
        CreateEventRequest {
            session_id,
            event_type: event_type.to_string(),
            event_data: json!({"n": n, "nested": {"ok": true}}),
        }
    }

    #[tokio::test]
    async fn test_events_listed_in_order() {
        let (svc, session_id) = setup().await;
        for n in 0..5 {
            svc.create(req(session_id, "tick", n)).await.unwrap().unwrap();
        }
        let events = svc.list(session_id).await.unwrap();
        let ns: Vec<i64> = events
            .iter()
            .map(|e| e.event_data["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (svc, _) = setup().await;
        let missing = Uuid::now_v7();
        assert!(svc.create(req(missing, "tick", 0)).await.unwrap().is_none());
        assert!(svc.list(missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_event_type_rejected() {
        let (svc, session_id) = setup().await;
        assert!(svc.create(req(session_id, "", 0)).await.is_err());
    }
}
