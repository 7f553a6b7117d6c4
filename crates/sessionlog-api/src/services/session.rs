// Session service for business logic

use anyhow::Result;
use sessionlog_core::{NewSession, Session, SessionUpdate};
use sessionlog_storage::{CreateSessionRow, StorageBackend, UpdateSessionRow};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::sessions::{CreateSessionRequest, UpdateSessionRequest};

pub struct SessionService {
    db: Arc<StorageBackend>,
}

impl SessionService {
    pub fn new(db: Arc<StorageBackend>) -> Self {
        Self { db }
    }

    pub async fn create(&self, req: CreateSessionRequest) -> Result<Session> {
        let input = NewSession::new(req.user_id, req.summary)?;
        let row = self
            .db
            .create_session(CreateSessionRow {
                user_id: input.user_id,
                summary: input.summary,
            })
            .await?;
        tracing::info!(session_id = %row.session_id, "Session created");
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Session>> {
        let row = self.db.get_session(id).await?;
        Ok(row.map(Session::from))
    }

    /// End a session and/or set its summary.
    pub async fn update(&self, id: Uuid, req: UpdateSessionRequest) -> Result<Option<Session>> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let update = SessionUpdate {
            end_time: req.end_time,
            summary: req.summary,
        };
        existing.check_update(&update)?;
        if update.is_empty() {
            return Ok(Some(existing));
        }

        let row = self
            .db
            .update_session(
                id,
                UpdateSessionRow {
                    end_time: update.end_time,
                    summary: update.summary,
                },
            )
            .await?;
        Ok(row.map(Session::from))
    }

    /// Delete a session; its events go with it.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        self.db.delete_session(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sessionlog_core::DomainError;

    fn service() -> SessionService {
        SessionService::new(Arc::new(StorageBackend::in_memory()))
    }

    fn create_req(user_id: &str) -> CreateSessionRequest {
        CreateSessionRequest {
            user_id: user_id.to_string(),
            summary: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let svc = service();
        let created = svc.create(create_req("user-1")).await.unwrap();
        let fetched = svc.get(created.session_id).await.unwrap().unwrap();
        assert_eq!(created, fetched);
        assert!(!fetched.is_ended());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_user() {
        let err = service().create(create_req("  ")).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DomainError>(),
            Some(&DomainError::EmptyField("user_id"))
        );
    }

    #[tokio::test]
    async fn test_end_session() {
        let svc = service();
        let created = svc.create(create_req("user-1")).await.unwrap();
        let end = created.start_time + Duration::minutes(5);

        let updated = svc
            .update(
                created.session_id,
                UpdateSessionRequest {
                    end_time: Some(end),
                    summary: Some("done".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.end_time, Some(end));
        assert_eq!(updated.summary.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn test_end_before_start_rejected() {
        let svc = service();
        let created = svc.create(create_req("user-1")).await.unwrap();
        let err = svc
            .update(
                created.session_id,
                UpdateSessionRequest {
                    end_time: Some(created.start_time - Duration::seconds(1)),
                    summary: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::EndBeforeStart { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let result = service()
            .update(
                Uuid::now_v7(),
                UpdateSessionRequest {
                    end_time: Some(Utc::now()),
                    summary: None,
                },
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
