// Repository layer for PostgreSQL
//
// Tables (provisioned outside this service):
//   session_metadata(session_id, user_id, start_time, end_time, summary)
//   event_log(event_id, session_id, timestamp, event_type, event_data)
// event_log.session_id references session_metadata with ON DELETE CASCADE.

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

/// SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Sessions
    // ============================================

    pub async fn create_session(&self, input: CreateSessionRow) -> Result<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO session_metadata (session_id, user_id, summary)
            VALUES ($1, $2, $3)
            RETURNING session_id, user_id, start_time, end_time, summary
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.user_id)
        .bind(&input.summary)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT session_id, user_id, start_time, end_time, summary
            FROM session_metadata
            WHERE session_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn update_session(
        &self,
        id: Uuid,
        input: UpdateSessionRow,
    ) -> Result<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE session_metadata
            SET
                end_time = COALESCE($2, end_time),
                summary = COALESCE($3, summary)
            WHERE session_id = $1
            RETURNING session_id, user_id, start_time, end_time, summary
            "#,
        )
        .bind(id)
        .bind(input.end_time)
        .bind(&input.summary)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn delete_session(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM session_metadata WHERE session_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // Events
    // ============================================

    /// Insert an event. Returns `None` when the session does not exist.
    pub async fn create_event(&self, input: CreateEventRow) -> Result<Option<EventRow>> {
        let result = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO event_log (event_id, session_id, event_type, event_data)
            VALUES ($1, $2, $3, $4)
            RETURNING event_id, session_id, timestamp, event_type, event_data
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.session_id)
        .bind(&input.event_type)
        .bind(&input.event_data)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Some(row)),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                tracing::debug!(session_id = %input.session_id, "event rejected: unknown session");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_events(&self, session_id: Uuid) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT event_id, session_id, timestamp, event_type, event_data
            FROM event_log
            WHERE session_id = $1
            ORDER BY timestamp ASC, event_id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
