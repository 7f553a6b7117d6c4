// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// Works with either PostgreSQL (production) or in-memory (dev mode) storage.

use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use super::memory::InMemoryDatabase;
use super::models::*;
use super::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL
    pub async fn postgres(database_url: &str, max_connections: u32) -> Result<Self> {
        let db = Database::from_url(database_url, max_connections).await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Check if this is dev mode (in-memory)
    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    /// Short label for health output and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::InMemory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> Result<()> {
        match self {
            Self::Postgres(db) => db.ping().await,
            Self::InMemory(_) => Ok(()),
        }
    }

    // ============================================
    // Sessions
    // ============================================

    pub async fn create_session(&self, input: CreateSessionRow) -> Result<SessionRow> {
        match self {
            Self::Postgres(db) => db.create_session(input).await,
            Self::InMemory(db) => db.create_session(input).await,
        }
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Option<SessionRow>> {
        match self {
            Self::Postgres(db) => db.get_session(id).await,
            Self::InMemory(db) => db.get_session(id).await,
        }
    }

    pub async fn update_session(
        &self,
        id: Uuid,
        input: UpdateSessionRow,
    ) -> Result<Option<SessionRow>> {
        match self {
            Self::Postgres(db) => db.update_session(id, input).await,
            Self::InMemory(db) => db.update_session(id, input).await,
        }
    }

    pub async fn delete_session(&self, id: Uuid) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.delete_session(id).await,
            Self::InMemory(db) => db.delete_session(id).await,
        }
    }

    // ============================================
    // Events
    // ============================================

    pub async fn create_event(&self, input: CreateEventRow) -> Result<Option<EventRow>> {
        match self {
            Self::Postgres(db) => db.create_event(input).await,
            Self::InMemory(db) => db.create_event(input).await,
        }
    }

    pub async fn list_events(&self, session_id: Uuid) -> Result<Vec<EventRow>> {
        match self {
            Self::Postgres(db) => db.list_events(session_id).await,
            Self::InMemory(db) => db.list_events(session_id).await,
        }
    }
}
