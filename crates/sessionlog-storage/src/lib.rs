// Storage layer for sessionlog
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// - Database: sqlx-backed repository over the session_metadata / event_log tables
// - InMemoryDatabase: HashMap-backed equivalent used in dev mode and tests
// - StorageBackend: enum dispatch between the two

pub mod backend;
pub mod memory;
pub mod models;
pub mod repositories;

pub use backend::StorageBackend;
pub use memory::InMemoryDatabase;
pub use models::*;
pub use repositories::*;
