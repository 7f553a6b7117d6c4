// HTTP API routes
//
// Each submodule handles one resource type with its own AppState.

pub mod common;
pub mod events;
pub mod realtime;
pub mod sessions;
pub mod validation;

// Re-export common types
pub use common::{ErrorResponse, ListResponse};
