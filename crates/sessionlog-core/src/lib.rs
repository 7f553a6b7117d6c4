// Sessionlog core
//
// Domain records shared by the storage and API crates:
// - Session: a user's interaction span with an optional summary
// - Event: a typed, timestamped payload recorded within a session
//
// Validation of user-supplied input lives next to the input types so both the
// HTTP layer and any other caller enforce the same invariants.

pub mod error;
pub mod event;
pub mod session;
pub mod telemetry;

pub use error::{DomainError, Result};
pub use event::{Event, NewEvent};
pub use session::{NewSession, Session, SessionUpdate};
