//! Realtime connection registry and broadcast fan-out.
//!
//! - [`connection`]: per-connection handle and outbound frame envelope
//! - [`registry`]: client id → connection map with echo + broadcast delivery
//! - [`lifecycle`]: the receive loop that drives one connection
//! - [`presence`]: typed join/leave notices

pub mod connection;
pub mod lifecycle;
pub mod presence;
pub mod registry;

pub use connection::{CloseReason, ConnectionHandle, ConnectionId, DeliveryError, Outbound};
pub use lifecycle::{run_connection, ConnectionOptions, ExitReason, Inbound};
pub use presence::{PresenceNotice, PresenceStatus};
pub use registry::{BroadcastReport, ConnectionRegistry, DuplicatePolicy, RegisterError};
