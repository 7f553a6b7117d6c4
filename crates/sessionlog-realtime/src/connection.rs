//! Connection handle held by the registry.
//!
//! The registry never touches the transport directly. Each accepted
//! connection gets a bounded channel: the registry keeps the sending half
//! inside a [`ConnectionHandle`], the transport writer owns the receiver.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one accepted transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the server is closing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// A newer connection registered the same client id.
    Superseded,
    /// The server is shutting down.
    Shutdown,
}

impl CloseReason {
    /// WebSocket close code (private-use range 4000-4999).
    pub fn code(self) -> u16 {
        match self {
            CloseReason::Superseded => 4000,
            CloseReason::Shutdown => 4001,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Superseded => "superseded by a newer connection",
            CloseReason::Shutdown => "server shutting down",
        }
    }
}

/// Frame handed to a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Opaque text payload relayed as-is.
    Text(Arc<str>),
    /// Close the transport.
    Close(CloseReason),
}

impl Outbound {
    pub fn text(payload: impl Into<Arc<str>>) -> Self {
        Outbound::Text(payload.into())
    }
}

/// A delivery attempt to a single connection failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The writer side is gone (transport closed or write error).
    #[error("connection closed")]
    Closed,
    /// The outbound buffer is full; the peer is not keeping up.
    #[error("outbound buffer full")]
    Full,
}

/// Cloneable handle to one live connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    client_id: Arc<str>,
    tx: mpsc::Sender<Outbound>,
    /// Signalled when the registry drops this connection for any reason
    /// other than its own cleanup.
    evicted: Arc<Notify>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its transport writer should drain.
    pub fn channel(
        client_id: impl Into<Arc<str>>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::next(),
            client_id: client_id.into(),
            tx,
            evicted: Arc::new(Notify::new()),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Try to queue a frame without waiting.
    pub fn deliver(&self, frame: Outbound) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Ask the writer to close the transport. Best effort.
    pub fn close(&self, reason: CloseReason) {
        if let Err(e) = self.deliver(Outbound::Close(reason)) {
            tracing::debug!(
                client_id = %self.client_id,
                connection_id = %self.id,
                error = %e,
                "close frame not queued"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wake the connection's receive loop so it stops.
    pub(crate) fn evict(&self) {
        // notify_one stores a permit, so a loop that is not currently
        // waiting still observes the eviction on its next poll.
        self.evicted.notify_one();
    }

    /// Resolves once the registry has evicted this connection.
    pub async fn evicted(&self) {
        self.evicted.notified().await
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let (a, _ra) = ConnectionHandle::channel("a", 4);
        let (b, _rb) = ConnectionHandle::channel("a", 4);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.client_id(), b.client_id());
    }

    #[tokio::test]
    async fn deliver_queues_frames_in_order() {
        let (handle, mut rx) = ConnectionHandle::channel("alice", 4);
        handle.deliver(Outbound::text("one")).unwrap();
        handle.deliver(Outbound::text("two")).unwrap();
        assert_eq!(rx.recv().await, Some(Outbound::text("one")));
        assert_eq!(rx.recv().await, Some(Outbound::text("two")));
    }

    #[test]
    fn deliver_reports_full_buffer() {
        let (handle, _rx) = ConnectionHandle::channel("alice", 1);
        handle.deliver(Outbound::text("fits")).unwrap();
        assert_eq!(
            handle.deliver(Outbound::text("overflow")),
            Err(DeliveryError::Full)
        );
    }

    #[test]
    fn deliver_reports_closed_receiver() {
        let (handle, rx) = ConnectionHandle::channel("alice", 4);
        drop(rx);
        assert!(handle.is_closed());
        assert_eq!(handle.deliver(Outbound::text("x")), Err(DeliveryError::Closed));
    }

    #[tokio::test]
    async fn eviction_is_observed_after_the_fact() {
        let (handle, _rx) = ConnectionHandle::channel("alice", 4);
        handle.evict();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle.evicted())
            .await
            .expect("eviction permit should be stored");
    }

    #[test]
    fn close_codes_are_private_range() {
        for reason in [CloseReason::Superseded, CloseReason::Shutdown] {
            assert!((4000..5000).contains(&reason.code()));
        }
    }
}
