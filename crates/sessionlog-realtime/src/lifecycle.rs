//! Per-connection receive loop.
//!
//! The transport adapter turns its frames into [`Inbound`] items and hands the
//! resulting stream to [`run_connection`], which relays text through the
//! registry until the peer goes away, the transport fails, the connection
//! idles out, or the registry evicts it.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use crate::connection::ConnectionHandle;
use crate::registry::ConnectionRegistry;

/// One frame received from the peer, already classified by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text payload to relay.
    Text(String),
    /// Frame with no relay semantics (ping, pong, binary).
    Ignored,
    /// Peer sent a close frame.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Close the connection when nothing arrives for this long.
    pub idle_timeout: Option<Duration>,
    /// Text frames larger than this are dropped instead of relayed.
    pub max_message_bytes: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            max_message_bytes: 64 * 1024,
        }
    }
}

/// Why a connection's loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    PeerClosed,
    TransportError(String),
    IdleTimeout,
    /// The registry dropped this connection: superseded by a newer one,
    /// removed after a failed delivery, or closed for shutdown.
    Evicted,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::PeerClosed => "peer_closed",
            ExitReason::TransportError(_) => "transport_error",
            ExitReason::IdleTimeout => "idle_timeout",
            ExitReason::Evicted => "evicted",
        }
    }
}

enum Step<E> {
    Evicted,
    Idle,
    Frame(Option<Result<Inbound, E>>),
}

/// Drive one registered connection until it ends.
///
/// The handle must already be registered. It is always unregistered (by
/// connection id) before this returns.
pub async fn run_connection<S, E>(
    registry: Arc<ConnectionRegistry>,
    handle: ConnectionHandle,
    mut inbound: S,
    options: ConnectionOptions,
) -> ExitReason
where
    S: Stream<Item = Result<Inbound, E>> + Unpin,
    E: Display,
{
    let reason = loop {
        let next_frame = async {
            match options.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, inbound.next()).await {
                    Ok(frame) => Step::Frame(frame),
                    Err(_) => Step::Idle,
                },
                None => Step::Frame(inbound.next().await),
            }
        };

        let step = tokio::select! {
            biased;
            _ = handle.evicted() => Step::Evicted,
            step = next_frame => step,
        };

        match step {
            Step::Evicted => break ExitReason::Evicted,
            Step::Idle => break ExitReason::IdleTimeout,
            Step::Frame(None) | Step::Frame(Some(Ok(Inbound::Closed))) => {
                break ExitReason::PeerClosed
            }
            Step::Frame(Some(Err(e))) => break ExitReason::TransportError(e.to_string()),
            Step::Frame(Some(Ok(Inbound::Ignored))) => {}
            Step::Frame(Some(Ok(Inbound::Text(text)))) => {
                if text.len() > options.max_message_bytes {
                    debug!(
                        client_id = handle.client_id(),
                        size = text.len(),
                        limit = options.max_message_bytes,
                        "dropping oversized message"
                    );
                    continue;
                }
                if registry.broadcast_from(&handle, text).is_none() {
                    break ExitReason::Evicted;
                }
            }
        }
    };

    registry.unregister_connection(&handle);
    info!(
        client_id = handle.client_id(),
        connection_id = %handle.id(),
        reason = reason.as_str(),
        "connection ended"
    );
    reason
}
