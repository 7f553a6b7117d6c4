//! Connection registry: tracks live connections by client id and fans
//! messages out to them.
//!
//! Deliveries never happen under the lock. Every broadcast copies the
//! current entries first, attempts each peer independently, and then removes
//! the peers whose delivery failed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::connection::{CloseReason, ConnectionHandle, DeliveryError, Outbound};

/// What to do when a client id that is already connected registers again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Last write wins; the superseded connection is closed.
    #[default]
    Replace,
    /// Refuse the new connection while the existing one is alive.
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(DuplicatePolicy::Replace),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!("unknown duplicate policy: {other}")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("client id {0:?} is already connected")]
    Duplicate(String),
}

/// Outcome of one broadcast. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the message was queued for (including the echo).
    pub delivered: usize,
    /// Client ids removed because delivery to them failed.
    pub removed: Vec<String>,
}

/// Shared map of client id → live connection.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
    policy: DuplicatePolicy,
}

impl ConnectionRegistry {
    /// Create an empty registry with the default (replace) policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Add a connection under its client id.
    pub fn register(&self, handle: ConnectionHandle) -> Result<(), RegisterError> {
        let client_id = handle.client_id().to_string();
        let connection_id = handle.id();

        let superseded = {
            let mut conns = self.connections.write();
            match conns.entry(client_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(handle);
                    None
                }
                Entry::Occupied(mut slot) => {
                    // A dead entry never blocks a new registration.
                    if self.policy == DuplicatePolicy::Reject && !slot.get().is_closed() {
                        return Err(RegisterError::Duplicate(client_id));
                    }
                    Some(slot.insert(handle))
                }
            }
        };

        if let Some(old) = superseded {
            warn!(
                client_id = %client_id,
                old_connection_id = %old.id(),
                connection_id = %connection_id,
                "client id re-registered, closing superseded connection"
            );
            old.close(CloseReason::Superseded);
            old.evict();
        }

        debug!(client_id = %client_id, connection_id = %connection_id, "connection registered");
        Ok(())
    }

    /// Remove the entry for a client id. No-op if absent.
    pub fn unregister(&self, client_id: &str) -> bool {
        let removed = self.connections.write().remove(client_id);
        match removed {
            Some(handle) => {
                debug!(client_id, connection_id = %handle.id(), "connection unregistered");
                handle.evict();
                true
            }
            None => false,
        }
    }

    /// Remove the entry only if it still belongs to this exact connection.
    ///
    /// Used by a connection's own cleanup, so a stale connection can never
    /// evict the replacement that took over its client id.
    pub fn unregister_connection(&self, handle: &ConnectionHandle) -> bool {
        let mut conns = self.connections.write();
        let owned = conns
            .get(handle.client_id())
            .is_some_and(|current| current.id() == handle.id());
        if owned {
            conns.remove(handle.client_id());
            debug!(
                client_id = handle.client_id(),
                connection_id = %handle.id(),
                "connection unregistered"
            );
        }
        owned
    }

    /// Whether this handle is the current registration for its client id.
    pub fn is_current(&self, handle: &ConnectionHandle) -> bool {
        self.connections
            .read()
            .get(handle.client_id())
            .is_some_and(|c| c.id() == handle.id())
    }

    /// Echo `message` to `sender_id`, then deliver it to every other
    /// connection. A sender that is not registered makes this a no-op.
    pub fn broadcast(&self, sender_id: &str, message: impl Into<Arc<str>>) -> BroadcastReport {
        let snapshot = self.snapshot();
        let Some(sender) = snapshot.iter().find(|c| c.client_id() == sender_id).cloned() else {
            debug!(sender_id, "broadcast from unregistered client ignored");
            return BroadcastReport::default();
        };
        self.fan_out(&sender, snapshot, message.into())
    }

    /// Like [`broadcast`](Self::broadcast), keyed by connection rather than
    /// client id. Returns `None` when the handle is no longer registered.
    pub fn broadcast_from(
        &self,
        sender: &ConnectionHandle,
        message: impl Into<Arc<str>>,
    ) -> Option<BroadcastReport> {
        let snapshot = self.snapshot();
        if !snapshot.iter().any(|c| c.id() == sender.id()) {
            return None;
        }
        Some(self.fan_out(sender, snapshot, message.into()))
    }

    /// Deliver `message` to every registered connection.
    pub fn broadcast_all(&self, message: impl Into<Arc<str>>) -> BroadcastReport {
        let frame = Outbound::Text(message.into());
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for conn in self.snapshot() {
            attempt(&conn, &frame, &mut report, &mut failed);
        }

        self.remove_failed(failed, &mut report);
        report
    }

    /// Close and remove every connection.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        let drained: Vec<ConnectionHandle> = self.connections.write().drain().map(|(_, c)| c).collect();
        for conn in &drained {
            conn.close(reason);
            conn.evict();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), reason = reason.as_str(), "closed all connections");
        }
        drained.len()
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.connections.read().contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Connected client ids, sorted.
    pub fn client_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.connections.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.connections.read().values().cloned().collect()
    }

    fn fan_out(
        &self,
        sender: &ConnectionHandle,
        snapshot: Vec<ConnectionHandle>,
        message: Arc<str>,
    ) -> BroadcastReport {
        let frame = Outbound::Text(message);
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        // Echo first.
        attempt(sender, &frame, &mut report, &mut failed);
        for conn in snapshot.iter().filter(|c| c.id() != sender.id()) {
            attempt(conn, &frame, &mut report, &mut failed);
        }

        self.remove_failed(failed, &mut report);
        debug!(
            sender_id = sender.client_id(),
            delivered = report.delivered,
            removed = report.removed.len(),
            "broadcast"
        );
        report
    }

    fn remove_failed(&self, failed: Vec<ConnectionHandle>, report: &mut BroadcastReport) {
        if failed.is_empty() {
            return;
        }
        let mut conns = self.connections.write();
        for conn in failed {
            // The entry may have been replaced since the snapshot was taken.
            let still_current = conns
                .get(conn.client_id())
                .is_some_and(|c| c.id() == conn.id());
            if still_current {
                conns.remove(conn.client_id());
                conn.evict();
                report.removed.push(conn.client_id().to_string());
            }
        }
    }
}

fn attempt(
    conn: &ConnectionHandle,
    frame: &Outbound,
    report: &mut BroadcastReport,
    failed: &mut Vec<ConnectionHandle>,
) {
    match conn.deliver(frame.clone()) {
        Ok(()) => report.delivered += 1,
        Err(e) => {
            match e {
                DeliveryError::Closed => {
                    debug!(client_id = conn.client_id(), connection_id = %conn.id(), "peer gone, removing")
                }
                DeliveryError::Full => {
                    warn!(client_id = conn.client_id(), connection_id = %conn.id(), "peer not keeping up, removing")
                }
            }
            failed.push(conn.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn connect(
        registry: &ConnectionRegistry,
        client_id: &str,
    ) -> (ConnectionHandle, mpsc::Receiver<Outbound>) {
        let (handle, rx) = ConnectionHandle::channel(client_id, 16);
        registry.register(handle.clone()).unwrap();
        (handle, rx)
    }

    fn texts(rx: &mut mpsc::Receiver<Outbound>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let Outbound::Text(t) = frame {
                out.push(t.to_string());
            }
        }
        out
    }

    #[test]
    fn register_and_unregister_track_membership() {
        let registry = ConnectionRegistry::new();
        let (_a, _ra) = connect(&registry, "alice");
        let (_b, _rb) = connect(&registry, "bob");
        assert_eq!(registry.client_ids(), vec!["alice", "bob"]);

        assert!(registry.unregister("alice"));
        assert!(!registry.contains("alice"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.unregister("ghost"));
        let (_a, _ra) = connect(&registry, "alice");
        assert!(registry.unregister("alice"));
        assert!(!registry.unregister("alice"));
        assert!(registry.is_empty());
    }

    #[test]
    fn broadcast_echoes_then_fans_out() {
        let registry = ConnectionRegistry::new();
        let (_a, mut ra) = connect(&registry, "alice");
        let (_b, mut rb) = connect(&registry, "bob");
        let (_c, mut rc) = connect(&registry, "carol");

        let report = registry.broadcast("alice", "hi");
        assert_eq!(report.delivered, 3);
        assert!(report.removed.is_empty());
        assert_eq!(texts(&mut ra), vec!["hi"]);
        assert_eq!(texts(&mut rb), vec!["hi"]);
        assert_eq!(texts(&mut rc), vec!["hi"]);
    }

    #[test]
    fn broadcast_alone_is_echo_only() {
        let registry = ConnectionRegistry::new();
        let (_a, mut ra) = connect(&registry, "alice");
        let report = registry.broadcast("alice", "hello");
        assert_eq!(report.delivered, 1);
        assert_eq!(texts(&mut ra), vec!["hello"]);
    }

    #[test]
    fn broadcast_from_unregistered_sender_is_noop() {
        let registry = ConnectionRegistry::new();
        let (_a, mut ra) = connect(&registry, "alice");
        let report = registry.broadcast("bob", "nobody home");
        assert_eq!(report, BroadcastReport::default());
        assert!(texts(&mut ra).is_empty());
    }

    #[test]
    fn failed_peer_is_removed_and_others_still_receive() {
        let registry = ConnectionRegistry::new();
        let (_a, mut ra) = connect(&registry, "alice");
        let (_b, rb) = connect(&registry, "bob");
        let (_c, mut rc) = connect(&registry, "carol");
        drop(rb);

        let report = registry.broadcast("alice", "still here?");
        assert_eq!(report.delivered, 2);
        assert_eq!(report.removed, vec!["bob".to_string()]);
        assert!(!registry.contains("bob"));
        assert_eq!(texts(&mut ra), vec!["still here?"]);
        assert_eq!(texts(&mut rc), vec!["still here?"]);
    }

    #[test]
    fn failed_echo_does_not_abort_fan_out() {
        let registry = ConnectionRegistry::new();
        let (_a, ra) = connect(&registry, "alice");
        let (_b, mut rb) = connect(&registry, "bob");
        drop(ra);

        let report = registry.broadcast("alice", "last words");
        assert_eq!(report.delivered, 1);
        assert_eq!(report.removed, vec!["alice".to_string()]);
        assert_eq!(texts(&mut rb), vec!["last words"]);
    }

    #[test]
    fn full_buffer_counts_as_delivery_failure() {
        let registry = ConnectionRegistry::new();
        let (_a, mut ra) = connect(&registry, "alice");
        let (slow, _slow_rx) = ConnectionHandle::channel("slow", 1);
        registry.register(slow).unwrap();

        registry.broadcast("alice", "one");
        let report = registry.broadcast("alice", "two");
        assert_eq!(report.removed, vec!["slow".to_string()]);
        assert_eq!(texts(&mut ra), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn duplicate_register_replaces_and_closes_old() {
        let registry = ConnectionRegistry::new();
        let (old, mut old_rx) = connect(&registry, "alice");
        let (new, mut new_rx) = connect(&registry, "alice");

        assert_eq!(registry.len(), 1);
        assert!(!registry.is_current(&old));
        assert!(registry.is_current(&new));
        assert_eq!(
            old_rx.recv().await,
            Some(Outbound::Close(CloseReason::Superseded))
        );
        tokio::time::timeout(std::time::Duration::from_secs(1), old.evicted())
            .await
            .unwrap();

        registry.broadcast("alice", "to the new one");
        assert_eq!(texts(&mut new_rx), vec!["to the new one"]);
        assert!(old_rx.try_recv().is_err());
    }

    #[test]
    fn stale_cleanup_does_not_evict_replacement() {
        let registry = ConnectionRegistry::new();
        let (old, _old_rx) = connect(&registry, "alice");
        let (new, _new_rx) = connect(&registry, "alice");

        assert!(!registry.unregister_connection(&old));
        assert!(registry.is_current(&new));
        assert!(registry.unregister_connection(&new));
        assert!(registry.is_empty());
    }

    #[test]
    fn reject_policy_keeps_existing_connection() {
        let registry = ConnectionRegistry::with_policy(DuplicatePolicy::Reject);
        let (first, _rx1) = connect(&registry, "alice");
        let (second, _rx2) = ConnectionHandle::channel("alice", 4);

        assert_eq!(
            registry.register(second),
            Err(RegisterError::Duplicate("alice".to_string()))
        );
        assert!(registry.is_current(&first));
    }

    #[test]
    fn reject_policy_allows_replacing_dead_entry() {
        let registry = ConnectionRegistry::with_policy(DuplicatePolicy::Reject);
        let (_first, rx1) = connect(&registry, "alice");
        drop(rx1);
        let (second, _rx2) = ConnectionHandle::channel("alice", 4);
        registry.register(second.clone()).unwrap();
        assert!(registry.is_current(&second));
    }

    #[test]
    fn broadcast_from_superseded_handle_returns_none() {
        let registry = ConnectionRegistry::new();
        let (old, _old_rx) = connect(&registry, "alice");
        let (_new, mut new_rx) = connect(&registry, "alice");

        assert!(registry.broadcast_from(&old, "stale").is_none());
        assert!(texts(&mut new_rx).is_empty());
    }

    #[test]
    fn broadcast_all_reaches_everyone() {
        let registry = ConnectionRegistry::new();
        let (_a, mut ra) = connect(&registry, "alice");
        let (_b, mut rb) = connect(&registry, "bob");
        let report = registry.broadcast_all("notice");
        assert_eq!(report.delivered, 2);
        assert_eq!(texts(&mut ra), vec!["notice"]);
        assert_eq!(texts(&mut rb), vec!["notice"]);
    }

    #[tokio::test]
    async fn close_all_drains_registry() {
        let registry = ConnectionRegistry::new();
        let (_a, mut ra) = connect(&registry, "alice");
        let (_b, _rb) = connect(&registry, "bob");
        assert_eq!(registry.close_all(CloseReason::Shutdown), 2);
        assert!(registry.is_empty());
        assert_eq!(ra.recv().await, Some(Outbound::Close(CloseReason::Shutdown)));
    }

    #[test]
    fn duplicate_policy_parses() {
        assert_eq!("Replace".parse(), Ok(DuplicatePolicy::Replace));
        assert_eq!(" reject ".parse(), Ok(DuplicatePolicy::Reject));
        assert!("drop".parse::<DuplicatePolicy>().is_err());
    }
}
