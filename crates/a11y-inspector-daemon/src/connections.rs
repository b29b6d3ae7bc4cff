//! Open WebSocket connections.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use a11y_inspector_common::mutex_lock_or_recover;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::warn;

pub type ConnectionId = u64;

/// Outbound text queues keyed by connection.
///
/// Each connection's writer task drains its own bounded queue, so sending
/// never blocks and works from any thread. A connection whose queue is full
/// is not keeping up and is dropped from the registry; its writer then
/// flushes what it has and closes the socket.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: Mutex<HashMap<ConnectionId, Sender<String>>>,
}

fn try_deliver(id: ConnectionId, outbound: &Sender<String>, frame: String) -> bool {
    match outbound.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(frame)) => {
            warn!(
                connection = id,
                bytes = frame.len(),
                "Outbound queue full; dropping connection"
            );
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, outbound: Sender<String>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        mutex_lock_or_recover(&self.connections).insert(id, outbound);
        id
    }

    pub fn unregister(&self, id: ConnectionId) {
        mutex_lock_or_recover(&self.connections).remove(&id);
    }

    pub fn len(&self) -> usize {
        mutex_lock_or_recover(&self.connections).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues `frame` for one connection; a closed or stalled connection is
    /// dropped.
    pub fn send_to(&self, id: ConnectionId, frame: String) -> bool {
        let Some(outbound) = mutex_lock_or_recover(&self.connections).get(&id).cloned() else {
            return false;
        };
        if try_deliver(id, &outbound, frame) {
            return true;
        }
        self.unregister(id);
        false
    }

    /// Queues `frame` on every open connection and returns how many took it.
    ///
    /// The map is snapshotted under the lock and sent to outside it; any
    /// connection whose queue is gone or full is removed afterwards.
    pub fn broadcast(&self, frame: &str) -> usize {
        let targets: Vec<(ConnectionId, Sender<String>)> =
            mutex_lock_or_recover(&self.connections)
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, outbound) in targets {
            if try_deliver(id, &outbound, frame.to_string()) {
                delivered += 1;
            } else {
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            let mut connections = mutex_lock_or_recover(&self.connections);
            for id in &closed {
                connections.remove(id);
            }
            debug!(removed = closed.len(), "Dropped closed or stalled connections");
        }
        delivered
    }
}
