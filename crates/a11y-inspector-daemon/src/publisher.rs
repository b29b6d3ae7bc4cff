//! Delivery of server-initiated frames.
//!
//! Capture and announcement frames go through a [`Publisher`]. The direct
//! variant broadcasts in the caller's thread; the relay variant compresses
//! the frame and lets a task in the network runtime decompress and
//! broadcast it.

use std::sync::Arc;

use a11y_inspector_ipc::codec;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use tracing::warn;

use crate::connections::ConnectionRegistry;

pub trait Publisher: Send + Sync {
    /// Returns false when the frame was dropped before reaching the registry.
    fn publish(&self, frame: String) -> bool;
}

pub struct DirectPublisher {
    registry: Arc<ConnectionRegistry>,
}

impl DirectPublisher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

impl Publisher for DirectPublisher {
    fn publish(&self, frame: String) -> bool {
        let delivered = self.registry.broadcast(&frame);
        debug!(bytes = frame.len(), delivered, "Broadcast frame");
        true
    }
}

pub struct RelayPublisher {
    relay: UnboundedSender<Vec<u8>>,
}

impl RelayPublisher {
    pub fn new(relay: UnboundedSender<Vec<u8>>) -> Self {
        Self { relay }
    }
}

impl Publisher for RelayPublisher {
    fn publish(&self, frame: String) -> bool {
        let compressed = match codec::encode(&frame) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "Failed to compress frame; skipping broadcast");
                return false;
            }
        };
        debug!(
            bytes = frame.len(),
            compressed = compressed.len(),
            "Queued frame for relay"
        );
        if self.relay.send(compressed).is_err() {
            warn!("Relay is gone; skipping broadcast");
            return false;
        }
        true
    }
}

/// Decodes relayed frames and broadcasts them until every sender is gone.
pub async fn run_relay(mut inbound: UnboundedReceiver<Vec<u8>>, registry: Arc<ConnectionRegistry>) {
    while let Some(bytes) = inbound.recv().await {
        match codec::decode(&bytes) {
            Ok(frame) => {
                let delivered = registry.broadcast(&frame);
                debug!(bytes = frame.len(), delivered, "Relayed frame");
            }
            Err(err) => warn!(error = %err, "Failed to decode relayed frame; skipping broadcast"),
        }
    }
    debug!("Relay stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::channel;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_direct_publisher_broadcasts_plain_text() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, mut rx) = channel(8);
        registry.register(tx);

        assert!(DirectPublisher::new(Arc::clone(&registry)).publish("{\"a\":1}".into()));
        assert_eq!(rx.try_recv().unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_relay_round_trip_and_bad_payload_skipped() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (conn_tx, mut conn_rx) = channel(8);
        registry.register(conn_tx);

        let (relay_tx, relay_rx) = unbounded_channel();
        let relay = tokio::spawn(run_relay(relay_rx, Arc::clone(&registry)));

        relay_tx.send(b"not gzip".to_vec()).unwrap();
        let publisher = RelayPublisher::new(relay_tx);
        assert!(publisher.publish("{\"views\":{\"children\":[]}}".into()));
        drop(publisher);
        relay.await.unwrap();

        assert_eq!(conn_rx.recv().await.unwrap(), "{\"views\":{\"children\":[]}}");
        assert!(conn_rx.try_recv().is_err());
    }

    #[test]
    fn test_relay_publisher_reports_missing_relay() {
        let (relay_tx, relay_rx) = unbounded_channel();
        drop(relay_rx);
        assert!(!RelayPublisher::new(relay_tx).publish("x".into()));
    }
}
