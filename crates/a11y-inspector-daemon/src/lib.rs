//! The inspector server.
//!
//! [`spawn_inspector`] starts two threads: `inspector-server`, a tokio
//! runtime serving WebSocket clients, and `inspector-capture`, which builds
//! the accessibility host and runs captures one at a time. Commands cross
//! from the first to the second through a bounded queue; results come back
//! through the configured [`Publisher`].

#![deny(clippy::all)]

mod capture_worker;
mod config;
mod connections;
mod error;
mod publisher;
mod server;
#[cfg(unix)]
mod signal_handler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use a11y_inspector_core::AccessibilityHost;
use a11y_inspector_core::CaptureKind;
use a11y_inspector_ipc::announcement_frame;
use tokio::sync::mpsc::unbounded_channel;
use tokio::sync::watch;
use tracing::info;
use tracing::warn;

pub use capture_worker::CAPTURE_THREAD_NAME;
pub use capture_worker::CaptureQueue;
pub use config::InspectorConfig;
pub use config::TransportVariant;
pub use connections::ConnectionId;
pub use connections::ConnectionRegistry;
pub use error::DaemonError;
pub use publisher::DirectPublisher;
pub use publisher::Publisher;
pub use publisher::RelayPublisher;
pub use server::SERVER_THREAD_NAME;
#[cfg(unix)]
pub use signal_handler::SignalHandler;

use capture_worker::CaptureWorker;
use publisher::run_relay;

pub type Result<T> = std::result::Result<T, DaemonError>;

/// A running inspector. Dropping it shuts everything down.
pub struct InspectorHandle {
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    publisher: Arc<dyn Publisher>,
    captures: Option<CaptureQueue>,
    shutdown_tx: watch::Sender<bool>,
    server_join: Option<thread::JoinHandle<()>>,
    capture_join: Option<thread::JoinHandle<()>>,
}

impl InspectorHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn url(&self) -> String {
        format!("ws://{}/", self.local_addr)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Broadcasts `{"announcement": text}`. Blank text is not sent.
    pub fn announce(&self, text: &str) -> bool {
        match announcement_frame(text) {
            Some(frame) => self.publisher.publish(frame),
            None => false,
        }
    }

    /// Queues a capture as if a client had asked for one.
    pub fn request_capture(&self, kind: CaptureKind) -> Result<()> {
        match &self.captures {
            Some(captures) => captures.request(kind),
            None => Err(DaemonError::ShuttingDown),
        }
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(join) = self.server_join.take() {
            if join.join().is_err() {
                warn!("Inspector server thread panicked");
            }
        }
        // The server's queue handles are gone with its runtime; dropping
        // ours ends the capture loop after any in-flight capture.
        self.captures = None;
        if let Some(join) = self.capture_join.take() {
            if join.join().is_err() {
                warn!("Capture thread panicked");
            }
        }
        info!(listen = %self.local_addr, "Inspector stopped");
    }
}

impl Drop for InspectorHandle {
    fn drop(&mut self) {
        if self.server_join.is_some() || self.capture_join.is_some() {
            self.stop();
        }
    }
}

/// Binds the listener and starts the server and capture threads.
///
/// `host_factory` runs on the capture thread, so the host itself never has
/// to be `Send`.
pub fn spawn_inspector<F, H>(config: InspectorConfig, host_factory: F) -> Result<InspectorHandle>
where
    F: FnOnce() -> H + Send + 'static,
    H: AccessibilityHost,
{
    let listener = server::bind_listener(&config.listen_addr())?;
    let registry = Arc::new(ConnectionRegistry::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (publisher, relay) = match config.transport {
        TransportVariant::Direct => {
            let publisher: Arc<dyn Publisher> =
                Arc::new(DirectPublisher::new(Arc::clone(&registry)));
            (publisher, None)
        }
        TransportVariant::Relay => {
            let (relay_tx, relay_rx) = unbounded_channel();
            let publisher: Arc<dyn Publisher> = Arc::new(RelayPublisher::new(relay_tx));
            (publisher, Some(run_relay(relay_rx, Arc::clone(&registry))))
        }
    };

    let (captures, requests) = CaptureQueue::bounded(config.queue_capacity);
    let capture_join = CaptureWorker {
        publisher: Arc::clone(&publisher),
        screenshot: config.screenshot,
    }
    .spawn(host_factory, requests)?;

    let server = match server::spawn_server(
        listener,
        Arc::clone(&registry),
        captures.clone(),
        config.ws_queue_capacity,
        shutdown_rx,
        relay,
    ) {
        Ok(server) => server,
        Err(err) => {
            drop(captures);
            let _ = capture_join.join();
            return Err(err);
        }
    };

    info!(
        listen = %server.local_addr,
        transport = %config.transport,
        screenshot = config.screenshot,
        queue = config.queue_capacity,
        ws_queue = config.ws_queue_capacity,
        "Inspector ready"
    );

    Ok(InspectorHandle {
        local_addr: server.local_addr,
        registry,
        publisher,
        captures: Some(captures),
        shutdown_tx,
        server_join: Some(server.join),
        capture_join: Some(capture_join),
    })
}
