//! WebSocket command server.

use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use a11y_inspector_core::CaptureKind;
use a11y_inspector_ipc::Command;
use a11y_inspector_ipc::parse_command_frame;
use a11y_inspector_ipc::pong_frame;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::Message;
use axum::extract::ws::WebSocket;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use axum::routing::get;
use futures_util::SinkExt;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::capture_worker::CaptureQueue;
use crate::connections::ConnectionId;
use crate::connections::ConnectionRegistry;
use crate::error::DaemonError;

pub const SERVER_THREAD_NAME: &str = "inspector-server";

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const READY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct ServerState {
    registry: Arc<ConnectionRegistry>,
    captures: CaptureQueue,
    ws_queue_capacity: usize,
    shutdown_rx: watch::Receiver<bool>,
}

pub(crate) struct ServerHandle {
    pub local_addr: SocketAddr,
    pub join: thread::JoinHandle<()>,
}

pub(crate) fn bind_listener(listen: &str) -> Result<std::net::TcpListener, DaemonError> {
    let addr = listen
        .to_socket_addrs()
        .map_err(|e| DaemonError::InvalidListen {
            addr: listen.to_string(),
            message: e.to_string(),
        })?
        .next()
        .ok_or_else(|| DaemonError::InvalidListen {
            addr: listen.to_string(),
            message: "no resolved address".to_string(),
        })?;

    let listener = std::net::TcpListener::bind(addr).map_err(|source| DaemonError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| DaemonError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    Ok(listener)
}

/// Runs the server on its own thread and multi-thread runtime.
///
/// `relay`, when present, runs alongside the server in the same runtime and
/// stops with it.
pub(crate) fn spawn_server<R>(
    listener: std::net::TcpListener,
    registry: Arc<ConnectionRegistry>,
    captures: CaptureQueue,
    ws_queue_capacity: usize,
    shutdown_rx: watch::Receiver<bool>,
    relay: Option<R>,
) -> Result<ServerHandle, DaemonError>
where
    R: std::future::Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr().map_err(|source| DaemonError::Bind {
        addr: "listener".to_string(),
        source,
    })?;
    let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), DaemonError>>();

    let state = ServerState {
        registry,
        captures,
        ws_queue_capacity: ws_queue_capacity.max(1),
        shutdown_rx: shutdown_rx.clone(),
    };

    let join = thread::Builder::new()
        .name(SERVER_THREAD_NAME.to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("inspector-io")
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ready_tx.send(Err(DaemonError::Runtime(e.to_string())));
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        let _ = ready_tx.send(Err(DaemonError::Runtime(e.to_string())));
                        return;
                    }
                };
                let relay_task = relay.map(tokio::spawn);
                let _ = ready_tx.send(Ok(()));
                info!(listen = %local_addr, "Inspector server started");

                let mut shutdown_server = shutdown_rx.clone();
                let mut shutdown_wait = shutdown_rx;
                let server = axum::serve(listener, build_router(state))
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_server.changed().await;
                    });
                let mut server_task = tokio::spawn(async move { server.await });

                tokio::select! {
                    joined = &mut server_task => {
                        if let Err(err) = joined {
                            error!(error = %err, "Inspector server task failed");
                        }
                    }
                    _ = shutdown_wait.changed() => {
                        match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server_task).await {
                            Ok(Err(err)) => error!(error = %err, "Inspector server task failed"),
                            Ok(Ok(_)) => {}
                            Err(_) => {
                                warn!(
                                    timeout_ms = SHUTDOWN_TIMEOUT.as_millis() as u64,
                                    "Inspector server shutdown timed out; aborting"
                                );
                                server_task.abort();
                            }
                        }
                    }
                }

                if let Some(relay_task) = relay_task {
                    relay_task.abort();
                }
                info!(listen = %local_addr, "Inspector server stopped");
            });
        })
        .map_err(|source| DaemonError::ThreadSpawn {
            name: SERVER_THREAD_NAME,
            source,
        })?;

    match ready_rx.recv_timeout(READY_TIMEOUT) {
        Ok(Ok(())) => Ok(ServerHandle { local_addr, join }),
        Ok(Err(err)) => Err(err),
        Err(e) => Err(DaemonError::Runtime(e.to_string())),
    }
}

fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .with_state(Arc::new(state))
}

async fn ws_handler(State(state): State<Arc<ServerState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(state.ws_queue_capacity);
    let id = state.registry.register(outbound_tx);
    info!(connection = id, open = state.registry.len(), "Client connected");

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    let mut shutdown_rx = state.shutdown_rx.clone();
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            message = stream.next() => {
                let message = match message {
                    Some(Ok(message)) => message,
                    Some(Err(err)) => {
                        debug!(connection = id, error = %err, "Connection error");
                        break;
                    }
                    None => break,
                };
                match message {
                    Message::Text(text) => handle_text(&state, id, &text),
                    Message::Binary(bytes) => {
                        debug!(connection = id, bytes = bytes.len(), "Ignoring binary frame");
                    }
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
        }
    }

    // Dropping the registry's sender lets the writer flush and send Close.
    state.registry.unregister(id);
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    info!(connection = id, open = state.registry.len(), "Client disconnected");
}

fn handle_text(state: &ServerState, id: ConnectionId, text: &str) {
    let command = match parse_command_frame(text) {
        Ok(command) => command,
        Err(err) => {
            warn!(connection = id, error = %err, "Ignoring frame");
            return;
        }
    };
    debug!(connection = id, command = command.as_str(), "Command received");

    let kind = match command {
        Command::Ping => {
            state.registry.send_to(id, pong_frame());
            return;
        }
        Command::Capture => CaptureKind::Standard,
        Command::CaptureNotImportant => CaptureKind::NotImportant,
    };
    if let Err(err) = state.captures.request(kind) {
        warn!(connection = id, error = %err, "Capture not queued");
    }
}
