//! Inspector startup and lifecycle errors.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Invalid listen address '{addr}': {message}")]
    InvalidListen { addr: String, message: String },
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to start network runtime: {0}")]
    Runtime(String),
    #[error("Failed to spawn thread '{name}': {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("Failed to setup signal handler: {0}")]
    SignalSetup(String),
    #[error("Capture queue is full")]
    QueueFull,
    #[error("Inspector is shutting down")]
    ShuttingDown,
}

impl DaemonError {
    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            DaemonError::InvalidListen { .. } => {
                "Use an IP address for --bind, e.g. 127.0.0.1 or 0.0.0.0.".to_string()
            }
            DaemonError::Bind { source, .. } if source.kind() == io::ErrorKind::AddrInUse => {
                "Another inspector may already be running. Stop it or pick a different --port."
                    .to_string()
            }
            DaemonError::Bind { .. } => {
                "Check that the address belongs to this machine and the port is allowed."
                    .to_string()
            }
            DaemonError::Runtime(_) | DaemonError::ThreadSpawn { .. } => {
                "The system may be out of threads or file descriptors.".to_string()
            }
            DaemonError::SignalSetup(_) => {
                "Signal handling is unavailable; stop the inspector with the handle instead."
                    .to_string()
            }
            DaemonError::QueueFull => {
                "A capture is still running. Retry shortly or raise A11Y_INSPECTOR_QUEUE."
                    .to_string()
            }
            DaemonError::ShuttingDown => "Start a new inspector.".to_string(),
        }
    }

    /// Returns whether this error is potentially transient and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            DaemonError::Bind { source, .. } => source.kind() == io::ErrorKind::AddrInUse,
            DaemonError::QueueFull => true,
            _ => false,
        }
    }
}
