//! Errors raised while reading the platform accessibility tree.

use thiserror::Error;

use crate::platform::NodeId;

/// A failure reported by the host accessibility layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("window {window_id} has no retrievable root node")]
    RootUnavailable { window_id: i32 },
    #[error("node {0} is no longer valid")]
    StaleNode(NodeId),
    #[error("window list unavailable: {0}")]
    WindowsUnavailable(String),
    #[error("host error: {0}")]
    Other(String),
}

impl HostError {
    /// Whether the same call may succeed once the UI settles.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HostError::StaleNode(_) | HostError::WindowsUnavailable(_)
        )
    }
}

/// A capture that could not produce any document.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to enumerate windows: {0}")]
    WindowList(#[source] HostError),
}
