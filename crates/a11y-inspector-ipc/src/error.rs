use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("gzip compression failed: {0}")]
    Compress(#[source] io::Error),
    #[error("gzip decompression failed: {0}")]
    Decompress(#[source] io::Error),
    #[error("decompressed payload is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// A client frame the server cannot act on.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed command frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to inspector: {0}")]
    ConnectionFailed(#[from] io::Error),

    #[error("Invalid inspector URL: {message}")]
    InvalidUrl { message: String },

    #[error("Timed out waiting for the inspector")]
    Timeout,

    #[error("Inspector closed the connection")]
    Closed,

    #[error("Invalid frame from inspector: {0}")]
    InvalidFrame(#[from] serde_json::Error),

    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::ConnectionFailed(_) | ClientError::Timeout)
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ClientError::ConnectionFailed(_) => {
                Some("Start the inspector with: a11y-inspector serve")
            }
            ClientError::Timeout => Some("Increase --timeout or check the inspector logs"),
            _ => None,
        }
    }
}
