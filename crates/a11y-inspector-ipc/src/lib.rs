//! Wire protocol shared by the inspector server and its clients.
//!
//! Clients send `{"message": <command>}` text frames; the server answers with
//! pong, capture and announcement frames. [`codec`] is the gzip layer used
//! between the capture thread and the relay task.

#![deny(clippy::all)]

mod client;
pub mod codec;
mod error;
mod protocol;

pub use client::DEFAULT_PORT;
pub use client::InspectorClient;
pub use client::default_url;
pub use error::ClientError;
pub use error::CodecError;
pub use error::ProtocolError;
pub use protocol::CaptureReply;
pub use protocol::Command;
pub use protocol::CommandEnvelope;
pub use protocol::PONG_MESSAGE;
pub use protocol::ServerFrame;
pub use protocol::announcement_frame;
pub use protocol::capture_frame;
pub use protocol::parse_command_frame;
pub use protocol::pong_frame;

pub type Result<T> = std::result::Result<T, ClientError>;
