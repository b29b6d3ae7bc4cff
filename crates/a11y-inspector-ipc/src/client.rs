//! Blocking WebSocket client.

use std::io;
use std::net::Shutdown;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::time::Duration;

use tracing::debug;
use tungstenite::Message;
use tungstenite::WebSocket;
use tungstenite::client::IntoClientRequest;
use url::Url;

use crate::error::ClientError;
use crate::protocol::CaptureReply;
use crate::protocol::Command;
use crate::protocol::ServerFrame;

pub const DEFAULT_PORT: u16 = 38301;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

pub fn default_url() -> String {
    format!("ws://127.0.0.1:{DEFAULT_PORT}/")
}

fn ws_error_to_client(err: tungstenite::Error) -> ClientError {
    match err {
        tungstenite::Error::Io(io_err)
            if matches!(
                io_err.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) =>
        {
            ClientError::Timeout
        }
        tungstenite::Error::Io(io_err) => ClientError::ConnectionFailed(io_err),
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            ClientError::Closed
        }
        other => ClientError::UnexpectedResponse {
            message: format!("websocket error: {other}"),
        },
    }
}

fn connect_socket(url: &Url) -> Result<WebSocket<TcpStream>, ClientError> {
    if url.scheme() != "ws" {
        return Err(ClientError::InvalidUrl {
            message: format!(
                "unsupported scheme '{}'; only ws:// is supported",
                url.scheme()
            ),
        });
    }
    let host = url.host_str().ok_or_else(|| ClientError::InvalidUrl {
        message: "URL is missing a host".to_string(),
    })?;
    let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| ClientError::InvalidUrl {
            message: format!("failed to resolve '{host}:{port}'"),
        })?;

    let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
    stream.set_nodelay(true)?;

    let request = url
        .as_str()
        .into_client_request()
        .map_err(|err| ClientError::InvalidUrl {
            message: err.to_string(),
        })?;
    let (mut socket, _response) =
        tungstenite::client::client(request, stream).map_err(|err| match err {
            tungstenite::HandshakeError::Failure(ws_err) => ws_error_to_client(ws_err),
            tungstenite::HandshakeError::Interrupted(_) => ClientError::UnexpectedResponse {
                message: "websocket handshake interrupted".to_string(),
            },
        })?;
    socket.get_mut().set_read_timeout(Some(DEFAULT_READ_TIMEOUT))?;
    socket.get_mut().set_write_timeout(Some(DEFAULT_WRITE_TIMEOUT))?;
    Ok(socket)
}

/// One connection to an inspector server.
///
/// Capture results are broadcast, so [`InspectorClient::capture`] may
/// return a capture another client asked for if it lands first.
pub struct InspectorClient {
    socket: WebSocket<TcpStream>,
}

impl InspectorClient {
    pub fn connect(url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(url).map_err(|err| ClientError::InvalidUrl {
            message: format!("{url}: {err}"),
        })?;
        debug!(url = %parsed, "Connecting to inspector");
        Ok(Self {
            socket: connect_socket(&parsed)?,
        })
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.socket.get_mut().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Sends a raw text frame.
    pub fn send_text(&mut self, text: &str) -> Result<(), ClientError> {
        self.socket
            .send(Message::Text(text.to_string()))
            .map_err(ws_error_to_client)
    }

    pub fn send_command(&mut self, command: Command) -> Result<(), ClientError> {
        self.send_text(&command.to_frame())
    }

    /// Next text frame, or `None` once the server closes the connection.
    pub fn next_text(&mut self) -> Result<Option<String>, ClientError> {
        loop {
            match self.socket.read() {
                Ok(Message::Text(text)) => return Ok(Some(text.to_string())),
                Ok(Message::Close(_)) => return Ok(None),
                Ok(Message::Ping(payload)) => {
                    self.socket
                        .send(Message::Pong(payload))
                        .map_err(ws_error_to_client)?;
                }
                Ok(_) => {}
                Err(tungstenite::Error::ConnectionClosed) => return Ok(None),
                Err(err) => return Err(ws_error_to_client(err)),
            }
        }
    }

    pub fn next_frame(&mut self) -> Result<Option<ServerFrame>, ClientError> {
        match self.next_text()? {
            Some(text) => Ok(Some(ServerFrame::parse(&text)?)),
            None => Ok(None),
        }
    }

    pub fn ping(&mut self) -> Result<(), ClientError> {
        self.send_command(Command::Ping)?;
        loop {
            match self.next_frame()? {
                Some(ServerFrame::Pong) => return Ok(()),
                Some(_) => debug!("Skipping frame while waiting for pong"),
                None => return Err(ClientError::Closed),
            }
        }
    }

    pub fn capture(&mut self, not_important: bool) -> Result<CaptureReply, ClientError> {
        let command = if not_important {
            Command::CaptureNotImportant
        } else {
            Command::Capture
        };
        self.send_command(command)?;
        loop {
            match self.next_frame()? {
                Some(ServerFrame::Capture(reply)) => return Ok(*reply),
                Some(_) => {}
                None => return Err(ClientError::Closed),
            }
        }
    }

    pub fn close(mut self) -> Result<(), ClientError> {
        let _ = self.socket.close(None);
        match self.socket.get_mut().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        assert_eq!(default_url(), "ws://127.0.0.1:38301/");
    }

    #[test]
    fn test_rejects_non_ws_scheme() {
        assert!(matches!(
            InspectorClient::connect("http://127.0.0.1:38301/"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            InspectorClient::connect("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_timeout_maps_from_would_block() {
        let err = ws_error_to_client(tungstenite::Error::Io(io::ErrorKind::WouldBlock.into()));
        assert!(matches!(err, ClientError::Timeout));
        let err = ws_error_to_client(tungstenite::Error::ConnectionClosed);
        assert!(matches!(err, ClientError::Closed));
    }
}
