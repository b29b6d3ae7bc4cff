//! Frame shapes.

use a11y_inspector_core::CaptureDocument;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::de::IgnoredAny;
use serde::ser::Error as _;
use serde_json::Value;

use crate::error::ProtocolError;

pub const PONG_MESSAGE: &str = "pong";

/// Client to server frame: `{"message": "<command>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Capture,
    CaptureNotImportant,
    Ping,
}

impl Command {
    /// Matches command names case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        [Self::Capture, Self::CaptureNotImportant, Self::Ping]
            .into_iter()
            .find(|command| command.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::CaptureNotImportant => "captureNotImportant",
            Self::Ping => "ping",
        }
    }

    pub fn to_frame(&self) -> String {
        serde_json::json!({ "message": self.as_str() }).to_string()
    }
}

pub fn parse_command_frame(text: &str) -> Result<Command, ProtocolError> {
    let envelope: CommandEnvelope = serde_json::from_str(text)?;
    Command::parse(&envelope.message).ok_or(ProtocolError::UnknownCommand(envelope.message))
}

pub fn pong_frame() -> String {
    serde_json::json!({ "message": PONG_MESSAGE }).to_string()
}

#[derive(Serialize)]
struct CaptureFrameRef<'a> {
    views: &'a CaptureDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshot: Option<String>,
}

/// `{"views": document}`, plus a base64 `screenshot` when one was taken.
pub fn capture_frame(
    document: &CaptureDocument,
    screenshot_png: Option<&[u8]>,
) -> Result<String, serde_json::Error> {
    let frame = CaptureFrameRef {
        views: document,
        screenshot: screenshot_png.map(|png| BASE64.encode(png)),
    };
    let mut out = Vec::new();
    frame.serialize(serde_stacker::Serializer::new(
        &mut serde_json::Serializer::new(&mut out),
    ))?;
    into_utf8(out)
}

// Capture trees nest two JSON levels per node and can be far deeper than
// serde_json's default limit. Both directions grow the stack on the heap
// instead of recursing on the caller's.

fn into_utf8(out: Vec<u8>) -> Result<String, serde_json::Error> {
    String::from_utf8(out).map_err(serde_json::Error::custom)
}

fn from_str_unbounded<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

/// `None` when there is nothing to say.
pub fn announcement_frame(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(serde_json::json!({ "announcement": text }).to_string())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptureReply {
    pub views: CaptureDocument,
    #[serde(default)]
    pub screenshot: Option<String>,
}

impl CaptureReply {
    pub fn screenshot_png(&self) -> Option<Vec<u8>> {
        self.screenshot
            .as_deref()
            .and_then(|encoded| BASE64.decode(encoded).ok())
    }

    /// The document as indented JSON.
    pub fn views_pretty(&self) -> Result<String, serde_json::Error> {
        let mut out = Vec::new();
        self.views.serialize(serde_stacker::Serializer::new(
            &mut serde_json::Serializer::pretty(&mut out),
        ))?;
        into_utf8(out)
    }
}

/// The top-level keys that decide what kind of frame this is.
#[derive(Default, Deserialize)]
struct FrameHead {
    #[serde(default)]
    views: Option<IgnoredAny>,
    #[serde(default)]
    announcement: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Pong,
    Capture(Box<CaptureReply>),
    Announcement(String),
    Other(Value),
}

impl ServerFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        // Anything that is not an object, or whose known keys have
        // unexpected types, is passed through as `Other`.
        let head = if text.trim_start().starts_with('{') {
            from_str_unbounded::<FrameHead>(text).unwrap_or_default()
        } else {
            FrameHead::default()
        };

        if head.views.is_some() {
            return Ok(Self::Capture(Box::new(from_str_unbounded(text)?)));
        }
        if let Some(announcement) = head.announcement {
            return Ok(Self::Announcement(announcement));
        }
        if head.message.as_deref() == Some(PONG_MESSAGE) {
            return Ok(Self::Pong);
        }
        Ok(Self::Other(from_str_unbounded(text)?))
    }
}
