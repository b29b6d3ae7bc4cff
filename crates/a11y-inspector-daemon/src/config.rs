use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use a11y_inspector_ipc::DEFAULT_PORT;

const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_QUEUE_CAPACITY: usize = 16;
const DEFAULT_WS_QUEUE_CAPACITY: usize = 128;

/// How capture frames travel from the capture thread to the sockets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportVariant {
    /// The capture thread broadcasts plain text itself.
    Direct,
    /// The capture thread hands gzip bytes to a relay task, which decodes
    /// and broadcasts.
    #[default]
    Relay,
}

impl TransportVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Relay => "relay",
        }
    }
}

impl fmt::Display for TransportVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "relay" => Ok(Self::Relay),
            other => Err(format!(
                "unknown transport '{other}'; expected 'direct' or 'relay'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorConfig {
    pub bind: String,
    pub port: u16,
    pub transport: TransportVariant,
    pub screenshot: bool,
    pub queue_capacity: usize,
    /// Frames a connection may have pending before it is dropped.
    pub ws_queue_capacity: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            transport: TransportVariant::default(),
            screenshot: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            ws_queue_capacity: DEFAULT_WS_QUEUE_CAPACITY,
        }
    }
}

impl InspectorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env::var("A11Y_INSPECTOR_BIND")
                .ok()
                .and_then(non_empty)
                .unwrap_or(defaults.bind),
            port: env::var("A11Y_INSPECTOR_PORT")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            transport: env::var("A11Y_INSPECTOR_TRANSPORT")
                .ok()
                .and_then(|v| match v.parse() {
                    Ok(variant) => Some(variant),
                    Err(message) => {
                        warn!(%message, "Ignoring A11Y_INSPECTOR_TRANSPORT");
                        None
                    }
                })
                .unwrap_or(defaults.transport),
            screenshot: env::var("A11Y_INSPECTOR_SCREENSHOT")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.screenshot),
            queue_capacity: env::var("A11Y_INSPECTOR_QUEUE")
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.queue_capacity),
            ws_queue_capacity: env::var("A11Y_INSPECTOR_WS_QUEUE")
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.ws_queue_capacity),
        }
    }

    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_transport(mut self, transport: TransportVariant) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_screenshot(mut self, screenshot: bool) -> Self {
        self.screenshot = screenshot;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_ws_queue_capacity(mut self, capacity: usize) -> Self {
        self.ws_queue_capacity = capacity.max(1);
        self
    }

    pub fn listen_addr(&self) -> String {
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
