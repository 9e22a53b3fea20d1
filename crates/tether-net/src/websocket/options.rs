//! Socket options.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::positive_secs;

/// Default number of automatic reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// WebSocket scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketProtocol {
    /// Plain `ws://`.
    #[default]
    Ws,
    /// TLS `wss://`.
    Wss,
}

impl SocketProtocol {
    /// The scheme string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }
}

impl fmt::Display for SocketProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to open one socket.
///
/// # Example
///
/// ```
/// use tether_net::websocket::{SocketOptions, SocketProtocol};
///
/// let options = SocketOptions::new(SocketProtocol::Wss, "wss://chat.example.com/live")
///     .header("Authorization", "Bearer token")
///     .reconnect(2.0, 5);
/// assert!(options.reconnect_delay().is_some());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketOptions {
    /// Scheme used when `url` has none.
    pub protocol: SocketProtocol,
    /// Server URL.
    pub url: String,
    /// Extra handshake headers.
    pub headers: HashMap<String, String>,
    /// Delay before an automatic reconnect, in seconds. Zero or negative
    /// disables reconnecting.
    pub reconnect_timeout_secs: f64,
    /// Maximum number of automatic reconnect attempts.
    pub max_reconnect_attempts: u32,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            protocol: SocketProtocol::Ws,
            url: String::new(),
            headers: HashMap::new(),
            reconnect_timeout_secs: 0.0,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl SocketOptions {
    /// Options for `url` with reconnecting disabled.
    pub fn new(protocol: SocketProtocol, url: impl Into<String>) -> Self {
        Self {
            protocol,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add or replace a handshake header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Enable automatic reconnects after `timeout_secs`, at most `max_attempts` times.
    pub fn reconnect(mut self, timeout_secs: f64, max_attempts: u32) -> Self {
        self.reconnect_timeout_secs = timeout_secs;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// The reconnect delay, if reconnecting is enabled.
    pub fn reconnect_delay(&self) -> Option<Duration> {
        positive_secs(self.reconnect_timeout_secs)
    }
}
