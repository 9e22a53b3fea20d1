//! Error types for the networking module.
//!
//! [`NetworkError`] is what transports and configuration loading return.
//! Sessions never surface it directly: they fold failures into
//! [`RequestErrorKind`] / [`SocketErrorKind`] and report them through their
//! failure signals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Network-specific errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// HTTP request failed.
    #[error("HTTP request error: {0}")]
    Request(String),
    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// Connection refused or failed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
    /// Request was cancelled.
    #[error("Request was cancelled")]
    Cancelled,
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),
    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for NetworkError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for NetworkError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for NetworkError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<toml::de::Error> for NetworkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for NetworkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::Io(io) => Self::Connection(io.to_string()),
            WsError::Url(url) => Self::InvalidUrl(url.to_string()),
            other => Self::WebSocket(other.to_string()),
        }
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Classified failure of a request session.
///
/// Reported through `RequestSession::failed` alongside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RequestErrorKind {
    /// No error recorded.
    #[default]
    None,
    /// Missing URL, unresolvable content type, or unusable request.
    InvalidRequest,
    /// The request body could not be prepared (e.g. unreadable file).
    InvalidBody,
    /// The transport failed without producing a response.
    InvalidResponse,
    /// Network-level failure.
    Connection,
    /// The soft timeout elapsed.
    TimedOut,
    /// The request was cancelled.
    Canceled,
    /// Any other failure.
    FailedRequest,
}

impl RequestErrorKind {
    /// Human-readable name of the error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::InvalidRequest => "Invalid Request",
            Self::InvalidBody => "Invalid Body",
            Self::InvalidResponse => "Invalid Response",
            Self::Connection => "Connection Error",
            Self::TimedOut => "Timed Out",
            Self::Canceled => "Canceled",
            Self::FailedRequest => "Failed Request",
        }
    }
}

impl fmt::Display for RequestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure of a socket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SocketErrorKind {
    /// No error recorded.
    #[default]
    None,
    /// Socket-layer error.
    Connection,
}

impl fmt::Display for SocketErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Connection => f.write_str("Connection Error"),
        }
    }
}
