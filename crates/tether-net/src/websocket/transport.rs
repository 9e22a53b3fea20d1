//! The seam between socket sessions and a WebSocket engine.

use std::collections::HashMap;

use bytes::Bytes;

use super::message::CloseCode;
use super::options::SocketProtocol;
use crate::error::Result;

/// Creates socket connections.
pub trait SocketTransport: Send + Sync {
    /// A new, not yet connected socket.
    ///
    /// Fails when the URL or headers cannot be used.
    fn create_socket(
        &self,
        url: &str,
        protocol: SocketProtocol,
        headers: &HashMap<String, String>,
    ) -> Result<Box<dyn SocketConnection>>;
}

/// One socket as seen by the engine that drives it.
pub trait SocketConnection: Send {
    /// Start the handshake. The outcome arrives as [`SocketEvent::Connected`]
    /// or [`SocketEvent::ConnectionError`].
    fn connect(&mut self);

    /// Send a close frame.
    fn close(&mut self, code: CloseCode, reason: &str);

    /// Send a text frame.
    fn send_text(&mut self, text: &str);

    /// Send `data` as a binary frame, or as a text frame when `is_binary` is false.
    fn send_bytes(&mut self, data: &[u8], is_binary: bool);

    /// Whether the handshake completed and the socket is still open.
    fn is_connected(&self) -> bool;

    /// Next pending notification, if any.
    fn poll_event(&mut self) -> Option<SocketEvent>;
}

/// Notifications produced by a socket, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The handshake completed.
    Connected,
    /// The handshake failed.
    ConnectionError(String),
    /// The connection ended.
    Closed {
        /// Close code.
        code: CloseCode,
        /// Close reason.
        reason: String,
        /// Whether the closing handshake completed.
        was_clean: bool,
    },
    /// A complete text message.
    TextMessage(String),
    /// One fragment of a binary message.
    BinaryMessage {
        /// Fragment payload.
        data: Bytes,
        /// Whether this fragment completes the message.
        is_last: bool,
    },
    /// A text message was written to the wire.
    MessageSent(String),
}
