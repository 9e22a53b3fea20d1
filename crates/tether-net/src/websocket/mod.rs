//! WebSocket sessions with timed reconnects.
//!
//! A [`SocketSession`] wraps one connection:
//! - `ws://` and `wss://` with custom handshake headers
//! - Text and binary messages, with binary fragments reassembled
//! - Automatic reconnects on the host [`Scheduler`](tether_core::Scheduler),
//!   bounded by a retry budget
//! - Signal-based event delivery from the session's `tick`

mod message;
mod options;
mod session;
mod transport;
mod tungstenite_transport;

pub use message::{CloseCode, SocketClosed, SocketState};
pub use options::{DEFAULT_MAX_RECONNECT_ATTEMPTS, SocketOptions, SocketProtocol};
pub use session::SocketSession;
pub use transport::{SocketConnection, SocketEvent, SocketTransport};
pub use tungstenite_transport::TungsteniteTransport;
