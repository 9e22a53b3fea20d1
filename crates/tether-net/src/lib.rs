//! HTTP request and WebSocket sessions for Tether.
//!
//! This crate provides the session layer between an application's frame loop
//! and the network:
//!
//! - **Requests**: [`RequestSession`](http::RequestSession) issues one request
//!   at a time with upload/download progress, header callbacks, server-sent
//!   events, a soft timeout and classified failures
//! - **WebSockets**: [`SocketSession`](websocket::SocketSession) keeps a
//!   connection alive across a bounded number of timed reconnects
//! - **Registry**: [`ClientRegistry`] tracks live sessions, ticks them, and
//!   shuts them all down at teardown
//! - **Streaming**: [`ContentBuffer`] and [`SseFrameParser`] for payloads and
//!   event streams
//!
//! # Cooperative model
//!
//! Sessions never block and never call back from another thread. Transports
//! queue notifications; the host calls `tick` once per frame and every signal
//! fires from inside that call:
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tether_core::{Tickable, TimerQueue};
//! use tether_net::ClientRegistry;
//! use tether_net::http::{HttpMethod, ReqwestTransport, RequestOptions, RequestSession};
//!
//! let timers = Arc::new(TimerQueue::new());
//! let registry = Arc::new(ClientRegistry::new());
//!
//! let request = RequestSession::new(Arc::new(ReqwestTransport::new()), registry.clone());
//! request.event.connect(|result| {
//!     println!("event {}: {}", result.event.event.as_text(), result.event.data.as_text());
//! });
//! request.start(RequestOptions::new(HttpMethod::Get, "https://example.com/stream"));
//!
//! loop {
//!     let frame = Duration::from_millis(16);
//!     timers.tick(frame);
//!     registry.tick(frame);
//!     # break;
//! }
//!
//! registry.shutdown_all();
//! ```
//!
//! # Custom transports
//!
//! [`HttpTransport`](http::HttpTransport) and
//! [`SocketTransport`](websocket::SocketTransport) are the engine seams. The
//! bundled implementations use `reqwest` and `tokio-tungstenite` on a shared
//! tokio runtime (see [`runtime`]).

mod config;
mod content;
mod error;
pub mod http;
mod registry;
pub mod runtime;
mod sse;
pub mod websocket;

pub use config::NetConfig;
pub use content::ContentBuffer;
pub use error::{NetworkError, RequestErrorKind, Result, SocketErrorKind};
pub use registry::{ClientRegistry, SessionId};
pub use sse::{ServerSentEvent, SseFrameParser};
