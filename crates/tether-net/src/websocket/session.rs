//! A WebSocket connection with a timed reconnect budget.

use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tether_core::{Scheduler, Signal, Tickable, TimerId};
use tether_core::logging::targets;

use super::message::{CloseCode, SocketClosed, SocketState};
use super::options::SocketOptions;
use super::transport::{SocketConnection, SocketEvent, SocketTransport};
use crate::error::SocketErrorKind;
use crate::registry::{ClientRegistry, SessionId};

struct SocketInner {
    state: SocketState,
    socket: Option<Box<dyn SocketConnection>>,
    options: SocketOptions,
    /// Fragments of the binary message being assembled.
    buffer: BytesMut,
    reconnect_attempts: u32,
    reconnect_timer: Option<TimerId>,
    last_error: SocketErrorKind,
}

impl SocketInner {
    fn is_connected(&self) -> bool {
        self.socket.as_ref().is_some_and(|socket| socket.is_connected())
    }
}

enum Emission {
    Connected,
    ConnectionError(String),
    Closed(SocketClosed),
    Text(String),
    Binary(Bytes),
    Sent(String),
}

/// One WebSocket connection that survives reconnect attempts.
///
/// After a connection error the session waits `reconnect_timeout_secs` on the
/// host [`Scheduler`], then opens again with the same options, up to
/// `max_reconnect_attempts` times. The attempt counter resets only when a
/// connection succeeds.
///
/// Socket notifications are delivered from [`tick`](Tickable::tick).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tether_core::{Tickable, TimerQueue};
/// use tether_net::ClientRegistry;
/// use tether_net::websocket::{SocketOptions, SocketProtocol, SocketSession, TungsteniteTransport};
///
/// let timers = Arc::new(TimerQueue::new());
/// let registry = Arc::new(ClientRegistry::new());
/// let socket = SocketSession::new(Arc::new(TungsteniteTransport::new()), timers.clone(), registry.clone());
///
/// socket.text_message.connect(|text| println!("<- {text}"));
/// socket.connection_retry.connect(|attempt| println!("retry #{attempt}"));
///
/// socket.open(SocketOptions::new(SocketProtocol::Wss, "wss://echo.example.com").reconnect(2.0, 3));
///
/// // In the host's frame loop:
/// let frame = Duration::from_millis(16);
/// timers.tick(frame);
/// registry.tick(frame);
/// ```
pub struct SocketSession {
    id: SessionId,
    transport: Arc<dyn SocketTransport>,
    scheduler: Arc<dyn Scheduler>,
    registry: Arc<ClientRegistry>,
    self_ref: Weak<SocketSession>,
    inner: Mutex<SocketInner>,

    /// Emitted when the handshake completes.
    pub connected: Signal<()>,
    /// Emitted for each text message.
    pub text_message: Signal<String>,
    /// Emitted for each fully assembled binary message.
    pub binary_message: Signal<Bytes>,
    /// Emitted when the connection ends.
    pub closed: Signal<SocketClosed>,
    /// Emitted when connecting fails.
    pub connection_error: Signal<String>,
    /// Emitted with the attempt number before each automatic reconnect.
    pub connection_retry: Signal<u32>,
    /// Emitted when a text message was written.
    pub message_sent: Signal<String>,
}

impl SocketSession {
    /// Create a disconnected session.
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        scheduler: Arc<dyn Scheduler>,
        registry: Arc<ClientRegistry>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id: SessionId::next(),
            transport,
            scheduler,
            registry,
            self_ref: self_ref.clone(),
            inner: Mutex::new(SocketInner {
                state: SocketState::Disconnected,
                socket: None,
                options: SocketOptions::default(),
                buffer: BytesMut::new(),
                reconnect_attempts: 0,
                reconnect_timer: None,
                last_error: SocketErrorKind::None,
            }),
            connected: Signal::new(),
            text_message: Signal::new(),
            binary_message: Signal::new(),
            closed: Signal::new(),
            connection_error: Signal::new(),
            connection_retry: Signal::new(),
            message_sent: Signal::new(),
        })
    }

    /// This session's identity in the registry.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current connection state.
    pub fn state(&self) -> SocketState {
        self.inner.lock().state
    }

    /// Whether the socket is open.
    pub fn is_connected(&self) -> bool {
        self.inner.lock().is_connected()
    }

    /// Automatic reconnect attempts since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().reconnect_attempts
    }

    /// Whether a reconnect is waiting on the scheduler.
    pub fn is_reconnect_pending(&self) -> bool {
        let inner = self.inner.lock();
        inner
            .reconnect_timer
            .is_some_and(|timer| self.scheduler.is_pending(timer))
    }

    /// The most recent socket-level failure.
    pub fn last_error(&self) -> SocketErrorKind {
        self.inner.lock().last_error
    }

    /// Start connecting.
    ///
    /// Returns `false` if the socket is already connected or cannot be
    /// created. `true` means the handshake was started, not that it
    /// succeeded.
    pub fn open(&self, options: SocketOptions) -> bool {
        let mut inner = self.inner.lock();
        if inner.is_connected() {
            tracing::warn!(target: targets::WEBSOCKET, id = %self.id, "socket is already open");
            return false;
        }

        if let Some(timer) = inner.reconnect_timer.take() {
            self.scheduler.cancel(timer);
        }

        let created = self
            .transport
            .create_socket(&options.url, options.protocol, &options.headers);
        let mut socket = match created {
            Ok(socket) => socket,
            Err(err) => {
                tracing::warn!(
                    target: targets::WEBSOCKET,
                    id = %self.id,
                    url = %options.url,
                    error = %err,
                    "failed to create socket"
                );
                return false;
            }
        };

        socket.connect();
        tracing::debug!(target: targets::WEBSOCKET, id = %self.id, url = %options.url, "connecting");

        inner.socket = Some(socket);
        inner.options = options;
        inner.state = SocketState::Connecting;
        drop(inner);

        if let Some(this) = self.self_ref.upgrade() {
            self.registry.register_socket(&this);
        }
        true
    }

    /// Send a close frame.
    ///
    /// Any pending reconnect is cancelled whether or not the socket is open.
    /// Returns whether a close frame was sent. The `closed` signal follows
    /// once the peer answers.
    pub fn close(&self, code: CloseCode, reason: &str) -> bool {
        let mut inner = self.inner.lock();
        let pending_retry = match inner.reconnect_timer.take() {
            Some(timer) => self.scheduler.cancel(timer),
            None => false,
        };

        let connected = inner.is_connected();
        if connected {
            if let Some(socket) = inner.socket.as_mut() {
                socket.close(code, reason);
            }
        } else if pending_retry {
            // The failed socket has nothing left to deliver.
            inner.socket = None;
        }
        inner.buffer.clear();
        if connected || pending_retry {
            inner.state = SocketState::Disconnected;
        }
        drop(inner);

        if connected || pending_retry {
            tracing::debug!(target: targets::WEBSOCKET, id = %self.id, code = code.as_u16(), "closing");
            self.registry.unregister_socket(self.id);
        }
        connected
    }

    /// Close with [`CloseCode::Normal`] and no reason.
    pub fn close_normal(&self) -> bool {
        self.close(CloseCode::Normal, "")
    }

    /// Send a text message. Returns `false` when not connected.
    pub fn send_text(&self, text: &str) -> bool {
        let mut inner = self.inner.lock();
        if !inner.is_connected() {
            return false;
        }
        match inner.socket.as_mut() {
            Some(socket) => {
                socket.send_text(text);
                true
            }
            None => false,
        }
    }

    /// Send raw bytes, as a binary frame when `is_binary` is set. Returns
    /// `false` when not connected.
    pub fn send_bytes(&self, data: &[u8], is_binary: bool) -> bool {
        let mut inner = self.inner.lock();
        if !inner.is_connected() {
            return false;
        }
        match inner.socket.as_mut() {
            Some(socket) => {
                socket.send_bytes(data, is_binary);
                true
            }
            None => false,
        }
    }

    /// Drain one socket event. Returns `false` when none was pending.
    fn dispatch_next(&self) -> bool {
        let mut unregister = false;
        let emission = {
            let mut inner = self.inner.lock();
            let Some(event) = inner.socket.as_mut().and_then(|s| s.poll_event()) else {
                return false;
            };

            match event {
                SocketEvent::Connected => {
                    inner.buffer.clear();
                    inner.reconnect_attempts = 0;
                    inner.last_error = SocketErrorKind::None;
                    if let Some(timer) = inner.reconnect_timer.take() {
                        self.scheduler.cancel(timer);
                    }
                    inner.state = SocketState::Connected;
                    tracing::debug!(target: targets::WEBSOCKET, id = %self.id, "connected");
                    Some(Emission::Connected)
                }
                SocketEvent::ConnectionError(reason) => {
                    inner.buffer.clear();
                    inner.last_error = SocketErrorKind::Connection;
                    unregister = !self.schedule_reconnect(&mut inner);
                    if unregister {
                        inner.socket = None;
                        inner.state = SocketState::Disconnected;
                    }
                    tracing::warn!(target: targets::WEBSOCKET, id = %self.id, %reason, "connection error");
                    Some(Emission::ConnectionError(reason))
                }
                SocketEvent::Closed {
                    code,
                    reason,
                    was_clean,
                } => {
                    inner.buffer.clear();
                    inner.socket = None;
                    if inner.reconnect_timer.is_none() {
                        inner.state = SocketState::Disconnected;
                    }
                    unregister = true;
                    tracing::debug!(
                        target: targets::WEBSOCKET,
                        id = %self.id,
                        code = code.as_u16(),
                        was_clean,
                        "closed"
                    );
                    Some(Emission::Closed(SocketClosed {
                        code,
                        reason,
                        was_clean,
                    }))
                }
                SocketEvent::TextMessage(text) => Some(Emission::Text(text)),
                SocketEvent::BinaryMessage { data, is_last } => {
                    inner.buffer.extend_from_slice(&data);
                    is_last.then(|| Emission::Binary(inner.buffer.split().freeze()))
                }
                SocketEvent::MessageSent(text) => Some(Emission::Sent(text)),
            }
        };

        if unregister {
            self.registry.unregister_socket(self.id);
        }

        match emission {
            Some(Emission::Connected) => self.connected.emit(()),
            Some(Emission::ConnectionError(reason)) => self.connection_error.emit(reason),
            Some(Emission::Closed(closed)) => self.closed.emit(closed),
            Some(Emission::Text(text)) => self.text_message.emit(text),
            Some(Emission::Binary(data)) => self.binary_message.emit(data),
            Some(Emission::Sent(text)) => self.message_sent.emit(text),
            None => {}
        }
        true
    }

    /// Arm the reconnect timer if the budget allows. Returns whether it did.
    fn schedule_reconnect(&self, inner: &mut SocketInner) -> bool {
        let Some(delay) = inner.options.reconnect_delay() else {
            return false;
        };
        if inner.reconnect_attempts >= inner.options.max_reconnect_attempts {
            tracing::warn!(
                target: targets::WEBSOCKET,
                id = %self.id,
                attempts = inner.reconnect_attempts,
                "reconnect attempts exhausted"
            );
            return false;
        }

        if let Some(timer) = inner.reconnect_timer.take() {
            self.scheduler.cancel(timer);
        }

        let session = self.self_ref.clone();
        let timer = self.scheduler.schedule_once(
            delay,
            Box::new(move || {
                if let Some(session) = session.upgrade() {
                    session.retry();
                }
            }),
        );
        inner.reconnect_timer = Some(timer);
        inner.state = SocketState::Reconnecting;
        true
    }

    fn retry(&self) {
        let (attempt, options) = {
            let mut inner = self.inner.lock();
            inner.reconnect_timer = None;
            inner.reconnect_attempts += 1;
            (inner.reconnect_attempts, inner.options.clone())
        };

        tracing::warn!(target: targets::WEBSOCKET, id = %self.id, attempt, "retrying to connect");
        self.connection_retry.emit(attempt);

        if !self.open(options) {
            self.inner.lock().state = SocketState::Disconnected;
            self.registry.unregister_socket(self.id);
        }
    }
}

impl Tickable for SocketSession {
    /// Deliver pending socket events.
    fn tick(&self, _delta: Duration) {
        while self.dispatch_next() {}
    }

    fn is_tickable(&self) -> bool {
        self.inner.lock().socket.is_some()
    }
}

impl std::fmt::Debug for SocketSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

static_assertions::assert_impl_all!(SocketSession: Send, Sync);
