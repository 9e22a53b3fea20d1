//! Socket session tests against a scripted transport and a virtual clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::{MockSocketTransport, Recorder};
use tether_core::{Tickable, TimerQueue};
use tether_net::websocket::{
    CloseCode, SocketEvent, SocketOptions, SocketProtocol, SocketSession, SocketState,
};
use tether_net::{ClientRegistry, SocketErrorKind};

const FRAME: Duration = Duration::from_millis(16);

struct Harness {
    transport: MockSocketTransport,
    timers: Arc<TimerQueue>,
    registry: Arc<ClientRegistry>,
    session: Arc<SocketSession>,
}

impl Harness {
    fn new() -> Self {
        let transport = MockSocketTransport::new();
        let timers = Arc::new(TimerQueue::new());
        let registry = Arc::new(ClientRegistry::new());
        let session = SocketSession::new(
            Arc::new(transport.clone()),
            timers.clone(),
            registry.clone(),
        );
        Self {
            transport,
            timers,
            registry,
            session,
        }
    }

    fn open_connected(&self) {
        assert!(self.session.open(options()));
        self.transport.accept();
        self.session.tick(FRAME);
    }
}

fn options() -> SocketOptions {
    SocketOptions::new(SocketProtocol::Ws, "ws://localhost:9001/chat")
}

#[test]
fn test_open_and_connect() {
    let h = Harness::new();
    let connected = Recorder::attach(&h.session.connected);

    assert!(h.session.open(options().header("Authorization", "Bearer t")));
    assert_eq!(h.session.state(), SocketState::Connecting);
    assert!(h.registry.contains_socket(h.session.id()));
    assert_eq!(h.transport.last().lock().connects, 1);
    assert_eq!(h.transport.last().lock().url, "ws://localhost:9001/chat");

    h.transport.accept();
    h.session.tick(FRAME);

    assert_eq!(connected.len(), 1);
    assert_eq!(h.session.state(), SocketState::Connected);
    assert!(h.session.is_connected());
    assert!(!h.session.open(options()));
    assert_eq!(h.transport.created(), 1);
}

#[test]
fn test_open_fails_when_socket_cannot_be_created() {
    let h = Harness::new();
    h.transport.reject_create();

    assert!(!h.session.open(options()));
    assert_eq!(h.session.state(), SocketState::Disconnected);
    assert_eq!(h.registry.socket_count(), 0);
}

#[test]
fn test_send_requires_connection() {
    let h = Harness::new();
    let sent = Recorder::attach(&h.session.message_sent);

    assert!(!h.session.send_text("early"));
    h.session.open(options());
    assert!(!h.session.send_bytes(b"early", true));

    h.transport.accept();
    h.session.tick(FRAME);

    assert!(h.session.send_text("hello"));
    assert!(h.session.send_bytes(&[1, 2, 3], true));
    h.session.tick(FRAME);

    let socket = h.transport.last();
    let socket = socket.lock();
    assert_eq!(socket.sent_text, vec!["hello".to_string()]);
    assert_eq!(socket.sent_bytes, vec![(vec![1, 2, 3], true)]);
    assert_eq!(sent.values(), vec!["hello".to_string()]);
}

#[test]
fn test_messages_are_delivered() {
    let h = Harness::new();
    let texts = Recorder::attach(&h.session.text_message);
    h.open_connected();

    h.transport.push(SocketEvent::TextMessage("one".into()));
    h.transport.push(SocketEvent::TextMessage("two".into()));
    h.session.tick(FRAME);

    assert_eq!(texts.values(), vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn test_binary_fragments_are_reassembled() {
    let h = Harness::new();
    let binary = Recorder::attach(&h.session.binary_message);
    h.open_connected();

    h.transport.push(SocketEvent::BinaryMessage {
        data: Bytes::from_static(b"\x01\x02"),
        is_last: false,
    });
    h.session.tick(FRAME);
    assert_eq!(binary.len(), 0);

    h.transport.push(SocketEvent::BinaryMessage {
        data: Bytes::from_static(b"\x03"),
        is_last: true,
    });
    h.transport.push(SocketEvent::BinaryMessage {
        data: Bytes::from_static(b"\x09"),
        is_last: true,
    });
    h.session.tick(FRAME);

    assert_eq!(
        binary.values(),
        vec![Bytes::from_static(b"\x01\x02\x03"), Bytes::from_static(b"\x09")]
    );
}

#[test]
fn test_reconnect_until_budget_exhausted() {
    let h = Harness::new();
    let errors = Recorder::attach(&h.session.connection_error);
    let retries = Recorder::attach(&h.session.connection_retry);

    h.session.open(options().reconnect(1.0, 2));
    h.transport.refuse();
    h.session.tick(FRAME);

    assert_eq!(errors.len(), 1);
    assert_eq!(h.session.state(), SocketState::Reconnecting);
    assert!(h.session.is_reconnect_pending());
    assert_eq!(h.session.last_error(), SocketErrorKind::Connection);
    assert!(h.registry.contains_socket(h.session.id()));

    h.timers.advance(Duration::from_millis(500));
    assert_eq!(h.transport.created(), 1);

    h.timers.advance(Duration::from_millis(500));
    assert_eq!(h.transport.created(), 2);
    assert_eq!(h.session.reconnect_attempts(), 1);
    assert_eq!(retries.values(), vec![1]);
    assert_eq!(h.session.state(), SocketState::Connecting);

    h.transport.refuse();
    h.session.tick(FRAME);
    h.timers.advance(Duration::from_secs(1));
    assert_eq!(h.transport.created(), 3);
    assert_eq!(h.session.reconnect_attempts(), 2);
    assert_eq!(retries.values(), vec![1, 2]);

    h.transport.refuse();
    h.session.tick(FRAME);
    assert_eq!(errors.len(), 3);
    assert!(!h.session.is_reconnect_pending());
    assert_eq!(h.session.state(), SocketState::Disconnected);
    assert!(!h.registry.contains_socket(h.session.id()));

    h.timers.advance(Duration::from_secs(10));
    assert_eq!(h.transport.created(), 3);
    assert_eq!(h.timers.active_count(), 0);
}

#[test]
fn test_successful_connect_resets_attempts() {
    let h = Harness::new();

    h.session.open(options().reconnect(0.5, 1));
    h.transport.refuse();
    h.session.tick(FRAME);
    h.timers.advance(Duration::from_millis(500));
    assert_eq!(h.session.reconnect_attempts(), 1);

    h.transport.accept();
    h.session.tick(FRAME);
    assert_eq!(h.session.reconnect_attempts(), 0);
    assert_eq!(h.session.state(), SocketState::Connected);

    // The budget is available again after the connection drops.
    h.transport.last().lock().connected = false;
    h.transport.refuse();
    h.session.tick(FRAME);
    assert!(h.session.is_reconnect_pending());
}

#[test]
fn test_no_reconnect_when_disabled() {
    let h = Harness::new();
    let errors = Recorder::attach(&h.session.connection_error);

    h.session.open(options());
    h.transport.refuse();
    h.session.tick(FRAME);

    assert_eq!(errors.values(), vec!["connection refused".to_string()]);
    assert!(!h.session.is_reconnect_pending());
    assert_eq!(h.session.state(), SocketState::Disconnected);
    assert_eq!(h.registry.socket_count(), 0);
    assert_eq!(h.timers.active_count(), 0);
}

#[test]
fn test_close_cancels_pending_reconnect() {
    let h = Harness::new();
    let retries = Recorder::attach(&h.session.connection_retry);

    h.session.open(options().reconnect(1.0, 3));
    h.transport.refuse();
    h.session.tick(FRAME);
    assert!(h.session.is_reconnect_pending());

    assert!(!h.session.close_normal());
    assert!(!h.session.is_reconnect_pending());
    assert_eq!(h.session.state(), SocketState::Disconnected);
    assert_eq!(h.registry.socket_count(), 0);

    h.timers.advance(Duration::from_secs(5));
    h.registry.tick(FRAME);
    assert_eq!(retries.len(), 0);
    assert_eq!(h.transport.created(), 1);
    assert_eq!(h.registry.draining_count(), 0);
}

#[test]
fn test_close_connected_socket() {
    let h = Harness::new();
    let closed = Recorder::attach(&h.session.closed);
    h.open_connected();

    assert!(h.session.close(CloseCode::Away, "leaving"));
    assert_eq!(h.session.state(), SocketState::Disconnected);
    assert!(!h.registry.contains_socket(h.session.id()));
    assert_eq!(
        h.transport.last().lock().closes,
        vec![(CloseCode::Away, "leaving".to_string())]
    );

    // Only the host loop runs; the session is no longer tracked but still
    // delivers its close.
    for _ in 0..3 {
        h.timers.tick(FRAME);
        h.registry.tick(FRAME);
    }
    assert_eq!(closed.len(), 1);
    assert_eq!(h.registry.draining_count(), 0);
    let event = closed.last().unwrap();
    assert_eq!(event.code, CloseCode::Away);
    assert_eq!(event.reason, "leaving");
    assert!(event.was_clean);

    assert!(!h.session.close_normal());
    assert_eq!(closed.len(), 1);
}

#[test]
fn test_remote_close_unregisters() {
    let h = Harness::new();
    let closed = Recorder::attach(&h.session.closed);
    h.open_connected();

    h.transport.last().lock().connected = false;
    h.transport.push(SocketEvent::Closed {
        code: CloseCode::Error,
        reason: "server error".into(),
        was_clean: false,
    });
    h.registry.tick(FRAME);

    assert_eq!(closed.len(), 1);
    assert!(!closed.last().unwrap().was_clean);
    assert_eq!(h.session.state(), SocketState::Disconnected);
    assert_eq!(h.registry.socket_count(), 0);

    // A closed session can be opened again.
    assert!(h.session.open(options()));
    assert_eq!(h.transport.created(), 2);
}
