//! End-to-end tests of the bundled transports against local servers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Recorder;
use futures_util::{SinkExt, StreamExt};
use tether_core::{Tickable, TimerQueue};
use tether_net::http::{HttpMethod, ReqwestTransport, RequestOptions, RequestSession, RequestState};
use tether_net::websocket::{
    SocketOptions, SocketProtocol, SocketSession, SocketState, TungsteniteTransport,
};
use tether_net::{ClientRegistry, RequestErrorKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const FRAME: Duration = Duration::from_millis(10);

/// Tick `registry` until `done` holds or about five seconds pass.
async fn pump(registry: &ClientRegistry, timers: &TimerQueue, done: impl Fn() -> bool) {
    for _ in 0..500 {
        timers.tick(FRAME);
        registry.tick(FRAME);
        if done() {
            return;
        }
        tokio::time::sleep(FRAME).await;
    }
    panic!("condition not reached in time");
}

/// Serve a single raw HTTP response and return the server address.
async fn serve_once(response: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_reqwest_event_stream() {
    let body = "event: ping\nid: 7\ndata: one\n\ndata: two\n\n";
    let url = serve_once(format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ))
    .await;

    let timers = TimerQueue::new();
    let registry = Arc::new(ClientRegistry::new());
    let session = RequestSession::new(Arc::new(ReqwestTransport::new()), registry.clone());
    let events = Recorder::attach(&session.event);
    let headers = Recorder::attach(&session.header_received);
    let completed = Recorder::attach(&session.completed);

    assert!(session.start(RequestOptions::new(HttpMethod::Get, format!("{url}/stream"))));
    pump(&registry, &timers, || session.state().is_terminal()).await;

    assert_eq!(session.state(), RequestState::Completed);
    assert!(headers.len() >= 2);

    let events = events.values();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.event.as_text(), "ping");
    assert_eq!(events[0].event.id.as_text(), "7");
    assert_eq!(events[0].event.data.as_text(), "one");
    assert_eq!(events[1].event.data.as_text(), "two");

    let result = completed.last().unwrap();
    assert_eq!(result.code, 200);
    assert!(result.is_ok);
    assert_eq!(result.content.as_text(), body);
    assert_eq!(result.download_percentage, 100.0);
    assert_eq!(registry.request_count(), 0);
}

#[tokio::test]
async fn test_reqwest_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let timers = TimerQueue::new();
    let registry = Arc::new(ClientRegistry::new());
    let session = RequestSession::new(Arc::new(ReqwestTransport::new()), registry.clone());
    let failed = Recorder::attach(&session.failed);

    session.start(RequestOptions::new(HttpMethod::Get, format!("http://{addr}/")));
    pump(&registry, &timers, || session.state().is_terminal()).await;

    assert_eq!(failed.len(), 1);
    assert_eq!(failed.last().unwrap().error_kind, RequestErrorKind::Connection);
}

#[tokio::test]
async fn test_reqwest_soft_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and never answer.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(stream);
    });

    let timers = TimerQueue::new();
    let registry = Arc::new(ClientRegistry::new());
    let session = RequestSession::new(Arc::new(ReqwestTransport::new()), registry.clone());
    let failed = Recorder::attach(&session.failed);

    session.start(RequestOptions::new(HttpMethod::Get, format!("http://{addr}/")).timeout_secs(0.1));
    pump(&registry, &timers, || session.state().is_terminal()).await;

    let result = failed.last().unwrap();
    assert_eq!(result.error_kind, RequestErrorKind::TimedOut);
    assert!(result.is_timed_out);
    server.abort();
}

#[tokio::test]
async fn test_tungstenite_echo() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(_) | Message::Binary(_) => {
                    if ws.send(message).await.is_err() {
                        break;
                    }
                }
                // Keep reading so the close reply gets flushed.
                _ => {}
            }
        }
    });

    let timers = Arc::new(TimerQueue::new());
    let registry = Arc::new(ClientRegistry::new());
    let socket = SocketSession::new(Arc::new(TungsteniteTransport::new()), timers.clone(), registry.clone());
    let connected = Recorder::attach(&socket.connected);
    let texts = Recorder::attach(&socket.text_message);
    let binary = Recorder::attach(&socket.binary_message);
    let sent = Recorder::attach(&socket.message_sent);
    let closed = Recorder::attach(&socket.closed);

    // The scheme comes from the protocol when the URL omits it.
    assert!(socket.open(SocketOptions::new(SocketProtocol::Ws, addr.to_string())));
    pump(&registry, &timers, || connected.len() == 1).await;
    assert_eq!(socket.state(), SocketState::Connected);

    assert!(socket.send_text("hello"));
    assert!(socket.send_bytes(&[1, 2, 3], true));
    pump(&registry, &timers, || texts.len() == 1 && binary.len() == 1).await;

    assert_eq!(texts.values(), vec!["hello".to_string()]);
    assert_eq!(binary.values()[0].as_ref(), &[1, 2, 3]);
    assert_eq!(sent.values(), vec!["hello".to_string()]);

    assert!(socket.close_normal());
    // Closed sessions leave the registry, so tick the session itself.
    for _ in 0..500 {
        socket.tick(FRAME);
        if closed.len() == 1 {
            break;
        }
        tokio::time::sleep(FRAME).await;
    }
    assert_eq!(closed.len(), 1);
    assert!(!socket.is_connected());
}

#[tokio::test]
async fn test_tungstenite_refused_without_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let timers = Arc::new(TimerQueue::new());
    let registry = Arc::new(ClientRegistry::new());
    let socket = SocketSession::new(Arc::new(TungsteniteTransport::new()), timers.clone(), registry.clone());
    let errors = Recorder::attach(&socket.connection_error);

    socket.open(SocketOptions::new(SocketProtocol::Ws, format!("ws://{addr}")));
    pump(&registry, &timers, || errors.len() == 1).await;

    assert_eq!(socket.state(), SocketState::Disconnected);
    assert_eq!(registry.socket_count(), 0);
}
