//! [`SocketTransport`] backed by `tokio-tungstenite` on the shared runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

use super::message::CloseCode;
use super::options::SocketProtocol;
use super::transport::{SocketConnection, SocketEvent, SocketTransport};
use crate::error::{NetworkError, Result};
use crate::runtime;

/// WebSocket transport using `tokio_tungstenite::connect_async`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    /// Create the transport.
    pub fn new() -> Self {
        Self
    }
}

impl SocketTransport for TungsteniteTransport {
    fn create_socket(
        &self,
        url: &str,
        protocol: SocketProtocol,
        headers: &HashMap<String, String>,
    ) -> Result<Box<dyn SocketConnection>> {
        let url = resolve_url(url, protocol)?;
        let headers: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        // Fail early on unusable headers rather than at connect time.
        build_request(&url, &headers)?;

        Ok(Box::new(TungsteniteSocket {
            url,
            headers,
            connected: Arc::new(AtomicBool::new(false)),
            events: None,
            commands: None,
        }))
    }
}

/// Prefix the scheme when missing and reject non-WebSocket schemes.
fn resolve_url(url: &str, protocol: SocketProtocol) -> Result<String> {
    let url = url.trim();
    let full = if url.contains("://") {
        url.to_string()
    } else {
        format!("{}://{url}", protocol.as_str())
    };

    let parsed = url::Url::parse(&full)?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(full),
        other => Err(NetworkError::InvalidUrl(format!(
            "unsupported WebSocket scheme `{other}`"
        ))),
    }
}

fn build_request(url: &str, headers: &[(String, String)]) -> Result<Request> {
    let mut request = url.into_client_request()?;

    let request_headers = request.headers_mut();
    for (name, value) in headers {
        let name = http::header::HeaderName::try_from(name.as_str())?;
        let value = http::header::HeaderValue::try_from(value.as_str())?;
        request_headers.insert(name, value);
    }

    Ok(request)
}

enum Command {
    Text(String),
    Binary(Bytes),
    Close(CloseCode, String),
}

struct TungsteniteSocket {
    url: String,
    headers: Vec<(String, String)>,
    connected: Arc<AtomicBool>,
    events: Option<mpsc::UnboundedReceiver<SocketEvent>>,
    commands: Option<mpsc::UnboundedSender<Command>>,
}

impl TungsteniteSocket {
    fn command(&self, command: Command) {
        if let Some(commands) = &self.commands {
            let _ = commands.send(command);
        }
    }
}

impl SocketConnection for TungsteniteSocket {
    fn connect(&mut self) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        self.events = Some(event_rx);
        self.commands = Some(command_tx);

        let request = match build_request(&self.url, &self.headers) {
            Ok(request) => request,
            Err(err) => {
                let _ = event_tx.send(SocketEvent::ConnectionError(err.to_string()));
                return;
            }
        };

        let connected = self.connected.clone();
        let task = run_socket(request, connected, event_tx.clone(), command_rx);
        if let Err(err) = runtime::spawn(task) {
            let _ = event_tx.send(SocketEvent::ConnectionError(err.to_string()));
        }
    }

    fn close(&mut self, code: CloseCode, reason: &str) {
        self.command(Command::Close(code, reason.to_string()));
    }

    fn send_text(&mut self, text: &str) {
        self.command(Command::Text(text.to_string()));
    }

    fn send_bytes(&mut self, data: &[u8], is_binary: bool) {
        if is_binary {
            self.command(Command::Binary(Bytes::copy_from_slice(data)));
        } else {
            self.command(Command::Text(String::from_utf8_lossy(data).into_owned()));
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn poll_event(&mut self) -> Option<SocketEvent> {
        self.events.as_mut()?.try_recv().ok()
    }
}

async fn run_socket(
    request: Request,
    connected: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SocketEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let stream = match tokio_tungstenite::connect_async(request).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            let _ = events.send(SocketEvent::ConnectionError(NetworkError::from(err).to_string()));
            return;
        }
    };

    connected.store(true, Ordering::SeqCst);
    let _ = events.send(SocketEvent::Connected);

    let (mut write, mut read) = stream.split();
    let closed = loop {
        tokio::select! {
            command = commands.recv() => {
                let result = match command {
                    Some(Command::Text(text)) => {
                        let sent = write.send(Message::Text(text.clone().into())).await;
                        if sent.is_ok() {
                            let _ = events.send(SocketEvent::MessageSent(text));
                        }
                        sent
                    }
                    Some(Command::Binary(data)) => write.send(Message::Binary(data)).await,
                    Some(Command::Close(code, reason)) => {
                        // Keep reading until the peer answers with its own close frame.
                        write
                            .send(Message::Close(Some(CloseFrame {
                                code: code.as_u16().into(),
                                reason: reason.into(),
                            })))
                            .await
                    }
                    // The session dropped the socket.
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break SocketEvent::Closed {
                            code: CloseCode::Away,
                            reason: String::new(),
                            was_clean: false,
                        };
                    }
                };

                if let Err(err) = result {
                    break SocketEvent::Closed {
                        code: CloseCode::Abnormal,
                        reason: err.to_string(),
                        was_clean: false,
                    };
                }
            }

            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(SocketEvent::TextMessage(text.to_string()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // tungstenite reassembles fragmented messages.
                        let _ = events.send(SocketEvent::BinaryMessage { data, is_last: true });
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (CloseCode::from_u16(frame.code.into()), frame.reason.to_string()),
                            None => (CloseCode::NoStatus, String::new()),
                        };
                        break SocketEvent::Closed { code, reason, was_clean: true };
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are handled by tungstenite.
                    }
                    Some(Err(err)) => {
                        break SocketEvent::Closed {
                            code: CloseCode::Abnormal,
                            reason: err.to_string(),
                            was_clean: false,
                        };
                    }
                    None => {
                        break SocketEvent::Closed {
                            code: CloseCode::Abnormal,
                            reason: String::new(),
                            was_clean: false,
                        };
                    }
                }
            }
        }
    };

    connected.store(false, Ordering::SeqCst);
    let _ = events.send(closed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_adds_scheme() {
        assert_eq!(
            resolve_url("example.com/socket", SocketProtocol::Wss).unwrap(),
            "wss://example.com/socket"
        );
        assert_eq!(
            resolve_url("ws://localhost:9000", SocketProtocol::Wss).unwrap(),
            "ws://localhost:9000"
        );
    }

    #[test]
    fn test_resolve_url_rejects_http() {
        let err = resolve_url("https://example.com", SocketProtocol::Ws).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidUrl(_)));
    }

    #[test]
    fn test_create_socket_rejects_bad_header() {
        let mut headers = HashMap::new();
        headers.insert("Bad Header".to_string(), "value".to_string());

        let result = TungsteniteTransport::new().create_socket(
            "ws://localhost:9000",
            SocketProtocol::Ws,
            &headers,
        );
        assert!(matches!(result, Err(NetworkError::InvalidHeader(_))));
    }

    #[test]
    fn test_build_request_carries_headers() {
        let headers = vec![("Authorization".to_string(), "Bearer abc".to_string())];
        let request = build_request("ws://localhost:9000/chat", &headers).unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer abc");
    }

    #[test]
    fn test_unconnected_socket_drops_sends() {
        let mut socket = TungsteniteTransport::new()
            .create_socket("ws://localhost:9000", SocketProtocol::Ws, &HashMap::new())
            .unwrap();
        assert!(!socket.is_connected());
        socket.send_text("ignored");
        assert!(socket.poll_event().is_none());
    }
}
