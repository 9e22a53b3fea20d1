//! Scripted transports for driving sessions without a network.
//!
//! Each created request or socket gets a shared state handle so a test can
//! inspect what the session did and queue the events the engine would report.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tether_net::NetworkError;
use tether_net::http::{
    FailureReason, HttpMethod, HttpTransport, RequestBody, TransportEvent, TransportRequest,
    TransportResponse, TransportStatus,
};
use tether_net::websocket::{
    CloseCode, SocketConnection, SocketEvent, SocketProtocol, SocketTransport,
};

// ============================================================================
// HTTP
// ============================================================================

#[derive(Default)]
pub struct RequestState {
    pub method: Option<HttpMethod>,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body_set: bool,
    pub processed: bool,
    pub cancels: usize,
    pub status: TransportStatus,
    pub reason: FailureReason,
    pub events: VecDeque<TransportEvent>,
}

impl RequestState {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct TransportShared {
    requests: Vec<Arc<Mutex<RequestState>>>,
    reject_body: bool,
    reject_process: bool,
}

#[derive(Clone, Default)]
pub struct MockHttpTransport {
    shared: Arc<Mutex<TransportShared>>,
}

impl MockHttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_body(&self) {
        self.shared.lock().reject_body = true;
    }

    pub fn reject_process(&self) {
        self.shared.lock().reject_process = true;
    }

    pub fn created(&self) -> usize {
        self.shared.lock().requests.len()
    }

    pub fn request(&self, index: usize) -> Arc<Mutex<RequestState>> {
        self.shared.lock().requests[index].clone()
    }

    pub fn last(&self) -> Arc<Mutex<RequestState>> {
        let shared = self.shared.lock();
        shared.requests[shared.requests.len() - 1].clone()
    }

    pub fn push_header(&self, name: &str, value: &str) {
        self.last().lock().events.push_back(TransportEvent::Header {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn push_download(&self, received: u64, chunk: &[u8], total: Option<u64>) {
        self.last().lock().events.push_back(TransportEvent::Progress {
            bytes_sent: 0,
            bytes_received: received,
            chunk: Bytes::copy_from_slice(chunk),
            download_total: total,
        });
    }

    pub fn push_response(&self, status_code: u16, content_type: &str, body: &str) {
        let request = self.last();
        let mut request = request.lock();
        request.status = TransportStatus::Succeeded;
        request.events.push_back(TransportEvent::Complete {
            success: true,
            response: Some(TransportResponse {
                status_code,
                content_type: content_type.into(),
                body: Bytes::copy_from_slice(body.as_bytes()),
            }),
        });
    }

    pub fn push_failure(&self, reason: FailureReason) {
        let request = self.last();
        let mut request = request.lock();
        request.status = TransportStatus::Failed;
        request.reason = reason;
        request.events.push_back(TransportEvent::Complete {
            success: false,
            response: None,
        });
    }
}

impl HttpTransport for MockHttpTransport {
    fn create_request(&self) -> Box<dyn TransportRequest> {
        let state = Arc::new(Mutex::new(RequestState::default()));
        let mut shared = self.shared.lock();
        shared.requests.push(state.clone());
        Box::new(MockRequest {
            state,
            reject_body: shared.reject_body,
            reject_process: shared.reject_process,
        })
    }
}

struct MockRequest {
    state: Arc<Mutex<RequestState>>,
    reject_body: bool,
    reject_process: bool,
}

impl TransportRequest for MockRequest {
    fn set_method(&mut self, method: HttpMethod) {
        self.state.lock().method = Some(method);
    }

    fn set_url(&mut self, url: &str) {
        self.state.lock().url = url.into();
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.state.lock().headers.push((name.into(), value.into()));
    }

    fn set_body(&mut self, body: &RequestBody) -> tether_net::Result<u64> {
        if self.reject_body {
            return Err(NetworkError::Io("no such file".into()));
        }
        self.state.lock().body_set = true;
        Ok(match body {
            RequestBody::None | RequestBody::File(_) => 0,
            RequestBody::Bytes(bytes) => bytes.len() as u64,
            RequestBody::Text(text) => text.len() as u64,
        })
    }

    fn process(&mut self) -> bool {
        if self.reject_process {
            return false;
        }
        let mut state = self.state.lock();
        state.processed = true;
        state.status = TransportStatus::Processing;
        true
    }

    fn cancel(&mut self) {
        let mut state = self.state.lock();
        state.cancels += 1;
        state.status = TransportStatus::Failed;
        state.reason = FailureReason::Cancelled;
        state.events.push_back(TransportEvent::Complete {
            success: false,
            response: None,
        });
    }

    fn status(&self) -> TransportStatus {
        self.state.lock().status
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(5)
    }

    fn failure_reason(&self) -> FailureReason {
        self.state.lock().reason
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.state.lock().events.pop_front()
    }
}

// ============================================================================
// WebSocket
// ============================================================================

#[derive(Default)]
pub struct SocketState {
    pub url: String,
    pub protocol: Option<SocketProtocol>,
    pub connected: bool,
    pub connects: usize,
    pub closes: Vec<(CloseCode, String)>,
    pub sent_text: Vec<String>,
    pub sent_bytes: Vec<(Vec<u8>, bool)>,
    pub events: VecDeque<SocketEvent>,
}

#[derive(Default)]
struct SocketShared {
    sockets: Vec<Arc<Mutex<SocketState>>>,
    reject_create: bool,
}

#[derive(Clone, Default)]
pub struct MockSocketTransport {
    shared: Arc<Mutex<SocketShared>>,
}

impl MockSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_create(&self) {
        self.shared.lock().reject_create = true;
    }

    pub fn created(&self) -> usize {
        self.shared.lock().sockets.len()
    }

    pub fn last(&self) -> Arc<Mutex<SocketState>> {
        let shared = self.shared.lock();
        shared.sockets[shared.sockets.len() - 1].clone()
    }

    /// Complete the handshake of the most recent socket.
    pub fn accept(&self) {
        let socket = self.last();
        let mut socket = socket.lock();
        socket.connected = true;
        socket.events.push_back(SocketEvent::Connected);
    }

    /// Fail the handshake of the most recent socket.
    pub fn refuse(&self) {
        self.push(SocketEvent::ConnectionError("connection refused".into()));
    }

    pub fn push(&self, event: SocketEvent) {
        self.last().lock().events.push_back(event);
    }
}

impl SocketTransport for MockSocketTransport {
    fn create_socket(
        &self,
        url: &str,
        protocol: SocketProtocol,
        _headers: &HashMap<String, String>,
    ) -> tether_net::Result<Box<dyn SocketConnection>> {
        let mut shared = self.shared.lock();
        if shared.reject_create {
            return Err(NetworkError::InvalidUrl(url.into()));
        }
        let state = Arc::new(Mutex::new(SocketState {
            url: url.into(),
            protocol: Some(protocol),
            ..SocketState::default()
        }));
        shared.sockets.push(state.clone());
        Ok(Box::new(MockSocket { state }))
    }
}

struct MockSocket {
    state: Arc<Mutex<SocketState>>,
}

impl SocketConnection for MockSocket {
    fn connect(&mut self) {
        self.state.lock().connects += 1;
    }

    fn close(&mut self, code: CloseCode, reason: &str) {
        let mut state = self.state.lock();
        state.connected = false;
        state.closes.push((code, reason.into()));
        state.events.push_back(SocketEvent::Closed {
            code,
            reason: reason.into(),
            was_clean: true,
        });
    }

    fn send_text(&mut self, text: &str) {
        let mut state = self.state.lock();
        state.sent_text.push(text.into());
        state.events.push_back(SocketEvent::MessageSent(text.into()));
    }

    fn send_bytes(&mut self, data: &[u8], is_binary: bool) {
        self.state.lock().sent_bytes.push((data.to_vec(), is_binary));
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn poll_event(&mut self) -> Option<SocketEvent> {
        self.state.lock().events.pop_front()
    }
}

// ============================================================================
// Signal recording
// ============================================================================

/// Collects every value a signal emits.
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn attach(signal: &tether_core::Signal<T>) -> Self {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = values.clone();
        signal.connect(move |value: &T| sink.lock().push(value.clone()));
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    pub fn last(&self) -> Option<T> {
        self.values.lock().last().cloned()
    }
}
