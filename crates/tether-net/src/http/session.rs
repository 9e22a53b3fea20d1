//! A single logical HTTP request driven by cooperative ticks.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tether_core::{Signal, Tickable};
use tether_core::logging::targets;

use super::options::{CONTENT_TYPE_HEADER, RequestOptions};
use super::result::{RequestResult, classify_failure, percentage};
use super::transport::{HttpTransport, TransportEvent, TransportRequest, TransportResponse};
use crate::content::ContentBuffer;
use crate::error::RequestErrorKind;
use crate::registry::{ClientRegistry, SessionId};
use crate::sse::{ServerSentEvent, SseFrameParser};

/// Lifecycle of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestState {
    /// Nothing started yet.
    #[default]
    Idle,
    /// Waiting on the transport.
    Active,
    /// Finished successfully.
    Completed,
    /// Finished with an error other than cancel or timeout.
    Failed,
    /// Cancelled by the caller.
    Canceled,
    /// Cancelled by the soft timeout.
    TimedOut,
}

impl RequestState {
    /// Whether the state is terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Idle | Self::Active)
    }

    fn from_error(kind: RequestErrorKind) -> Self {
        match kind {
            RequestErrorKind::TimedOut => Self::TimedOut,
            RequestErrorKind::Canceled => Self::Canceled,
            _ => Self::Failed,
        }
    }
}

struct RequestInner {
    state: RequestState,
    handle: Option<Box<dyn TransportRequest>>,
    result: RequestResult,
    cancel_requested: bool,
    /// Soft timeout left, `None` when disabled or already fired.
    remaining: Option<Duration>,
    upload_total: u64,
    /// Undelivered tail of an event stream.
    stream: Vec<u8>,
    parser: SseFrameParser,
}

impl RequestInner {
    fn new() -> Self {
        Self {
            state: RequestState::Idle,
            handle: None,
            result: RequestResult::default(),
            cancel_requested: false,
            remaining: None,
            upload_total: 0,
            stream: Vec::new(),
            parser: SseFrameParser::new(),
        }
    }

    fn is_processing(&self) -> bool {
        self.state == RequestState::Active && self.handle.is_some()
    }

    /// Append response bytes to the event stream and take every complete
    /// event. Consumed bytes are dropped so the buffer only ever holds the
    /// unterminated tail.
    fn push_stream(&mut self, chunk: &[u8]) -> Vec<ServerSentEvent> {
        self.stream.extend_from_slice(chunk);
        let events = self.parser.extract_all(&self.stream);
        let consumed = self.parser.read_offset().min(self.stream.len());
        self.stream.drain(..consumed);
        self.parser.reset();
        events
    }

    /// Terminal failure outside the transport's completion path.
    fn fail(&mut self, kind: RequestErrorKind, message: &str) -> RequestResult {
        self.result.fail(kind, message);
        self.state = RequestState::from_error(kind);
        self.handle = None;
        self.remaining = None;
        self.result.clone()
    }
}

/// Signal payloads produced while the lock is held, emitted after release.
enum Emission {
    Header(RequestResult),
    Event(RequestResult),
    Progress(RequestResult),
    Completed(RequestResult),
    Failed(RequestResult),
}

/// One logical HTTP request with streaming progress, SSE and a soft timeout.
///
/// Create with [`RequestSession::new`], connect to the signals, then call
/// [`start`](Self::start). Transport notifications and the timeout are both
/// processed in [`tick`](Tickable::tick), so all signals fire on the thread
/// that ticks the session (or the [`ClientRegistry`] it belongs to).
///
/// Every started request ends with exactly one `completed` or `failed`
/// emission.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tether_core::Tickable;
/// use tether_net::ClientRegistry;
/// use tether_net::http::{HttpMethod, ReqwestTransport, RequestOptions, RequestSession};
///
/// let registry = Arc::new(ClientRegistry::new());
/// let session = RequestSession::new(Arc::new(ReqwestTransport::new()), registry.clone());
///
/// session.completed.connect(|result| {
///     println!("{} -> {}", result.code, result.content.as_text());
/// });
/// session.failed.connect(|result| eprintln!("{}: {}", result.error_kind, result.error));
///
/// session.start(RequestOptions::new(HttpMethod::Get, "https://example.com").timeout_secs(5.0));
///
/// // In the host's frame loop:
/// registry.tick(Duration::from_millis(16));
/// ```
pub struct RequestSession {
    id: SessionId,
    transport: Arc<dyn HttpTransport>,
    registry: Arc<ClientRegistry>,
    self_ref: Weak<RequestSession>,
    inner: Mutex<RequestInner>,

    /// Emitted after each progress update.
    pub progress: Signal<RequestResult>,
    /// Emitted after each response header.
    pub header_received: Signal<RequestResult>,
    /// Emitted once when the request succeeds.
    pub completed: Signal<RequestResult>,
    /// Emitted once when the request fails, is cancelled or times out.
    pub failed: Signal<RequestResult>,
    /// Emitted for each server-sent event; `result.event` holds it.
    pub event: Signal<RequestResult>,
}

impl RequestSession {
    /// Create an idle session.
    pub fn new(transport: Arc<dyn HttpTransport>, registry: Arc<ClientRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id: SessionId::next(),
            transport,
            registry,
            self_ref: self_ref.clone(),
            inner: Mutex::new(RequestInner::new()),
            progress: Signal::new(),
            header_received: Signal::new(),
            completed: Signal::new(),
            failed: Signal::new(),
            event: Signal::new(),
        })
    }

    /// This session's identity in the registry.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        self.inner.lock().state
    }

    /// Snapshot of the current result.
    pub fn result(&self) -> RequestResult {
        self.inner.lock().result.clone()
    }

    /// Whether a request is in flight.
    pub fn is_processing(&self) -> bool {
        self.inner.lock().is_processing()
    }

    /// Whether the in-flight response is an event stream.
    pub fn is_server_sent_events(&self) -> bool {
        let inner = self.inner.lock();
        inner.is_processing() && inner.result.has_event_stream_content_type()
    }

    /// Issue a request.
    ///
    /// A request still in flight is cancelled first and reported through
    /// `failed` as [`RequestErrorKind::Canceled`]. Validation failures are
    /// reported through `failed` as well, before the transport is touched.
    ///
    /// Returns whether the transport accepted the request.
    pub fn start(&self, options: RequestOptions) -> bool {
        self.abort_previous();

        let mut inner = self.inner.lock();
        inner.result = RequestResult::default();
        inner.cancel_requested = false;
        inner.stream.clear();
        inner.parser.reset();

        if options.url.trim().is_empty() {
            let result = inner.fail(
                RequestErrorKind::InvalidRequest,
                "Invalid URL provided for the request",
            );
            drop(inner);
            return self.reject(result);
        }

        let has_content_type = options
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE_HEADER));
        let body_mime = options.content_type.mime();
        if options.body.is_some() && body_mime.is_none() && !has_content_type {
            let result = inner.fail(
                RequestErrorKind::InvalidRequest,
                "Content-Type header is missing, cannot complete request",
            );
            drop(inner);
            return self.reject(result);
        }

        let mut handle = self.transport.create_request();
        handle.set_method(options.method);
        handle.set_url(&options.url);
        for (name, value) in &options.headers {
            handle.set_header(name, value);
        }

        let mut upload_total = 0;
        if options.body.is_some() {
            if let Some(mime) = body_mime {
                handle.set_header(CONTENT_TYPE_HEADER, mime);
            }

            upload_total = match handle.set_body(&options.body) {
                Ok(len) => len,
                Err(err) => {
                    tracing::warn!(target: targets::HTTP, id = %self.id, error = %err, "request body rejected");
                    let result = inner.fail(
                        RequestErrorKind::InvalidBody,
                        "Invalid filepath for http payload, cannot complete request",
                    );
                    drop(inner);
                    return self.reject(result);
                }
            };
        }

        inner.upload_total = upload_total;
        inner.remaining = options.timeout();
        inner.state = RequestState::Active;
        inner.result.status = "Processing".into();

        if let Some(this) = self.self_ref.upgrade() {
            self.registry.register_request(&this);
        }

        let accepted = handle.process();
        if !accepted {
            let result = inner.fail(
                RequestErrorKind::FailedRequest,
                "Request could not be processed by the transport",
            );
            drop(inner);
            self.registry.unregister_request(self.id);
            return self.reject(result);
        }

        inner.handle = Some(handle);
        tracing::debug!(
            target: targets::HTTP,
            id = %self.id,
            method = %options.method,
            url = %options.url,
            "request started"
        );
        true
    }

    /// Request cancellation of the in-flight request.
    ///
    /// The outcome is reported later through `failed` from `tick`. Returns
    /// whether a cancellation was actually issued.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.is_processing() || inner.cancel_requested {
            return false;
        }
        inner.result.is_canceled = true;
        self.request_abort(&mut inner);
        true
    }

    fn request_abort(&self, inner: &mut RequestInner) {
        inner.cancel_requested = true;
        inner.remaining = None;
        if let Some(handle) = inner.handle.as_mut() {
            handle.cancel();
        }
        tracing::debug!(target: targets::HTTP, id = %self.id, "cancellation requested");
    }

    /// Cancel a request still in flight and deliver its terminal failure.
    fn abort_previous(&self) {
        let result = {
            let mut inner = self.inner.lock();
            if inner.state != RequestState::Active {
                return;
            }
            let Some(mut handle) = inner.handle.take() else {
                return;
            };
            handle.cancel();
            inner.result.is_canceled = true;
            inner.result.is_finished = true;
            inner.result.status = "Failed".into();
            inner.fail(RequestErrorKind::Canceled, "Request canceled by user")
        };

        tracing::warn!(target: targets::HTTP, id = %self.id, "request restarted while in flight");
        self.registry.unregister_request(self.id);
        self.failed.emit(result);
    }

    fn reject(&self, result: RequestResult) -> bool {
        tracing::warn!(
            target: targets::HTTP,
            id = %self.id,
            kind = %result.error_kind,
            error = %result.error,
            "request failed"
        );
        self.failed.emit(result);
        false
    }

    /// Drain one transport event. Returns `false` when none was pending.
    fn dispatch_next(&self) -> bool {
        let mut emissions = Vec::new();
        let mut finished = false;
        {
            let mut inner = self.inner.lock();
            let Some(event) = inner.handle.as_mut().and_then(|h| h.poll_event()) else {
                return false;
            };

            match event {
                TransportEvent::Header { name, value } => {
                    if name.eq_ignore_ascii_case(CONTENT_TYPE_HEADER) {
                        inner.result.content_type = value.clone();
                    }
                    inner.result.headers.insert(name, value);
                    emissions.push(Emission::Header(inner.result.clone()));
                }
                TransportEvent::Progress {
                    bytes_sent,
                    bytes_received,
                    chunk,
                    download_total,
                } => {
                    self.on_progress(
                        &mut inner,
                        bytes_sent,
                        bytes_received,
                        &chunk,
                        download_total,
                        &mut emissions,
                    );
                }
                TransportEvent::Complete { success, response } => {
                    finished = self.on_complete(&mut inner, success, response, &mut emissions);
                }
            }
        }

        if finished {
            self.registry.unregister_request(self.id);
        }

        for emission in emissions {
            match emission {
                Emission::Header(result) => self.header_received.emit(result),
                Emission::Event(result) => self.event.emit(result),
                Emission::Progress(result) => self.progress.emit(result),
                Emission::Completed(result) => self.completed.emit(result),
                Emission::Failed(result) => self.failed.emit(result),
            }
        }
        true
    }

    fn on_progress(
        &self,
        inner: &mut RequestInner,
        bytes_sent: u64,
        bytes_received: u64,
        chunk: &[u8],
        download_total: Option<u64>,
        emissions: &mut Vec<Emission>,
    ) {
        let upload_total = inner.upload_total;
        let result = &mut inner.result;
        result.bytes_sent = bytes_sent;
        result.bytes_received = bytes_received;
        if let Some(pct) = percentage(bytes_sent, Some(upload_total)) {
            result.upload_percentage = pct;
        }
        if let Some(pct) = percentage(bytes_received, download_total) {
            result.download_percentage = pct;
        }

        if inner.result.has_event_stream_content_type() {
            inner.result.is_server_sent_event = true;
            let events = inner.push_stream(chunk);

            for event in events {
                tracing::trace!(
                    target: targets::SSE,
                    id = %self.id,
                    event = event.event.as_text(),
                    "server-sent event received"
                );
                inner.result.event = event;
                emissions.push(Emission::Event(inner.result.clone()));
            }
        }

        emissions.push(Emission::Progress(inner.result.clone()));
    }

    /// Returns whether the request reached a terminal state.
    fn on_complete(
        &self,
        inner: &mut RequestInner,
        success: bool,
        response: Option<TransportResponse>,
        emissions: &mut Vec<Emission>,
    ) -> bool {
        let Some(handle) = inner.handle.take() else {
            return false;
        };
        if inner.state != RequestState::Active {
            return false;
        }
        inner.remaining = None;

        let status = handle.status();
        let reason = handle.failure_reason();
        let result = &mut inner.result;
        result.elapsed = handle.elapsed();
        result.status = status.as_str().to_string();
        result.is_finished = status.is_finished();

        let has_response = response.is_some();
        if let Some(response) = response {
            result.code = response.status_code;
            result.content_type = response.content_type;
            result.is_ok = http::StatusCode::from_u16(response.status_code)
                .is_ok_and(|code| code.is_success());
            result.content = ContentBuffer::from_bytes(response.body);
        }

        if success {
            inner.state = RequestState::Completed;
            tracing::debug!(
                target: targets::HTTP,
                id = %self.id,
                code = inner.result.code,
                elapsed = ?inner.result.elapsed,
                "request completed"
            );
            emissions.push(Emission::Completed(inner.result.clone()));
        } else {
            let (kind, message) = classify_failure(&inner.result, status, reason, has_response);
            tracing::warn!(
                target: targets::HTTP,
                id = %self.id,
                %kind,
                error = message,
                "request failed"
            );
            inner.result.fail(kind, message);
            inner.state = RequestState::from_error(kind);
            emissions.push(Emission::Failed(inner.result.clone()));
        }
        true
    }

    fn update_timeout(&self, delta: Duration) {
        let mut inner = self.inner.lock();
        if !inner.is_processing() {
            return;
        }
        let Some(remaining) = inner.remaining else {
            return;
        };

        let remaining = remaining.saturating_sub(delta);
        if !remaining.is_zero() {
            inner.remaining = Some(remaining);
            return;
        }

        tracing::debug!(target: targets::HTTP, id = %self.id, "request timed out");
        inner.result.is_timed_out = true;
        self.request_abort(&mut inner);
    }
}

impl Tickable for RequestSession {
    /// Deliver pending transport events, then advance the soft timeout.
    fn tick(&self, delta: Duration) {
        while self.dispatch_next() {}
        self.update_timeout(delta);
    }

    fn is_tickable(&self) -> bool {
        self.is_processing()
    }
}

impl std::fmt::Debug for RequestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

static_assertions::assert_impl_all!(RequestSession: Send, Sync);
