//! [`HttpTransport`] backed by `reqwest` on the shared tokio runtime.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tether_core::logging::targets;
use tokio::sync::{mpsc, oneshot};

use super::options::{HttpMethod, RequestBody};
use super::transport::{
    FailureReason, HttpTransport, TransportEvent, TransportRequest, TransportResponse,
    TransportStatus,
};
use crate::error::{NetworkError, Result};
use crate::runtime;

/// HTTP transport using a shared `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that sends `user_agent` with every request.
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn create_request(&self) -> Box<dyn TransportRequest> {
        Box::new(ReqwestRequest::new(self.client.clone()))
    }
}

#[derive(Debug, Clone)]
enum PreparedBody {
    Empty,
    Bytes(Bytes),
    File { path: PathBuf, len: u64 },
}

#[derive(Debug, Default)]
struct Lifecycle {
    status: TransportStatus,
    reason: FailureReason,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

struct ReqwestRequest {
    client: reqwest::Client,
    method: HttpMethod,
    url: String,
    headers: Vec<(String, String)>,
    body: PreparedBody,
    lifecycle: Arc<Mutex<Lifecycle>>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl ReqwestRequest {
    fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            method: HttpMethod::Get,
            url: String::new(),
            headers: Vec::new(),
            body: PreparedBody::Empty,
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
            events: None,
            cancel_tx: None,
        }
    }

    fn build(&self) -> Result<reqwest::RequestBuilder> {
        let url = reqwest::Url::parse(&self.url)?;
        let mut builder = self.client.request(self.method.to_reqwest(), url);
        for (name, value) in &self.headers {
            let name = http::HeaderName::from_bytes(name.as_bytes())?;
            let value = http::HeaderValue::from_str(value)?;
            builder = builder.header(name, value);
        }
        Ok(builder)
    }
}

impl TransportRequest for ReqwestRequest {
    fn set_method(&mut self, method: HttpMethod) {
        self.method = method;
    }

    fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn set_body(&mut self, body: &RequestBody) -> Result<u64> {
        self.body = match body {
            RequestBody::None => PreparedBody::Empty,
            RequestBody::Bytes(bytes) => PreparedBody::Bytes(bytes.clone()),
            RequestBody::Text(text) => PreparedBody::Bytes(Bytes::from(text.clone())),
            RequestBody::File(path) => {
                let metadata = std::fs::metadata(path)?;
                if !metadata.is_file() {
                    return Err(NetworkError::Io(format!("{} is not a file", path.display())));
                }
                PreparedBody::File {
                    path: path.clone(),
                    len: metadata.len(),
                }
            }
        };

        Ok(match &self.body {
            PreparedBody::Empty => 0,
            PreparedBody::Bytes(bytes) => bytes.len() as u64,
            PreparedBody::File { len, .. } => *len,
        })
    }

    fn process(&mut self) -> bool {
        if self.events.is_some() {
            return false;
        }

        let builder = match self.build() {
            Ok(builder) => builder,
            Err(err) => {
                tracing::warn!(target: targets::HTTP, url = %self.url, error = %err, "request rejected");
                return false;
            }
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let lifecycle = self.lifecycle.clone();
        let body = self.body.clone();

        {
            let mut state = lifecycle.lock();
            state.status = TransportStatus::Processing;
            state.started = Some(Instant::now());
        }

        let task = async move {
            let outcome = tokio::select! {
                outcome = perform(builder, body, &event_tx) => outcome,
                // Also resolves when the request handle is dropped.
                _ = cancel_rx => Err(FailureReason::Cancelled),
            };

            let (success, response) = {
                let mut state = lifecycle.lock();
                state.elapsed = state.started.map(|started| started.elapsed());
                match outcome {
                    Ok(response) => {
                        state.status = TransportStatus::Succeeded;
                        (true, Some(response))
                    }
                    Err(reason) => {
                        state.status = TransportStatus::Failed;
                        state.reason = reason;
                        (false, None)
                    }
                }
            };

            let _ = event_tx.send(TransportEvent::Complete { success, response });
        };

        if let Err(err) = runtime::spawn(task) {
            tracing::error!(target: targets::HTTP, error = %err, "cannot spawn request task");
            self.lifecycle.lock().status = TransportStatus::NotStarted;
            return false;
        }

        self.events = Some(event_rx);
        self.cancel_tx = Some(cancel_tx);
        true
    }

    fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    fn status(&self) -> TransportStatus {
        self.lifecycle.lock().status
    }

    fn elapsed(&self) -> Duration {
        let state = self.lifecycle.lock();
        state
            .elapsed
            .or_else(|| state.started.map(|started| started.elapsed()))
            .unwrap_or_default()
    }

    fn failure_reason(&self) -> FailureReason {
        self.lifecycle.lock().reason
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.as_mut()?.try_recv().ok()
    }
}

fn failure_reason(err: reqwest::Error) -> FailureReason {
    match NetworkError::from(err) {
        NetworkError::Timeout => FailureReason::TimedOut,
        NetworkError::Connection(_) => FailureReason::ConnectionError,
        _ => FailureReason::Other,
    }
}

async fn perform(
    builder: reqwest::RequestBuilder,
    body: PreparedBody,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> std::result::Result<TransportResponse, FailureReason> {
    let (builder, bytes_sent) = match body {
        PreparedBody::Empty => (builder, 0),
        PreparedBody::Bytes(bytes) => {
            let len = bytes.len() as u64;
            (builder.body(bytes), len)
        }
        PreparedBody::File { path, .. } => {
            let contents = tokio::fs::read(&path).await.map_err(|err| {
                tracing::warn!(target: targets::HTTP, path = %path.display(), error = %err, "cannot read request body");
                FailureReason::Other
            })?;
            let len = contents.len() as u64;
            (builder.body(contents), len)
        }
    };

    let mut response = builder.send().await.map_err(failure_reason)?;
    let status_code = response.status().as_u16();
    let download_total = response.content_length();

    for (name, value) in response.headers() {
        let _ = events.send(TransportEvent::Header {
            name: name.as_str().to_string(),
            value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
        });
    }
    let content_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    // The request body is fully written once response headers arrive.
    let _ = events.send(TransportEvent::Progress {
        bytes_sent,
        bytes_received: 0,
        chunk: Bytes::new(),
        download_total,
    });

    let mut received = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(failure_reason)? {
        received.extend_from_slice(&chunk);
        let _ = events.send(TransportEvent::Progress {
            bytes_sent,
            bytes_received: received.len() as u64,
            chunk,
            download_total,
        });
    }

    Ok(TransportResponse {
        status_code,
        content_type,
        body: received.freeze(),
    })
}
