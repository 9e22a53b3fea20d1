//! The seam between request sessions and an HTTP client engine.
//!
//! A transport hands out one [`TransportRequest`] per logical request. The
//! session configures it, calls [`process`](TransportRequest::process), and
//! from then on drains [`TransportEvent`]s with
//! [`poll_event`](TransportRequest::poll_event) from its own `tick`, so every
//! callback runs on the thread that drives the session.

use std::time::Duration;

use bytes::Bytes;

use super::options::{HttpMethod, RequestBody};
use crate::error::Result;

/// Creates request handles.
pub trait HttpTransport: Send + Sync {
    /// A fresh, unconfigured request.
    fn create_request(&self) -> Box<dyn TransportRequest>;
}

/// One request as seen by the engine that performs it.
pub trait TransportRequest: Send {
    /// Set the request method.
    fn set_method(&mut self, method: HttpMethod);

    /// Set the target URL.
    fn set_url(&mut self, url: &str);

    /// Add or replace a request header.
    fn set_header(&mut self, name: &str, value: &str);

    /// Attach the request body.
    ///
    /// Returns the payload length in bytes, used as the upload denominator.
    /// Fails if the body cannot be prepared, for example an unreadable file.
    fn set_body(&mut self, body: &RequestBody) -> Result<u64>;

    /// Start the request. Returns whether the engine accepted it.
    fn process(&mut self) -> bool;

    /// Ask the engine to abort. Completion is still reported through
    /// [`TransportEvent::Complete`].
    fn cancel(&mut self);

    /// Current engine-level status.
    fn status(&self) -> TransportStatus;

    /// Time since `process` was called.
    fn elapsed(&self) -> Duration;

    /// Why the request failed, once it has.
    fn failure_reason(&self) -> FailureReason;

    /// Next pending notification, if any.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}

/// Notifications produced by a running request, in arrival order.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A response header arrived.
    Header {
        /// Header name as sent by the server.
        name: String,
        /// Header value.
        value: String,
    },
    /// Bytes moved in either direction.
    Progress {
        /// Total request bytes sent so far.
        bytes_sent: u64,
        /// Total response bytes received so far.
        bytes_received: u64,
        /// Response bytes received since the previous progress event.
        chunk: Bytes,
        /// Announced response length, if known.
        download_total: Option<u64>,
    },
    /// The request finished, successfully or not. Always the last event.
    Complete {
        /// Whether the engine considers the exchange successful.
        success: bool,
        /// The response, when one was received.
        response: Option<TransportResponse>,
    },
}

/// A received response.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Value of the `Content-Type` header, or empty.
    pub content_type: String,
    /// The full response body.
    pub body: Bytes,
}

/// Engine-level request status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransportStatus {
    /// Not yet processed.
    #[default]
    NotStarted,
    /// In flight.
    Processing,
    /// Finished with a failure.
    Failed,
    /// Finished successfully.
    Succeeded,
}

impl TransportStatus {
    /// Display name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Processing => "Processing",
            Self::Failed => "Failed",
            Self::Succeeded => "Succeeded",
        }
    }

    /// Whether the status is terminal.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Failed | Self::Succeeded)
    }
}

/// Why the engine failed a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// No failure recorded.
    #[default]
    None,
    /// The connection could not be established or was lost.
    ConnectionError,
    /// Aborted through [`TransportRequest::cancel`].
    Cancelled,
    /// The engine's own timeout elapsed.
    TimedOut,
    /// Anything else.
    Other,
}
