//! The request accumulator handed to every request callback.

use std::collections::HashMap;
use std::time::Duration;

use super::transport::{FailureReason, TransportStatus};
use crate::content::ContentBuffer;
use crate::error::RequestErrorKind;
use crate::sse::ServerSentEvent;

/// Content type that switches a response into server-sent event parsing.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// State of one request, updated as the request progresses.
///
/// Each signal receives a snapshot taken right after the update that
/// triggered it.
#[derive(Debug, Clone)]
pub struct RequestResult {
    /// Whether the engine reported a terminal status.
    pub is_finished: bool,
    /// Whether the request was cancelled by the caller.
    pub is_canceled: bool,
    /// Whether the soft timeout elapsed.
    pub is_timed_out: bool,
    /// Whether `code` is a 2xx status.
    pub is_ok: bool,
    /// Whether the response is an event stream.
    pub is_server_sent_event: bool,
    /// HTTP status code, zero until a response arrives.
    pub code: u16,
    /// Response headers received so far.
    pub headers: HashMap<String, String>,
    /// Response content type.
    pub content_type: String,
    /// Full response body, set on completion.
    pub content: ContentBuffer,
    /// The most recent server-sent event.
    pub event: ServerSentEvent,
    /// Time spent in the engine.
    pub elapsed: Duration,
    /// Engine status name (`"Processing"`, `"Succeeded"`, `"Failed"`...).
    pub status: String,
    /// Request bytes sent so far.
    pub bytes_sent: u64,
    /// Response bytes received so far.
    pub bytes_received: u64,
    /// Download progress in percent, `-1.0` while the total is unknown.
    pub download_percentage: f32,
    /// Upload progress in percent, `-1.0` while the total is unknown.
    pub upload_percentage: f32,
    /// Classified failure.
    pub error_kind: RequestErrorKind,
    /// Human-readable failure description.
    pub error: String,
}

impl Default for RequestResult {
    fn default() -> Self {
        Self {
            is_finished: false,
            is_canceled: false,
            is_timed_out: false,
            is_ok: false,
            is_server_sent_event: false,
            code: 0,
            headers: HashMap::new(),
            content_type: String::new(),
            content: ContentBuffer::default(),
            event: ServerSentEvent::default(),
            elapsed: Duration::ZERO,
            status: String::new(),
            bytes_sent: 0,
            bytes_received: 0,
            download_percentage: -1.0,
            upload_percentage: -1.0,
            error_kind: RequestErrorKind::None,
            error: String::new(),
        }
    }
}

impl RequestResult {
    /// Whether `content_type` announces an event stream.
    pub fn has_event_stream_content_type(&self) -> bool {
        self.content_type
            .get(..EVENT_STREAM_CONTENT_TYPE.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(EVENT_STREAM_CONTENT_TYPE))
    }

    pub(crate) fn fail(&mut self, kind: RequestErrorKind, message: impl Into<String>) {
        self.error_kind = kind;
        self.error = message.into();
    }
}

/// Percentage of `done` over `total`, or `None` for an unknown total.
pub(crate) fn percentage(done: u64, total: Option<u64>) -> Option<f32> {
    match total {
        Some(total) if total > 0 => Some((done as f64 / total as f64 * 100.0) as f32),
        _ => None,
    }
}

/// Classify a failed completion.
///
/// The caller's own timeout and cancel flags take precedence over what the
/// engine reports, then connection failures, then a missing response.
pub(crate) fn classify_failure(
    result: &RequestResult,
    status: TransportStatus,
    reason: FailureReason,
    has_response: bool,
) -> (RequestErrorKind, &'static str) {
    let failed_with = |r: FailureReason| status == TransportStatus::Failed && reason == r;

    if result.is_timed_out || failed_with(FailureReason::TimedOut) {
        (RequestErrorKind::TimedOut, "Request canceled because timed out")
    } else if result.is_canceled || failed_with(FailureReason::Cancelled) {
        (RequestErrorKind::Canceled, "Request canceled by user")
    } else if failed_with(FailureReason::ConnectionError) {
        (
            RequestErrorKind::Connection,
            "Request failed due to the network connection",
        )
    } else if !has_response {
        (
            RequestErrorKind::InvalidResponse,
            "Invalid response object, cannot complete request",
        )
    } else {
        (
            RequestErrorKind::FailedRequest,
            "Request completed with a fail status",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(50, Some(200)), Some(25.0));
        assert_eq!(percentage(50, Some(0)), None);
        assert_eq!(percentage(50, None), None);
    }

    #[test]
    fn test_event_stream_detection() {
        let mut result = RequestResult::default();
        assert!(!result.has_event_stream_content_type());

        result.content_type = "text/event-stream; charset=utf-8".into();
        assert!(result.has_event_stream_content_type());

        result.content_type = "text/event".into();
        assert!(!result.has_event_stream_content_type());
    }

    #[test]
    fn test_classification_priority() {
        let mut result = RequestResult::default();
        let failed = TransportStatus::Failed;

        assert_eq!(
            classify_failure(&result, failed, FailureReason::Other, true).0,
            RequestErrorKind::FailedRequest
        );
        assert_eq!(
            classify_failure(&result, failed, FailureReason::Other, false).0,
            RequestErrorKind::InvalidResponse
        );
        assert_eq!(
            classify_failure(&result, failed, FailureReason::ConnectionError, false).0,
            RequestErrorKind::Connection
        );
        assert_eq!(
            classify_failure(&result, failed, FailureReason::Cancelled, false).0,
            RequestErrorKind::Canceled
        );

        result.is_canceled = true;
        assert_eq!(
            classify_failure(&result, failed, FailureReason::ConnectionError, false).0,
            RequestErrorKind::Canceled
        );

        // A soft timeout cancels, so both flags are set; timeout wins.
        result.is_timed_out = true;
        assert_eq!(
            classify_failure(&result, failed, FailureReason::Cancelled, false).0,
            RequestErrorKind::TimedOut
        );
    }

    #[test]
    fn test_reason_ignored_unless_failed() {
        let result = RequestResult::default();
        assert_eq!(
            classify_failure(&result, TransportStatus::Succeeded, FailureReason::TimedOut, true).0,
            RequestErrorKind::FailedRequest
        );
    }
}
