//! HTTP request sessions.
//!
//! - [`RequestSession`] - one logical request: validation, progress,
//!   server-sent events, soft timeout, classified failures
//! - [`RequestOptions`] - what to send
//! - [`RequestResult`] - what every callback receives
//! - [`HttpTransport`] - the engine seam, with [`ReqwestTransport`] as the
//!   bundled implementation

mod options;
mod reqwest_transport;
mod result;
mod session;
mod transport;

pub use options::{CONTENT_TYPE_HEADER, ContentType, HttpMethod, RequestBody, RequestOptions};
pub use reqwest_transport::ReqwestTransport;
pub use result::{EVENT_STREAM_CONTENT_TYPE, RequestResult};
pub use session::{RequestSession, RequestState};
pub use transport::{
    FailureReason, HttpTransport, TransportEvent, TransportRequest, TransportResponse,
    TransportStatus,
};

pub(crate) use options::positive_secs;
