//! Shared tokio runtime for the bundled transports.
//!
//! Sessions never block on it: transports spawn their I/O here and hand
//! results back through channels the sessions drain on `tick`.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::error::{NetworkError, Result};

/// The build error is kept as text so a failed start is reported to every caller.
static RUNTIME: OnceLock<std::result::Result<Runtime, String>> = OnceLock::new();

/// Initialize the async runtime.
///
/// If not called explicitly, the runtime is created on first use.
pub fn init() -> Result<&'static Runtime> {
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("tether-net")
                .enable_all()
                .build()
                .map_err(|err| err.to_string())
        })
        .as_ref()
        .map_err(|err| NetworkError::Io(format!("failed to create tokio runtime: {err}")))
}

/// Spawn a future on the shared runtime.
pub fn spawn<F>(future: F) -> Result<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    Ok(init()?.spawn(future))
}
