//! Defaults shared by all sessions, loadable from TOML.
//!
//! ```toml
//! request_timeout_secs = 30.0
//! user_agent = "my-game/1.4"
//! reconnect_timeout_secs = 2.0
//! max_reconnect_attempts = 5
//!
//! [default_headers]
//! Accept = "application/json"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tether_core::logging::targets;

use crate::error::Result;
use crate::http::{ReqwestTransport, RequestOptions};
use crate::websocket::{DEFAULT_MAX_RECONNECT_ATTEMPTS, SocketOptions};

/// Network defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Soft timeout for requests that do not set one. Zero disables it.
    pub request_timeout_secs: f64,
    /// User agent sent by the bundled HTTP transport.
    pub user_agent: Option<String>,
    /// Headers added to requests that do not already set them.
    pub default_headers: HashMap<String, String>,
    /// Reconnect delay for sockets that do not set one. Zero disables it.
    pub reconnect_timeout_secs: f64,
    /// Reconnect budget applied together with `reconnect_timeout_secs`.
    pub max_reconnect_attempts: u32,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 0.0,
            user_agent: None,
            default_headers: HashMap::new(),
            reconnect_timeout_secs: 0.0,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl NetConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(target: targets::HTTP, path = %path.display(), "network config loaded");
        Ok(config)
    }

    /// Fill in the timeout and headers `options` leaves unset.
    pub fn apply_request_defaults(&self, options: &mut RequestOptions) {
        if options.timeout().is_none() {
            options.timeout_secs = self.request_timeout_secs;
        }
        for (name, value) in &self.default_headers {
            let present = options
                .headers
                .keys()
                .any(|existing| existing.eq_ignore_ascii_case(name));
            if !present {
                options.headers.insert(name.clone(), value.clone());
            }
        }
    }

    /// Fill in the reconnect policy when `options` has reconnecting disabled.
    pub fn apply_socket_defaults(&self, options: &mut SocketOptions) {
        if options.reconnect_delay().is_none() {
            options.reconnect_timeout_secs = self.reconnect_timeout_secs;
            options.max_reconnect_attempts = self.max_reconnect_attempts;
        }
    }

    /// An HTTP transport honoring `user_agent`.
    pub fn http_transport(&self) -> Result<ReqwestTransport> {
        match &self.user_agent {
            Some(user_agent) => ReqwestTransport::with_user_agent(user_agent),
            None => Ok(ReqwestTransport::new()),
        }
    }
}
