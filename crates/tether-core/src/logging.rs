//! Logging targets for Tether.
//!
//! Tether uses the `tracing` crate for instrumentation and never installs a
//! subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("tether_net::websocket=debug,tether_net::http=info")
//!         .init();
//! }
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Timer queue target.
    pub const TIMER: &str = "tether_core::timer";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "tether_core::signal";
    /// HTTP request sessions.
    pub const HTTP: &str = "tether_net::http";
    /// Server-sent event framing.
    pub const SSE: &str = "tether_net::sse";
    /// WebSocket sessions.
    pub const WEBSOCKET: &str = "tether_net::websocket";
    /// Live-session registry.
    pub const REGISTRY: &str = "tether_net::registry";
}
