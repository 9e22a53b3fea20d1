//! Core primitives for Tether.
//!
//! This crate provides the pieces the network sessions in `tether-net` are
//! built from:
//!
//! - **Signal/Slot System**: Observer lists used for every session callback
//! - **Timers**: A tick-driven [`TimerQueue`] behind the [`Scheduler`] seam
//! - **Ticking**: The [`Tickable`] trait hosts drive once per frame
//! - **Logging**: `tracing` target names for each subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use tether_core::Signal;
//!
//! let progress = Signal::<f32>::new();
//!
//! let conn_id = progress.connect(|percent| {
//!     println!("Downloaded {percent:.1}%");
//! });
//!
//! progress.emit(42.0);
//! progress.disconnect(conn_id);
//! ```
//!
//! # Timer Example
//!
//! ```
//! use std::time::Duration;
//! use tether_core::{Scheduler, Tickable, TimerQueue};
//!
//! let timers = TimerQueue::new();
//! let id = timers.schedule_once(Duration::from_millis(250), Box::new(|| println!("retrying")));
//!
//! // Called from the host's frame loop.
//! timers.tick(Duration::from_millis(250));
//! assert!(!timers.is_pending(id));
//! ```

mod error;
pub mod logging;
pub mod signal;
mod tick;
mod timer;

pub use error::{CoreError, Result, TimerError};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use tick::Tickable;
pub use timer::{OnceTask, RepeatingTask, Scheduler, TimerId, TimerKind, TimerQueue};
