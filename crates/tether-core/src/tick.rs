//! The cooperative tick seam.

use std::time::Duration;

/// Something the host advances once per frame or loop iteration.
///
/// Sessions do all of their callback dispatch and timeout bookkeeping from
/// `tick`, so every signal fires on the thread that drives the ticks.
pub trait Tickable: Send + Sync {
    /// Advance by `delta`, the time elapsed since the previous tick.
    fn tick(&self, delta: Duration);

    /// Whether ticking currently has any effect.
    fn is_tickable(&self) -> bool {
        true
    }
}
