//! Tick-driven timer queue.
//!
//! Tether never owns a thread. Deadlines live on a virtual clock that the host
//! advances from its own frame/tick loop, so a reconnect delay of two seconds
//! means "two seconds of accumulated `advance` calls", with a resolution
//! bounded by the tick frequency.
//!
//! [`Scheduler`] is the seam sessions depend on; [`TimerQueue`] is the
//! implementation shipped with the crate.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, TimerError};
use crate::logging::targets;
use crate::tick::Tickable;

new_key_type! {
    /// A unique identifier for a scheduled timer.
    pub struct TimerId;
}

/// A one-shot task handed to a [`Scheduler`].
pub type OnceTask = Box<dyn FnOnce() + Send>;

/// A repeating task handed to [`TimerQueue::schedule_repeating`].
pub type RepeatingTask = Box<dyn FnMut() + Send>;

/// Host-supplied single-shot timers.
///
/// Tasks run on the thread that drives the scheduler, never inside
/// `schedule_once` itself.
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay` has elapsed.
    fn schedule_once(&self, delay: Duration, task: OnceTask) -> TimerId;

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// never scheduled.
    fn cancel(&self, id: TimerId) -> bool;

    /// Whether `id` is still waiting to fire.
    fn is_pending(&self, id: TimerId) -> bool;
}

/// The kind of timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once after the specified duration.
    OneShot,
    /// Fires repeatedly at the specified interval.
    Repeating,
}

enum TimerTask {
    Once(Option<OnceTask>),
    /// `None` while the callback is running outside the lock.
    Repeating(Option<RepeatingTask>),
}

struct TimerData {
    deadline: Duration,
    interval: Duration,
    task: TimerTask,
}

impl TimerData {
    fn kind(&self) -> TimerKind {
        match self.task {
            TimerTask::Once(_) => TimerKind::OneShot,
            TimerTask::Repeating(_) => TimerKind::Repeating,
        }
    }
}

/// An entry in the timer queue (min-heap by deadline, FIFO among equals).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    deadline: Duration,
    seq: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct TimerState {
    now: Duration,
    seq: u64,
    timers: SlotMap<TimerId, TimerData>,
    queue: BinaryHeap<TimerQueueEntry>,
}

impl TimerState {
    fn insert(&mut self, delay: Duration, task: TimerTask) -> TimerId {
        let deadline = self.now + delay;
        let id = self.timers.insert(TimerData {
            deadline,
            interval: delay,
            task,
        });
        self.push(id, deadline);
        id
    }

    fn push(&mut self, id: TimerId, deadline: Duration) {
        self.seq += 1;
        self.queue.push(TimerQueueEntry {
            id,
            deadline,
            seq: self.seq,
        });
    }
}

enum Fired {
    Once(TimerId, OnceTask),
    Repeating(TimerId, RepeatingTask),
}

/// A thread-safe, tick-driven timer queue.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::time::Duration;
/// use tether_core::{Scheduler, TimerQueue};
///
/// let timers = TimerQueue::new();
/// let fired = Arc::new(AtomicBool::new(false));
///
/// let flag = fired.clone();
/// timers.schedule_once(Duration::from_secs(2), Box::new(move || flag.store(true, Ordering::SeqCst)));
///
/// timers.advance(Duration::from_secs(1));
/// assert!(!fired.load(Ordering::SeqCst));
/// timers.advance(Duration::from_secs(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[derive(Default)]
pub struct TimerQueue {
    state: Mutex<TimerState>,
}

impl TimerQueue {
    /// Create an empty timer queue whose clock starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a repeating timer. The first fire occurs after `interval`.
    pub fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TimerId {
        self.state
            .lock()
            .insert(interval, TimerTask::Repeating(Some(task)))
    }

    /// Stop and remove a timer.
    ///
    /// Returns an error if the timer has already fired or never existed.
    pub fn stop(&self, id: TimerId) -> Result<()> {
        match self.state.lock().timers.remove(id) {
            Some(_) => Ok(()),
            None => Err(TimerError::InvalidTimerId.into()),
        }
    }

    /// The kind of a live timer.
    pub fn kind(&self, id: TimerId) -> Option<TimerKind> {
        self.state.lock().timers.get(id).map(TimerData::kind)
    }

    /// Current position of the virtual clock.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Get the duration until the next timer fires, if any.
    pub fn time_until_next(&self) -> Option<Duration> {
        let mut state = self.state.lock();

        // Clean up any cancelled timers from the front of the queue.
        while let Some(entry) = state.queue.peek() {
            if state.timers.contains_key(entry.id) {
                break;
            }
            state.queue.pop();
        }

        let now = state.now;
        state
            .queue
            .peek()
            .map(|entry| entry.deadline.saturating_sub(now))
    }

    /// Get the number of live timers.
    pub fn active_count(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Move the clock forward by `delta` and run every timer that expired.
    ///
    /// Tasks run in deadline order after the internal lock is released, so a
    /// task may schedule or cancel timers. Timers scheduled by a task are first
    /// considered on the next call. Returns the number of tasks that ran.
    #[tracing::instrument(skip(self), target = "tether_core::timer", level = "trace")]
    pub fn advance(&self, delta: Duration) -> usize {
        let fired = self.collect_expired(delta);
        let count = fired.len();

        for fired in fired {
            match fired {
                Fired::Once(id, task) => {
                    tracing::trace!(target: targets::TIMER, ?id, "one-shot timer fired");
                    task();
                }
                Fired::Repeating(id, mut task) => {
                    tracing::trace!(target: targets::TIMER, ?id, "repeating timer fired");
                    task();
                    // Hand the callback back unless the timer was stopped meanwhile.
                    let mut state = self.state.lock();
                    if let Some(TimerData {
                        task: TimerTask::Repeating(slot),
                        ..
                    }) = state.timers.get_mut(id)
                    {
                        *slot = Some(task);
                    }
                }
            }
        }

        count
    }

    fn collect_expired(&self, delta: Duration) -> Vec<Fired> {
        let mut state = self.state.lock();
        state.now += delta;
        let now = state.now;

        let mut fired = Vec::new();
        let mut rescheduled = Vec::new();

        while let Some(entry) = state.queue.peek().copied() {
            if entry.deadline > now {
                break;
            }
            state.queue.pop();

            let Some(timer) = state.timers.get_mut(entry.id) else {
                continue;
            };
            // Stale heap entry left behind by a reschedule.
            if timer.deadline != entry.deadline {
                continue;
            }

            match &mut timer.task {
                TimerTask::Once(task) => {
                    if let Some(task) = task.take() {
                        fired.push(Fired::Once(entry.id, task));
                    }
                    state.timers.remove(entry.id);
                }
                TimerTask::Repeating(task) => {
                    if let Some(task) = task.take() {
                        fired.push(Fired::Repeating(entry.id, task));
                    }
                    timer.deadline = now + timer.interval;
                    rescheduled.push((entry.id, timer.deadline));
                }
            }
        }

        for (id, deadline) in rescheduled {
            state.push(id, deadline);
        }

        fired
    }
}

impl Scheduler for TimerQueue {
    fn schedule_once(&self, delay: Duration, task: OnceTask) -> TimerId {
        let id = self.state.lock().insert(delay, TimerTask::Once(Some(task)));
        tracing::trace!(target: targets::TIMER, ?id, ?delay, "one-shot timer scheduled");
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.stop(id).is_ok()
    }

    fn is_pending(&self, id: TimerId) -> bool {
        self.state.lock().timers.contains_key(id)
    }
}

impl Tickable for TimerQueue {
    fn tick(&self, delta: Duration) {
        self.advance(delta);
    }
}

impl std::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TimerQueue")
            .field("now", &state.now)
            .field("active", &state.timers.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(TimerQueue: Send, Sync);
