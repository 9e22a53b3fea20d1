//! Tracking of live sessions for bulk shutdown.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tether_core::Tickable;
use tether_core::logging::targets;

use crate::http::RequestSession;
use crate::websocket::SocketSession;

/// Identity of a request or socket session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sessions of one kind.
///
/// `live` is what `shutdown_all` acts on. `draining` holds sessions that left
/// `live` but may still owe their terminal callback; they keep being ticked
/// until they stop being tickable.
struct Tracked<T> {
    live: HashMap<SessionId, Weak<T>>,
    draining: HashMap<SessionId, Weak<T>>,
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            draining: HashMap::new(),
        }
    }
}

impl<T> Tracked<T> {
    fn insert(&mut self, id: SessionId, session: Weak<T>) -> bool {
        if self.live.contains_key(&id) {
            return false;
        }
        self.draining.remove(&id);
        self.live.insert(id, session);
        true
    }

    fn retire(&mut self, id: SessionId) -> bool {
        match self.live.remove(&id) {
            Some(session) => {
                self.draining.insert(id, session);
                true
            }
            None => false,
        }
    }

    /// Move every live session to `draining` and return the ones still alive.
    fn retire_all(&mut self) -> Vec<Arc<T>> {
        let retired: Vec<_> = self.live.drain().collect();
        let mut alive = Vec::with_capacity(retired.len());
        for (id, session) in retired {
            if let Some(strong) = session.upgrade() {
                alive.push(strong);
                self.draining.insert(id, session);
            }
        }
        alive
    }

    /// Upgrade every entry, dropping the ones whose session is gone.
    fn snapshot(&mut self) -> Vec<Arc<T>> {
        self.live.retain(|_, session| session.strong_count() > 0);
        self.draining.retain(|_, session| session.strong_count() > 0);
        self.live
            .values()
            .chain(self.draining.values())
            .filter_map(Weak::upgrade)
            .collect()
    }
}

/// Non-owning set of active sessions.
///
/// Sessions register themselves when they start and unregister when they
/// reach a terminal state or are closed. The host owns the registry and calls
/// [`shutdown_all`](Self::shutdown_all) at teardown; nothing happens on drop.
///
/// The registry is also [`Tickable`]: ticking it ticks every registered
/// session, so a host can drive all sessions from one call per frame.
/// Unregistered sessions are still ticked until they have delivered their
/// pending events, so a `closed` or `failed` callback that follows `close`,
/// `cancel` or `shutdown_all` is never lost.
#[derive(Default)]
pub struct ClientRegistry {
    requests: Mutex<Tracked<RequestSession>>,
    sockets: Mutex<Tracked<SocketSession>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request session. Returns `false` if it was already tracked.
    pub fn register_request(&self, session: &Arc<RequestSession>) -> bool {
        let added = self
            .requests
            .lock()
            .insert(session.id(), Arc::downgrade(session));
        if added {
            tracing::debug!(target: targets::REGISTRY, id = %session.id(), "request registered");
        }
        added
    }

    /// Stop tracking a request session. Returns `false` if it was not tracked.
    pub fn unregister_request(&self, id: SessionId) -> bool {
        let removed = self.requests.lock().retire(id);
        if removed {
            tracing::debug!(target: targets::REGISTRY, %id, "request unregistered");
        }
        removed
    }

    /// Track a socket session. Returns `false` if it was already tracked.
    pub fn register_socket(&self, session: &Arc<SocketSession>) -> bool {
        let added = self
            .sockets
            .lock()
            .insert(session.id(), Arc::downgrade(session));
        if added {
            tracing::debug!(target: targets::REGISTRY, id = %session.id(), "socket registered");
        }
        added
    }

    /// Stop tracking a socket session. Returns `false` if it was not tracked.
    pub fn unregister_socket(&self, id: SessionId) -> bool {
        let removed = self.sockets.lock().retire(id);
        if removed {
            tracing::debug!(target: targets::REGISTRY, %id, "socket unregistered");
        }
        removed
    }

    /// Whether a request session is tracked.
    pub fn contains_request(&self, id: SessionId) -> bool {
        self.requests.lock().live.contains_key(&id)
    }

    /// Whether a socket session is tracked.
    pub fn contains_socket(&self, id: SessionId) -> bool {
        self.sockets.lock().live.contains_key(&id)
    }

    /// Number of tracked request sessions.
    pub fn request_count(&self) -> usize {
        self.requests.lock().live.len()
    }

    /// Number of tracked socket sessions.
    pub fn socket_count(&self) -> usize {
        self.sockets.lock().live.len()
    }

    /// Number of untracked sessions still being ticked for pending events.
    pub fn draining_count(&self) -> usize {
        self.requests.lock().draining.len() + self.sockets.lock().draining.len()
    }

    /// Cancel every tracked request and close every tracked socket.
    ///
    /// Each session is handled once and the registry is empty afterwards.
    /// Sessions that were already dropped are skipped. The resulting `failed`
    /// and `closed` callbacks are delivered by later ticks. Returns how many
    /// sessions were cancelled or closed.
    pub fn shutdown_all(&self) -> usize {
        let requests = self.requests.lock().retire_all();
        let sockets = self.sockets.lock().retire_all();
        let count = requests.len() + sockets.len();

        for session in requests {
            session.cancel();
        }
        for session in sockets {
            session.close_normal();
        }

        tracing::info!(target: targets::REGISTRY, count, "all sessions shut down");
        count
    }
}

impl Tickable for ClientRegistry {
    fn tick(&self, delta: Duration) {
        // Sessions register and unregister while ticking, so work on a
        // snapshot taken with the registry unlocked.
        let requests = self.requests.lock().snapshot();
        let sockets = self.sockets.lock().snapshot();

        let mut finished_requests = Vec::new();
        for session in requests {
            session.tick(delta);
            if !session.is_tickable() {
                finished_requests.push(session.id());
            }
        }
        let mut finished_sockets = Vec::new();
        for session in sockets {
            session.tick(delta);
            if !session.is_tickable() {
                finished_sockets.push(session.id());
            }
        }

        let mut tracked = self.requests.lock();
        for id in finished_requests {
            tracked.draining.remove(&id);
        }
        drop(tracked);
        let mut tracked = self.sockets.lock();
        for id in finished_sockets {
            tracked.draining.remove(&id);
        }
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("requests", &self.request_count())
            .field("sockets", &self.socket_count())
            .field("draining", &self.draining_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(ClientRegistry: Send, Sync);
