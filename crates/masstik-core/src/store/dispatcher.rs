// ── Store / dispatcher ──
//
// All mutation funnels through `dispatch`. Actions are queued and drained
// by one caller at a time, so subscribers see changes in exact dispatch
// order even when a subscriber dispatches from inside a notification or
// another thread dispatches concurrently.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::{debug, trace};

use super::stream::StateStream;
use crate::action::Action;
use crate::reducer::reduce;
use crate::state::RootState;

/// One applied action, delivered to every subscriber.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub previous: Arc<RootState>,
    pub current: Arc<RootState>,
    pub action: Arc<Action>,
    /// Number of actions applied so far, including this one.
    pub version: u64,
}

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = dyn Fn(&StateChange) + Send + Sync;

/// The single owner of the authoritative `RootState`.
///
/// Cheaply cloneable via `Arc<StoreInner>`; every clone dispatches into
/// the same queue.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    initial: Arc<RootState>,
    state: ArcSwap<RootState>,
    version: AtomicU64,
    queue: Mutex<VecDeque<Action>>,
    /// Set while one caller is draining the queue.
    draining: AtomicBool,
    started: AtomicBool,
    subscribers: Mutex<Vec<(SubscriptionId, Arc<Handler>)>>,
    next_subscription: AtomicU64,
    publisher: watch::Sender<Arc<RootState>>,
}

impl Store {
    /// Create a store holding `initial`. Dispatched actions are held
    /// until [`start()`](Self::start) is called.
    pub fn new(initial: RootState) -> Self {
        let initial = Arc::new(initial);
        let (publisher, _) = watch::channel(Arc::clone(&initial));

        Self {
            inner: Arc::new(StoreInner {
                state: ArcSwap::new(Arc::clone(&initial)),
                initial,
                version: AtomicU64::new(0),
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                started: AtomicBool::new(false),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                publisher,
            }),
        }
    }

    /// Create a store that is already started.
    pub fn started(initial: RootState) -> Self {
        let store = Self::new(initial);
        store.start();
        store
    }

    /// The state the store was constructed with.
    pub fn initial_state(&self) -> Arc<RootState> {
        Arc::clone(&self.inner.initial)
    }

    /// The current authoritative snapshot.
    pub fn state(&self) -> Arc<RootState> {
        self.inner.state.load_full()
    }

    /// Number of actions applied so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Start the publish loop, applying any actions queued before now.
    pub fn start(&self) {
        if !self.inner.started.swap(true, Ordering::AcqRel) {
            debug!(queued = lock(&self.inner.queue).len(), "store started");
            self.drain();
        }
    }

    /// Queue `action` and apply it, unless another dispatch is already
    /// draining the queue, in which case that drain applies it.
    pub fn dispatch(&self, action: Action) {
        trace!(action = action.name(), "queue action");
        lock(&self.inner.queue).push_back(action);
        self.drain();
    }

    /// Register a synchronous handler, called after every applied action
    /// in registration order.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.subscribers).push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.inner.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    /// Async view of the latest published state.
    pub fn watch(&self) -> StateStream {
        StateStream::new(self.inner.publisher.subscribe())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn drain(&self) {
        let inner = &*self.inner;
        loop {
            if !inner.started.load(Ordering::Acquire) {
                return;
            }
            if inner
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            {
                let _flag = DrainFlag(&inner.draining);
                loop {
                    let next = lock(&inner.queue).pop_front();
                    let Some(action) = next else { break };
                    self.apply(action);
                }
            }

            // An action queued between the last pop and the flag reset
            // would otherwise wait for the next dispatch.
            if lock(&inner.queue).is_empty() {
                return;
            }
        }
    }

    fn apply(&self, action: Action) {
        let inner = &*self.inner;
        let previous = inner.state.load_full();
        let current = Arc::new(reduce(&previous, &action));
        inner.state.store(Arc::clone(&current));
        let version = inner.version.fetch_add(1, Ordering::AcqRel) + 1;

        debug!(action = action.name(), version, "applied action");

        // `send_replace` updates unconditionally, even with zero receivers.
        inner.publisher.send_replace(Arc::clone(&current));

        let handlers: Vec<Arc<Handler>> = lock(&inner.subscribers)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        if handlers.is_empty() {
            return;
        }

        let change = StateChange {
            previous,
            current,
            action: Arc::new(action),
            version,
        };
        for handler in handlers {
            handler(&change);
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("version", &self.version())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

/// Clears the draining flag even if a subscriber panics mid-drain.
struct DrainFlag<'a>(&'a AtomicBool);

impl Drop for DrainFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A panicking subscriber must not wedge the store for everyone else.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
