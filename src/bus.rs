//! Ordered, synchronous publish/subscribe.
//!
//! [`EventBus::publish`] calls every subscriber in subscription order on the
//! calling thread before returning. Publishes from different threads are
//! serialized; a subscriber may publish again from inside its own callback
//! because the dispatch lock is re-entrant.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use tracing::{error, trace};

use crate::event::Event;

/// A bus subscriber. Receives the bus so it can publish follow-up events.
pub type Subscriber = dyn Fn(&EventBus, &Event) + Send + Sync;

struct BusInner {
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
    dispatch: ReentrantMutex<()>,
}

/// Cheaply cloneable handle to a shared event bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(Vec::new()),
                dispatch: ReentrantMutex::new(()),
            }),
        }
    }

    /// Append a subscriber. It sees every event published after this call
    /// returns; a publish already in progress is not affected.
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&EventBus, &Event) + Send + Sync + 'static,
    {
        self.inner.subscribers.write().push(Arc::new(subscriber));
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// True when nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every subscriber, in order.
    ///
    /// A panicking subscriber is logged and skipped; the remaining
    /// subscribers still run.
    pub fn publish(&self, event: Event) {
        let _dispatch = self.inner.dispatch.lock();
        let subscribers = self.inner.subscribers.read().clone();
        trace!(kind = event.kind(), "publish");

        for subscriber in subscribers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber(self, &event)));
            if let Err(payload) = outcome {
                error!(
                    kind = event.kind(),
                    "bus subscriber panicked: {}",
                    panic_message(&*payload)
                );
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
