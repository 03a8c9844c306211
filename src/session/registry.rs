//! Per-event-type handler lists.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::Session;
use crate::event::Event;

/// A session event handler.
pub type Handler = dyn Fn(&Session, &Event) -> anyhow::Result<()> + Send + Sync;

/// A dispatch-time predicate; the handler runs only when it returns `true`.
pub type Filter = dyn Fn(&Event) -> bool + Send + Sync;

/// Opaque handle returned when a handler is registered.
///
/// Ids increase monotonically for the lifetime of a session and are never
/// reused, so they double as correlation tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct Registration {
    pub(crate) id: HandlerId,
    pub(crate) handler: Box<Handler>,
    pub(crate) filter: Option<Box<Filter>>,
    removed: AtomicBool,
}

impl Registration {
    pub(crate) fn is_live(&self) -> bool {
        !self.removed.load(Ordering::Acquire)
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<Arc<Registration>>>>,
}

impl Registry {
    pub(crate) fn insert(
        &self,
        kind: &str,
        handler: Box<Handler>,
        filter: Option<Box<Filter>>,
    ) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let registration = Arc::new(Registration {
            id,
            handler,
            filter,
            removed: AtomicBool::new(false),
        });
        self.handlers
            .lock()
            .entry(kind.to_string())
            .or_default()
            .push(registration);
        id
    }

    /// Remove a handler. A dispatch already in progress skips it from now on.
    pub(crate) fn remove(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        for list in handlers.values_mut() {
            if let Some(pos) = list.iter().position(|r| r.id == id) {
                let registration = list.remove(pos);
                registration.removed.store(true, Ordering::Release);
                return true;
            }
        }
        false
    }

    /// Handlers for `kind`, in registration order.
    pub(crate) fn snapshot(&self, kind: &str) -> Vec<Arc<Registration>> {
        self.handlers
            .lock()
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, kind: &str) -> usize {
        self.handlers.lock().get(kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Box<Handler> {
        Box::new(|_, _| Ok(()))
    }

    #[test]
    fn test_ids_are_monotonic() {
        let registry = Registry::default();
        let a = registry.insert("x", noop(), None);
        let b = registry.insert("y", noop(), None);
        let c = registry.insert("x", noop(), None);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let registry = Registry::default();
        let a = registry.insert("x", noop(), None);
        let b = registry.insert("x", noop(), None);
        let ids: Vec<_> = registry.snapshot("x").iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(registry.snapshot("missing").is_empty());
    }

    #[test]
    fn test_remove_marks_snapshot_entries_dead() {
        let registry = Registry::default();
        let a = registry.insert("x", noop(), None);
        let snapshot = registry.snapshot("x");

        assert!(registry.remove(a));
        assert!(!snapshot[0].is_live());
        assert_eq!(registry.count("x"), 0);
        assert!(!registry.remove(a));
    }
}
