//! Ordered, dynamically mutable set of listeners.

use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use keyspec::Modifier;
use parking_lot::RwLock;
use tracing::debug;

use crate::Listener;

/// Handle returned by registration, used to deregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listeners in registration order.
///
/// Broadcasts iterate over a snapshot taken under the read lock, so a
/// listener may register or deregister (itself included) from inside a
/// callback.
#[derive(Default)]
pub struct ListenerRegistry {
    /// Next id to hand out.
    next: AtomicU64,
    /// Registered listeners.
    entries: RwLock<Vec<(ListenerId, Arc<dyn Listener>)>>,
}

impl ListenerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener.
    pub fn register(&self, listener: Arc<dyn Listener>) -> ListenerId {
        self.register_with(|_| listener)
    }

    /// Append a listener that needs to know its own id, e.g. to remove
    /// itself later.
    pub fn register_with<F>(&self, make: F) -> ListenerId
    where
        F: FnOnce(ListenerId) -> Arc<dyn Listener>,
    {
        let id = ListenerId(self.next.fetch_add(1, Ordering::Relaxed));
        let listener = make(id);
        self.entries.write().push((id, listener));
        debug!(?id, "listener_registered");
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn deregister(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(i, _)| *i != id);
        let removed = entries.len() != before;
        if removed {
            debug!(?id, "listener_deregistered");
        }
        removed
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Current listeners, in order.
    pub fn snapshot(&self) -> Vec<Arc<dyn Listener>> {
        self.entries.read().iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    /// Deliver a keypress to every listener.
    pub fn broadcast_keypress(&self, key: &str, title: &str) {
        for l in self.snapshot() {
            l.handle_keypress(key, title);
        }
    }

    /// Deliver a hotkey to every listener.
    pub fn broadcast_hotkey(&self, key: &str, modifiers: &BTreeSet<Modifier>, title: &str) {
        for l in self.snapshot() {
            l.handle_hotkey(key, modifiers, title);
        }
    }

    /// Deliver a mouse click to every listener.
    pub fn broadcast_mouseclick(&self) {
        for l in self.snapshot() {
            l.handle_mouseclick();
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    /// Appends its tag to a shared log on every keypress.
    struct Tagged {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Listener for Tagged {
        fn handle_keypress(&self, key: &str, _window_title: &str) {
            self.log.lock().push(format!("{}:{key}", self.tag));
        }
        fn handle_hotkey(&self, _key: &str, _modifiers: &BTreeSet<Modifier>, _window_title: &str) {}
    }

    /// Removes itself on the first keypress.
    struct OneShot {
        id: ListenerId,
        registry: Arc<ListenerRegistry>,
        hits: Arc<Mutex<usize>>,
    }

    impl Listener for OneShot {
        fn handle_keypress(&self, _key: &str, _window_title: &str) {
            *self.hits.lock() += 1;
            self.registry.deregister(self.id);
        }
        fn handle_hotkey(&self, _key: &str, _modifiers: &BTreeSet<Modifier>, _window_title: &str) {}
    }

    #[test]
    fn broadcast_in_registration_order() {
        let reg = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        reg.register(Arc::new(Tagged { tag: "a", log: log.clone() }));
        let b = reg.register(Arc::new(Tagged { tag: "b", log: log.clone() }));
        reg.register(Arc::new(Tagged { tag: "c", log: log.clone() }));
        reg.broadcast_keypress("x", "");
        assert!(reg.deregister(b));
        assert!(!reg.deregister(b));
        reg.broadcast_keypress("y", "");
        assert_eq!(*log.lock(), vec!["a:x", "b:x", "c:x", "a:y", "c:y"]);
    }

    #[test]
    fn listener_can_remove_itself_mid_broadcast() {
        let reg = Arc::new(ListenerRegistry::new());
        let hits = Arc::new(Mutex::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        reg.register_with(|id| {
            Arc::new(OneShot {
                id,
                registry: reg.clone(),
                hits: hits.clone(),
            })
        });
        reg.register(Arc::new(Tagged { tag: "t", log: log.clone() }));
        reg.broadcast_keypress("a", "");
        reg.broadcast_keypress("b", "");
        assert_eq!(*hits.lock(), 1);
        assert_eq!(reg.len(), 1);
        assert_eq!(*log.lock(), vec!["t:a", "t:b"]);
    }
}
