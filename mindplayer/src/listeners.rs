//! Token-based callback registry shared by media handles and gesture sources

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Token returned by a registration, used to unregister
pub type ListenerId = u64;

/// Callback invoked with every emitted event
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub struct Listeners<E> {
    counter: AtomicU64,
    callbacks: RwLock<HashMap<ListenerId, Listener<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            counter: AtomicU64::new(1),
            callbacks: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Listener<E>) -> ListenerId {
        let token = self.counter.fetch_add(1, Ordering::Relaxed);
        self.callbacks.write().insert(token, listener);
        token
    }

    /// Returns false when the token was unknown (already removed)
    pub fn unregister(&self, token: ListenerId) -> bool {
        self.callbacks.write().remove(&token).is_some()
    }

    /// Calls every listener in registration order.
    ///
    /// The registry lock is released before the callbacks run, so a listener
    /// may register or unregister others.
    pub fn emit(&self, event: &E) {
        let mut snapshot: Vec<(ListenerId, Listener<E>)> = self
            .callbacks
            .read()
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);

        for (_, cb) in snapshot {
            cb(event);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
