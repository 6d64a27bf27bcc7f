use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Typed listener registry. Callbacks run synchronously on the emitting
/// task; a panicking callback is caught and logged so the remaining
/// listeners still fire.
pub struct Listeners<T> {
    inner: Arc<Mutex<HashMap<u64, Callback<T>>>>,
    next_id: AtomicU64,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .lock()
            .expect("listener registry poisoned")
            .insert(id, Arc::new(callback));

        let inner = Arc::clone(&self.inner);
        Subscription {
            cancel: Box::new(move || {
                if let Ok(mut map) = inner.lock() {
                    map.remove(&id);
                }
            }),
        }
    }

    pub fn emit(&self, value: &T) {
        // Snapshot the callbacks so listeners may subscribe or unsubscribe
        // from inside a notification without deadlocking.
        let callbacks: Vec<(u64, Callback<T>)> = {
            let map = self.inner.lock().expect("listener registry poisoned");
            map.iter().map(|(id, cb)| (*id, Arc::clone(cb))).collect()
        };
        for (id, callback) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                tracing::error!(listener = id, "listener panicked during notification");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("listener registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener
/// registered; call `unsubscribe` to remove it.
pub struct Subscription {
    cancel: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.cancel)();
    }
}
