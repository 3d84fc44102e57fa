use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use wsnotify_core::{Envelope, Result};

/// Inbound-message callback. Returning `Err` reports a handler failure without
/// affecting other subscribers.
pub type Callback = Arc<dyn Fn(&Envelope) -> Result<()> + Send + Sync>;

struct Entry {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct RegistryInner {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    fn remove(&self, id: u64) -> bool {
        // The entry is dropped after the lock is released: its closure may
        // own another Subscription whose drop re-enters this registry.
        let removed = {
            let mut entries = self.entries.lock();
            entries
                .iter()
                .position(|e| e.id == id)
                .map(|i| entries.remove(i))
        };
        removed.is_some()
    }
}

/// Ordered set of inbound callbacks.
///
/// Registration order is delivery order. Dispatch iterates a snapshot, so
/// callbacks may subscribe or unsubscribe from inside their own invocation.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` to the live set.
    ///
    /// Registering the same closure twice yields two independent entries.
    pub fn register<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Envelope) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.lock().push(Entry {
            id,
            callback: Arc::new(callback),
        });
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    /// Copy of the live callbacks, in registration order.
    pub fn snapshot(&self) -> Vec<Callback> {
        self.inner
            .entries
            .lock()
            .iter()
            .map(|e| Arc::clone(&e.callback))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Capability to remove exactly one registry entry.
///
/// Dropping it unregisters, which ties the entry to the consumer's scope.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the callback. Calling this again is a no-op.
    pub fn unregister(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            inner.remove(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn env() -> Envelope {
        Envelope::new("chat", json!(null))
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let sub = reg.register(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let _other = reg.register(|_| Ok(()));
        assert_eq!(reg.len(), 2);

        sub.unregister();
        sub.unregister();
        assert!(!sub.is_active());
        assert_eq!(reg.len(), 1);

        for cb in reg.snapshot() {
            cb(&env()).unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_closures_are_independent_entries() {
        let reg = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let cb = {
            let h = hits.clone();
            move |_: &Envelope| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        };
        let a = reg.register(cb.clone());
        let _b = reg.register(cb);

        a.unregister();
        for cb in reg.snapshot() {
            cb(&env()).unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_entry() {
        let reg = SubscriptionRegistry::new();
        {
            let _sub = reg.register(|_| Ok(()));
            assert_eq!(reg.len(), 1);
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let reg = SubscriptionRegistry::new();
        let sub = reg.register(|_| Ok(()));
        drop(reg);
        sub.unregister();
    }
}
