//! Book-keeping for the project's subscriptions to native store notifiers.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use nmrid_store::{DataStore, NotifyFn, NotifyKey};
use tracing::debug;

/// Active store subscriptions of one project, at most one per key.
#[derive(Default)]
pub struct NotifierRegistry {
    active: BTreeMap<NotifyKey, NotifyFn>,
}

impl fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("keys", &self.active.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` for `key`.
    ///
    /// An existing subscription for the same key is removed from the store
    /// before the new one is registered, so the store never holds two of our
    /// callbacks for one key. Returns `true` if a subscription was replaced.
    pub fn subscribe(&mut self, store: &dyn DataStore, key: NotifyKey, callback: NotifyFn) -> bool {
        let replaced = match self.active.remove(&key) {
            Some(old) => {
                store.unregister_notify(&old, key.class, key.event);
                true
            }
            None => false,
        };
        store.register_notify(Rc::clone(&callback), key.class, key.event);
        self.active.insert(key, callback);
        debug!(%key, replaced, "store notifier subscribed");
        replaced
    }

    /// Remove every subscription from the store. Returns how many were removed.
    pub fn unsubscribe_all(&mut self, store: &dyn DataStore) -> usize {
        let count = self.active.len();
        for (key, callback) in std::mem::take(&mut self.active) {
            store.unregister_notify(&callback, key.class, key.event);
        }
        debug!(count, "store notifiers unsubscribed");
        count
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, key: NotifyKey) -> bool {
        self.active.contains_key(&key)
    }

    /// The callback currently registered for `key`.
    pub fn callback(&self, key: NotifyKey) -> Option<&NotifyFn> {
        self.active.get(&key)
    }

    /// Subscribed keys, in key order.
    pub fn keys(&self) -> Vec<NotifyKey> {
        self.active.keys().copied().collect()
    }
}
