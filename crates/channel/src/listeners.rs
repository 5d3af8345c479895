//! Typed listener lists.
//!
//! A [`Listeners`] list holds callbacks for one kind of event. Registering a
//! callback returns a [`Subscription`] which removes it again when disposed
//! or dropped.

use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerList<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Callbacks for one event type, invoked in registration order.
pub struct Listeners<T> {
    inner: Arc<Mutex<ListenerList<T>>>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerList {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a callback.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut list = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = list.next_id;
            list.next_id += 1;
            list.entries.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<ListenerList<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut list = inner.lock().unwrap_or_else(PoisonError::into_inner);
                list.entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Invoke every registered callback with `value`.
    ///
    /// Callbacks run outside the lock, so they may register or dispose
    /// listeners themselves.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = {
            let list = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            list.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in snapshot {
            callback(value);
        }
    }

    /// Remove every callback.
    pub fn clear(&self) {
        let mut list = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        list.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
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

/// Handle to a registered callback.
///
/// Dropping the handle unregisters the callback. Use [`Subscription::detach`]
/// to keep it registered for as long as its source lives.
#[must_use = "dropping a Subscription unregisters the listener immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Build a subscription from an arbitrary unsubscribe action.
    ///
    /// Useful for event sources outside this crate.
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Unregister the callback now.
    pub fn dispose(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Keep the callback registered until its source goes away.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
