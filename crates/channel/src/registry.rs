//! Tracks the one event channel allowed to be bound at a time.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::channel::{EventChannel, Shared};

/// Slot holding the currently active [`EventChannel`].
///
/// Endpoint addresses are scoped to the process, not to a test session, so
/// two live channels would fight over the same address. Claiming the slot
/// closes whichever channel held it before.
///
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    slot: Arc<Mutex<Option<Arc<Shared>>>>,
}

impl ChannelRegistry {
    /// A fresh, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn process_wide() -> Self {
        static REGISTRY: OnceLock<ChannelRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ChannelRegistry::new).clone()
    }

    /// Make `channel` the active channel, closing the previous holder.
    ///
    /// Returns the channel that was replaced, already closed.
    pub fn claim(&self, channel: &EventChannel) -> Option<EventChannel> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.replace(Arc::clone(&channel.shared))?;
        if Arc::ptr_eq(&previous, &channel.shared) {
            return None;
        }
        // still inside the critical section: nobody can observe the slot
        // pointing at a closed channel
        previous.close_replaced();
        Some(EventChannel { shared: previous })
    }

    /// Clear the slot if `channel` holds it.
    pub fn release(&self, channel: &EventChannel) -> bool {
        self.release_shared(&channel.shared, || {})
    }

    /// Clear the slot if `shared` holds it and run `on_release` before the
    /// lock is dropped.
    ///
    /// Nothing else can claim the slot while `on_release` runs, so it may
    /// touch resources only the holder owns, such as the endpoint file.
    pub(crate) fn release_shared(&self, shared: &Arc<Shared>, on_release: impl FnOnce()) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(current) if Arc::ptr_eq(current, shared) => {
                *slot = None;
                on_release();
                true
            }
            _ => false,
        }
    }

    /// The active channel, if any.
    pub fn current(&self) -> Option<EventChannel> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|shared| EventChannel {
            shared: Arc::clone(shared),
        })
    }

    /// Whether `channel` is the active channel.
    pub fn is_current(&self, channel: &EventChannel) -> bool {
        self.current()
            .is_some_and(|current| current.ptr_eq(channel))
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("current", &self.current())
            .finish()
    }
}
