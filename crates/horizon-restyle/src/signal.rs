//! Change notification.
//!
//! A small signal/slot channel: subscribers connect a closure and get a
//! [`ConnectionId`] back, or a [`ConnectionGuard`] that disconnects when
//! dropped. Emission is direct and synchronous.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use horizon_restyle::signal::Signal;
//!
//! let signal = Signal::<usize>::new();
//! let total = Arc::new(AtomicUsize::new(0));
//!
//! {
//!     let total = total.clone();
//!     let _guard = signal.connect_scoped(move |&n| {
//!         total.fetch_add(n, Ordering::SeqCst);
//!     });
//!     signal.emit(2);
//! }
//! signal.emit(3); // guard dropped, nobody listens
//! assert_eq!(total.load(Ordering::SeqCst), 2);
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Identifies one connection on a [`Signal`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;
type Connections<Args> = Mutex<SlotMap<ConnectionId, Slot<Args>>>;

/// A signal with any number of connected slots.
pub struct Signal<Args> {
    connections: Arc<Connections<Args>>,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Connect a slot.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Connect a slot that is disconnected when the guard drops.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            connections: Arc::downgrade(&self.connections),
            id,
        }
    }

    /// Disconnect a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect every slot.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Invoke every connected slot with `args`.
    ///
    /// Slots run after the connection table is unlocked, so a slot may
    /// connect or disconnect without deadlocking.
    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SESSION, connection_count = slots.len(), "emitting signal");
        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// Disconnects its slot when dropped.
///
/// Dropping the guard after the signal itself is gone is a no-op.
#[must_use = "dropping the guard disconnects the slot immediately"]
pub struct ConnectionGuard<Args> {
    connections: Weak<Connections<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    /// The guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(connections) = self.connections.upgrade() {
            connections.lock().remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        assert_eq!(*received.lock(), vec![42, 100]);
    }

    #[test]
    fn disconnect() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn scoped_connection() {
        let signal = Signal::<()>::new();
        let guard = signal.connect_scoped(|_| {});
        assert_eq!(signal.connection_count(), 1);
        drop(guard);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn guard_outliving_signal() {
        let signal = Signal::<()>::new();
        let guard = signal.connect_scoped(|_| {});
        drop(signal);
        drop(guard);
    }

    #[test]
    fn disconnect_all() {
        let signal = Signal::<()>::new();
        for _ in 0..3 {
            signal.connect(|_| {});
        }
        assert_eq!(signal.connection_count(), 3);
        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }
}
