//! Synchronous change notification.
//!
//! A [`Signal`] keeps an ordered list of observers. [`Signal::emit`] calls
//! every observer attached at the moment of emission, in attachment order,
//! on the calling thread.
//!
//! - A panicking observer is isolated: the panic is caught and logged, and
//!   the remaining observers still run.
//! - Observers may connect or disconnect (themselves or others) while an
//!   emission is in progress. Changes take effect from the next emission.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Handle returned by [`Signal::connect`], used to disconnect later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

type Slot<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// A broadcast notification with any number of observers.
pub struct Signal<A> {
    name: &'static str,
    slots: Mutex<Vec<(ConnectionId, Slot<A>)>>,
    next_id: AtomicU64,
}

impl<A> Signal<A> {
    /// Creates a signal with no observers. `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Attaches an observer. Observers run in the order they were connected.
    pub fn connect(&self, observer: impl Fn(&A) + Send + Sync + 'static) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().push((id, Arc::new(observer)));
        id
    }

    /// Detaches an observer. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    /// Detaches every observer.
    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Calls every attached observer with `args`.
    pub fn emit(&self, args: &A) {
        // Snapshot so observers can reconnect without deadlocking on `slots`.
        let snapshot: Vec<Slot<A>> = self.slots.lock().iter().map(|(_, s)| s.clone()).collect();

        for slot in snapshot {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| slot(args))) {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".into());
                log::warn!("observer of signal '{}' panicked: {message}", self.name);
            }
        }
    }
}

impl<A> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("observers", &self.observer_count())
            .finish()
    }
}
