//! Subscriber channels notified of each successfully loaded configuration.
//!
//! Sends never block: when a listener's buffer is full, or a zero-capacity
//! listener has no receiver waiting, the update is dropped for that listener.
//! Subscribers that need the latest value should read it from the manager
//! rather than rely on seeing every update on their channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::debug;

/// Identifies a listener within its registry.
pub type ListenerId = u64;

/// Receiving side of a listener channel.
///
/// The channel is closed when the listener is removed from its registry or the
/// manager stops. Buffered values can still be received after closing.
pub struct Listener<T> {
    id: ListenerId,
    rx: Receiver<Arc<T>>,
}

impl<T> Listener<T> {
    /// Registry-assigned identifier, unique for the registry's lifetime.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Blocks until a value arrives. Returns `None` once the channel is closed and drained.
    pub fn recv(&self) -> Option<Arc<T>> {
        self.rx.recv().ok()
    }

    /// Returns a buffered value without blocking.
    pub fn try_recv(&self) -> Option<Arc<T>> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Arc<T>, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Returns the underlying receiver, e.g. for use with `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<Arc<T>> {
        &self.rx
    }
}

struct Entries<T> {
    senders: Vec<(ListenerId, Sender<Arc<T>>)>,
    closed: bool,
}

/// Registry of listener channels.
pub struct ListenerRegistry<T> {
    entries: Mutex<Entries<T>>,
    next_id: AtomicU64,
}

impl<T> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                senders: Vec::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a listener with room for `buffer` pending values.
    ///
    /// After [`close_all`](Self::close_all) the returned listener is already closed.
    pub fn subscribe(&self, buffer: usize) -> Listener<T> {
        let (tx, rx) = crossbeam_channel::bounded(buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.entries.lock();
        if entries.closed {
            debug!(listener = id, "registry closed, returning closed listener");
        } else {
            entries.senders.push((id, tx));
            debug!(listener = id, buffer, "listener added");
        }

        Listener { id, rx }
    }

    /// Removes a listener and closes its channel. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        match entries.senders.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(ix) => {
                // Dropping the sender closes the channel.
                entries.senders.remove(ix);
                debug!(listener = id, "listener removed");
                true
            }
            None => false,
        }
    }

    /// Offers `value` to every listener without blocking. Returns how many accepted it.
    pub fn publish(&self, value: &Arc<T>) -> usize {
        let entries = self.entries.lock();
        let mut delivered = 0;

        for (id, tx) in &entries.senders {
            match tx.try_send(Arc::clone(value)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(listener = id, "listener not ready, update dropped");
                }
                Err(TrySendError::Disconnected(_)) => {
                    debug!(listener = id, "listener receiver dropped, update discarded");
                }
            }
        }

        delivered
    }

    /// Closes every listener. Later subscriptions are handed closed channels.
    pub fn close_all(&self) {
        let mut entries = self.entries.lock();
        entries.closed = true;
        entries.senders.clear();
    }

    /// Returns true once [`close_all`](Self::close_all) has run.
    pub fn is_closed(&self) -> bool {
        self.entries.lock().closed
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.lock().senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
