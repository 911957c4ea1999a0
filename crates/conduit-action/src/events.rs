//! Lifecycle event fan-out.
//!
//! Listeners are called synchronously, in subscription order, at most once
//! per event. A panicking listener is logged and skipped; it never affects
//! the dispatch that emitted the event or the listeners after it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use conduit_core::events::LifecycleEvent;
use tokio::sync::broadcast;

/// Receives lifecycle events from an engine.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> EventListener for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn EventListener>)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Returns whether a listener was removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn emit(&self, event: &LifecycleEvent) {
        let snapshot: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in snapshot {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            if delivered.is_err() {
                tracing::warn!(
                    event = event.event_name(),
                    action = %event.action_name,
                    "Event listener panicked"
                );
            }
        }
    }
}

/// Forwards events into a `tokio::sync::broadcast` channel.
///
/// Sends to a channel without receivers are dropped silently.
pub struct BroadcastListener {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl BroadcastListener {
    pub fn new(tx: broadcast::Sender<LifecycleEvent>) -> Self {
        Self { tx }
    }

    /// Listener plus a receiver on a fresh channel of `capacity`, raised to
    /// at least 1.
    pub fn channel(capacity: usize) -> (Self, broadcast::Receiver<LifecycleEvent>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn sender(&self) -> broadcast::Sender<LifecycleEvent> {
        self.tx.clone()
    }
}

impl EventListener for BroadcastListener {
    fn on_event(&self, event: &LifecycleEvent) {
        let _ = self.tx.send(event.clone());
    }
}
