//! Outward event channel.
//!
//! Sessions publish through an [`EventSink`]. [`EventBus`] is the standard
//! sink: listeners subscribe per event kind and receive events through an
//! unbounded channel, so a slow listener never stalls a transfer loop.
//! Dropping a [`Subscription`] unsubscribes it.
//!
//! Buffering is unbounded per subscription. A handle that is held but never
//! polled retains every matching event until it is read or dropped, so drop
//! handles you no longer read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tusbridge_protocol::{EventKind, UploadEvent};

/// Receives session lifecycle events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UploadEvent);
}

impl<F> EventSink for F
where
    F: Fn(UploadEvent) + Send + Sync,
{
    fn emit(&self, event: UploadEvent) {
        self(event)
    }
}

struct Subscriber {
    /// Empty means every kind.
    kinds: Vec<EventKind>,
    tx: mpsc::UnboundedSender<UploadEvent>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

#[derive(Default)]
struct BusInner {
    subscribers: DashMap<u64, Subscriber>,
    next_id: AtomicU64,
}

/// Fan-out event bus with per-kind subscriptions.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a single event kind. Always succeeds.
    pub fn subscribe(&self, kind: EventKind) -> Subscription {
        self.register(vec![kind])
    }

    /// Subscribes to several event kinds through one handle.
    pub fn subscribe_many(&self, kinds: &[EventKind]) -> Subscription {
        if kinds.is_empty() {
            return self.subscribe_all();
        }
        self.register(kinds.to_vec())
    }

    /// Subscribes to every event kind.
    pub fn subscribe_all(&self) -> Subscription {
        self.register(Vec::new())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    fn register(&self, kinds: Vec<EventKind>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.insert(id, Subscriber { kinds, tx });
        tracing::trace!(subscription = id, "listener added");
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: UploadEvent) {
        let kind = event.kind();
        let mut closed = Vec::new();

        for entry in self.inner.subscribers.iter() {
            if !entry.wants(kind) {
                continue;
            }
            if entry.tx.send(event.clone()).is_err() {
                closed.push(*entry.key());
            }
        }

        // Removal must happen after the iterator's shard guards are released.
        for id in closed {
            self.inner.subscribers.remove(&id);
        }
    }
}

/// Handle to a listener registration.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<UploadEvent>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<UploadEvent> {
        self.rx.recv().await
    }

    /// Returns an already delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<UploadEvent> {
        self.rx.try_recv().ok()
    }

    /// Unsubscribes explicitly. Equivalent to dropping the handle.
    pub fn remove(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.subscribers.remove(&self.id);
            tracing::trace!(subscription = self.id, "listener removed");
        }
    }
}
