//! Snapshot broadcaster.
//!
//! Holds the latest [`Snapshot`] and fans every published one out to
//! subscribers. Each subscriber owns a bounded pending buffer; a slow
//! consumer loses its *oldest* pending snapshots, never the newest —
//! liveness over history. Subscribers observe snapshots in exactly
//! the order the supervisor published them (no reorder, no merge).
//!
//! Subscribing delivers the current snapshot immediately as the first
//! event. A dropped [`Subscription`] is detached and reaped on the
//! next publish; explicit unsubscribe is idempotent.

use parking_lot::Mutex;
use sauna_types::{Snapshot, SnapshotRecord, SubscriberId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, trace};

/// Pending-buffer depth per subscriber.
pub const SUBSCRIBER_DEPTH: usize = 8;

struct SubQueue {
    pending: Mutex<VecDeque<Snapshot>>,
    notify: Notify,
    /// Snapshots discarded for this subscriber. Monotone.
    discarded: AtomicU64,
    /// Set when the subscription handle was dropped.
    detached: AtomicBool,
    /// Set on unsubscribe/close; recv drains then ends.
    closed: AtomicBool,
}

impl SubQueue {
    fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::with_capacity(SUBSCRIBER_DEPTH)),
            notify: Notify::new(),
            discarded: AtomicU64::new(0),
            detached: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueues for this subscriber; `false` means the subscriber is
    /// gone and the slot should be reaped.
    fn push(&self, snapshot: Snapshot) -> bool {
        if self.detached.load(Ordering::Acquire) || self.closed.load(Ordering::Acquire) {
            return false;
        }
        let mut pending = self.pending.lock();
        if pending.len() == SUBSCRIBER_DEPTH {
            pending.pop_front();
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
        pending.push_back(snapshot);
        drop(pending);
        self.notify.notify_one();
        true
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

struct Slot {
    id: SubscriberId,
    queue: Arc<SubQueue>,
}

struct Inner {
    current: Option<Snapshot>,
    subscribers: Vec<Slot>,
    closed: bool,
}

/// Fan-out point between the supervisor and its live subscribers.
///
/// The subscriber list sits behind a mutex; pending buffers are
/// per-subscriber and only touched from [`publish`](Self::publish)
/// and the owning [`Subscription`].
#[derive(Clone)]
pub struct SnapshotBroadcaster {
    inner: Arc<Mutex<Inner>>,
}

impl SnapshotBroadcaster {
    /// Creates an empty broadcaster (no snapshot yet).
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                current: None,
                subscribers: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Publishes a new snapshot to every subscriber.
    ///
    /// Detached subscribers are reaped here (send failure).
    pub fn publish(&self, snapshot: Snapshot) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.current = Some(snapshot.clone());
        let before = inner.subscribers.len();
        inner
            .subscribers
            .retain(|slot| slot.queue.push(snapshot.clone()));
        let reaped = before - inner.subscribers.len();
        if reaped > 0 {
            debug!(reaped, "reaped detached snapshot subscribers");
        }
    }

    /// Attaches a subscriber.
    ///
    /// The current snapshot, when one exists, is delivered immediately
    /// as the subscriber's first event.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId::new();
        let queue = Arc::new(SubQueue::new());

        let mut inner = self.inner.lock();
        if inner.closed {
            queue.close();
        } else {
            if let Some(current) = &inner.current {
                queue.push(current.clone());
            }
            inner.subscribers.push(Slot {
                id,
                queue: Arc::clone(&queue),
            });
        }
        trace!(subscriber = %id, "subscribed");

        Subscription { id, queue }
    }

    /// Detaches a subscriber by id. Idempotent.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|slot| {
            if slot.id == id {
                slot.queue.close();
                false
            } else {
                true
            }
        });
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn current(&self) -> Option<Snapshot> {
        self.inner.lock().current.clone()
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Closes the broadcaster; every subscriber's stream drains its
    /// pending buffer and then ends.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        for slot in inner.subscribers.drain(..) {
            slot.queue.close();
        }
    }
}

impl std::fmt::Debug for SnapshotBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotBroadcaster")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// One subscriber's receiving half.
pub struct Subscription {
    id: SubscriberId,
    queue: Arc<SubQueue>,
}

impl Subscription {
    /// This subscriber's id.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// The synthetic record a transport sends at connect time.
    #[must_use]
    pub fn connected_record(&self) -> SnapshotRecord {
        SnapshotRecord::Connected {
            subscriber_id: self.id,
        }
    }

    /// Receives the next snapshot, in publish order.
    ///
    /// Returns `None` once the broadcaster closed (or this subscriber
    /// was unsubscribed) and the pending buffer has drained.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        loop {
            {
                let mut pending = self.queue.pending.lock();
                if let Some(snapshot) = pending.pop_front() {
                    return Some(snapshot);
                }
            }
            if self.queue.closed.load(Ordering::Acquire) {
                return None;
            }
            self.queue.notify.notified().await;
        }
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.queue.pending.lock().pop_front()
    }

    /// Snapshots dropped for this subscriber by the slow-consumer
    /// policy. Monotone non-decreasing.
    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.queue.discarded.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.queue.detached.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
