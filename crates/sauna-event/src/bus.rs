//! Bounded single-consumer event bus.
//!
//! A typed mailbox between the adapter/HTTP/timer tasks and the one
//! supervisor task. Bounded so a stuck supervisor cannot take the
//! process down with it; the overflow policy prefers liveness for
//! telemetry and never sheds safety-relevant traffic.
//!
//! # Overflow policy
//!
//! | Incoming | Queue full | Action |
//! |----------|-----------|--------|
//! | non-critical | yes | evict oldest non-critical, count it; if every queued event is critical, drop the incoming one instead |
//! | critical | yes | block the producer up to 100 ms for space, then evict the oldest non-critical; if none exists, exceed capacity |
//!
//! Critical events ([`Event::is_critical`]) are never dropped.

use crate::{Event, EventError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Default queue capacity.
pub const BUS_CAPACITY: usize = 256;

/// How long a producer of a critical event waits for space before
/// room is made by eviction.
const CRITICAL_BLOCK: Duration = Duration::from_millis(100);

struct Shared {
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    /// Wakes the consumer.
    ready: Notify,
    /// Wakes producers waiting for space.
    space: Notify,
    /// Non-critical events shed since start.
    dropped: AtomicU64,
    /// Live sender count; 0 means no more events will arrive.
    senders: AtomicUsize,
    /// Set when the receiver is gone.
    closed: AtomicBool,
}

/// Creates a bus with the given capacity.
///
/// Use [`BUS_CAPACITY`] unless a test needs a smaller queue.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn channel(capacity: usize) -> (BusSender, BusReceiver) {
    assert!(capacity > 0, "bus capacity must be positive");

    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        capacity,
        ready: Notify::new(),
        space: Notify::new(),
        dropped: AtomicU64::new(0),
        senders: AtomicUsize::new(1),
        closed: AtomicBool::new(false),
    });

    (
        BusSender {
            shared: Arc::clone(&shared),
        },
        BusReceiver { shared },
    )
}

/// Producer handle. Cheap to clone; one per adapter task.
pub struct BusSender {
    shared: Arc<Shared>,
}

impl Clone for BusSender {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for BusSender {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last producer gone: let the consumer drain and stop.
            self.shared.ready.notify_one();
        }
    }
}

impl std::fmt::Debug for BusSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusSender")
            .field("capacity", &self.shared.capacity)
            .finish_non_exhaustive()
    }
}

impl BusSender {
    /// Enqueues an event.
    ///
    /// Never blocks for non-critical events. For critical events the
    /// call may suspend up to 100 ms waiting for space; it still
    /// always succeeds unless the bus is closed.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Closed`] when the receiver is gone.
    pub async fn send(&self, event: Event) -> Result<(), EventError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(EventError::Closed);
        }

        let critical = event.is_critical();
        let mut event = match self.try_enqueue(event) {
            Ok(()) => return Ok(()),
            Err(ev) => ev,
        };

        if critical {
            let deadline = tokio::time::Instant::now() + CRITICAL_BLOCK;
            loop {
                let left = deadline.saturating_duration_since(tokio::time::Instant::now());
                if left.is_zero() {
                    break;
                }
                if tokio::time::timeout(left, self.shared.space.notified())
                    .await
                    .is_err()
                {
                    break;
                }
                match self.try_enqueue(event) {
                    Ok(()) => return Ok(()),
                    Err(ev) => event = ev,
                }
            }
            self.enqueue_evicting(event, true)
        } else {
            self.enqueue_evicting(event, false)
        }
    }

    /// Current shed counter.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Fast path: push when below capacity, else hand the event back.
    fn try_enqueue(&self, event: Event) -> Result<(), Event> {
        if self.shared.closed.load(Ordering::Acquire) {
            // Closed while waiting; the caller surfaces Closed below
            // via enqueue_evicting.
            return Err(event);
        }
        let mut q = self.shared.queue.lock();
        if q.len() < self.shared.capacity {
            q.push_back(event);
            drop(q);
            self.shared.ready.notify_one();
            Ok(())
        } else {
            Err(event)
        }
    }

    /// Slow path: make room by shedding the oldest non-critical entry.
    fn enqueue_evicting(&self, event: Event, keep_incoming: bool) -> Result<(), EventError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(EventError::Closed);
        }
        let mut q = self.shared.queue.lock();
        if q.len() < self.shared.capacity {
            q.push_back(event);
        } else if let Some(idx) = q.iter().position(|e| !e.is_critical()) {
            let evicted = q.remove(idx);
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                evicted = evicted.map(|e| e.kind()).unwrap_or("?"),
                "bus full, shed oldest non-critical event"
            );
            q.push_back(event);
        } else if keep_incoming {
            // Everything queued is critical and so is this; capacity
            // is exceeded rather than dropping it.
            warn!(len = q.len(), "bus full of critical events, exceeding capacity");
            q.push_back(event);
        } else {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(kind = event.kind(), "bus full of critical events, dropped incoming");
        }
        drop(q);
        self.shared.ready.notify_one();
        Ok(())
    }
}

/// Consumer handle, held by the supervisor.
pub struct BusReceiver {
    shared: Arc<Shared>,
}

impl BusReceiver {
    /// Receives the next event, in FIFO order.
    ///
    /// Returns `None` once every sender is gone and the queue has
    /// drained.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.pop() {
                return Some(event);
            }
            if self.shared.senders.load(Ordering::Acquire) == 0 {
                return None;
            }
            self.shared.ready.notified().await;
        }
    }

    /// Non-blocking receive, used while draining during shutdown.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.pop()
    }

    /// Number of events currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-critical events shed since start.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    fn pop(&mut self) -> Option<Event> {
        let mut q = self.shared.queue.lock();
        let event = q.pop_front();
        if event.is_some() {
            drop(q);
            self.shared.space.notify_one();
        }
        event
    }
}

impl Drop for BusReceiver {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        // Unblock any producer parked on the space notify.
        self.shared.space.notify_waiters();
    }
}
