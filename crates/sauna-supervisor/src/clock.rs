//! Clock and timer service.
//!
//! Timers never execute logic against supervisor data. Arming a timer
//! spawns a task that, at the due instant, enqueues
//! [`Event::TimerFired`] on the bus; the supervisor dispatches it to
//! the owning component. This keeps every state mutation inside the
//! single consumer task.
//!
//! # Cancellation
//!
//! Each handle carries a generation stamp. `cancel` aborts the timer
//! task *and* retires the generation, so a fire that was already
//! queued on the bus is rejected by [`TimerService::acknowledge`] at
//! dispatch time. Cancelling twice, or cancelling a timer that has
//! already fired, is a no-op.

use parking_lot::Mutex;
use sauna_event::{BusSender, Event, TimerId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    OneShot,
    Periodic,
}

struct Entry {
    generation: u64,
    kind: TimerKind,
    task: tokio::task::JoinHandle<()>,
}

struct Inner {
    next_id: u64,
    next_generation: u64,
    entries: HashMap<TimerId, Entry>,
}

/// Handle to an armed timer.
///
/// Owned by the component that armed it; cancelling through a stale
/// handle (same id, older generation) has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    id: TimerId,
    generation: u64,
}

impl TimerHandle {
    /// The timer's id, as it will appear in `TimerFired`.
    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }
}

/// Monotonic clock plus one-shot and periodic timers.
///
/// Cheap to clone; all clones share the registry.
#[derive(Clone)]
pub struct TimerService {
    bus: BusSender,
    inner: Arc<Mutex<Inner>>,
}

impl TimerService {
    /// Creates a service feeding fires into `bus`.
    #[must_use]
    pub fn new(bus: BusSender) -> Self {
        Self {
            bus,
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                next_generation: 1,
                entries: HashMap::new(),
            })),
        }
    }

    /// Current monotonic instant.
    #[must_use]
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// Arms a one-shot timer due after `dur`.
    pub fn after(&self, dur: Duration) -> TimerHandle {
        self.arm(dur, TimerKind::OneShot)
    }

    /// Arms a periodic timer; the first fire is one full period out.
    pub fn every(&self, dur: Duration) -> TimerHandle {
        self.arm(dur, TimerKind::Periodic)
    }

    fn arm(&self, dur: Duration, kind: TimerKind) -> TimerHandle {
        let mut inner = self.inner.lock();
        let id = TimerId(inner.next_id);
        inner.next_id += 1;
        let generation = inner.next_generation;
        inner.next_generation += 1;

        let bus = self.bus.clone();
        let task = match kind {
            TimerKind::OneShot => tokio::spawn(async move {
                tokio::time::sleep(dur).await;
                if bus.send(Event::TimerFired { id, generation }).await.is_err() {
                    debug!(%id, "bus closed before one-shot fire");
                }
            }),
            TimerKind::Periodic => tokio::spawn(async move {
                let mut interval = tokio::time::interval_at(Instant::now() + dur, dur);
                loop {
                    interval.tick().await;
                    if bus.send(Event::TimerFired { id, generation }).await.is_err() {
                        debug!(%id, "bus closed, stopping periodic timer");
                        break;
                    }
                }
            }),
        };

        inner.entries.insert(
            id,
            Entry {
                generation,
                kind,
                task,
            },
        );
        trace!(%id, ?dur, ?kind, "armed timer");

        TimerHandle { id, generation }
    }

    /// Cancels a timer. Idempotent; stale handles are ignored.
    ///
    /// Guaranteed to prevent any further delivery: the timer task is
    /// aborted and the generation retired, so an already-queued fire
    /// fails [`acknowledge`](Self::acknowledge).
    pub fn cancel(&self, handle: &TimerHandle) {
        let mut inner = self.inner.lock();
        let matches = inner
            .entries
            .get(&handle.id)
            .is_some_and(|e| e.generation == handle.generation);
        if matches {
            if let Some(entry) = inner.entries.remove(&handle.id) {
                entry.task.abort();
                trace!(id = %handle.id, "cancelled timer");
            }
        }
    }

    /// Validates a `TimerFired` event at dispatch time.
    ///
    /// Returns `false` for stale generations (the timer was cancelled
    /// after the fire was queued). A valid one-shot fire retires its
    /// entry; periodic entries stay until cancelled.
    #[must_use]
    pub fn acknowledge(&self, id: TimerId, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.get(&id) {
            Some(entry) if entry.generation == generation => {
                if entry.kind == TimerKind::OneShot {
                    inner.entries.remove(&id);
                }
                true
            }
            _ => {
                debug!(%id, generation, "dropping stale timer fire");
                false
            }
        }
    }

    /// Number of live timers.
    #[must_use]
    pub fn live(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Cancels every timer. Used on shutdown.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        for (_, entry) in inner.entries.drain() {
            entry.task.abort();
        }
    }
}

impl std::fmt::Debug for TimerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerService")
            .field("live", &self.live())
            .finish()
    }
}
