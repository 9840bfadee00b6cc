//! Event system for the sauna supervisor.
//!
//! Every input the supervisor acts on — device observations, sensor
//! readings, button presses, operator commands, timer fires — arrives
//! as one [`Event`] on a single bounded mailbox ([`bus`]). The
//! supervisor is the only consumer; producers are adapter tasks, the
//! HTTP layer, and the timer service.
//!
//! ```text
//!  MCB adapter ──┐
//!  meter adapter ─┤
//!  sensors ───────┼──► EventBus (bounded, critical-aware) ──► Supervisor
//!  HTTP commands ─┤
//!  timer service ─┘
//! ```
//!
//! # Ordering & loss
//!
//! FIFO per producer; exactly-once to the consumer. On overflow the
//! bus sheds the oldest non-critical event and counts it.
//! [`Event::is_critical`] marks `PhaseReading` and `McbObserved` —
//! those are never dropped: a producer of a critical event blocks up
//! to 100 ms for space, then room is made by evicting a non-critical
//! entry.

mod bus;
mod error;
mod event;

pub use bus::{channel, BusReceiver, BusSender, BUS_CAPACITY};
pub use error::EventError;
pub use event::{
    CommandAction, CommandFailure, CommandFailureKind, CommandOutcome, CommandResult, Event,
    HealthReport, OperatorCommand, TimerId,
};
