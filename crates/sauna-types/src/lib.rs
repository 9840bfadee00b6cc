//! Value types for the sauna supervisor.
//!
//! This crate holds the plain data the whole workspace agrees on:
//! the MCB state, sensor readings, button/flic actions, notification
//! kinds, and the live [`Snapshot`] handed to subscribers.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  sauna-types    : McbState, readings, Snapshot ◄ HERE │
//! │  sauna-event    : Event union, bounded bus            │
//! │  sauna-supervisor : timers, controllers, core loop    │
//! │  sauna-adapters : payload parsing, HTTP clients       │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is inert data: no I/O, no clocks, no tasks. The
//! supervisor is the single writer of the authoritative state these
//! types describe; adapters construct readings and never mutate them
//! after emission.
//!
//! # Error Handling
//!
//! The [`ErrorCode`] trait gives every workspace error a stable
//! machine-readable code and a recoverability flag:
//!
//! ```
//! use sauna_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Timeout,
//! }
//!
//! impl ErrorCode for MyError {
//!     fn code(&self) -> &'static str {
//!         "MY_TIMEOUT"
//!     }
//!     fn is_recoverable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! assert_eq!(MyError::Timeout.code(), "MY_TIMEOUT");
//! ```

mod button;
mod error;
mod mcb;
mod notify;
mod reading;
mod snapshot;

pub use button::{ButtonAction, ButtonEvent, FlicAction, FlicMapping};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use mcb::{McbState, McbStatusSource};
pub use notify::NotificationKind;
pub use reading::{DoorReading, PhaseReading, TemperatureReading};
pub use snapshot::{
    FloorHeatingAction, FloorHeatingMode, FloorHeatingState, Snapshot, SnapshotRecord,
    SubscriberId, VentilatorSummary,
};
