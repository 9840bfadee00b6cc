//! Supervisor core for the sauna controller.
//!
//! One task owns all authoritative state and makes every decision:
//! the [`Supervisor`](supervisor::Supervisor). Everything around it is
//! either an input producer (adapters, HTTP commands, timers) or an
//! output sink (actuator adapters, the notifier, snapshot
//! subscribers).
//!
//! ```text
//!                 ┌────────────────────────────────────────┐
//!  events ──────► │  Supervisor (single consumer)          │
//!                 │    safety evaluator (pure)             │
//!                 │    ventilator controller ── relay      │
//!                 │    floor-heating controller ── thermo  │
//!                 │    rate limiter ── notifier            │
//!                 │    timer service (generation handles)  │
//!                 └───────────────┬────────────────────────┘
//!                                 ▼
//!                        SnapshotBroadcaster ──► subscribers
//! ```
//!
//! # Modules
//!
//! - [`clock`] — monotonic time, one-shot and periodic timers as events
//! - [`broadcast`] — current snapshot + slow-consumer-tolerant fan-out
//! - [`ratelimit`] — per-kind notification cooldowns
//! - [`safety`] — pure phase-threshold evaluation
//! - [`ventilator`] — delayed-off and keep-alive state machine
//! - [`floorheating`] — setpoint driver and status poll
//! - [`supervisor`] — the event loop and operator command handling
//! - [`ports`] — adapter contracts the core depends on
//! - [`config`] — recognised options, defaults, TOML/env loader
//! - [`testing`] — scripted port implementations for tests

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod floorheating;
pub mod ports;
pub mod ratelimit;
pub mod safety;
pub mod supervisor;
pub mod testing;
pub mod ventilator;

pub use broadcast::{SnapshotBroadcaster, Subscription};
pub use clock::{TimerHandle, TimerService};
pub use config::{ConfigError, ConfigLoader, SaunaConfig};
pub use ports::{AdapterError, McbDevice, Notifier, Thermostat, VentilatorRelay};
pub use ratelimit::{Allowance, RateLimiter};
pub use safety::{check_thresholds, format_offenders, Offender, Phase, ThresholdCheck};
pub use supervisor::{Supervisor, SupervisorHandle};
