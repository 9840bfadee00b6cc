//! Adapters between external devices and the supervisor's typed
//! event/command model.
//!
//! Two kinds of code live here:
//!
//! - **Parsers** for the push streams the supervisor subscribes to:
//!   the phase meter topics ([`meter`]), Ruuvi temperature
//!   ([`ruuvi`]), the door contact ([`door`]), the wall button
//!   ([`button`]) and the ventilator status feed
//!   ([`ventilator_status`]). Malformed payloads are dropped and
//!   counted at this boundary — they never reach the supervisor.
//! - **HTTP clients** implementing the outbound ports: the ventilator
//!   relay ([`relay`]) and the notification gateway ([`notifier`]).
//!
//! The transport that carries the inbound payloads (MQTT or
//! otherwise) and the key-value device protocol for the MCB and
//! thermostat stay outside this crate; a transport task feeds raw
//! `(topic, payload)` pairs to the parsers and forwards the resulting
//! events onto the bus.

pub mod button;
pub mod door;
pub mod meter;
pub mod notifier;
pub mod relay;
pub mod ruuvi;
pub mod ventilator_status;

pub use meter::{PhaseAccumulator, PhaseField};
pub use notifier::HttpNotifier;
pub use relay::ShellyRelay;
