//! Adapter contracts.
//!
//! The supervisor depends on these traits, never on a transport. The
//! MCB and thermostat speak a local key-value device protocol, the
//! relay and notifier are HTTP endpoints, and sensor streams push
//! events straight onto the bus — all of that lives behind these
//! seams.
//!
//! # Contracts
//!
//! - Every call resolves in bounded time: the supervisor wraps each
//!   await in an explicit timeout (MCB 5 s, relay 5 s, thermostat
//!   5 s, notifier 10 s) and a deadline surfaces as
//!   [`AdapterError::Timeout`] with no orphan work left behind.
//! - An MCB adapter also owns a push stream of `McbObserved` events
//!   into the bus; a fresh connection must report the current state
//!   within 10 s or surface an initialisation error.
//! - Sensor adapters drop malformed payloads at their boundary
//!   (counted, logged) — they never reach the supervisor.

use async_trait::async_trait;
use sauna_types::{ErrorCode, FloorHeatingMode, FloorHeatingState};
use thiserror::Error;

/// Adapter failure taxonomy.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The call did not complete within its deadline.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        /// What was being attempted.
        operation: &'static str,
        /// The deadline that expired.
        timeout_ms: u64,
    },

    /// Transport-level failure (connection reset, refused, DNS).
    #[error("i/o error: {0}")]
    Io(String),

    /// The device answered with a recognised error code.
    #[error("device protocol error {code}: {message}")]
    Protocol {
        /// Device-reported code.
        code: i32,
        /// Device-reported detail.
        message: String,
    },

    /// The device answered something unparseable.
    #[error("malformed device response: {0}")]
    Malformed(String),
}

impl AdapterError {
    /// Shorthand for a timeout of `operation`.
    #[must_use]
    pub fn timeout(operation: &'static str, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation,
            timeout_ms,
        }
    }
}

impl ErrorCode for AdapterError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "ADAPTER_TIMEOUT",
            Self::Io(_) => "ADAPTER_IO",
            Self::Protocol { .. } => "ADAPTER_PROTOCOL",
            Self::Malformed(_) => "ADAPTER_MALFORMED",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Transient transport conditions may clear; a protocol error
        // or garbage response will not.
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}

/// The smart breaker switching the heater.
#[async_trait]
pub trait McbDevice: Send + Sync {
    /// Closes the breaker (heater powered).
    async fn turn_on(&self) -> Result<(), AdapterError>;

    /// Opens the breaker.
    async fn turn_off(&self) -> Result<(), AdapterError>;

    /// Releases the device connection. Idempotent.
    async fn close(&self);
}

/// The ventilator relay.
#[async_trait]
pub trait VentilatorRelay: Send + Sync {
    /// Drives the relay.
    async fn set(&self, on: bool) -> Result<(), AdapterError>;

    /// Reads the relay state.
    async fn status(&self) -> Result<bool, AdapterError>;
}

/// The floor-heating thermostat.
#[async_trait]
pub trait Thermostat: Send + Sync {
    /// Switches between schedule-driven and manual control.
    async fn set_mode(&self, mode: FloorHeatingMode) -> Result<(), AdapterError>;

    /// Sets the target temperature.
    async fn set_target_c(&self, target: f64) -> Result<(), AdapterError>;

    /// Reads the full thermostat state.
    async fn status(&self) -> Result<FloorHeatingState, AdapterError>;
}

/// The operator notification gateway.
///
/// Whether this is WhatsApp or something else is opaque to the core.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a text notification.
    async fn send_text(&self, body: &str) -> Result<(), AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sauna_types::assert_error_codes;

    #[test]
    fn error_codes_follow_convention() {
        let all = [
            AdapterError::timeout("relay set", 5_000),
            AdapterError::Io("connection reset".into()),
            AdapterError::Protocol {
                code: 7,
                message: "busy".into(),
            },
            AdapterError::Malformed("not json".into()),
        ];
        assert_error_codes(&all, "ADAPTER_");
    }

    #[test]
    fn transient_kinds_are_recoverable() {
        assert!(AdapterError::timeout("x", 1).is_recoverable());
        assert!(AdapterError::Io("reset".into()).is_recoverable());
        assert!(!AdapterError::Protocol {
            code: 1,
            message: "no".into()
        }
        .is_recoverable());
        assert!(!AdapterError::Malformed("??".into()).is_recoverable());
    }

    #[test]
    fn timeout_message_names_operation() {
        let err = AdapterError::timeout("mcb turn_off", 5_000);
        assert_eq!(err.to_string(), "mcb turn_off timed out after 5000 ms");
    }
}
