//! MCB state and observation source.
//!
//! The MCB (the smart breaker switching the heater) has exactly one
//! authoritative state holder: the supervisor. Everything else —
//! device events, meter-topic observations, command completions — is
//! an input the supervisor folds into that state.

use serde::{Deserialize, Serialize};

/// State of the smart circuit breaker.
///
/// Initialised [`Unknown`](Self::Unknown) at process start; the
/// supervisor is the only writer. Every change produces exactly one
/// new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McbState {
    /// Breaker is closed, heater powered.
    On,
    /// Breaker is open.
    Off,
    /// No observation yet (fresh process, or device unreachable).
    #[default]
    Unknown,
}

impl McbState {
    /// Returns `true` if the breaker is known to be closed.
    #[must_use]
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// Returns `true` if no observation has been folded in yet.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The state an explicit toggle should drive towards.
    ///
    /// `Unknown` toggles to `On`: an operator pressing toggle on an
    /// unobserved breaker expects the heater to start.
    #[must_use]
    pub fn toggled(&self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off | Self::Unknown => Self::On,
        }
    }
}

impl std::fmt::Display for McbState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which observation path produced an MCB state report.
///
/// Two paths exist historically: the local device channel and the
/// meter's MQTT topic. The authoritative one is configuration
/// (`mcb_status_source`); the other is honored only while the
/// supervisor still holds [`McbState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McbStatusSource {
    /// The local device channel.
    #[default]
    Device,
    /// The smart-meter publisher.
    Meter,
}

impl std::fmt::Display for McbStatusSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Meter => write!(f, "meter"),
        }
    }
}
