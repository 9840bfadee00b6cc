//! Sensor readings.
//!
//! Readings are immutable once emitted by their adapter. Wall-clock
//! timestamps record when the adapter assembled the value, not when
//! the supervisor processed it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complete three-phase current reading, in amperes.
///
/// Phase values arrive from the meter by field, not atomically; the
/// meter adapter's accumulator emits a `PhaseReading` only once all
/// three fields have been observed. A reading is never exposed with
/// fewer than three components set, and components are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseReading {
    /// Current on L1.
    pub l1: f64,
    /// Current on L2.
    pub l2: f64,
    /// Current on L3.
    pub l3: f64,
    /// When the adapter assembled this reading.
    pub at: DateTime<Utc>,
}

impl PhaseReading {
    /// Creates a reading stamped `at`.
    #[must_use]
    pub fn new(l1: f64, l2: f64, l3: f64, at: DateTime<Utc>) -> Self {
        Self { l1, l2, l3, at }
    }

    /// The largest of the three phase currents.
    #[must_use]
    pub fn max_amps(&self) -> f64 {
        self.l1.max(self.l2).max(self.l3)
    }
}

/// A temperature report from the Ruuvi sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Degrees Celsius. Required in the source payload.
    pub celsius: f64,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
    /// Sensor battery voltage.
    pub battery_volts: Option<f64>,
    /// Radio signal strength at the receiver.
    pub rssi: Option<i32>,
    /// When the adapter decoded the payload.
    pub at: DateTime<Utc>,
}

/// A door (window contact) report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoorReading {
    /// `true` when the contact is open.
    pub is_open: bool,
    /// Sensor battery, percent.
    pub battery_percent: Option<f64>,
    /// When the adapter decoded the payload.
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_amps_picks_largest_phase() {
        let r = PhaseReading::new(12.0, 28.5, 3.0, Utc::now());
        assert_eq!(r.max_amps(), 28.5);
    }

    #[test]
    fn phase_reading_roundtrip() {
        let r = PhaseReading::new(1.0, 2.0, 3.0, Utc::now());
        let json = serde_json::to_string(&r).unwrap();
        let back: PhaseReading = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
