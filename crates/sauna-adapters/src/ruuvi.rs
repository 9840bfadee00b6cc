//! Ruuvi temperature payload decoding.
//!
//! The gateway publishes JSON like
//! `{"temp":74.2,"humidity":12.5,"pressure":1013,"batt":2.98,"rssi":-61}`.
//! Only `temp` is required; everything else is carried through when
//! present. Malformed payloads are dropped here.

use chrono::{DateTime, Utc};
use sauna_types::TemperatureReading;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RuuviPayload {
    temp: f64,
    humidity: Option<f64>,
    #[allow(dead_code)]
    pressure: Option<f64>,
    batt: Option<f64>,
    rssi: Option<i32>,
}

/// Decodes a Ruuvi payload into a reading.
///
/// Returns `None` (logged) for anything that does not carry a numeric
/// `temp`.
#[must_use]
pub fn parse(payload: &str, at: DateTime<Utc>) -> Option<TemperatureReading> {
    match serde_json::from_str::<RuuviPayload>(payload) {
        Ok(p) => Some(TemperatureReading {
            celsius: p.temp,
            humidity: p.humidity,
            battery_volts: p.batt,
            rssi: p.rssi,
            at,
        }),
        Err(err) => {
            debug!(error = %err, "malformed ruuvi payload dropped");
            None
        }
    }
}
