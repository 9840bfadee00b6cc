//! Door contact payload decoding.
//!
//! The contact sensor publishes `{"Window":0|1,"Battery":95}`.
//! `Window` is required and must be exactly 0 or 1.

use chrono::{DateTime, Utc};
use sauna_types::DoorReading;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct DoorPayload {
    #[serde(rename = "Window")]
    window: u8,
    #[serde(rename = "Battery")]
    battery: Option<f64>,
}

/// Decodes a door payload into a reading.
#[must_use]
pub fn parse(payload: &str, at: DateTime<Utc>) -> Option<DoorReading> {
    let p = match serde_json::from_str::<DoorPayload>(payload) {
        Ok(p) => p,
        Err(err) => {
            debug!(error = %err, "malformed door payload dropped");
            return None;
        }
    };
    let is_open = match p.window {
        0 => false,
        1 => true,
        other => {
            debug!(window = other, "door payload with out-of-range Window dropped");
            return None;
        }
    };
    Some(DoorReading {
        is_open,
        battery_percent: p.battery,
        at,
    })
}
