//! Ventilator status payload decoding.
//!
//! Different relay firmware generations report the switch state in
//! different JSON shapes; all four in the field are accepted:
//!
//! 1. `{"output": true}`
//! 2. `{"switch:0": {"output": true}}`
//! 3. `{"status": true}`
//! 4. `{"state": "on"}` (case-insensitive)

use serde_json::Value;
use tracing::debug;

/// Decodes any of the four known status shapes into the relay state.
#[must_use]
pub fn parse(payload: &str) -> Option<bool> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "malformed ventilator status dropped");
            return None;
        }
    };

    if let Some(output) = value.get("output").and_then(Value::as_bool) {
        return Some(output);
    }
    if let Some(output) = value
        .get("switch:0")
        .and_then(|s| s.get("output"))
        .and_then(Value::as_bool)
    {
        return Some(output);
    }
    if let Some(status) = value.get("status").and_then(Value::as_bool) {
        return Some(status);
    }
    if let Some(state) = value.get("state").and_then(Value::as_str) {
        return match state.to_ascii_lowercase().as_str() {
            "on" => Some(true),
            "off" => Some(false),
            other => {
                debug!(state = other, "unrecognized ventilator state string");
                None
            }
        };
    }

    debug!("ventilator status in no known shape");
    None
}
