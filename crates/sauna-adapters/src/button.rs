//! Wall button payload decoding and gesture normalization.
//!
//! Firmware versions disagree on gesture spellings
//! (`single_click` vs `click`, `long_press` vs `hold`); the adapter
//! normalizes them so the supervisor only ever sees
//! [`ButtonAction`] variants. Unrecognized spellings become
//! [`ButtonAction::Unknown`] — delivered, logged, and mapped to no
//! action by the flic mapping.

use chrono::{DateTime, Utc};
use sauna_types::{ButtonAction, ButtonEvent};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ButtonPayload {
    action: String,
    button_id: Option<String>,
}

/// Normalizes a raw gesture string.
#[must_use]
pub fn normalize(action: &str) -> ButtonAction {
    match action.to_ascii_lowercase().as_str() {
        "click" | "single_click" => ButtonAction::Click,
        "double_click" | "doubleclick" => ButtonAction::DoubleClick,
        "hold" | "long_press" => ButtonAction::Hold,
        other => {
            debug!(action = other, "unrecognized button gesture");
            ButtonAction::Unknown
        }
    }
}

/// Decodes a button payload into an event.
///
/// `_at` is accepted for symmetry with the other parsers; button
/// events are acted on immediately and carry no timestamp of their
/// own.
#[must_use]
pub fn parse(payload: &str, _at: DateTime<Utc>) -> Option<ButtonEvent> {
    let p = match serde_json::from_str::<ButtonPayload>(payload) {
        Ok(p) => p,
        Err(err) => {
            debug!(error = %err, "malformed button payload dropped");
            return None;
        }
    };
    let mut event = ButtonEvent::new(normalize(&p.action));
    if let Some(id) = p.button_id {
        event = event.with_button_id(id);
    }
    Some(event)
}
