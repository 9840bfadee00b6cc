//! Phase meter adapter: topic matching and the phase accumulator.
//!
//! The smart meter publishes each phase current on its own topic; the
//! phase identifier is the last topic segment (`…/l1_a`, `…/l2_a`,
//! `…/l3_a`, case-insensitive) and the payload is a plain decimal in
//! amperes — no JSON, no units. Everything else under the prefix is
//! ignored.
//!
//! Readings arrive by field, not atomically. The [`PhaseAccumulator`]
//! holds the three fields and emits a complete [`PhaseReading`] only
//! once all of `l1`, `l2`, `l3` have been observed since connection;
//! after that, every field update emits a fresh reading built from
//! the latest values.

use chrono::{DateTime, Utc};
use sauna_types::PhaseReading;
use tracing::{debug, trace};

/// Which phase a topic addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseField {
    L1,
    L2,
    L3,
}

/// Extracts the phase from the last topic segment.
///
/// Returns `None` for every topic that is not a phase current, which
/// the caller simply ignores.
///
/// # Example
///
/// ```
/// use sauna_adapters::meter::{phase_field, PhaseField};
///
/// assert_eq!(phase_field("meter/sauna/l1_a"), Some(PhaseField::L1));
/// assert_eq!(phase_field("meter/sauna/L3_A"), Some(PhaseField::L3));
/// assert_eq!(phase_field("meter/sauna/voltage"), None);
/// ```
#[must_use]
pub fn phase_field(topic: &str) -> Option<PhaseField> {
    let last = topic.rsplit('/').next().unwrap_or(topic);
    match last.to_ascii_lowercase().as_str() {
        "l1_a" => Some(PhaseField::L1),
        "l2_a" => Some(PhaseField::L2),
        "l3_a" => Some(PhaseField::L3),
        _ => None,
    }
}

/// Parses a plain-text amperage payload.
///
/// Accepts a single non-negative finite decimal, surrounding
/// whitespace tolerated. Anything else is malformed.
#[must_use]
pub fn parse_amps(payload: &str) -> Option<f64> {
    let amps: f64 = payload.trim().parse().ok()?;
    if amps.is_finite() && amps >= 0.0 {
        Some(amps)
    } else {
        None
    }
}

/// Assembles per-field updates into complete readings.
///
/// Owned by the meter adapter task; one per connection. A reading is
/// never emitted with fewer than three components set.
#[derive(Debug, Default)]
pub struct PhaseAccumulator {
    l1: Option<f64>,
    l2: Option<f64>,
    l3: Option<f64>,
    last_update: Option<DateTime<Utc>>,
    rejected: u64,
}

impl PhaseAccumulator {
    /// A fresh accumulator with no fields observed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one field update, returning a complete reading once
    /// all three phases have been observed.
    pub fn update(&mut self, field: PhaseField, amps: f64, at: DateTime<Utc>) -> Option<PhaseReading> {
        match field {
            PhaseField::L1 => self.l1 = Some(amps),
            PhaseField::L2 => self.l2 = Some(amps),
            PhaseField::L3 => self.l3 = Some(amps),
        }
        self.last_update = Some(at);
        match (self.l1, self.l2, self.l3) {
            (Some(l1), Some(l2), Some(l3)) => Some(PhaseReading::new(l1, l2, l3, at)),
            _ => None,
        }
    }

    /// Handles a raw `(topic, payload)` pair.
    ///
    /// Non-phase topics are silently ignored; malformed payloads on a
    /// phase topic are dropped and counted.
    pub fn handle(
        &mut self,
        topic: &str,
        payload: &str,
        at: DateTime<Utc>,
    ) -> Option<PhaseReading> {
        let field = match phase_field(topic) {
            Some(field) => field,
            None => {
                trace!(topic, "ignored meter topic");
                return None;
            }
        };
        let amps = match parse_amps(payload) {
            Some(amps) => amps,
            None => {
                self.rejected += 1;
                debug!(topic, payload, "malformed amperage payload dropped");
                return None;
            }
        };
        self.update(field, amps, at)
    }

    /// Malformed payloads dropped so far.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// When the last field update arrived.
    #[must_use]
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn topic_matching_is_case_insensitive() {
        assert_eq!(phase_field("shellies/em3/emeter/l1_a"), Some(PhaseField::L1));
        assert_eq!(phase_field("shellies/em3/emeter/L2_A"), Some(PhaseField::L2));
        assert_eq!(phase_field("x/L3_a"), Some(PhaseField::L3));
        assert_eq!(phase_field("l1_a"), Some(PhaseField::L1));
    }

    #[test]
    fn sibling_topics_ignored() {
        assert_eq!(phase_field("shellies/em3/emeter/l1_v"), None);
        assert_eq!(phase_field("shellies/em3/emeter/total"), None);
        assert_eq!(phase_field("shellies/em3/online"), None);
    }

    #[test]
    fn amps_accept_plain_decimals() {
        assert_eq!(parse_amps("12.0"), Some(12.0));
        assert_eq!(parse_amps(" 0 "), Some(0.0));
        assert_eq!(parse_amps("28.45\n"), Some(28.45));
    }

    #[test]
    fn amps_reject_garbage() {
        assert_eq!(parse_amps("-3.0"), None);
        assert_eq!(parse_amps("NaN"), None);
        assert_eq!(parse_amps("inf"), None);
        assert_eq!(parse_amps("12A"), None);
        assert_eq!(parse_amps("{\"a\":1}"), None);
        assert_eq!(parse_amps(""), None);
    }

    #[test]
    fn no_reading_until_all_three_fields() {
        let mut acc = PhaseAccumulator::new();
        assert!(acc.handle("m/l1_a", "12.0", at()).is_none());
        assert!(acc.handle("m/l2_a", "7.0", at()).is_none());

        let reading = acc.handle("m/l3_a", "3.0", at()).expect("complete");
        assert_eq!((reading.l1, reading.l2, reading.l3), (12.0, 7.0, 3.0));
    }

    #[test]
    fn complete_accumulator_emits_on_every_update() {
        let mut acc = PhaseAccumulator::new();
        acc.handle("m/l1_a", "12.0", at());
        acc.handle("m/l2_a", "7.0", at());
        acc.handle("m/l3_a", "3.0", at());

        let reading = acc.handle("m/l1_a", "28.0", at()).expect("updated");
        assert_eq!((reading.l1, reading.l2, reading.l3), (28.0, 7.0, 3.0));
    }

    #[test]
    fn duplicate_field_before_completion_emits_nothing() {
        let mut acc = PhaseAccumulator::new();
        assert!(acc.handle("m/l1_a", "12.0", at()).is_none());
        assert!(acc.handle("m/l1_a", "13.0", at()).is_none());
    }

    #[test]
    fn malformed_payload_counted_not_emitted() {
        let mut acc = PhaseAccumulator::new();
        acc.handle("m/l1_a", "12.0", at());
        acc.handle("m/l2_a", "7.0", at());
        assert!(acc.handle("m/l3_a", "three amps", at()).is_none());
        assert_eq!(acc.rejected(), 1);

        // The valid retry completes the reading.
        assert!(acc.handle("m/l3_a", "3.0", at()).is_some());
    }

    #[test]
    fn ignored_topic_not_counted_as_rejected() {
        let mut acc = PhaseAccumulator::new();
        assert!(acc.handle("m/total_w", "4500", at()).is_none());
        assert_eq!(acc.rejected(), 0);
    }
}
