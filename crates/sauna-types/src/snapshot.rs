//! The live snapshot and its wire records.
//!
//! A [`Snapshot`] is the immutable current-value view of everything
//! the supervisor has observed. The supervisor publishes one snapshot
//! per state transition; subscribers see them in publish order.
//!
//! The UI layer does not consume snapshots raw — it consumes the named
//! [`SnapshotRecord`]s rendered from one ([`Snapshot::records`]), plus
//! a synthetic `connected` record at attach time. The wire framing
//! (SSE or otherwise) is the HTTP layer's business.

use crate::{McbState, McbStatusSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a snapshot subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    /// Creates a fresh random id.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Floor-heating thermostat mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorHeatingMode {
    Auto,
    Manual,
    #[default]
    Unknown,
}

/// What the floor-heating loop is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorHeatingAction {
    Heating,
    Warming,
    Idle,
    #[default]
    Unknown,
}

/// Last observed floor-heating state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorHeatingState {
    /// Thermostat mode.
    pub mode: FloorHeatingMode,
    /// Current loop action.
    pub action: FloorHeatingAction,
    /// Setpoint, Celsius.
    pub target_c: f64,
    /// Measured floor temperature, Celsius.
    pub current_c: f64,
    /// When the thermostat reported this.
    pub at: DateTime<Utc>,
}

/// Ventilator controller summary, as reported in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VentilatorSummary {
    /// Whether the ventilator integration is configured at all.
    pub enabled: bool,
    /// Last observed relay state, if any observation arrived.
    pub relay_is_on: Option<bool>,
    /// A delayed-off timer is pending.
    pub has_delayed_off: bool,
    /// Time until the delayed-off fires, when pending.
    pub delayed_off_remaining_ms: Option<u64>,
    /// The keep-alive cycler is running.
    pub keep_alive_active: bool,
}

impl VentilatorSummary {
    /// Summary for a disabled or never-started controller.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            relay_is_on: None,
            has_delayed_off: false,
            delayed_off_remaining_ms: None,
            keep_alive_active: false,
        }
    }
}

/// The immutable record handed to snapshot subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Authoritative MCB state.
    pub mcb: McbState,
    /// Which path last reported the MCB state.
    pub mcb_source: McbStatusSource,
    /// Last complete phase reading.
    pub phases: Option<crate::PhaseReading>,
    /// Last temperature reading.
    pub temperature: Option<crate::TemperatureReading>,
    /// Last door reading.
    pub door: Option<crate::DoorReading>,
    /// Ventilator controller summary.
    pub ventilator: VentilatorSummary,
    /// Last observed floor-heating state.
    pub floor_heating: Option<FloorHeatingState>,
    /// Set when the most recent safety shutdown failed to switch the
    /// breaker off; cleared by the next successful transition.
    pub last_safety_error: Option<String>,
    /// When the supervisor assembled this snapshot.
    pub at: DateTime<Utc>,
}

impl Snapshot {
    /// An empty snapshot for a freshly started supervisor.
    #[must_use]
    pub fn initial(at: DateTime<Utc>) -> Self {
        Self {
            mcb: McbState::Unknown,
            mcb_source: McbStatusSource::default(),
            phases: None,
            temperature: None,
            door: None,
            ventilator: VentilatorSummary::disabled(),
            floor_heating: None,
            last_safety_error: None,
            at,
        }
    }

    /// Renders the named wire records for this snapshot, in the fixed
    /// order the UI contract lists them.
    ///
    /// Records for values never observed are omitted; `sensor_data`
    /// components are nullable on the wire but a record is only
    /// rendered once a complete reading exists.
    #[must_use]
    pub fn records(&self) -> Vec<SnapshotRecord> {
        let mut out = vec![SnapshotRecord::McbStatus {
            status: self.mcb,
            source: self.mcb_source,
        }];

        if let Some(p) = &self.phases {
            out.push(SnapshotRecord::SensorData {
                l1: Some(p.l1),
                l2: Some(p.l2),
                l3: Some(p.l3),
            });
        }
        if let Some(t) = &self.temperature {
            out.push(SnapshotRecord::Temperature {
                temperature: t.celsius,
                humidity: t.humidity,
            });
        }
        if let Some(d) = &self.door {
            out.push(SnapshotRecord::Door { is_open: d.is_open });
        }
        if self.ventilator.enabled {
            out.push(SnapshotRecord::Ventilator {
                status: self.ventilator.relay_is_on,
                delayed_off_remaining: self.ventilator.delayed_off_remaining_ms,
            });
        }
        if let Some(fh) = &self.floor_heating {
            out.push(SnapshotRecord::FloorHeating {
                current_temp: fh.current_c,
                target_temp: fh.target_c,
                mode: fh.mode,
                action: fh.action,
            });
        }
        out
    }
}

/// A named event record on the subscriber wire.
///
/// Tag names are the wire names the UI subscribes to; payload fields
/// keep the wire's camelCase spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SnapshotRecord {
    /// Breaker state and which path reported it.
    McbStatus {
        status: McbState,
        source: McbStatusSource,
    },
    /// Three-phase currents.
    SensorData {
        l1: Option<f64>,
        l2: Option<f64>,
        l3: Option<f64>,
    },
    /// Cabin temperature.
    Temperature {
        temperature: f64,
        humidity: Option<f64>,
    },
    /// Door contact.
    Door { is_open: bool },
    /// Ventilator relay and pending delayed-off.
    Ventilator {
        status: Option<bool>,
        delayed_off_remaining: Option<u64>,
    },
    /// Floor-heating thermostat.
    FloorHeating {
        current_temp: f64,
        target_temp: f64,
        mode: FloorHeatingMode,
        action: FloorHeatingAction,
    },
    /// Synthesized once per subscription, before any snapshot.
    Connected { subscriber_id: SubscriberId },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_snapshot() -> Snapshot {
        let at = Utc::now();
        Snapshot {
            mcb: McbState::On,
            mcb_source: McbStatusSource::Device,
            phases: Some(crate::PhaseReading::new(1.0, 2.0, 3.0, at)),
            temperature: Some(crate::TemperatureReading {
                celsius: 74.0,
                humidity: Some(12.0),
                battery_volts: None,
                rssi: Some(-61),
                at,
            }),
            door: Some(crate::DoorReading {
                is_open: false,
                battery_percent: Some(88.0),
                at,
            }),
            ventilator: VentilatorSummary {
                enabled: true,
                relay_is_on: Some(true),
                has_delayed_off: false,
                delayed_off_remaining_ms: None,
                keep_alive_active: true,
            },
            floor_heating: Some(FloorHeatingState {
                mode: FloorHeatingMode::Manual,
                action: FloorHeatingAction::Warming,
                target_c: 21.0,
                current_c: 19.5,
                at,
            }),
            last_safety_error: None,
            at,
        }
    }

    #[test]
    fn initial_snapshot_renders_only_mcb() {
        let records = Snapshot::initial(Utc::now()).records();
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0],
            SnapshotRecord::McbStatus {
                status: McbState::Unknown,
                ..
            }
        ));
    }

    #[test]
    fn full_snapshot_renders_all_records_in_order() {
        let records = full_snapshot().records();
        assert_eq!(records.len(), 6);
        assert!(matches!(records[0], SnapshotRecord::McbStatus { .. }));
        assert!(matches!(records[1], SnapshotRecord::SensorData { .. }));
        assert!(matches!(records[2], SnapshotRecord::Temperature { .. }));
        assert!(matches!(records[3], SnapshotRecord::Door { .. }));
        assert!(matches!(records[4], SnapshotRecord::Ventilator { .. }));
        assert!(matches!(records[5], SnapshotRecord::FloorHeating { .. }));
    }

    #[test]
    fn records_use_wire_tag_names() {
        let json = serde_json::to_value(SnapshotRecord::McbStatus {
            status: McbState::Off,
            source: McbStatusSource::Device,
        })
        .unwrap();
        assert_eq!(json["event"], "mcb_status");
        assert_eq!(json["status"], "off");

        let json = serde_json::to_value(SnapshotRecord::Connected {
            subscriber_id: SubscriberId::new(),
        })
        .unwrap();
        assert_eq!(json["event"], "connected");
        assert!(json.get("subscriberId").is_some());

        let json = serde_json::to_value(SnapshotRecord::Door { is_open: true }).unwrap();
        assert_eq!(json["isOpen"], true);
    }

    #[test]
    fn disabled_ventilator_record_omitted() {
        let mut snap = full_snapshot();
        snap.ventilator = VentilatorSummary::disabled();
        assert!(!snap
            .records()
            .iter()
            .any(|r| matches!(r, SnapshotRecord::Ventilator { .. })));
    }
}
