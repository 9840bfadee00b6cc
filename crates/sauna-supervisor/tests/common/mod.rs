#![allow(dead_code)] // not every scenario file uses every helper

//! Shared harness for supervisor scenario tests.
//!
//! Wires a real supervisor over scripted mock adapters, spawns its
//! loop, and hands the test the producer side of the bus plus every
//! mock for call inspection. Tests run under paused tokio time so
//! hour-scale timers advance instantly and deterministically.

use sauna_event::{channel, BusSender, Event};
use sauna_supervisor::broadcast::SnapshotBroadcaster;
use sauna_supervisor::config::SaunaConfig;
use sauna_supervisor::ports::{McbDevice, Notifier, Thermostat, VentilatorRelay};
use sauna_supervisor::supervisor::{Supervisor, SupervisorHandle};
use sauna_supervisor::testing::{MockMcb, MockNotifier, MockRelay, MockThermostat};
use sauna_types::{McbState, McbStatusSource, PhaseReading};
use std::sync::Arc;

pub struct Harness {
    pub bus: BusSender,
    pub handle: SupervisorHandle,
    pub broadcaster: SnapshotBroadcaster,
    pub mcb: Arc<MockMcb>,
    pub relay: Arc<MockRelay>,
    pub thermostat: Arc<MockThermostat>,
    pub notifier: Arc<MockNotifier>,
    pub task: tokio::task::JoinHandle<()>,
}

/// A config with the ventilator and floor heating wired up, so the
/// full peripheral fan-out is exercised.
pub fn full_config() -> SaunaConfig {
    let mut config = SaunaConfig::default();
    config.ventilator.ip = "192.168.1.40".into();
    config.floor_heating.device_id = "bf8b40".into();
    config.floor_heating.local_key = "secret".into();
    config
}

/// Spawns a supervisor over mocks and lets it publish its initial
/// snapshot.
pub async fn spawn(config: SaunaConfig) -> Harness {
    let (bus, rx) = channel(64);
    let mcb = Arc::new(MockMcb::new());
    let relay = Arc::new(MockRelay::new());
    let thermostat = Arc::new(MockThermostat::new());
    let notifier = Arc::new(MockNotifier::new());

    let supervisor = Supervisor::new(
        config,
        bus.clone(),
        rx,
        Arc::clone(&mcb) as Arc<dyn McbDevice>,
        Arc::clone(&relay) as Arc<dyn VentilatorRelay>,
        Arc::clone(&thermostat) as Arc<dyn Thermostat>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );
    let broadcaster = supervisor.broadcaster();
    let handle = SupervisorHandle::new(bus.clone());
    let task = tokio::spawn(supervisor.run());
    settle().await;

    Harness {
        bus,
        handle,
        broadcaster,
        mcb,
        relay,
        thermostat,
        notifier,
        task,
    }
}

/// Lets spawned tasks run until the system is quiescent.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Sends one event and lets the supervisor process it.
pub async fn feed(harness: &Harness, event: Event) {
    harness.bus.send(event).await.expect("bus open");
    settle().await;
}

/// Puts the supervisor's MCB into a known state via the device path.
pub async fn observe_mcb(harness: &Harness, state: McbState) {
    feed(
        harness,
        Event::McbObserved {
            state,
            source: McbStatusSource::Device,
        },
    )
    .await;
}

/// A complete phase reading stamped now.
pub fn phases(l1: f64, l2: f64, l3: f64) -> Event {
    Event::PhaseReading(PhaseReading::new(l1, l2, l3, chrono::Utc::now()))
}
