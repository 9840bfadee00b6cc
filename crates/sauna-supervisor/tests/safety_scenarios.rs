//! Safety trip scenarios: threshold evaluation, cooldown, failure
//! annotation, temperature alerts.

mod common;

use common::{feed, full_config, observe_mcb, phases, spawn};
use sauna_event::Event;
use sauna_types::{McbState, TemperatureReading};
use std::time::Duration;

fn temperature(celsius: f64) -> Event {
    Event::TemperatureReading(TemperatureReading {
        celsius,
        humidity: None,
        battery_volts: None,
        rssi: None,
        at: chrono::Utc::now(),
    })
}

// ─── Safety trip ──────────────────────────────────────────────────

/// An in-range reading leaves the breaker alone; the next reading
/// with L1 over threshold trips it exactly once, with the alert body
/// naming the offending phase.
#[tokio::test(start_paused = true)]
async fn over_threshold_reading_trips_breaker_once() {
    let h = spawn(full_config()).await;
    observe_mcb(&h, McbState::On).await;

    feed(&h, phases(12.0, 7.0, 3.0)).await;
    assert_eq!(h.mcb.off_calls(), 0);

    feed(&h, phases(28.0, 7.0, 3.0)).await;
    assert_eq!(h.mcb.off_calls(), 1);

    let snap = h.broadcaster.current().expect("snapshot");
    assert_eq!(snap.mcb, McbState::Off);
    assert_eq!(snap.phases.map(|p| p.l1), Some(28.0));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("L1 (28A)"), "body was: {}", sent[0]);
}

/// Readings while the breaker is off are recorded but never
/// evaluated.
#[tokio::test(start_paused = true)]
async fn no_evaluation_while_breaker_off() {
    let h = spawn(full_config()).await;
    observe_mcb(&h, McbState::Off).await;

    feed(&h, phases(90.0, 7.0, 3.0)).await;
    assert_eq!(h.mcb.off_calls(), 0);
    assert_eq!(
        h.broadcaster.current().and_then(|s| s.phases).map(|p| p.l1),
        Some(90.0)
    );
}

// ─── Cooldown ─────────────────────────────────────────────────────

/// Inside the switch-off cooldown a second overload does not trip
/// again; after the window it does.
#[tokio::test(start_paused = true)]
async fn cooldown_suppresses_duplicate_trip() {
    let h = spawn(full_config()).await;
    observe_mcb(&h, McbState::On).await;

    feed(&h, phases(28.0, 7.0, 3.0)).await;
    assert_eq!(h.mcb.off_calls(), 1);

    // Operator (or device report) brings it back on right away.
    observe_mcb(&h, McbState::On).await;
    tokio::time::advance(Duration::from_secs(2)).await;
    feed(&h, phases(29.0, 7.0, 3.0)).await;
    assert_eq!(h.mcb.off_calls(), 1, "trip inside cooldown");

    tokio::time::advance(Duration::from_secs(10)).await;
    feed(&h, phases(29.0, 7.0, 3.0)).await;
    assert_eq!(h.mcb.off_calls(), 2, "trip after cooldown expired");
}

/// A reading with every phase at exactly the threshold never trips.
#[tokio::test(start_paused = true)]
async fn equality_does_not_trip() {
    let h = spawn(full_config()).await;
    observe_mcb(&h, McbState::On).await;

    feed(&h, phases(25.0, 25.0, 25.0)).await;
    assert_eq!(h.mcb.off_calls(), 0);
}

// ─── Safety action failure ────────────────────────────────────────

/// When the device refuses the off command the state stays On, the
/// snapshot carries the error annotation, and the committed cooldown
/// prevents immediate re-hammering.
#[tokio::test(start_paused = true)]
async fn failed_trip_annotates_snapshot_and_keeps_state() {
    let h = spawn(full_config()).await;
    observe_mcb(&h, McbState::On).await;

    h.mcb.fail_next_commands(1);
    feed(&h, phases(28.0, 7.0, 3.0)).await;
    assert_eq!(h.mcb.off_calls(), 1);

    let snap = h.broadcaster.current().expect("snapshot");
    assert_eq!(snap.mcb, McbState::On);
    assert!(snap
        .last_safety_error
        .as_deref()
        .is_some_and(|e| e.contains("turn_off failed")));
    assert!(h.notifier.sent().is_empty());

    // Cooldown committed despite the failure.
    tokio::time::advance(Duration::from_secs(2)).await;
    feed(&h, phases(28.0, 7.0, 3.0)).await;
    assert_eq!(h.mcb.off_calls(), 1);
}

/// The shutdown alert is rate limited, the trip itself is not.
#[tokio::test(start_paused = true)]
async fn shutdown_alert_rate_limited_across_trips() {
    let h = spawn(full_config()).await;

    for _ in 0..2 {
        observe_mcb(&h, McbState::On).await;
        feed(&h, phases(30.0, 7.0, 3.0)).await;
        tokio::time::advance(Duration::from_secs(15)).await;
    }

    assert_eq!(h.mcb.off_calls(), 2);
    // Second alert fell inside the 60 s notification cooldown.
    assert_eq!(h.notifier.sent().len(), 1);
}

// ─── Temperature alerts ───────────────────────────────────────────

/// Crossing the temperature threshold alerts once per cooldown
/// window; the boundary value itself alerts.
#[tokio::test(start_paused = true)]
async fn temperature_alert_threshold_and_cooldown() {
    let h = spawn(full_config()).await;

    feed(&h, temperature(84.9)).await;
    assert!(h.notifier.sent().is_empty());

    feed(&h, temperature(85.0)).await;
    assert_eq!(h.notifier.sent().len(), 1);

    feed(&h, temperature(92.0)).await;
    assert_eq!(h.notifier.sent().len(), 1, "inside 300 s cooldown");

    tokio::time::advance(Duration::from_secs(300)).await;
    feed(&h, temperature(92.0)).await;
    assert_eq!(h.notifier.sent().len(), 2);
}

/// A failed alert send does not consume the cooldown window.
#[tokio::test(start_paused = true)]
async fn failed_alert_does_not_shift_window() {
    let h = spawn(full_config()).await;

    h.notifier.fail_next_sends(1);
    feed(&h, temperature(90.0)).await;
    assert!(h.notifier.sent().is_empty());

    feed(&h, temperature(90.0)).await;
    assert_eq!(h.notifier.sent().len(), 1);
}
