//! Ventilator controller.
//!
//! Wraps the relay adapter with the two time-delayed behaviours the
//! sauna needs:
//!
//! - **Delayed off**: when the heater stops, the ventilator keeps
//!   running for a configured post-run period, then turns off.
//! - **Keep-alive cycling**: while the ventilator should be running,
//!   the relay is briefly cycled off and back on every period to
//!   defeat any upstream auto-off timer.
//!
//! States are the set of timers alive:
//!
//! | State | `McbOn` | `McbOff` | delay-off fires | keep-alive tick |
//! |---|---|---|---|---|
//! | Idle | → Running | relay off ⇒ stay; else arm delay-off | — | — |
//! | Running | stay | → Cooling | — | cycle relay |
//! | Cooling | → Running (cancel delay-off) | re-arm delay-off | relay OFF → Idle | cycle relay |
//!
//! All relay I/O initiated here is off the supervisor's critical
//! path: turn-on and cycling are spawned fire-and-forget, only the
//! delayed-off OFF command is awaited (so it is issued exactly once
//! before keep-alive stops). Relay failures are logged and never
//! alter the state machine; the observed relay state comes back
//! through the status stream.

use crate::clock::{TimerHandle, TimerService};
use crate::config::VentilatorConfig;
use crate::ports::{AdapterError, VentilatorRelay};
use sauna_event::TimerId;
use sauna_types::VentilatorSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Gap between the off and on legs of a keep-alive cycle.
const CYCLE_GAP: Duration = Duration::from_secs(1);

struct DelayedOff {
    handle: TimerHandle,
    deadline: Instant,
}

/// Delayed-off and keep-alive driver around the relay adapter.
///
/// Exclusively owned and driven by the supervisor task.
pub struct VentilatorController {
    relay: Arc<dyn VentilatorRelay>,
    timers: TimerService,
    enabled: bool,
    delay_off: Duration,
    keep_alive_every: Duration,
    call_timeout: Duration,
    relay_is_on: Option<bool>,
    last_observed_at: Option<Instant>,
    delayed: Option<DelayedOff>,
    keep_alive: Option<TimerHandle>,
}

impl VentilatorController {
    /// Creates a controller over `relay` with the configured periods.
    #[must_use]
    pub fn new(relay: Arc<dyn VentilatorRelay>, timers: TimerService, cfg: &VentilatorConfig) -> Self {
        Self {
            relay,
            timers,
            enabled: cfg.enabled && !cfg.ip.is_empty(),
            delay_off: cfg.delay_off(),
            keep_alive_every: cfg.keep_alive(),
            call_timeout: cfg.timeout(),
            relay_is_on: None,
            last_observed_at: None,
            delayed: None,
            keep_alive: None,
        }
    }

    /// Whether the integration is active at all.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Heater turned on: ventilator must run.
    ///
    /// Cancels a pending delayed-off, commands the relay on, and
    /// starts keep-alive cycling if it is not already running.
    pub fn on_mcb_on(&mut self) {
        if !self.enabled {
            return;
        }
        if let Some(delayed) = self.delayed.take() {
            self.timers.cancel(&delayed.handle);
            debug!("cancelled pending ventilator delayed-off");
        }
        self.spawn_set(true);
        if self.keep_alive.is_none() {
            self.keep_alive = Some(self.timers.every(self.keep_alive_every));
            debug!(period_s = self.keep_alive_every.as_secs(), "started ventilator keep-alive");
        }
    }

    /// Heater turned off: begin the post-run period.
    ///
    /// With the relay observed ON (or unknown) the delayed-off is
    /// (re-)armed and keep-alive keeps running until it fires. With
    /// the relay observed OFF there is nothing to cool down — the
    /// keep-alive stops immediately.
    pub fn on_mcb_off(&mut self) {
        if !self.enabled {
            return;
        }
        if self.relay_is_on == Some(false) {
            self.stop_keep_alive();
            return;
        }
        if let Some(delayed) = self.delayed.take() {
            self.timers.cancel(&delayed.handle);
        }
        let handle = self.timers.after(self.delay_off);
        self.delayed = Some(DelayedOff {
            handle,
            deadline: self.timers.now() + self.delay_off,
        });
        debug!(delay_s = self.delay_off.as_secs(), "armed ventilator delayed-off");
    }

    /// Folds in an observation from the ventilator status stream.
    pub fn observed(&mut self, is_on: bool, at: Instant) {
        self.relay_is_on = Some(is_on);
        self.last_observed_at = Some(at);
    }

    /// Dispatches a timer fire. Returns `false` when the timer does
    /// not belong to this controller.
    pub async fn handle_timer(&mut self, id: TimerId) -> bool {
        if self.delayed.as_ref().is_some_and(|d| d.handle.id() == id) {
            self.delayed = None;
            if let Err(err) = self.set_with_timeout(false).await {
                warn!(error = %err, "ventilator delayed-off relay command failed");
            }
            self.stop_keep_alive();
            return true;
        }
        if self.keep_alive.as_ref().is_some_and(|h| h.id() == id) {
            self.spawn_cycle();
            return true;
        }
        false
    }

    /// Cancels both timers and clears state.
    pub fn stop_all(&mut self) {
        if let Some(delayed) = self.delayed.take() {
            self.timers.cancel(&delayed.handle);
        }
        self.stop_keep_alive();
    }

    /// Current summary for the snapshot.
    #[must_use]
    pub fn summary(&self, now: Instant) -> VentilatorSummary {
        VentilatorSummary {
            enabled: self.enabled,
            relay_is_on: self.relay_is_on,
            has_delayed_off: self.delayed.is_some(),
            delayed_off_remaining_ms: self.delayed.as_ref().map(|d| {
                u64::try_from(d.deadline.saturating_duration_since(now).as_millis())
                    .unwrap_or(u64::MAX)
            }),
            keep_alive_active: self.keep_alive.is_some(),
        }
    }

    fn stop_keep_alive(&mut self) {
        if let Some(handle) = self.keep_alive.take() {
            self.timers.cancel(&handle);
            debug!("stopped ventilator keep-alive");
        }
    }

    /// Relay command on the critical path (delayed-off), awaited with
    /// the configured timeout.
    async fn set_with_timeout(&self, on: bool) -> Result<(), AdapterError> {
        let timeout_ms = u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(self.call_timeout, self.relay.set(on)).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::timeout("relay set", timeout_ms)),
        }
    }

    /// Fire-and-forget relay command off the critical path.
    fn spawn_set(&self, on: bool) {
        let relay = Arc::clone(&self.relay);
        let call_timeout = self.call_timeout;
        tokio::spawn(async move {
            let timeout_ms = u64::try_from(call_timeout.as_millis()).unwrap_or(u64::MAX);
            let result = match tokio::time::timeout(call_timeout, relay.set(on)).await {
                Ok(result) => result,
                Err(_) => Err(AdapterError::timeout("relay set", timeout_ms)),
            };
            if let Err(err) = result {
                warn!(on, error = %err, "ventilator relay command failed");
            }
        });
    }

    /// One keep-alive cycle: off, short gap, on. Failures are logged
    /// and the on leg is still attempted.
    fn spawn_cycle(&self) {
        let relay = Arc::clone(&self.relay);
        let call_timeout = self.call_timeout;
        tokio::spawn(async move {
            let timeout_ms = u64::try_from(call_timeout.as_millis()).unwrap_or(u64::MAX);
            for (leg, on) in [("off", false), ("on", true)] {
                let result = match tokio::time::timeout(call_timeout, relay.set(on)).await {
                    Ok(result) => result,
                    Err(_) => Err(AdapterError::timeout("relay set", timeout_ms)),
                };
                if let Err(err) = result {
                    warn!(leg, error = %err, "keep-alive relay leg failed");
                }
                if !on {
                    tokio::time::sleep(CYCLE_GAP).await;
                }
            }
        });
    }
}

impl std::fmt::Debug for VentilatorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VentilatorController")
            .field("enabled", &self.enabled)
            .field("relay_is_on", &self.relay_is_on)
            .field("has_delayed_off", &self.delayed.is_some())
            .field("keep_alive_active", &self.keep_alive.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRelay;
    use sauna_event::channel;

    fn cfg() -> VentilatorConfig {
        VentilatorConfig {
            ip: "192.168.1.40".into(),
            ..VentilatorConfig::default()
        }
    }

    fn controller(relay: Arc<MockRelay>) -> (VentilatorController, sauna_event::BusReceiver) {
        let (tx, rx) = channel(64);
        let timers = TimerService::new(tx);
        (VentilatorController::new(relay, timers, &cfg()), rx)
    }

    async fn settle() {
        // Let spawned relay tasks run to completion under paused time.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::advance(CYCLE_GAP).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn mcb_on_starts_keep_alive_and_relay() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(Arc::clone(&relay));

        vent.on_mcb_on();
        settle().await;

        assert_eq!(relay.set_calls(), vec![true]);
        let summary = vent.summary(Instant::now());
        assert!(summary.keep_alive_active);
        assert!(!summary.has_delayed_off);
    }

    #[tokio::test(start_paused = true)]
    async fn mcb_on_is_idempotent_for_keep_alive() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(relay);

        vent.on_mcb_on();
        let timers_live = vent.timers.live();
        vent.on_mcb_on();
        assert_eq!(vent.timers.live(), timers_live);
    }

    #[tokio::test(start_paused = true)]
    async fn mcb_off_with_relay_on_arms_delayed_off() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(relay);

        vent.on_mcb_on();
        vent.observed(true, Instant::now());
        vent.on_mcb_off();

        let summary = vent.summary(Instant::now());
        assert!(summary.has_delayed_off);
        // Keep-alive not stopped yet.
        assert!(summary.keep_alive_active);
        assert_eq!(
            summary.delayed_off_remaining_ms,
            Some(60 * 60 * 1000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn mcb_off_with_relay_unknown_arms_delayed_off() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(relay);

        vent.on_mcb_off();
        assert!(vent.summary(Instant::now()).has_delayed_off);
    }

    #[tokio::test(start_paused = true)]
    async fn mcb_off_with_relay_off_stops_keep_alive_immediately() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(relay);

        vent.on_mcb_on();
        vent.observed(false, Instant::now());
        vent.on_mcb_off();

        let summary = vent.summary(Instant::now());
        assert!(!summary.has_delayed_off);
        assert!(!summary.keep_alive_active);
    }

    #[tokio::test(start_paused = true)]
    async fn mcb_on_cancels_pending_delayed_off() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(relay);

        vent.observed(true, Instant::now());
        vent.on_mcb_off();
        assert!(vent.summary(Instant::now()).has_delayed_off);

        vent.on_mcb_on();
        let summary = vent.summary(Instant::now());
        assert!(!summary.has_delayed_off);
        assert!(summary.keep_alive_active);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_off_fire_turns_relay_off_and_stops_keep_alive() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(Arc::clone(&relay));

        vent.on_mcb_on();
        vent.observed(true, Instant::now());
        vent.on_mcb_off();
        settle().await;
        relay.clear();

        let id = vent.delayed.as_ref().expect("armed").handle.id();
        assert!(vent.handle_timer(id).await);

        assert_eq!(relay.set_calls(), vec![false]);
        let summary = vent.summary(Instant::now());
        assert!(!summary.has_delayed_off);
        assert!(!summary.keep_alive_active);
    }

    #[tokio::test(start_paused = true)]
    async fn keep_alive_tick_cycles_relay() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(Arc::clone(&relay));

        vent.on_mcb_on();
        settle().await;
        relay.clear();

        let id = vent.keep_alive.as_ref().expect("running").id();
        assert!(vent.handle_timer(id).await);
        settle().await;

        assert_eq!(relay.set_calls(), vec![false, true]);
        // Cycling does not change the timer set.
        assert!(vent.summary(Instant::now()).keep_alive_active);
    }

    #[tokio::test(start_paused = true)]
    async fn relay_failure_does_not_alter_state_machine() {
        let relay = Arc::new(MockRelay::new());
        relay.fail_next_sets(10);
        let (mut vent, _rx) = controller(Arc::clone(&relay));

        vent.on_mcb_on();
        settle().await;
        let id = vent.keep_alive.as_ref().expect("running").id();
        assert!(vent.handle_timer(id).await);
        settle().await;

        assert!(vent.summary(Instant::now()).keep_alive_active);
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_timer_not_claimed() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(relay);

        vent.on_mcb_on();
        assert!(!vent.handle_timer(TimerId(9999)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_clears_both_timers() {
        let relay = Arc::new(MockRelay::new());
        let (mut vent, _rx) = controller(relay);

        vent.observed(true, Instant::now());
        vent.on_mcb_on();
        vent.on_mcb_off();
        vent.stop_all();

        let summary = vent.summary(Instant::now());
        assert!(!summary.has_delayed_off);
        assert!(!summary.keep_alive_active);
        assert_eq!(vent.timers.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_controller_ignores_everything() {
        let relay = Arc::new(MockRelay::new());
        let (tx, _rx) = channel(16);
        let timers = TimerService::new(tx);
        let mut vent = VentilatorController::new(
            Arc::clone(&relay) as Arc<dyn VentilatorRelay>,
            timers,
            &VentilatorConfig {
                enabled: false,
                ..cfg()
            },
        );

        vent.on_mcb_on();
        vent.on_mcb_off();
        settle().await;

        assert!(relay.set_calls().is_empty());
        assert_eq!(vent.summary(Instant::now()), VentilatorSummary::disabled());
    }
}
