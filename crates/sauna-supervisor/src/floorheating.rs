//! Floor-heating controller.
//!
//! Drives the bathroom floor-heating thermostat in step with the
//! sauna: heater on → comfortable setpoint, heater off → standby
//! setpoint. Commands are best-effort and never block an MCB
//! transition; a periodic poll refreshes the observed state, with the
//! result coming back through the bus as `FloorHeatingObserved`.

use crate::clock::{TimerHandle, TimerService};
use crate::config::FloorHeatingConfig;
use crate::ports::{AdapterError, Thermostat};
use sauna_event::{BusSender, Event, TimerId};
use sauna_types::{FloorHeatingMode, FloorHeatingState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Deadline for each thermostat call.
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Setpoint/mode driver around the thermostat adapter.
///
/// Exclusively owned and driven by the supervisor task.
pub struct FloorHeatingController {
    thermostat: Arc<dyn Thermostat>,
    timers: TimerService,
    bus: BusSender,
    enabled: bool,
    target_on_c: f64,
    target_off_c: f64,
    poll_every: Duration,
    state: Option<FloorHeatingState>,
    poll: Option<TimerHandle>,
}

impl FloorHeatingController {
    /// Creates a controller over `thermostat`.
    ///
    /// An empty `device_id` disables the integration.
    #[must_use]
    pub fn new(
        thermostat: Arc<dyn Thermostat>,
        timers: TimerService,
        bus: BusSender,
        cfg: &FloorHeatingConfig,
    ) -> Self {
        Self {
            thermostat,
            timers,
            bus,
            enabled: !cfg.device_id.is_empty(),
            target_on_c: cfg.target_on_c,
            target_off_c: cfg.target_off_c,
            poll_every: cfg.poll_interval(),
            state: None,
            poll: None,
        }
    }

    /// Whether the integration is active.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Starts the periodic status poll.
    pub fn start(&mut self) {
        if self.enabled && self.poll.is_none() {
            self.poll = Some(self.timers.every(self.poll_every));
            debug!(period_ms = self.poll_every.as_millis() as u64, "started floor-heating poll");
        }
    }

    /// Sauna turned on: manual mode, comfortable setpoint.
    pub fn on_sauna_on(&self) {
        self.spawn_drive(self.target_on_c);
    }

    /// Sauna turned off: manual mode, standby setpoint.
    pub fn on_sauna_off(&self) {
        self.spawn_drive(self.target_off_c);
    }

    /// Folds in a poll result.
    pub fn observed(&mut self, state: FloorHeatingState) {
        self.state = Some(state);
    }

    /// Last observed thermostat state.
    #[must_use]
    pub fn state(&self) -> Option<FloorHeatingState> {
        self.state
    }

    /// Dispatches a timer fire. Returns `false` when the timer does
    /// not belong to this controller.
    pub fn handle_timer(&mut self, id: TimerId) -> bool {
        if self.poll.as_ref().is_some_and(|h| h.id() == id) {
            self.spawn_poll();
            return true;
        }
        false
    }

    /// Cancels the poll timer.
    pub fn stop_all(&mut self) {
        if let Some(handle) = self.poll.take() {
            self.timers.cancel(&handle);
        }
    }

    /// Fire-and-forget mode + setpoint drive.
    fn spawn_drive(&self, target_c: f64) {
        if !self.enabled {
            return;
        }
        let thermostat = Arc::clone(&self.thermostat);
        tokio::spawn(async move {
            if let Err(err) = call(thermostat.set_mode(FloorHeatingMode::Manual)).await {
                warn!(error = %err, "floor-heating set_mode failed");
            }
            match call(thermostat.set_target_c(target_c)).await {
                Ok(()) => debug!(target_c, "floor-heating setpoint applied"),
                Err(err) => warn!(target_c, error = %err, "floor-heating set_target failed"),
            }
        });
    }

    /// Fire-and-forget status poll; the result returns as an event.
    fn spawn_poll(&self) {
        let thermostat = Arc::clone(&self.thermostat);
        let bus = self.bus.clone();
        tokio::spawn(async move {
            match call(thermostat.status()).await {
                Ok(state) => {
                    if bus.send(Event::FloorHeatingObserved(state)).await.is_err() {
                        debug!("bus closed, dropping floor-heating poll result");
                    }
                }
                Err(err) => warn!(error = %err, "floor-heating status poll failed"),
            }
        });
    }
}

async fn call<T>(
    fut: impl std::future::Future<Output = Result<T, AdapterError>>,
) -> Result<T, AdapterError> {
    match tokio::time::timeout(CALL_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::timeout(
            "thermostat call",
            CALL_TIMEOUT.as_millis() as u64,
        )),
    }
}

impl std::fmt::Debug for FloorHeatingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloorHeatingController")
            .field("enabled", &self.enabled)
            .field("polling", &self.poll.is_some())
            .field("state", &self.state)
            .finish()
    }
}
