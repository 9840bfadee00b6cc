//! Supervisor core.
//!
//! The single consumer of the event bus. All authoritative state —
//! MCB, last readings, the safety cooldown stamp — lives here and is
//! mutated from exactly one task, so no locking is needed. Peripheral
//! side-effects (ventilator, floor heating) are driven through the
//! controllers this struct owns; outbound notifications pass the rate
//! limiter first.
//!
//! # Suspension points
//!
//! The loop suspends only on the bus and on adapter calls it issued
//! itself, each wrapped in an explicit timeout (MCB 5 s, relay 5 s,
//! thermostat 5 s, notifier 10 s). Side-effects off the critical path
//! are spawned fire-and-forget by the controllers; their outcomes
//! return as events when relevant.
//!
//! # Failure model
//!
//! The loop never propagates an error out of itself. Adapter errors
//! are logged with context and either recorded in the snapshot (a
//! failed safety shutdown), returned to the HTTP caller (explicit
//! commands), or swallowed (best-effort peripherals).

use crate::broadcast::SnapshotBroadcaster;
use crate::clock::TimerService;
use crate::config::SaunaConfig;
use crate::floorheating::FloorHeatingController;
use crate::ports::{AdapterError, McbDevice, Notifier, Thermostat, VentilatorRelay};
use crate::ratelimit::RateLimiter;
use crate::safety::{check_thresholds, format_offenders, Offender, ThresholdCheck};
use crate::ventilator::VentilatorController;
use sauna_event::{
    BusReceiver, BusSender, CommandAction, CommandFailure, CommandFailureKind, CommandOutcome,
    CommandResult, Event, HealthReport, OperatorCommand, TimerId,
};
use sauna_types::{
    ButtonEvent, FlicAction, McbState, McbStatusSource, NotificationKind, Snapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Deadline for MCB switch commands.
const MCB_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for notifier sends.
const NOTIFIER_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown keeps draining buffered events.
const DRAIN_DEADLINE: Duration = Duration::from_secs(2);

async fn with_timeout<T>(
    dur: Duration,
    operation: &'static str,
    fut: impl std::future::Future<Output = Result<T, AdapterError>>,
) -> Result<T, AdapterError> {
    match tokio::time::timeout(dur, fut).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::timeout(
            operation,
            u64::try_from(dur.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}

/// Typed front door for the HTTP layer.
///
/// Wraps the bus sender and exposes the eight logical operator
/// commands. Each returns the supervisor's typed result; commands are
/// serialized with sensor-driven transitions by the bus itself.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    bus: BusSender,
}

impl SupervisorHandle {
    /// Creates a handle over the supervisor's bus.
    #[must_use]
    pub fn new(bus: BusSender) -> Self {
        Self { bus }
    }

    /// Reports the current MCB state.
    pub async fn get_mcb(&self) -> CommandResult {
        self.command(CommandAction::GetMcb).await
    }

    /// Switches the breaker on.
    pub async fn turn_on(&self) -> CommandResult {
        self.command(CommandAction::TurnOn).await
    }

    /// Switches the breaker off.
    pub async fn turn_off(&self) -> CommandResult {
        self.command(CommandAction::TurnOff).await
    }

    /// Flips the breaker.
    pub async fn toggle(&self) -> CommandResult {
        self.command(CommandAction::Toggle).await
    }

    /// Switches on regardless of current state.
    pub async fn force_on(&self) -> CommandResult {
        self.command(CommandAction::ForceOn).await
    }

    /// Switches off regardless of current state.
    pub async fn force_off(&self) -> CommandResult {
        self.command(CommandAction::ForceOff).await
    }

    /// Sends a test notification, bypassing the rate limiter.
    pub async fn test_notify(&self) -> CommandResult {
        self.command(CommandAction::TestNotify).await
    }

    /// Reports supervisor health.
    pub async fn health(&self) -> CommandResult {
        self.command(CommandAction::Health).await
    }

    /// Requests orderly shutdown. Returns once the event is queued.
    pub async fn shutdown(&self) -> bool {
        self.bus.send(Event::Shutdown).await.is_ok()
    }

    async fn command(&self, action: CommandAction) -> CommandResult {
        let (cmd, reply) = OperatorCommand::with_reply(action);
        if self.bus.send(Event::Command(cmd)).await.is_err() {
            return Err(CommandFailure::new(
                CommandFailureKind::Unavailable,
                "supervisor is not running",
            ));
        }
        match reply.await {
            Ok(result) => result,
            Err(_) => Err(CommandFailure::new(
                CommandFailureKind::Unavailable,
                "supervisor stopped before replying",
            )),
        }
    }
}

/// The event-driven state holder.
pub struct Supervisor {
    config: SaunaConfig,
    rx: BusReceiver,
    timers: TimerService,
    broadcaster: SnapshotBroadcaster,
    limiter: RateLimiter,
    mcb_device: Arc<dyn McbDevice>,
    notifier: Arc<dyn Notifier>,
    ventilator: VentilatorController,
    floor_heating: FloorHeatingController,

    mcb: McbState,
    mcb_source: McbStatusSource,
    last_phases: Option<sauna_types::PhaseReading>,
    last_temp: Option<sauna_types::TemperatureReading>,
    last_door: Option<sauna_types::DoorReading>,
    last_switch_off_at: Option<tokio::time::Instant>,
    last_safety_error: Option<String>,
}

impl Supervisor {
    /// Wires a supervisor over its adapters and the bus.
    ///
    /// `bus` is the producer side handed to adapters, the HTTP layer
    /// and the internal timer service; `rx` is the consumer side this
    /// supervisor drains.
    #[must_use]
    pub fn new(
        config: SaunaConfig,
        bus: BusSender,
        rx: BusReceiver,
        mcb_device: Arc<dyn McbDevice>,
        relay: Arc<dyn VentilatorRelay>,
        thermostat: Arc<dyn Thermostat>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let timers = TimerService::new(bus.clone());
        let ventilator = VentilatorController::new(relay, timers.clone(), &config.ventilator);
        let floor_heating = FloorHeatingController::new(
            thermostat,
            timers.clone(),
            bus,
            &config.floor_heating,
        );
        let limiter = RateLimiter::new(config.notification.cooldowns());
        let mcb_source = config.mcb_status_source;

        Self {
            config,
            rx,
            timers,
            broadcaster: SnapshotBroadcaster::new(),
            limiter,
            mcb_device,
            notifier,
            ventilator,
            floor_heating,
            mcb: McbState::Unknown,
            mcb_source,
            last_phases: None,
            last_temp: None,
            last_door: None,
            last_switch_off_at: None,
            last_safety_error: None,
        }
    }

    /// The broadcaster subscribers attach to.
    #[must_use]
    pub fn broadcaster(&self) -> SnapshotBroadcaster {
        self.broadcaster.clone()
    }

    /// Current MCB state, for tests and wiring.
    #[must_use]
    pub fn mcb(&self) -> McbState {
        self.mcb
    }

    /// Runs the loop until shutdown or until every producer is gone.
    pub async fn run(mut self) {
        info!(
            threshold_a = self.config.amperage_threshold,
            safety = self.config.safety_enabled,
            source = %self.config.mcb_status_source,
            "supervisor started"
        );
        self.floor_heating.start();
        self.publish();

        while let Some(event) = self.rx.recv().await {
            if matches!(event, Event::Shutdown) {
                self.shutdown_sequence().await;
                break;
            }
            self.handle_data_event(event).await;
        }
        info!("supervisor stopped");
    }

    /// Handles every event except `Shutdown`.
    async fn handle_data_event(&mut self, event: Event) {
        match event {
            Event::McbObserved { state, source } => self.on_mcb_observed(state, source),
            Event::PhaseReading(reading) => self.on_phase_reading(reading).await,
            Event::TemperatureReading(reading) => self.on_temperature(reading).await,
            Event::DoorReading(reading) => {
                self.last_door = Some(reading);
                self.publish();
            }
            Event::Button(button) => self.on_button(button).await,
            Event::VentilatorObserved { is_on } => {
                self.ventilator.observed(is_on, self.timers.now());
                self.publish();
            }
            Event::FloorHeatingObserved(state) => {
                self.floor_heating.observed(state);
                self.publish();
            }
            Event::Command(cmd) => self.on_command(cmd).await,
            Event::TimerFired { id, generation } => self.on_timer(id, generation).await,
            Event::Shutdown => {
                // Handled by the run loop; during drain it is inert.
            }
        }
    }

    fn on_mcb_observed(&mut self, state: McbState, source: McbStatusSource) {
        if source != self.config.mcb_status_source && !self.mcb.is_unknown() {
            debug!(%source, %state, "ignoring fallback MCB observer");
            return;
        }
        let previous = self.mcb;
        self.mcb = state;
        self.mcb_source = source;
        if previous != state {
            info!(from = %previous, to = %state, %source, "MCB observed");
            self.apply_transition_side_effects(previous, state);
        }
        self.publish();
    }

    async fn on_phase_reading(&mut self, reading: sauna_types::PhaseReading) {
        self.last_phases = Some(reading);
        self.publish();

        if !self.mcb.is_on() || !self.config.safety_enabled {
            return;
        }
        if let ThresholdCheck::Exceeded(offenders) =
            check_thresholds(&reading, self.config.amperage_threshold)
        {
            self.run_safety_shutdown(&offenders).await;
        }
    }

    /// The safety trip: cooldown gate, breaker off, alert.
    ///
    /// The cooldown stamp is committed *before* the device call so a
    /// burst of over-threshold readings produces at most one in-flight
    /// trip, and stays committed on failure so a broken device is not
    /// hammered.
    async fn run_safety_shutdown(&mut self, offenders: &[Offender]) {
        let now = self.timers.now();
        if let Some(last) = self.last_switch_off_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.config.switch_off_cooldown() {
                debug!(elapsed_ms = elapsed.as_millis() as u64, "safety trip inside cooldown");
                return;
            }
        }
        self.last_switch_off_at = Some(now);

        let formatted = format_offenders(offenders);
        warn!(offenders = %formatted, "phase threshold exceeded, tripping MCB");

        let device = Arc::clone(&self.mcb_device);
        let call = with_timeout(MCB_TIMEOUT, "mcb turn_off", device.turn_off()).await;
        match call {
            Ok(()) => {
                let previous = self.mcb;
                self.mcb = McbState::Off;
                self.mcb_source = McbStatusSource::Device;
                self.last_safety_error = None;
                self.apply_transition_side_effects(previous, McbState::Off);
                self.publish();
                self.notify_safety_shutdown(&formatted, now).await;
            }
            Err(err) => {
                error!(error = %err, "safety shutdown could not switch the MCB off");
                self.last_safety_error = Some(format!("MCB turn_off failed: {err}"));
                self.publish();
            }
        }
    }

    async fn notify_safety_shutdown(&mut self, formatted: &str, now: tokio::time::Instant) {
        let allowance = self.limiter.allow(NotificationKind::SafetyShutdown, now);
        if !allowance.is_granted() {
            debug!("safety shutdown notification rate limited");
            return;
        }
        let body = format!("Sauna safety shutdown: {formatted}");
        let notifier = Arc::clone(&self.notifier);
        let sent = with_timeout(NOTIFIER_TIMEOUT, "notifier send", notifier.send_text(&body)).await;
        match sent {
            Ok(()) => self.limiter.mark_sent(NotificationKind::SafetyShutdown, now),
            Err(err) => warn!(error = %err, "shutdown alert failed"),
        }
    }

    async fn on_temperature(&mut self, reading: sauna_types::TemperatureReading) {
        self.last_temp = Some(reading);
        self.publish();

        if reading.celsius < self.config.temperature_alert_celsius {
            return;
        }
        let now = self.timers.now();
        let allowance = self.limiter.allow(NotificationKind::TemperatureAlert, now);
        if !allowance.is_granted() {
            debug!(celsius = reading.celsius, "temperature alert rate limited");
            return;
        }
        let body = format!("Sauna temperature alert: {:.1}°C", reading.celsius);
        let notifier = Arc::clone(&self.notifier);
        let sent = with_timeout(NOTIFIER_TIMEOUT, "notifier send", notifier.send_text(&body)).await;
        match sent {
            Ok(()) => self.limiter.mark_sent(NotificationKind::TemperatureAlert, now),
            Err(err) => warn!(error = %err, "temperature alert failed"),
        }
    }

    async fn on_button(&mut self, button: ButtonEvent) {
        let action = self.config.flic.resolve(button.action);
        info!(gesture = ?button.action, resolved = ?action, "button press");
        let command = match action {
            FlicAction::Toggle => CommandAction::Toggle,
            FlicAction::ForceOn => CommandAction::ForceOn,
            FlicAction::ForceOff => CommandAction::ForceOff,
            FlicAction::None => return,
        };
        self.on_command(OperatorCommand::fire_and_forget(command)).await;
    }

    async fn on_command(&mut self, cmd: OperatorCommand) {
        let action = cmd.action;
        let result = match action {
            CommandAction::GetMcb => Ok(CommandOutcome::Mcb(self.mcb)),
            CommandAction::Health => Ok(CommandOutcome::Health(HealthReport {
                mcb: self.mcb,
                safety_enabled: self.config.safety_enabled,
                dropped_events: self.rx.dropped(),
            })),
            CommandAction::TestNotify => self.test_notify().await,
            CommandAction::TurnOn | CommandAction::ForceOn => self.switch_mcb(true).await,
            CommandAction::TurnOff | CommandAction::ForceOff => self.switch_mcb(false).await,
            CommandAction::Toggle => {
                let to_on = self.mcb.toggled().is_on();
                self.switch_mcb(to_on).await
            }
        };
        if let Err(failure) = &result {
            warn!(?action, error = %failure, "operator command failed");
        }
        cmd.respond(result);
    }

    /// Drives the breaker and, on success, applies the transition as
    /// if the new state had been observed.
    async fn switch_mcb(&mut self, to_on: bool) -> CommandResult {
        let call = if to_on {
            with_timeout(MCB_TIMEOUT, "mcb turn_on", self.mcb_device.turn_on()).await
        } else {
            with_timeout(MCB_TIMEOUT, "mcb turn_off", self.mcb_device.turn_off()).await
        };

        match call {
            Ok(()) => {
                let new = if to_on { McbState::On } else { McbState::Off };
                let previous = self.mcb;
                self.mcb = new;
                self.mcb_source = McbStatusSource::Device;
                self.last_safety_error = None;
                if previous != new {
                    self.apply_transition_side_effects(previous, new);
                }
                self.publish();
                Ok(CommandOutcome::Switched(new))
            }
            Err(err @ AdapterError::Timeout { .. }) => Err(CommandFailure::new(
                CommandFailureKind::Timeout,
                err.to_string(),
            )),
            Err(err) => Err(CommandFailure::new(
                CommandFailureKind::Device,
                err.to_string(),
            )),
        }
    }

    async fn test_notify(&mut self) -> CommandResult {
        // Deliberately not rate limited: the only bypass.
        match with_timeout(
            NOTIFIER_TIMEOUT,
            "notifier send",
            self.notifier.send_text("Sauna supervisor test notification"),
        )
        .await
        {
            Ok(()) => Ok(CommandOutcome::NotifySent),
            Err(err) => Err(CommandFailure::new(
                CommandFailureKind::Notify,
                err.to_string(),
            )),
        }
    }

    /// Peripheral fan-out for an MCB transition, identical for
    /// observed states and command completions.
    fn apply_transition_side_effects(&mut self, previous: McbState, new: McbState) {
        match (previous, new) {
            (McbState::On, McbState::Off) => {
                self.ventilator.on_mcb_off();
                self.floor_heating.on_sauna_off();
            }
            (_, McbState::On) => {
                self.ventilator.on_mcb_on();
                self.floor_heating.on_sauna_on();
            }
            // Unknown→Off: the sauna was not known to be running, so
            // there is no post-run work to schedule.
            _ => {}
        }
    }

    async fn on_timer(&mut self, id: TimerId, generation: u64) {
        if !self.timers.acknowledge(id, generation) {
            return;
        }
        if self.ventilator.handle_timer(id).await {
            self.publish();
            return;
        }
        if self.floor_heating.handle_timer(id) {
            // Snapshot follows when the poll result arrives.
            return;
        }
        debug!(%id, "timer fire with no owner");
    }

    async fn shutdown_sequence(&mut self) {
        info!("shutdown requested, draining bus");
        let deadline = self.timers.now() + DRAIN_DEADLINE;
        while self.timers.now() < deadline {
            match self.rx.try_recv() {
                Some(Event::Shutdown) | None => break,
                Some(event) => self.handle_data_event(event).await,
            }
        }

        self.ventilator.stop_all();
        self.floor_heating.stop_all();
        self.timers.shutdown();
        self.mcb_device.close().await;
        self.broadcaster.close();
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            mcb: self.mcb,
            mcb_source: self.mcb_source,
            phases: self.last_phases,
            temperature: self.last_temp,
            door: self.last_door,
            ventilator: self.ventilator.summary(self.timers.now()),
            floor_heating: self.floor_heating.state(),
            last_safety_error: self.last_safety_error.clone(),
            at: chrono::Utc::now(),
        }
    }

    fn publish(&self) {
        self.broadcaster.publish(self.snapshot());
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("mcb", &self.mcb)
            .field("queued", &self.rx.len())
            .finish_non_exhaustive()
    }
}
