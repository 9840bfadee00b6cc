//! The supervisor's event union and operator commands.
//!
//! Events are a tagged union; the supervisor dispatches exhaustively
//! on the tag and logs anything it deliberately ignores. Operator
//! commands carry an optional reply channel so the HTTP layer gets a
//! typed result without the supervisor ever blocking on it.

use sauna_types::{
    ButtonEvent, DoorReading, ErrorCode, FloorHeatingState, McbState, McbStatusSource,
    PhaseReading, TemperatureReading,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Identifier of an armed timer.
///
/// Unique per `after`/`every` call for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(pub u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// One input to the supervisor.
#[derive(Debug)]
pub enum Event {
    /// The MCB was observed in a state, by one of the two paths.
    McbObserved {
        state: McbState,
        source: McbStatusSource,
    },
    /// A complete three-phase reading from the meter adapter.
    PhaseReading(PhaseReading),
    /// A temperature report.
    TemperatureReading(TemperatureReading),
    /// A door contact report.
    DoorReading(DoorReading),
    /// A normalized button press.
    Button(ButtonEvent),
    /// The ventilator relay was observed on or off.
    VentilatorObserved { is_on: bool },
    /// The floor-heating poll returned a fresh state.
    FloorHeatingObserved(FloorHeatingState),
    /// An operator command from the HTTP layer.
    Command(OperatorCommand),
    /// A timer armed through the timer service fired.
    TimerFired { id: TimerId, generation: u64 },
    /// Begin orderly shutdown.
    Shutdown,
}

impl Event {
    /// Whether the overflow policy must never drop this event.
    ///
    /// Safety depends on phase readings and breaker observations; all
    /// other traffic is reconstructible or best-effort.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::PhaseReading(_) | Self::McbObserved { .. })
    }

    /// Short tag for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::McbObserved { .. } => "mcb_observed",
            Self::PhaseReading(_) => "phase_reading",
            Self::TemperatureReading(_) => "temperature",
            Self::DoorReading(_) => "door",
            Self::Button(_) => "button",
            Self::VentilatorObserved { .. } => "ventilator_observed",
            Self::FloorHeatingObserved(_) => "floor_heating_observed",
            Self::Command(_) => "command",
            Self::TimerFired { .. } => "timer_fired",
            Self::Shutdown => "shutdown",
        }
    }
}

/// The eight logical operator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    /// Report the current MCB state.
    GetMcb,
    /// Switch the breaker on.
    TurnOn,
    /// Switch the breaker off.
    TurnOff,
    /// Flip the breaker (flic single click).
    Toggle,
    /// Switch on regardless of current state.
    ForceOn,
    /// Switch off regardless of current state.
    ForceOff,
    /// Send a test notification, bypassing the rate limiter.
    TestNotify,
    /// Report supervisor health.
    Health,
}

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Current MCB state (from `GetMcb`).
    Mcb(McbState),
    /// The breaker was driven to this state.
    Switched(McbState),
    /// The test notification went out.
    NotifySent,
    /// Health summary.
    Health(HealthReport),
}

/// Health summary returned by the `Health` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Current MCB state.
    pub mcb: McbState,
    /// Whether the phase-threshold safety check is active.
    pub safety_enabled: bool,
    /// Non-critical events shed by the bus since start.
    pub dropped_events: u64,
}

/// Failure kind surfaced to the HTTP caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandFailureKind {
    /// The device call did not complete within its deadline.
    Timeout,
    /// The device returned an error.
    Device,
    /// The notification gateway rejected or failed the send.
    Notify,
    /// The supervisor is shutting down.
    Unavailable,
}

/// A structured command failure.
///
/// Supervisor state is never changed by a failed command.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct CommandFailure {
    /// Failure classification.
    pub kind: CommandFailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl CommandFailure {
    /// Creates a failure of the given kind.
    #[must_use]
    pub fn new(kind: CommandFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl ErrorCode for CommandFailure {
    fn code(&self) -> &'static str {
        match self.kind {
            CommandFailureKind::Timeout => "CMD_TIMEOUT",
            CommandFailureKind::Device => "CMD_DEVICE",
            CommandFailureKind::Notify => "CMD_NOTIFY",
            CommandFailureKind::Unavailable => "CMD_UNAVAILABLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            CommandFailureKind::Timeout | CommandFailureKind::Notify
        )
    }
}

/// Typed result delivered back to the command issuer.
pub type CommandResult = Result<CommandOutcome, CommandFailure>;

/// An operator command on the bus.
///
/// `reply` is `None` for commands synthesized from button presses —
/// nobody is waiting on those.
#[derive(Debug)]
pub struct OperatorCommand {
    /// What to do.
    pub action: CommandAction,
    /// Where to deliver the typed result, if anyone is waiting.
    pub reply: Option<oneshot::Sender<CommandResult>>,
}

impl OperatorCommand {
    /// A command with no reply expected (button-originated).
    #[must_use]
    pub fn fire_and_forget(action: CommandAction) -> Self {
        Self {
            action,
            reply: None,
        }
    }

    /// A command with a reply channel; returns the receiving half.
    #[must_use]
    pub fn with_reply(action: CommandAction) -> (Self, oneshot::Receiver<CommandResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                action,
                reply: Some(tx),
            },
            rx,
        )
    }

    /// Delivers the result to the issuer, if one is waiting.
    ///
    /// A dropped receiver (HTTP client went away) is not an error.
    pub fn respond(self, result: CommandResult) {
        if let Some(tx) = self.reply {
            let _ = tx.send(result);
        }
    }
}
