//! Button actions and the flic mapping.
//!
//! The wall button (a flic) reports raw gestures; the adapter
//! normalizes vendor spellings into [`ButtonAction`], and the
//! configured [`FlicMapping`] resolves each gesture to the operator
//! command it stands for.

use serde::{Deserialize, Serialize};

/// A normalized button gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Single short press.
    Click,
    /// Two presses in quick succession.
    DoubleClick,
    /// Press held down.
    Hold,
    /// Unrecognized gesture string from the device.
    Unknown,
}

/// A button press as delivered to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    /// The normalized gesture.
    pub action: ButtonAction,
    /// Device identifier, when the payload carried one.
    pub button_id: Option<String>,
}

impl ButtonEvent {
    /// Creates an event with no device identifier.
    #[must_use]
    pub fn new(action: ButtonAction) -> Self {
        Self {
            action,
            button_id: None,
        }
    }

    /// Attaches the device identifier.
    #[must_use]
    pub fn with_button_id(mut self, id: impl Into<String>) -> Self {
        self.button_id = Some(id.into());
        self
    }
}

/// What a button gesture resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlicAction {
    /// Flip the MCB: on when off or unknown, off when on.
    Toggle,
    /// Turn the MCB on regardless of current state.
    ForceOn,
    /// Turn the MCB off regardless of current state.
    ForceOff,
    /// Ignore the gesture.
    #[default]
    None,
}

/// Gesture → action mapping, from configuration.
///
/// Defaults match the installed button: click toggles, double-click
/// forces off (panic gesture), hold forces on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlicMapping {
    /// Action for a single click.
    pub click: FlicAction,
    /// Action for a double click.
    pub double_click: FlicAction,
    /// Action for a hold.
    pub hold: FlicAction,
}

impl Default for FlicMapping {
    fn default() -> Self {
        Self {
            click: FlicAction::Toggle,
            double_click: FlicAction::ForceOff,
            hold: FlicAction::ForceOn,
        }
    }
}

impl FlicMapping {
    /// Resolves a gesture to its configured action.
    ///
    /// Unknown gestures always resolve to [`FlicAction::None`].
    #[must_use]
    pub fn resolve(&self, action: ButtonAction) -> FlicAction {
        match action {
            ButtonAction::Click => self.click,
            ButtonAction::DoubleClick => self.double_click,
            ButtonAction::Hold => self.hold,
            ButtonAction::Unknown => FlicAction::None,
        }
    }
}
