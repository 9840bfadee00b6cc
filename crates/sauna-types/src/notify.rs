//! Notification kinds.

use serde::{Deserialize, Serialize};

/// Kinds of outbound operator notifications, each with its own
/// cooldown window in the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The safety evaluator tripped the breaker.
    SafetyShutdown,
    /// Cabin temperature crossed the alert threshold.
    TemperatureAlert,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SafetyShutdown => write!(f, "safety_shutdown"),
            Self::TemperatureAlert => write!(f, "temperature_alert"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(NotificationKind::SafetyShutdown.to_string(), "safety_shutdown");
        assert_eq!(
            NotificationKind::TemperatureAlert.to_string(),
            "temperature_alert"
        );
    }
}
