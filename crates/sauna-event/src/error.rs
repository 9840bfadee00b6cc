//! Event system errors.

use sauna_types::ErrorCode;
use thiserror::Error;

/// Errors from the event bus.
#[derive(Debug, Error)]
pub enum EventError {
    /// The receiving side is gone; no event can be delivered.
    #[error("event bus closed")]
    Closed,
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::Closed => "BUS_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        // A closed bus means the supervisor is shutting down.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sauna_types::assert_error_code;

    #[test]
    fn codes_follow_convention() {
        assert_error_code(&EventError::Closed, "BUS_");
        assert!(!EventError::Closed.is_recoverable());
    }
}
