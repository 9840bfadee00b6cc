//! Notification rate limiter.
//!
//! A per-kind cooldown gate in front of the notifier. [`allow`] is a
//! pure read; [`mark_sent`] is the only writer and must be called
//! only after a notification actually went out — a denied or failed
//! attempt never shifts the window.

use sauna_types::NotificationKind;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Result of an [`RateLimiter::allow`] check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    /// Sending is allowed.
    Granted,
    /// Still inside the cooldown window.
    Denied {
        /// Time left until the window opens.
        remaining: Duration,
    },
}

impl Allowance {
    /// Returns `true` when sending is allowed.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Per-kind cooldown ledger.
///
/// Ledger entries are monotone non-decreasing.
#[derive(Debug)]
pub struct RateLimiter {
    cooldowns: HashMap<NotificationKind, Duration>,
    last_sent: HashMap<NotificationKind, Instant>,
}

impl RateLimiter {
    /// Creates a limiter with per-kind cooldowns.
    #[must_use]
    pub fn new(cooldowns: HashMap<NotificationKind, Duration>) -> Self {
        Self {
            cooldowns,
            last_sent: HashMap::new(),
        }
    }

    /// Checks whether a notification of `kind` may go out at `now`.
    ///
    /// Pure: no side effects, same answer for the same inputs.
    #[must_use]
    pub fn allow(&self, kind: NotificationKind, now: Instant) -> Allowance {
        let Some(cooldown) = self.cooldowns.get(&kind) else {
            return Allowance::Granted;
        };
        match self.last_sent.get(&kind) {
            Some(last) => {
                let elapsed = now.saturating_duration_since(*last);
                if elapsed >= *cooldown {
                    Allowance::Granted
                } else {
                    Allowance::Denied {
                        remaining: *cooldown - elapsed,
                    }
                }
            }
            None => Allowance::Granted,
        }
    }

    /// Records a successful send at `now`.
    ///
    /// Clamped monotone: an out-of-order `now` never moves an entry
    /// backwards.
    pub fn mark_sent(&mut self, kind: NotificationKind, now: Instant) {
        self.last_sent
            .entry(kind)
            .and_modify(|last| {
                if now > *last {
                    *last = now;
                }
            })
            .or_insert(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(HashMap::from([
            (NotificationKind::SafetyShutdown, Duration::from_secs(60)),
            (NotificationKind::TemperatureAlert, Duration::from_secs(300)),
        ]))
    }

    #[tokio::test(start_paused = true)]
    async fn first_send_always_granted() {
        let rl = limiter();
        let now = Instant::now();
        assert!(rl.allow(NotificationKind::SafetyShutdown, now).is_granted());
        assert!(rl
            .allow(NotificationKind::TemperatureAlert, now)
            .is_granted());
    }

    #[tokio::test(start_paused = true)]
    async fn denied_inside_window_with_remaining() {
        let mut rl = limiter();
        let t0 = Instant::now();
        rl.mark_sent(NotificationKind::SafetyShutdown, t0);

        let t1 = t0 + Duration::from_secs(20);
        match rl.allow(NotificationKind::SafetyShutdown, t1) {
            Allowance::Denied { remaining } => {
                assert_eq!(remaining, Duration::from_secs(40));
            }
            Allowance::Granted => panic!("should be denied inside the window"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn granted_again_after_window() {
        let mut rl = limiter();
        let t0 = Instant::now();
        rl.mark_sent(NotificationKind::SafetyShutdown, t0);

        assert!(rl
            .allow(NotificationKind::SafetyShutdown, t0 + Duration::from_secs(60))
            .is_granted());
    }

    #[tokio::test(start_paused = true)]
    async fn kinds_have_independent_windows() {
        let mut rl = limiter();
        let t0 = Instant::now();
        rl.mark_sent(NotificationKind::SafetyShutdown, t0);

        assert!(rl
            .allow(NotificationKind::TemperatureAlert, t0 + Duration::from_secs(1))
            .is_granted());
    }

    #[tokio::test(start_paused = true)]
    async fn allow_is_pure() {
        let rl = limiter();
        let now = Instant::now();
        // Repeated checks without mark_sent never close the window.
        for _ in 0..3 {
            assert!(rl.allow(NotificationKind::SafetyShutdown, now).is_granted());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ledger_is_monotone() {
        let mut rl = limiter();
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(30);
        rl.mark_sent(NotificationKind::SafetyShutdown, later);
        // An out-of-order earlier mark must not reopen the window.
        rl.mark_sent(NotificationKind::SafetyShutdown, t0);

        match rl.allow(NotificationKind::SafetyShutdown, later + Duration::from_secs(1)) {
            Allowance::Denied { remaining } => {
                assert_eq!(remaining, Duration::from_secs(59));
            }
            Allowance::Granted => panic!("window should still be closed"),
        }
    }
}
