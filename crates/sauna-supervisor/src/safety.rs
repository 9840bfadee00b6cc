//! Phase-threshold safety evaluation.
//!
//! Pure and deterministic: the supervisor decides *when* to evaluate
//! and what to do with the verdict; this module only answers "does
//! this reading exceed the limit, and on which phases".

use sauna_types::PhaseReading;

/// One of the three live conductors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    L1,
    L2,
    L3,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L3 => write!(f, "L3"),
        }
    }
}

/// A phase that exceeded the threshold, with the current it carried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offender {
    /// Which conductor.
    pub phase: Phase,
    /// Measured current, amperes.
    pub amps: f64,
}

/// Verdict of a threshold evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdCheck {
    /// No phase exceeds the threshold.
    Within,
    /// At least one phase exceeds; offenders in fixed L1, L2, L3
    /// order.
    Exceeded(Vec<Offender>),
}

impl ThresholdCheck {
    /// Returns `true` when the reading exceeded the threshold.
    #[must_use]
    pub fn exceeds(&self) -> bool {
        matches!(self, Self::Exceeded(_))
    }
}

/// Evaluates a reading against the configured amperage threshold.
///
/// Comparison is strict `>` — a phase carrying exactly the threshold
/// does not trip.
#[must_use]
pub fn check_thresholds(reading: &PhaseReading, threshold: f64) -> ThresholdCheck {
    let mut offenders = Vec::new();
    for (phase, amps) in [
        (Phase::L1, reading.l1),
        (Phase::L2, reading.l2),
        (Phase::L3, reading.l3),
    ] {
        if amps > threshold {
            offenders.push(Offender { phase, amps });
        }
    }
    if offenders.is_empty() {
        ThresholdCheck::Within
    } else {
        ThresholdCheck::Exceeded(offenders)
    }
}

/// Formats offenders for the shutdown notification.
///
/// Amperage prints as a whole number exactly as the adapter delivered
/// it (truncation, no extra rounding): `"L1 (26A), L3 (28A)"`.
#[must_use]
pub fn format_offenders(offenders: &[Offender]) -> String {
    offenders
        .iter()
        .map(|o| format!("{} ({}A)", o.phase, o.amps as i64))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(l1: f64, l2: f64, l3: f64) -> PhaseReading {
        PhaseReading::new(l1, l2, l3, Utc::now())
    }

    #[test]
    fn within_when_all_below() {
        let check = check_thresholds(&reading(12.0, 7.0, 3.0), 25.0);
        assert_eq!(check, ThresholdCheck::Within);
        assert!(!check.exceeds());
    }

    #[test]
    fn equality_does_not_trip() {
        assert_eq!(check_thresholds(&reading(25.0, 25.0, 25.0), 25.0), ThresholdCheck::Within);
    }

    #[test]
    fn single_offender() {
        match check_thresholds(&reading(28.0, 7.0, 3.0), 25.0) {
            ThresholdCheck::Exceeded(offenders) => {
                assert_eq!(offenders.len(), 1);
                assert_eq!(offenders[0].phase, Phase::L1);
                assert_eq!(offenders[0].amps, 28.0);
            }
            ThresholdCheck::Within => panic!("should exceed"),
        }
    }

    #[test]
    fn offenders_in_fixed_phase_order() {
        match check_thresholds(&reading(26.0, 7.0, 28.0), 25.0) {
            ThresholdCheck::Exceeded(offenders) => {
                let phases: Vec<Phase> = offenders.iter().map(|o| o.phase).collect();
                assert_eq!(phases, vec![Phase::L1, Phase::L3]);
            }
            ThresholdCheck::Within => panic!("should exceed"),
        }
    }

    #[test]
    fn format_matches_notification_shape() {
        let offenders = [
            Offender {
                phase: Phase::L1,
                amps: 26.0,
            },
            Offender {
                phase: Phase::L3,
                amps: 28.0,
            },
        ];
        assert_eq!(format_offenders(&offenders), "L1 (26A), L3 (28A)");
    }

    #[test]
    fn format_truncates_fractional_amps() {
        let offenders = [Offender {
            phase: Phase::L2,
            amps: 27.9,
        }];
        assert_eq!(format_offenders(&offenders), "L2 (27A)");
    }
}
