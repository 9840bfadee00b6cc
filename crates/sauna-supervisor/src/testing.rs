//! Scripted port implementations for tests.
//!
//! Every mock records the calls it receives and can be told to fail
//! its next N calls, which is enough to exercise the supervisor's
//! failure model without a device on the bench.

use crate::ports::{AdapterError, McbDevice, Notifier, Thermostat, VentilatorRelay};
use async_trait::async_trait;
use parking_lot::Mutex;
use sauna_types::{FloorHeatingMode, FloorHeatingState};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

fn take_failure(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}

fn injected() -> AdapterError {
    AdapterError::Io("injected failure".into())
}

/// Scripted MCB device.
#[derive(Debug, Default)]
pub struct MockMcb {
    on_calls: AtomicU64,
    off_calls: AtomicU64,
    close_calls: AtomicU64,
    fail_budget: AtomicUsize,
}

impl MockMcb {
    /// A device that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` switch commands.
    pub fn fail_next_commands(&self, n: usize) {
        self.fail_budget.store(n, Ordering::Release);
    }

    /// Number of `turn_on` calls seen.
    #[must_use]
    pub fn on_calls(&self) -> u64 {
        self.on_calls.load(Ordering::Acquire)
    }

    /// Number of `turn_off` calls seen.
    #[must_use]
    pub fn off_calls(&self) -> u64 {
        self.off_calls.load(Ordering::Acquire)
    }

    /// Number of `close` calls seen.
    #[must_use]
    pub fn close_calls(&self) -> u64 {
        self.close_calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl McbDevice for MockMcb {
    async fn turn_on(&self) -> Result<(), AdapterError> {
        self.on_calls.fetch_add(1, Ordering::AcqRel);
        if take_failure(&self.fail_budget) {
            return Err(injected());
        }
        Ok(())
    }

    async fn turn_off(&self) -> Result<(), AdapterError> {
        self.off_calls.fetch_add(1, Ordering::AcqRel);
        if take_failure(&self.fail_budget) {
            return Err(injected());
        }
        Ok(())
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
    }
}

/// Scripted ventilator relay.
#[derive(Debug, Default)]
pub struct MockRelay {
    set_calls: Mutex<Vec<bool>>,
    status: Mutex<Option<bool>>,
    fail_budget: AtomicUsize,
}

impl MockRelay {
    /// A relay that accepts everything and reports no status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` `set` calls.
    pub fn fail_next_sets(&self, n: usize) {
        self.fail_budget.store(n, Ordering::Release);
    }

    /// Scripts the `status` answer.
    pub fn set_status(&self, on: bool) {
        *self.status.lock() = Some(on);
    }

    /// The recorded `set` arguments, in call order.
    #[must_use]
    pub fn set_calls(&self) -> Vec<bool> {
        self.set_calls.lock().clone()
    }

    /// Forgets recorded calls.
    pub fn clear(&self) {
        self.set_calls.lock().clear();
    }
}

#[async_trait]
impl VentilatorRelay for MockRelay {
    async fn set(&self, on: bool) -> Result<(), AdapterError> {
        if take_failure(&self.fail_budget) {
            return Err(injected());
        }
        self.set_calls.lock().push(on);
        Ok(())
    }

    async fn status(&self) -> Result<bool, AdapterError> {
        (*self.status.lock()).ok_or_else(|| AdapterError::Malformed("no scripted status".into()))
    }
}

/// Scripted thermostat.
#[derive(Debug, Default)]
pub struct MockThermostat {
    modes: Mutex<Vec<FloorHeatingMode>>,
    targets: Mutex<Vec<f64>>,
    status: Mutex<Option<FloorHeatingState>>,
    fail_budget: AtomicUsize,
}

impl MockThermostat {
    /// A thermostat that accepts everything and reports no status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` calls (any operation).
    pub fn fail_next_calls(&self, n: usize) {
        self.fail_budget.store(n, Ordering::Release);
    }

    /// Scripts the `status` answer.
    pub fn set_status(&self, state: FloorHeatingState) {
        *self.status.lock() = Some(state);
    }

    /// The recorded `set_mode` arguments.
    #[must_use]
    pub fn modes(&self) -> Vec<FloorHeatingMode> {
        self.modes.lock().clone()
    }

    /// The recorded `set_target_c` arguments.
    #[must_use]
    pub fn targets(&self) -> Vec<f64> {
        self.targets.lock().clone()
    }
}

#[async_trait]
impl Thermostat for MockThermostat {
    async fn set_mode(&self, mode: FloorHeatingMode) -> Result<(), AdapterError> {
        if take_failure(&self.fail_budget) {
            return Err(injected());
        }
        self.modes.lock().push(mode);
        Ok(())
    }

    async fn set_target_c(&self, target: f64) -> Result<(), AdapterError> {
        if take_failure(&self.fail_budget) {
            return Err(injected());
        }
        self.targets.lock().push(target);
        Ok(())
    }

    async fn status(&self) -> Result<FloorHeatingState, AdapterError> {
        if take_failure(&self.fail_budget) {
            return Err(injected());
        }
        (*self.status.lock()).ok_or_else(|| AdapterError::Malformed("no scripted status".into()))
    }
}

/// Scripted notifier.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<String>>,
    fail_budget: AtomicUsize,
}

impl MockNotifier {
    /// A notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` sends.
    pub fn fail_next_sends(&self, n: usize) {
        self.fail_budget.store(n, Ordering::Release);
    }

    /// Bodies sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_text(&self, body: &str) -> Result<(), AdapterError> {
        if take_failure(&self.fail_budget) {
            return Err(injected());
        }
        self.sent.lock().push(body.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failure_budget_is_consumed() {
        let relay = MockRelay::new();
        relay.fail_next_sets(2);

        assert!(relay.set(true).await.is_err());
        assert!(relay.set(true).await.is_err());
        assert!(relay.set(true).await.is_ok());
        assert_eq!(relay.set_calls(), vec![true]);
    }

    #[tokio::test]
    async fn unscripted_status_is_malformed() {
        let relay = MockRelay::new();
        assert!(relay.status().await.is_err());
        relay.set_status(true);
        assert_eq!(relay.status().await.unwrap(), true);
    }

    #[tokio::test]
    async fn notifier_records_bodies() {
        let notifier = MockNotifier::new();
        notifier.send_text("hello").await.unwrap();
        assert_eq!(notifier.sent(), vec!["hello".to_string()]);
    }
}
