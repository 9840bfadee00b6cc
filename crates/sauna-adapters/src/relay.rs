//! Ventilator relay HTTP client.
//!
//! Speaks to a Shelly-style relay over its local HTTP API:
//! `GET /relay/0?turn=on|off` to drive the switch and
//! `GET /rpc/Switch.GetStatus?id=0` to read it back, with the status
//! body going through the tolerant shape parser
//! ([`crate::ventilator_status`]).

use async_trait::async_trait;
use sauna_supervisor::config::VentilatorConfig;
use sauna_supervisor::ports::{AdapterError, VentilatorRelay};
use std::time::Duration;
use tracing::trace;

/// HTTP implementation of [`VentilatorRelay`].
#[derive(Debug, Clone)]
pub struct ShellyRelay {
    base: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ShellyRelay {
    /// Creates a client for the relay at `cfg.ip`.
    #[must_use]
    pub fn new(cfg: &VentilatorConfig) -> Self {
        Self {
            base: format!("http://{}", cfg.ip),
            timeout: cfg.timeout(),
            client: reqwest::Client::new(),
        }
    }

    fn switch_url(&self, on: bool) -> String {
        format!(
            "{}/relay/0?turn={}",
            self.base,
            if on { "on" } else { "off" }
        )
    }

    fn status_url(&self) -> String {
        format!("{}/rpc/Switch.GetStatus?id=0", self.base)
    }

    async fn get(&self, url: &str, operation: &'static str) -> Result<String, AdapterError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| classify(err, operation, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Protocol {
                code: i32::from(status.as_u16()),
                message: format!("{operation} rejected by relay"),
            });
        }
        response
            .text()
            .await
            .map_err(|err| classify(err, operation, self.timeout))
    }
}

fn classify(err: reqwest::Error, operation: &'static str, timeout: Duration) -> AdapterError {
    if err.is_timeout() {
        AdapterError::timeout(
            operation,
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        )
    } else {
        AdapterError::Io(err.to_string())
    }
}

#[async_trait]
impl VentilatorRelay for ShellyRelay {
    async fn set(&self, on: bool) -> Result<(), AdapterError> {
        trace!(on, "relay set");
        self.get(&self.switch_url(on), "relay set").await?;
        Ok(())
    }

    async fn status(&self) -> Result<bool, AdapterError> {
        let body = self.get(&self.status_url(), "relay status").await?;
        crate::ventilator_status::parse(&body)
            .ok_or_else(|| AdapterError::Malformed(format!("unrecognized status body: {body}")))
    }
}
