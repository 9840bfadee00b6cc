//! Notification gateway HTTP client.
//!
//! Sends the text as a query parameter to a configured gateway URL.
//! Which messaging service sits behind the URL (WhatsApp bridge or
//! otherwise) is the gateway's business; the supervisor only sees
//! [`Notifier`].

use async_trait::async_trait;
use sauna_supervisor::ports::{AdapterError, Notifier};
use std::time::Duration;
use tracing::debug;

/// Deadline for gateway requests.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation of [`Notifier`].
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    /// Gateway endpoint, credentials already embedded in the query.
    url: String,
    client: reqwest::Client,
}

impl HttpNotifier {
    /// Creates a client for the gateway at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_text(&self, body: &str) -> Result<(), AdapterError> {
        debug!(chars = body.len(), "sending notification");
        let response = self
            .client
            .get(&self.url)
            .query(&[("text", body)])
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AdapterError::timeout(
                        "notifier send",
                        u64::try_from(SEND_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
                    )
                } else {
                    AdapterError::Io(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Protocol {
                code: i32::from(status.as_u16()),
                message: "gateway rejected notification".into(),
            });
        }
        Ok(())
    }
}
