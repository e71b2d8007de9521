use crate::error::DeliveryError;
use crate::message::Message;
use crate::transport::Transport;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// Configuration for [`WebhookClient`].
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Full incoming-webhook URL, e.g. "https://hooks.slack.com/services/T000/B000/XXXX".
    pub url: String,
    /// Per-request timeout. `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

/// Slack incoming-webhook implementation of [`Transport`].
///
/// Posts each [`Message`] as JSON. Retries, backoff and authentication
/// beyond the secret URL are out of its scope.
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    /// Construct a client posting to `url` with default HTTP settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: Client::new(), url: url.into() }
    }

    /// Construct a client from a [`WebhookConfig`].
    ///
    /// **Returns**
    /// - `Err(DeliveryError::Http)` if the HTTP client cannot be built
    ///   (e.g. TLS backend initialization failed).
    pub fn from_config(config: &WebhookConfig) -> Result<Self, DeliveryError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self { client: builder.build()?, url: config.url.clone() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post a message and map non-success statuses to [`DeliveryError`].
    pub async fn post(&self, message: &Message) -> Result<(), DeliveryError> {
        let resp = self.client.post(&self.url).json(message).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(DeliveryError::Status { status, body })
        }
    }
}

#[async_trait]
impl Transport for WebhookClient {
    async fn send(&self, message: &Message) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.post(message).await?;
        Ok(())
    }
}
