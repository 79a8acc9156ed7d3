//! HTTP implementation of [`MessageGateway`] for a JSON SMS provider.

use std::time::Duration;

use anyhow::Context as _;
use mayday_core::gateway::{DeliveryError, MessageGateway};
use reqwest::Client;
use serde_json::json;

/// Connection settings for the SMS provider endpoint.
#[derive(Debug, Clone)]
pub struct SmsProviderConfig {
  pub url:       String,
  pub api_key:   String,
  /// The sender id or originating number registered with the provider.
  pub sender_id: String,
}

/// Sends each message as one JSON POST to the provider endpoint.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. The
/// dispatcher applies its own per-send timeout on top of the client's
/// overall one.
#[derive(Clone)]
pub struct HttpSmsGateway {
  client: Client,
  config: SmsProviderConfig,
}

impl HttpSmsGateway {
  pub fn new(config: SmsProviderConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }
}

impl MessageGateway for HttpSmsGateway {
  async fn send(
    &self,
    phone_number: &str,
    message: &str,
  ) -> Result<String, DeliveryError> {
    let response = self
      .client
      .post(&self.config.url)
      .bearer_auth(&self.config.api_key)
      .json(&json!({
        "from": self.config.sender_id,
        "to":   phone_number,
        "body": message,
      }))
      .send()
      .await
      .map_err(|e| DeliveryError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| DeliveryError::Transport(e.to_string()))?;

    if status.is_success() {
      Ok(body)
    } else {
      Err(DeliveryError::Provider(format!("{status}: {body}")))
    }
  }
}
