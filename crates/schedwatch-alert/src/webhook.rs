//! Chat webhook alerts (Slack-compatible incoming webhooks).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use schedwatch_core::WebhookConfig;

use crate::channel::AlertChannel;
use crate::error::AlertError;

pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    username: String,
}

impl WebhookChannel {
    /// Build the channel, or `Ok(None)` with a warning when no URL is set.
    pub fn from_config(config: &WebhookConfig, timeout: Duration) -> Result<Option<Self>, AlertError> {
        let Some(url) = config.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            warn!("webhook not configured, skipping webhook alerts");
            return Ok(None);
        };

        crate::install_crypto_provider();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::Webhook(e.to_string()))?;

        info!("webhook alerts enabled");
        Ok(Some(Self {
            client,
            url: url.to_string(),
            username: config.username.clone(),
        }))
    }

    fn payload(&self, subject: &str, body: &str) -> serde_json::Value {
        json!({
            "text": format!("🚨 *{subject}*\n{body}"),
            "username": self.username,
        })
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError> {
        self.client
            .post(&self.url)
            .json(&self.payload(subject, body))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AlertError::Webhook(e.to_string()))?;
        Ok(())
    }
}
