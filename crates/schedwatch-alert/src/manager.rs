//! AlertManager — console echo, channel fan-out, and cooldown.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use schedwatch_core::{age, iso8601, AlertConfig, Clock};

use crate::channel::AlertChannel;
use crate::email::EmailChannel;
use crate::error::AlertError;
use crate::webhook::WebhookChannel;

/// What happened to one alert request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// The cooldown was active, so no channel was attempted.
    pub suppressed: bool,
    /// Channels that accepted the alert.
    pub delivered: Vec<String>,
    /// Channels that were attempted and failed.
    pub failed: Vec<String>,
}

pub struct AlertManager {
    channels: Vec<Box<dyn AlertChannel>>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    /// Last time any channel delivered an alert.
    last_alert_time: Mutex<Option<DateTime<Utc>>>,
}

impl AlertManager {
    /// Manager with no channels: alerts are only logged and echoed.
    pub fn new(clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            channels: Vec::new(),
            clock,
            cooldown,
            last_alert_time: Mutex::new(None),
        }
    }

    /// Build a manager with every channel `config` fully describes.
    /// Unconfigured channels are skipped with a warning.
    pub fn from_config(config: &AlertConfig, clock: Arc<dyn Clock>) -> Result<Self, AlertError> {
        let mut manager = Self::new(clock, config.cooldown);

        match &config.email {
            Some(email) => {
                if let Some(channel) = EmailChannel::from_config(email, config.timeout)? {
                    manager = manager.with_channel(Box::new(channel));
                }
            }
            None => warn!("email not configured, skipping email alerts"),
        }

        match &config.webhook {
            Some(webhook) => {
                if let Some(channel) = WebhookChannel::from_config(webhook, config.timeout)? {
                    manager = manager.with_channel(Box::new(channel));
                }
            }
            None => warn!("webhook not configured, skipping webhook alerts"),
        }

        if manager.channels.is_empty() {
            info!("no alert channels configured, alerts go to the console only");
        }
        Ok(manager)
    }

    pub fn with_channel(mut self, channel: Box<dyn AlertChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn last_alert_time(&self) -> Option<DateTime<Utc>> {
        *self.last_alert_time.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the cooldown since the last delivered alert has elapsed.
    pub fn should_send_alert(&self) -> bool {
        match self.last_alert_time() {
            None => true,
            Some(last) => age(self.clock.now(), last) >= self.cooldown,
        }
    }

    /// Log and echo the alert, then try every channel unless the cooldown
    /// is active. Channel failures are logged and reported, never raised.
    pub async fn send_alert(&self, subject: &str, message: &str) -> DispatchReport {
        let now = self.clock.now();
        warn!(%subject, %message, "ALERT");
        println!("{}", console_banner(subject, message, now));

        let mut report = DispatchReport::default();
        if !self.should_send_alert() {
            info!(%subject, "suppressing alert due to cooldown");
            report.suppressed = true;
            return report;
        }

        for channel in &self.channels {
            match channel.send(subject, message).await {
                Ok(()) => {
                    *self.last_alert_time.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(self.clock.now());
                    info!(channel = channel.name(), %subject, "alert sent");
                    report.delivered.push(channel.name().to_string());
                }
                Err(e) => {
                    error!(channel = channel.name(), error = %e, "failed to send alert");
                    report.failed.push(channel.name().to_string());
                }
            }
        }
        report
    }
}

/// Banner printed to the operator console for every alert.
pub fn console_banner(subject: &str, message: &str, at: DateTime<Utc>) -> String {
    let rule = "!".repeat(60);
    format!(
        "\n{rule}\nALERT: {subject}\nTime: {}\nMessage: {message}\n{rule}\n",
        iso8601::format(&at)
    )
}
