//! schedwatch.toml configuration.
//!
//! Every field has a default, so a missing or empty file yields a working
//! setup that watches `/tmp/scheduler_state.json` with no alert channels.
//! Durations are written as `"500ms"`, `"30s"`, `"5m"`, `"1h"` or a bare
//! number of seconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the monitored job writes its snapshot unless told otherwise.
pub const DEFAULT_STATE_FILE: &str = "/tmp/scheduler_state.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value:?}")]
    InvalidOverride { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedwatchConfig {
    /// Shared snapshot file between the job process and its observers.
    pub state_file: PathBuf,
    pub policy: PolicyConfig,
    pub watchdog: WatchdogConfig,
    pub alert: AlertConfig,
}

/// Thresholds for deciding whether a snapshot is healthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// More errors than this is unhealthy.
    pub max_errors: u64,
    /// Longest tolerated gap since the last heartbeat.
    #[serde(with = "duration_str")]
    pub max_execution_gap: Duration,
    /// Snapshots older than this mean the writer has died.
    #[serde(with = "duration_str")]
    pub staleness_window: Duration,
}

/// Whether the watchdog keeps asking for alerts while an outage lasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealertPolicy {
    /// Request an alert on every failed check past the threshold and let
    /// the alert cooldown drop the repeats.
    #[default]
    EveryCycle,
    /// Request one alert when the threshold is first reached, then stay
    /// quiet until recovery.
    OncePerOutage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    #[serde(with = "duration_str")]
    pub interval: Duration,
    /// Consecutive failed checks before alerting.
    pub failure_threshold: u32,
    pub realert: RealertPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between dispatched alerts.
    #[serde(with = "duration_str")]
    pub cooldown: Duration,
    /// Per-channel network timeout.
    #[serde(with = "duration_str")]
    pub timeout: Duration,
    pub email: Option<EmailConfig>,
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    /// Recipient address.
    pub to: Option<String>,
    /// Sender address; defaults to `smtp_user`.
    pub from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<String>,
    /// Display name for the posting bot.
    pub username: String,
}

impl Default for SchedwatchConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            policy: PolicyConfig::default(),
            watchdog: WatchdogConfig::default(),
            alert: AlertConfig::default(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_errors: 10,
            max_execution_gap: Duration::from_secs(5 * 60),
            staleness_window: Duration::from_secs(2 * 60),
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            failure_threshold: 3,
            realert: RealertPolicy::default(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(300),
            timeout: Duration::from_secs(10),
            email: None,
            webhook: None,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            to: None,
            from: None,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: "Scheduler Watchdog".to_string(),
        }
    }
}

impl EmailConfig {
    /// Credentials and recipient are all present.
    pub fn is_complete(&self) -> bool {
        self.smtp_user.is_some() && self.smtp_pass.is_some() && self.to.is_some()
    }
}

impl SchedwatchConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if given (defaults otherwise), then apply the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply `SCHEDWATCH_STATE_FILE`, `SMTP_*`, `ALERT_EMAIL` and
    /// `SLACK_WEBHOOK` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("SCHEDWATCH_STATE_FILE") {
            self.state_file = PathBuf::from(path);
        }

        let email_vars = ["SMTP_HOST", "SMTP_PORT", "SMTP_USER", "SMTP_PASS", "ALERT_EMAIL"];
        if email_vars.iter().any(|var| lookup(var).is_some()) {
            let email = self.alert.email.get_or_insert_with(EmailConfig::default);
            if let Some(host) = lookup("SMTP_HOST") {
                email.smtp_host = host;
            }
            if let Some(port) = lookup("SMTP_PORT") {
                email.smtp_port = port.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                    var: "SMTP_PORT",
                    value: port.clone(),
                })?;
            }
            if let Some(user) = lookup("SMTP_USER") {
                email.smtp_user = Some(user);
            }
            if let Some(pass) = lookup("SMTP_PASS") {
                email.smtp_pass = Some(pass);
            }
            if let Some(to) = lookup("ALERT_EMAIL") {
                email.to = Some(to);
            }
        }

        if let Some(url) = lookup("SLACK_WEBHOOK") {
            self.alert.webhook.get_or_insert_with(WebhookConfig::default).url = Some(url);
        }

        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "2m", "1h".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.trim().parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.trim().parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Serde adapter for human-readable durations.
mod duration_str {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if value.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", value.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", value.as_secs()))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => super::parse_duration(&text)
                .ok_or_else(|| D::Error::custom(format_args!("invalid duration {text:?}"))),
        }
    }
}
