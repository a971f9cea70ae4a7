//! schedwatch-core — shared types for the schedwatch health pipeline.
//!
//! The monitored job process writes a [`HealthStatus`] snapshot; independent
//! observers read it back and decide whether the job is healthy. Everything
//! both sides must agree on lives here:
//!
//! - [`HealthStatus`], the persisted snapshot and its ISO-8601 codec
//! - [`Clock`], so time-window policies can be tested without sleeping
//! - [`SchedwatchConfig`], the TOML configuration with env overrides

pub mod clock;
pub mod config;
pub mod iso8601;
pub mod types;

pub use clock::{age, Clock, ManualClock, SystemClock};
pub use config::{
    parse_duration, AlertConfig, ConfigError, EmailConfig, PolicyConfig, RealertPolicy,
    SchedwatchConfig, WatchdogConfig, WebhookConfig, DEFAULT_STATE_FILE,
};
pub use types::HealthStatus;
