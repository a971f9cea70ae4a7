//! The health snapshot exchanged between the monitored job and its observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of the monitored job process.
///
/// The field names are the persisted schema: a flat JSON document that
/// readers in other processes rely on. Values are never edited in place;
/// derive a new one instead (see [`HealthStatus::marked_dead`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// When this snapshot was produced.
    #[serde(with = "crate::iso8601")]
    pub timestamp: DateTime<Utc>,
    /// Whether the writer believes the job process is running.
    pub is_alive: bool,
    /// Most recent successful heartbeat.
    #[serde(default, with = "crate::iso8601::option")]
    pub last_execution: Option<DateTime<Utc>>,
    /// Errors recorded since the last reset.
    pub error_count: u64,
    /// `"<iso-timestamp>: <message>"` for the most recent error.
    #[serde(default)]
    pub last_error: Option<String>,
    /// Seconds since the writer started.
    pub uptime_seconds: f64,
    /// Informational job count reported by the writer.
    pub active_jobs: u32,
    /// Heartbeats recorded since the counters were first created.
    pub total_executions: u64,
}

impl HealthStatus {
    /// Status for a job that has never reported: not alive, all counters zero.
    pub fn dead(now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            is_alive: false,
            last_execution: None,
            error_count: 0,
            last_error: None,
            uptime_seconds: 0.0,
            active_jobs: 0,
            total_executions: 0,
        }
    }

    /// Dead status carrying the reason the real snapshot could not be used.
    pub fn dead_with_error(now: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            last_error: Some(error.into()),
            ..Self::dead(now)
        }
    }

    /// Copy of this status with `is_alive` forced off.
    pub fn marked_dead(&self) -> Self {
        Self {
            is_alive: false,
            ..self.clone()
        }
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if !self.uptime_seconds.is_finite() || self.uptime_seconds < 0.0 {
            return Err(format!(
                "uptime_seconds must be a non-negative number, got {}",
                self.uptime_seconds
            ));
        }
        Ok(())
    }
}
