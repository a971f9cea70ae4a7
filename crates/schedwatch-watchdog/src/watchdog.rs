//! Watchdog — periodic health polling with failure thresholds.
//!
//! One check per interval, never two at once. Every failed check bumps the
//! consecutive-failure counter; reaching the threshold requests an alert.
//! The first healthy check after any failure sends a recovery alert and
//! resets the counter. A check that errors out counts as a failure and the
//! loop carries on.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use schedwatch_alert::AlertManager;
use schedwatch_core::{iso8601, Clock, HealthStatus, RealertPolicy, WatchdogConfig};
use schedwatch_health::{HealthChecker, HealthReport};

const FAILURE_SUBJECT: &str = "Scheduler Health Check Failed";
const RECOVERY_SUBJECT: &str = "Scheduler Recovery";

/// Shortest poll interval `run` accepts; smaller values are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Where the watchdog gets its health reports from.
pub trait StatusSource: Send + Sync {
    fn check(&self) -> anyhow::Result<HealthReport>;
}

impl StatusSource for HealthChecker {
    fn check(&self) -> anyhow::Result<HealthReport> {
        Ok(self.report())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Nominal,
    /// Failing, but not yet at the alert threshold.
    Degraded(u32),
    /// At or past the threshold.
    Alerted(u32),
}

/// What a single poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Healthy,
    /// Healthy again after `after` failed checks; a recovery alert was sent.
    Recovered { after: u32 },
    /// Unhealthy (or the check itself failed).
    Failed { consecutive: u32, alert_requested: bool },
}

pub struct Watchdog {
    source: Box<dyn StatusSource>,
    alerts: AlertManager,
    clock: Arc<dyn Clock>,
    failure_threshold: u32,
    realert: RealertPolicy,
    consecutive_failures: u32,
    /// An alert was requested during the current outage.
    outage_alerted: bool,
}

impl Watchdog {
    pub fn new(source: Box<dyn StatusSource>, alerts: AlertManager, clock: Arc<dyn Clock>) -> Self {
        let defaults = WatchdogConfig::default();
        Self {
            source,
            alerts,
            clock,
            failure_threshold: defaults.failure_threshold,
            realert: defaults.realert,
            consecutive_failures: 0,
            outage_alerted: false,
        }
    }

    /// Apply threshold and re-alert settings from config.
    pub fn with_config(self, config: &WatchdogConfig) -> Self {
        self.with_threshold(config.failure_threshold)
            .with_realert(config.realert)
    }

    pub fn with_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold.max(1);
        self
    }

    pub fn with_realert(mut self, realert: RealertPolicy) -> Self {
        self.realert = realert;
        self
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn state(&self) -> WatchdogState {
        match self.consecutive_failures {
            0 => WatchdogState::Nominal,
            n if n < self.failure_threshold => WatchdogState::Degraded(n),
            n => WatchdogState::Alerted(n),
        }
    }

    /// Run one poll: check, update the counter, alert if warranted.
    pub async fn check_once(&mut self) -> CycleOutcome {
        let report = match self.source.check() {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "error during health check");
                let now = self.clock.now();
                let status = HealthStatus::dead_with_error(now, e.to_string());
                return self
                    .record_failure(&status, &format!("health check failed: {e}"))
                    .await;
            }
        };

        if report.is_healthy() {
            return self.record_success(&report).await;
        }
        self.record_failure(&report.status, &report.reason()).await
    }

    /// Poll every `interval` (at least [`MIN_INTERVAL`]) until `shutdown`
    /// fires. A check in progress always runs to completion; shutdown cuts
    /// the following sleep short.
    pub async fn run(&mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let interval = interval.max(MIN_INTERVAL);
        info!(
            interval_secs = interval.as_secs_f64(),
            threshold = self.failure_threshold,
            "watchdog started"
        );

        loop {
            self.check_once().await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    info!("watchdog shutting down");
                    break;
                }
            }
        }
    }

    async fn record_success(&mut self, report: &HealthReport) -> CycleOutcome {
        let failed = self.consecutive_failures;
        self.consecutive_failures = 0;
        self.outage_alerted = false;

        if failed == 0 {
            debug!(
                total_executions = report.status.total_executions,
                "health check passed"
            );
            return CycleOutcome::Healthy;
        }

        info!(after = failed, "scheduler recovered");
        self.alerts
            .send_alert(
                RECOVERY_SUBJECT,
                &format!("Scheduler is now healthy after {failed} failed checks"),
            )
            .await;
        CycleOutcome::Recovered { after: failed }
    }

    async fn record_failure(&mut self, status: &HealthStatus, reason: &str) -> CycleOutcome {
        self.consecutive_failures += 1;
        let consecutive = self.consecutive_failures;
        warn!(attempt = consecutive, %reason, "health check failed");

        let past_threshold = consecutive >= self.failure_threshold;
        let alert_requested = past_threshold
            && match self.realert {
                RealertPolicy::EveryCycle => true,
                RealertPolicy::OncePerOutage => !self.outage_alerted,
            };

        if alert_requested {
            let message = build_alert_message(status, reason, consecutive, self.clock.now());
            self.alerts.send_alert(FAILURE_SUBJECT, &message).await;
            self.outage_alerted = true;
        }

        CycleOutcome::Failed {
            consecutive,
            alert_requested,
        }
    }
}

/// Body of the failure alert.
pub fn build_alert_message(
    status: &HealthStatus,
    reason: &str,
    consecutive_failures: u32,
    at: DateTime<Utc>,
) -> String {
    let last_execution = status
        .last_execution
        .map(|t| iso8601::format(&t))
        .unwrap_or_else(|| "Never".to_string());

    [
        "Scheduler health check has failed!".to_string(),
        String::new(),
        format!("Status: {}", if status.is_alive { "ALIVE" } else { "DEAD" }),
        format!("Reason: {reason}"),
        format!("Last Execution: {last_execution}"),
        format!("Total Executions: {}", status.total_executions),
        format!("Error Count: {}", status.error_count),
        format!("Last Error: {}", status.last_error.as_deref().unwrap_or("None")),
        format!("Consecutive Failures: {consecutive_failures}"),
        String::new(),
        format!("Check time: {}", iso8601::format(&at)),
    ]
    .join("\n")
}
