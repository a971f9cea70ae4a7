//! Health-determination policy.
//!
//! A snapshot is healthy when the writer is alive, has executed at least
//! once, has not exceeded the error budget, and executed recently. The
//! first failing rule, in that order, is the reported reason.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use schedwatch_core::{age, HealthStatus, PolicyConfig};

/// Why a snapshot was judged unhealthy.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    NotRunning,
    NoExecutions,
    TooManyErrors(u64),
    NoRecentActivity { minutes: f64 },
    /// The writer stopped refreshing the snapshot.
    StaleSnapshot { minutes: f64 },
    /// No snapshot has ever been written.
    StateMissing,
    /// The snapshot exists but could not be used.
    StateCorrupt(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning => f.write_str("not running"),
            Self::NoExecutions => f.write_str("no executions recorded yet"),
            Self::TooManyErrors(count) => write!(f, "too many errors: {count}"),
            Self::NoRecentActivity { minutes } => {
                write!(f, "no recent activity (last execution {minutes:.1} minutes ago)")
            }
            Self::StaleSnapshot { minutes } => {
                write!(f, "status snapshot is stale (last update {minutes:.1} minutes ago)")
            }
            Self::StateMissing => f.write_str("no status snapshot found"),
            Self::StateCorrupt(e) => write!(f, "unreadable status snapshot: {e}"),
        }
    }
}

/// Outcome of a health evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Healthy,
    Unhealthy(Failure),
}

impl Verdict {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Healthy => None,
            Self::Unhealthy(failure) => Some(failure),
        }
    }

    /// Human-readable explanation.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("all systems operational"),
            Self::Unhealthy(failure) => fmt::Display::fmt(failure, f),
        }
    }
}

/// Thresholds applied to a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthPolicy {
    /// More errors than this is unhealthy.
    pub max_errors: u64,
    /// Longest tolerated gap since the last heartbeat.
    pub max_execution_gap: Duration,
    /// Snapshot age beyond which the writer is presumed dead.
    pub staleness_window: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self::from(&PolicyConfig::default())
    }
}

impl From<&PolicyConfig> for HealthPolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            max_errors: config.max_errors,
            max_execution_gap: config.max_execution_gap,
            staleness_window: config.staleness_window,
        }
    }
}

impl HealthPolicy {
    /// Judge a snapshot as of `now`.
    pub fn evaluate(&self, status: &HealthStatus, now: DateTime<Utc>) -> Verdict {
        if !status.is_alive {
            return Verdict::Unhealthy(Failure::NotRunning);
        }

        let Some(last_execution) = status.last_execution else {
            return Verdict::Unhealthy(Failure::NoExecutions);
        };

        if status.error_count > self.max_errors {
            return Verdict::Unhealthy(Failure::TooManyErrors(status.error_count));
        }

        let gap = age(now, last_execution);
        if gap > self.max_execution_gap {
            return Verdict::Unhealthy(Failure::NoRecentActivity {
                minutes: minutes(gap),
            });
        }

        Verdict::Healthy
    }

    /// Whether the snapshot is too old to trust, and by how much.
    pub fn staleness(&self, status: &HealthStatus, now: DateTime<Utc>) -> Option<Failure> {
        let since_update = age(now, status.timestamp);
        (since_update > self.staleness_window).then(|| Failure::StaleSnapshot {
            minutes: minutes(since_update),
        })
    }
}

fn minutes(d: Duration) -> f64 {
    d.as_secs_f64() / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn fresh(now: DateTime<Utc>) -> HealthStatus {
        HealthStatus {
            timestamp: now,
            is_alive: true,
            last_execution: Some(now - TimeDelta::seconds(30)),
            error_count: 0,
            last_error: None,
            uptime_seconds: 600.0,
            active_jobs: 1,
            total_executions: 20,
        }
    }

    #[test]
    fn fresh_status_is_healthy() {
        let now = Utc::now();
        let verdict = HealthPolicy::default().evaluate(&fresh(now), now);
        assert!(verdict.is_healthy());
        assert_eq!(verdict.reason(), "all systems operational");
    }

    #[test]
    fn not_alive_wins_over_everything() {
        let now = Utc::now();
        let status = HealthStatus {
            is_alive: false,
            last_execution: None,
            error_count: 50,
            ..fresh(now)
        };
        let verdict = HealthPolicy::default().evaluate(&status, now);
        assert_eq!(verdict, Verdict::Unhealthy(Failure::NotRunning));
        assert_eq!(verdict.reason(), "not running");
    }

    #[test]
    fn never_executed_is_unhealthy() {
        let now = Utc::now();
        let status = HealthStatus {
            last_execution: None,
            error_count: 50,
            ..fresh(now)
        };
        let verdict = HealthPolicy::default().evaluate(&status, now);
        assert_eq!(verdict.failure(), Some(&Failure::NoExecutions));
        assert_eq!(verdict.reason(), "no executions recorded yet");
    }

    #[test]
    fn error_budget_boundary() {
        let now = Utc::now();
        let policy = HealthPolicy::default();

        let at_limit = HealthStatus {
            error_count: 10,
            ..fresh(now)
        };
        assert!(policy.evaluate(&at_limit, now).is_healthy());

        let over = HealthStatus {
            error_count: 11,
            ..fresh(now)
        };
        let verdict = policy.evaluate(&over, now);
        assert_eq!(verdict, Verdict::Unhealthy(Failure::TooManyErrors(11)));
        assert_eq!(verdict.reason(), "too many errors: 11");
    }

    #[test]
    fn errors_reported_before_stale_execution() {
        let now = Utc::now();
        let status = HealthStatus {
            error_count: 11,
            last_execution: Some(now - TimeDelta::minutes(30)),
            ..fresh(now)
        };
        let verdict = HealthPolicy::default().evaluate(&status, now);
        assert_eq!(verdict.failure(), Some(&Failure::TooManyErrors(11)));
    }

    #[test]
    fn execution_gap_boundary() {
        let now = Utc::now();
        let policy = HealthPolicy::default();

        let recent = HealthStatus {
            last_execution: Some(now - TimeDelta::seconds(4 * 60 + 59)),
            ..fresh(now)
        };
        assert!(policy.evaluate(&recent, now).is_healthy());

        let exactly = HealthStatus {
            last_execution: Some(now - TimeDelta::minutes(5)),
            ..fresh(now)
        };
        assert!(policy.evaluate(&exactly, now).is_healthy());

        let late = HealthStatus {
            last_execution: Some(now - TimeDelta::seconds(5 * 60 + 1)),
            ..fresh(now)
        };
        let verdict = policy.evaluate(&late, now);
        assert!(matches!(verdict.failure(), Some(Failure::NoRecentActivity { .. })));
        assert_eq!(
            verdict.reason(),
            "no recent activity (last execution 5.0 minutes ago)"
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let now = Utc::now();
        let policy = HealthPolicy::default();
        let status = HealthStatus {
            error_count: 12,
            ..fresh(now)
        };
        assert_eq!(policy.evaluate(&status, now), policy.evaluate(&status, now));
    }

    #[test]
    fn custom_thresholds_apply() {
        let now = Utc::now();
        let policy = HealthPolicy {
            max_errors: 2,
            max_execution_gap: Duration::from_secs(10),
            staleness_window: Duration::from_secs(5),
        };
        let status = HealthStatus {
            error_count: 3,
            ..fresh(now)
        };
        assert_eq!(
            policy.evaluate(&status, now).failure(),
            Some(&Failure::TooManyErrors(3))
        );

        let quiet = fresh(now);
        assert!(matches!(
            policy.evaluate(&quiet, now).failure(),
            Some(Failure::NoRecentActivity { .. })
        ));
    }

    #[test]
    fn staleness_window() {
        let now = Utc::now();
        let policy = HealthPolicy::default();

        let status = HealthStatus {
            timestamp: now - TimeDelta::seconds(119),
            ..fresh(now)
        };
        assert!(policy.staleness(&status, now).is_none());

        let status = HealthStatus {
            timestamp: now - TimeDelta::minutes(3),
            ..fresh(now)
        };
        let failure = policy.staleness(&status, now).unwrap();
        assert_eq!(
            failure.to_string(),
            "status snapshot is stale (last update 3.0 minutes ago)"
        );
    }

    #[test]
    fn from_config() {
        let config = PolicyConfig {
            max_errors: 4,
            ..PolicyConfig::default()
        };
        let policy = HealthPolicy::from(&config);
        assert_eq!(policy.max_errors, 4);
        assert_eq!(policy.staleness_window, Duration::from_secs(120));
    }
}
