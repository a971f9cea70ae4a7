//! Monitor — in-process recorder embedded in the monitored job.
//!
//! The job calls [`Monitor::heartbeat`] after each successful unit of work
//! and [`Monitor::record_error`] on failure. Every mutation updates the
//! counters and persists a fresh snapshot inside one critical section, so
//! concurrent callers serialize and the persisted file never reflects a
//! half-applied update.
//!
//! Persistence failures are logged and swallowed: the in-memory counters
//! stay authoritative and the job keeps running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use schedwatch_core::{age, iso8601, Clock, HealthStatus};
use schedwatch_state::StateStore;

use crate::policy::{HealthPolicy, Verdict};

/// Mutable counters owned by the monitor.
#[derive(Debug)]
struct Counters {
    started_at: DateTime<Utc>,
    total_executions: u64,
    error_count: u64,
    last_error: Option<String>,
    last_execution: Option<DateTime<Utc>>,
    active_jobs: u32,
}

pub struct Monitor {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    policy: HealthPolicy,
    counters: Mutex<Counters>,
}

impl Monitor {
    /// Create a monitor, seeding its counters from any snapshot already in
    /// `store`. A missing or unreadable snapshot starts from zero.
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        let mut counters = Counters {
            started_at: clock.now(),
            total_executions: 0,
            error_count: 0,
            last_error: None,
            last_execution: None,
            active_jobs: 1,
        };

        match store.read() {
            Ok(Some(previous)) => {
                counters.total_executions = previous.total_executions;
                counters.error_count = previous.error_count;
                counters.last_error = previous.last_error;
                counters.last_execution = previous.last_execution;
                info!(
                    store = %store.describe(),
                    total_executions = counters.total_executions,
                    error_count = counters.error_count,
                    "loaded existing state"
                );
            }
            Ok(None) => debug!(store = %store.describe(), "no previous state"),
            Err(e) => warn!(store = %store.describe(), error = %e, "could not load state"),
        }

        Self {
            store,
            clock,
            policy: HealthPolicy::default(),
            counters: Mutex::new(counters),
        }
    }

    /// Replace the policy used by [`Monitor::check_health`].
    pub fn with_policy(mut self, policy: HealthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Record a successful execution.
    pub fn heartbeat(&self) {
        let mut counters = self.lock();
        counters.last_execution = Some(self.clock.now());
        counters.total_executions += 1;
        self.persist(&counters);
        debug!(execution = counters.total_executions, "heartbeat recorded");
    }

    /// Record a failed execution. The stored message is prefixed with the
    /// current timestamp; callers should bound its length.
    pub fn record_error(&self, message: &str) {
        let mut counters = self.lock();
        counters.error_count += 1;
        counters.last_error = Some(format!("{}: {message}", iso8601::format(&self.clock.now())));
        self.persist(&counters);
        error!(error = %message, count = counters.error_count, "error recorded");
    }

    /// Clear the error counter after a confirmed recovery.
    pub fn reset_errors(&self) {
        let mut counters = self.lock();
        counters.error_count = 0;
        counters.last_error = None;
        self.persist(&counters);
        info!("error counter reset");
    }

    /// Re-persist the snapshot with a fresh timestamp without counting an
    /// execution, so observers can tell the process is still up between
    /// widely spaced jobs.
    pub fn touch(&self) {
        let counters = self.lock();
        self.persist(&counters);
    }

    pub fn set_active_jobs(&self, active_jobs: u32) {
        let mut counters = self.lock();
        counters.active_jobs = active_jobs;
        self.persist(&counters);
    }

    /// Current status built from the live counters. Always alive: the
    /// monitor only ever reports for a running process.
    pub fn get_status(&self) -> HealthStatus {
        let counters = self.lock();
        self.snapshot(&counters)
    }

    /// Apply the health policy to the current status.
    pub fn check_health(&self) -> Verdict {
        let status = self.get_status();
        self.policy.evaluate(&status, status.timestamp)
    }

    /// Spawn a task that calls [`Monitor::touch`] every `interval` until
    /// `shutdown` fires.
    pub fn spawn_keepalive(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            debug!(interval_secs = interval.as_secs_f64(), "keepalive starting");
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => monitor.touch(),
                    _ = shutdown.changed() => {
                        debug!("keepalive shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, counters: &Counters) -> HealthStatus {
        let now = self.clock.now();
        HealthStatus {
            timestamp: now,
            is_alive: true,
            last_execution: counters.last_execution,
            error_count: counters.error_count,
            last_error: counters.last_error.clone(),
            uptime_seconds: age(now, counters.started_at).as_secs_f64(),
            active_jobs: counters.active_jobs,
            total_executions: counters.total_executions,
        }
    }

    /// Write the snapshot. Callers hold the counters lock.
    fn persist(&self, counters: &Counters) {
        let status = self.snapshot(counters);
        if let Err(e) = self.store.write(&status) {
            error!(store = %self.store.describe(), error = %e, "could not save state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Failure;
    use chrono::TimeDelta;
    use schedwatch_core::ManualClock;
    use schedwatch_state::MemoryStateStore;

    fn setup() -> (Monitor, MemoryStateStore, ManualClock) {
        let store = MemoryStateStore::new();
        let clock = ManualClock::default();
        let monitor = Monitor::new(Arc::new(store.clone()), Arc::new(clock.clone()));
        (monitor, store, clock)
    }

    #[test]
    fn fresh_monitor_starts_at_zero() {
        let (monitor, store, _) = setup();
        let status = monitor.get_status();
        assert!(status.is_alive);
        assert_eq!(status.total_executions, 0);
        assert_eq!(status.error_count, 0);
        assert_eq!(status.active_jobs, 1);
        // Constructing a monitor does not write.
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn heartbeat_counts_and_persists() {
        let (monitor, store, clock) = setup();
        monitor.heartbeat();
        monitor.heartbeat();

        let persisted = store.snapshot().unwrap();
        assert_eq!(persisted.total_executions, 2);
        assert_eq!(persisted.last_execution, Some(clock.now()));
        assert!(persisted.is_alive);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn record_error_prefixes_timestamp() {
        let (monitor, store, clock) = setup();
        monitor.record_error("Connection timeout to Alpaca API");

        let persisted = store.snapshot().unwrap();
        assert_eq!(persisted.error_count, 1);
        assert_eq!(
            persisted.last_error,
            Some(format!(
                "{}: Connection timeout to Alpaca API",
                iso8601::format(&clock.now())
            ))
        );
    }

    #[test]
    fn counters_track_calls_until_reset() {
        let (monitor, _, _) = setup();
        for i in 0..7 {
            monitor.heartbeat();
            if i % 2 == 0 {
                monitor.record_error("Position data unavailable");
            }
        }
        let status = monitor.get_status();
        assert_eq!(status.total_executions, 7);
        assert_eq!(status.error_count, 4);

        monitor.reset_errors();
        let status = monitor.get_status();
        assert_eq!(status.error_count, 0);
        assert!(status.last_error.is_none());
        assert_eq!(status.total_executions, 7);
    }

    #[test]
    fn uptime_follows_clock() {
        let (monitor, _, clock) = setup();
        clock.advance(TimeDelta::seconds(90));
        assert_eq!(monitor.get_status().uptime_seconds, 90.0);
    }

    #[test]
    fn seeds_from_previous_snapshot() {
        let clock = ManualClock::default();
        let previous = HealthStatus {
            timestamp: clock.now() - TimeDelta::hours(1),
            is_alive: true,
            last_execution: Some(clock.now() - TimeDelta::hours(1)),
            error_count: 3,
            last_error: Some("old error".to_string()),
            uptime_seconds: 7200.0,
            active_jobs: 4,
            total_executions: 120,
        };
        let store = MemoryStateStore::with_status(previous.clone());
        let monitor = Monitor::new(Arc::new(store), Arc::new(clock));

        let status = monitor.get_status();
        assert_eq!(status.total_executions, 120);
        assert_eq!(status.error_count, 3);
        assert_eq!(status.last_error.as_deref(), Some("old error"));
        assert_eq!(status.last_execution, previous.last_execution);
        // Uptime restarts with the new process.
        assert_eq!(status.uptime_seconds, 0.0);
        assert_eq!(status.active_jobs, 1);
    }

    #[test]
    fn corrupt_previous_snapshot_is_ignored() {
        let store = MemoryStateStore::new();
        store.corrupt("expected value at line 1 column 1");
        let monitor = Monitor::new(Arc::new(store), Arc::new(ManualClock::default()));
        assert_eq!(monitor.get_status().total_executions, 0);
    }

    #[test]
    fn persistence_failure_does_not_lose_counts() {
        let (monitor, store, _) = setup();
        store.fail_writes(Some("No space left on device"));

        monitor.heartbeat();
        monitor.record_error("boom");
        assert!(store.snapshot().is_none());

        let status = monitor.get_status();
        assert_eq!(status.total_executions, 1);
        assert_eq!(status.error_count, 1);

        store.fail_writes(None);
        monitor.heartbeat();
        assert_eq!(store.snapshot().unwrap().total_executions, 2);
    }

    #[test]
    fn check_health_reasons() {
        let (monitor, _, clock) = setup();
        assert_eq!(
            monitor.check_health(),
            Verdict::Unhealthy(Failure::NoExecutions)
        );

        monitor.heartbeat();
        assert!(monitor.check_health().is_healthy());

        for _ in 0..11 {
            monitor.record_error("Insufficient buying power for trade");
        }
        assert_eq!(monitor.check_health().reason(), "too many errors: 11");

        monitor.reset_errors();
        clock.advance(TimeDelta::minutes(6));
        assert!(matches!(
            monitor.check_health().failure(),
            Some(Failure::NoRecentActivity { .. })
        ));
    }

    #[test]
    fn check_health_is_idempotent() {
        let (monitor, _, _) = setup();
        monitor.heartbeat();
        assert_eq!(monitor.check_health(), monitor.check_health());
    }

    #[test]
    fn custom_policy() {
        let (monitor, _, _) = setup();
        let monitor = monitor.with_policy(HealthPolicy {
            max_errors: 0,
            ..HealthPolicy::default()
        });
        monitor.heartbeat();
        monitor.record_error("one is too many");
        assert_eq!(monitor.check_health().reason(), "too many errors: 1");
    }

    #[test]
    fn touch_refreshes_timestamp_only() {
        let (monitor, store, clock) = setup();
        monitor.heartbeat();
        clock.advance(TimeDelta::seconds(45));
        monitor.touch();

        let persisted = store.snapshot().unwrap();
        assert_eq!(persisted.timestamp, clock.now());
        assert_eq!(persisted.total_executions, 1);
    }

    #[test]
    fn set_active_jobs_persists() {
        let (monitor, store, _) = setup();
        monitor.set_active_jobs(3);
        assert_eq!(store.snapshot().unwrap().active_jobs, 3);
    }

    #[test]
    fn concurrent_callers_serialize() {
        let (monitor, store, _) = setup();
        let monitor = Arc::new(monitor);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        monitor.heartbeat();
                        monitor.record_error("Network timeout");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let status = monitor.get_status();
        assert_eq!(status.total_executions, 400);
        assert_eq!(status.error_count, 400);
        let persisted = store.snapshot().unwrap();
        assert_eq!(persisted.total_executions, 400);
        assert_eq!(persisted.error_count, 400);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_touches_until_shutdown() {
        let (monitor, store, _) = setup();
        let monitor = Arc::new(monitor);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = monitor.spawn_keepalive(Duration::from_secs(30), shutdown_rx);
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(store.write_count(), 3);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.write_count(), 3);
    }
}
