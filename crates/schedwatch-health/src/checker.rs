//! HealthChecker — out-of-process view of the monitored job.
//!
//! Reads the snapshot the monitor persisted and turns every outcome into a
//! verdict. Nothing here returns an error: a missing or corrupt snapshot is
//! itself an unhealthy answer.

use std::sync::Arc;

use tracing::{debug, error};

use schedwatch_core::{Clock, HealthStatus};
use schedwatch_state::StateStore;

use crate::policy::{Failure, HealthPolicy, Verdict};

/// Result of one check: the verdict plus the status it was based on.
///
/// When the snapshot could not be used, `status` is a synthesized dead
/// status rather than whatever was on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub verdict: Verdict,
    pub status: HealthStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.verdict.is_healthy()
    }

    pub fn reason(&self) -> String {
        self.verdict.reason()
    }
}

pub struct HealthChecker {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    policy: HealthPolicy,
}

impl HealthChecker {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: HealthPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: HealthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `(is_healthy, status)` for callers that only need the verdict bit.
    pub fn check(&self) -> (bool, HealthStatus) {
        let report = self.report();
        (report.is_healthy(), report.status)
    }

    /// Read the snapshot and judge it.
    pub fn report(&self) -> HealthReport {
        let now = self.clock.now();

        let status = match self.store.read() {
            Ok(Some(status)) => status,
            Ok(None) => {
                debug!(store = %self.store.describe(), "no snapshot present");
                return HealthReport {
                    verdict: Verdict::Unhealthy(Failure::StateMissing),
                    status: HealthStatus::dead(now),
                };
            }
            Err(e) => {
                error!(store = %self.store.describe(), error = %e, "error checking health");
                return HealthReport {
                    verdict: Verdict::Unhealthy(Failure::StateCorrupt(e.to_string())),
                    status: HealthStatus::dead_with_error(now, e.to_string()),
                };
            }
        };

        // The writer always claims to be alive; only the snapshot's age
        // reveals that it has stopped.
        if let Some(stale) = self.policy.staleness(&status, now) {
            debug!(reason = %stale, "snapshot is stale");
            return HealthReport {
                verdict: Verdict::Unhealthy(stale),
                status: status.marked_dead(),
            };
        }

        HealthReport {
            verdict: self.policy.evaluate(&status, now),
            status,
        }
    }
}
