//! `schedwatchd simulate` — a stand-in job that reports to a [`Monitor`].
//!
//! Useful for exercising `check` and `watch` against a live snapshot
//! without wiring a real scheduler.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tracing::info;

use schedwatch_core::{SchedwatchConfig, SystemClock};
use schedwatch_health::{HealthPolicy, Monitor};
use schedwatch_state::FileStateStore;

const ERROR_MESSAGES: [&str; 3] = [
    "API rate limit exceeded",
    "Position data unavailable",
    "Network timeout",
];

pub struct Options {
    pub iterations: u32,
    pub pause: Duration,
    /// Every Nth run fails; 0 disables failures.
    pub fail_every: u32,
    /// Keepalive period; zero disables it.
    pub keepalive: Duration,
}

/// Whether run `index` (0-based) is scripted to fail.
fn run_fails(index: u32, fail_every: u32) -> bool {
    fail_every > 0 && (index + 1) % fail_every == 0
}

pub async fn run(config: &SchedwatchConfig, options: Options) -> anyhow::Result<ExitCode> {
    let store = FileStateStore::new(&config.state_file);
    println!("Writing scheduler status to {}", store.path().display());

    let monitor = Arc::new(
        Monitor::new(Arc::new(store), Arc::new(SystemClock))
            .with_policy(HealthPolicy::from(&config.policy)),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let keepalive = (!options.keepalive.is_zero())
        .then(|| monitor.spawn_keepalive(options.keepalive, stop_rx));

    let mut failures = 0usize;
    for index in 0..options.iterations {
        print!("[{}] ", Local::now().format("%H:%M:%S"));

        if run_fails(index, options.fail_every) {
            let message = ERROR_MESSAGES[failures % ERROR_MESSAGES.len()];
            failures += 1;
            println!("job failed: {message}");
            monitor.record_error(message);
        } else {
            println!("job completed");
            monitor.heartbeat();
        }

        let status = monitor.get_status();
        println!(
            "    executions={} errors={} uptime={:.1}s",
            status.total_executions, status.error_count, status.uptime_seconds
        );

        if index + 1 < options.iterations {
            tokio::time::sleep(options.pause).await;
        }
    }

    let _ = stop_tx.send(true);
    if let Some(handle) = keepalive {
        handle.await?;
    }

    let verdict = monitor.check_health();
    info!(healthy = verdict.is_healthy(), reason = %verdict, "simulation finished");
    println!("\nHealth: {verdict}");

    Ok(if verdict.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_schedule() {
        let failing: Vec<u32> = (0..10).filter(|&i| run_fails(i, 5)).collect();
        assert_eq!(failing, [4, 9]);
        assert!((0..10).all(|i| !run_fails(i, 0)));
        assert!((0..3).all(|i| run_fails(i, 1)));
    }

    #[tokio::test]
    async fn simulation_leaves_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = SchedwatchConfig {
            state_file: dir.path().join("state.json"),
            ..SchedwatchConfig::default()
        };
        let options = Options {
            iterations: 3,
            pause: Duration::ZERO,
            fail_every: 3,
            keepalive: Duration::ZERO,
        };

        run(&config, options).await.unwrap();

        let raw = std::fs::read_to_string(&config.state_file).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["total_executions"], 2);
        assert_eq!(value["error_count"], 1);
        assert!(value["last_error"]
            .as_str()
            .unwrap()
            .ends_with("API rate limit exceeded"));
    }
}
