//! `schedwatchd watch` — long-running watchdog that alerts on sustained failures.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info};

use schedwatch_alert::AlertManager;
use schedwatch_core::{Clock, SchedwatchConfig, SystemClock};
use schedwatch_health::{HealthChecker, HealthPolicy};
use schedwatch_state::FileStateStore;
use schedwatch_watchdog::Watchdog;

/// Run the watchdog until Ctrl-C.
pub async fn run(config: SchedwatchConfig) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store = FileStateStore::new(&config.state_file);
    info!(state_file = %store.path().display(), "watching scheduler snapshot");

    let checker = HealthChecker::new(Arc::new(store), Arc::clone(&clock))
        .with_policy(HealthPolicy::from(&config.policy));
    let alerts = AlertManager::from_config(&config.alert, Arc::clone(&clock))
        .context("failed to configure alert channels")?;

    let mut dog = Watchdog::new(Box::new(checker), alerts, clock).with_config(&config.watchdog);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received shutdown signal"),
            Err(e) => error!(error = %e, "failed to listen for ctrl-c, stopping"),
        }
        let _ = shutdown_tx.send(true);
    });

    dog.run(config.watchdog.interval, shutdown_rx).await;
    println!("\nShutting down watchdog...");
    Ok(())
}
