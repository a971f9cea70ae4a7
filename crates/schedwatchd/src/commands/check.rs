//! `schedwatchd check` — one-shot health probe.

use std::process::ExitCode;
use std::sync::Arc;

use serde_json::json;

use schedwatch_core::{iso8601, SchedwatchConfig, SystemClock};
use schedwatch_health::{HealthChecker, HealthPolicy, HealthReport};
use schedwatch_state::FileStateStore;

pub fn run(config: &SchedwatchConfig, as_json: bool) -> anyhow::Result<ExitCode> {
    let checker = HealthChecker::new(
        Arc::new(FileStateStore::new(&config.state_file)),
        Arc::new(SystemClock),
    )
    .with_policy(HealthPolicy::from(&config.policy));

    let report = checker.report();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        print!("{}", render_status_block(&report));
    }

    Ok(if report.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Shape served to dashboards: verdict, reason, and the raw snapshot.
pub fn report_json(report: &HealthReport) -> serde_json::Value {
    json!({
        "healthy": report.is_healthy(),
        "reason": report.reason(),
        "status": report.status,
    })
}

/// Operator-facing status block.
pub fn render_status_block(report: &HealthReport) -> String {
    let status = &report.status;
    let rule = "=".repeat(60);
    let last_execution = status
        .last_execution
        .map(|t| iso8601::format(&t))
        .unwrap_or_else(|| "Never".to_string());

    let lines = [
        format!("Timestamp:        {}", iso8601::format(&status.timestamp)),
        format!(
            "Status:           {}",
            if report.is_healthy() { "HEALTHY" } else { "UNHEALTHY" }
        ),
        format!("Reason:           {}", report.reason()),
        format!(
            "Is Alive:         {}",
            if status.is_alive { "Yes" } else { "No" }
        ),
        format!("Last Execution:   {last_execution}"),
        format!("Total Executions: {}", status.total_executions),
        format!("Error Count:      {}", status.error_count),
        format!(
            "Last Error:       {}",
            status.last_error.as_deref().unwrap_or("None")
        ),
        format!("Uptime:           {:.1} seconds", status.uptime_seconds),
        format!("Active Jobs:      {}", status.active_jobs),
    ];

    format!(
        "\n{rule}\nSCHEDULER STATUS\n{rule}\n{}\n{rule}\n\n",
        lines.join("\n")
    )
}
