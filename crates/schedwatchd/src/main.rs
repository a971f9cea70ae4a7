//! schedwatchd — command-line entry points for schedwatch.
//!
//! - `check`: one-shot probe for shell scripts and process supervisors;
//!   exits 0 when healthy, 1 otherwise
//! - `watch`: long-running watchdog that alerts on sustained failures
//! - `simulate`: drives a monitor through a scripted job run
//!
//! # Usage
//!
//! ```text
//! schedwatchd check --state-file /tmp/scheduler_state.json
//! schedwatchd watch --config /etc/schedwatch.toml --interval 60
//! schedwatchd simulate --iterations 6 --fail-every 5
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use schedwatch_core::SchedwatchConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "schedwatchd",
    about = "Health monitoring and watchdog for periodic jobs",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Clone)]
struct Common {
    /// Path to a schedwatch.toml configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the snapshot location from the config file.
    #[arg(long)]
    state_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Check job health once and exit 0 (healthy) or 1 (unhealthy).
    Check {
        #[command(flatten)]
        common: Common,

        /// Print the report as JSON instead of a status block.
        #[arg(long)]
        json: bool,
    },
    /// Poll job health continuously and send alerts.
    Watch {
        #[command(flatten)]
        common: Common,

        /// Check interval in seconds (overrides the config file).
        #[arg(short, long)]
        interval: Option<u64>,

        /// Also append logs to this file.
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Run a simulated job that reports to the monitor.
    Simulate {
        #[command(flatten)]
        common: Common,

        /// Number of job runs.
        #[arg(short = 'n', long, default_value = "6")]
        iterations: u32,

        /// Seconds between job runs.
        #[arg(long, default_value = "3")]
        pause: u64,

        /// Every Nth run fails (0 = never).
        #[arg(long, default_value = "5")]
        fail_every: u32,

        /// Refresh the snapshot every N seconds between runs (0 = off).
        #[arg(long, default_value = "30")]
        keepalive: u64,
    },
}

impl Common {
    fn load_config(&self) -> anyhow::Result<SchedwatchConfig> {
        let mut config = SchedwatchConfig::load(self.config.as_deref())?;
        if let Some(path) = &self.state_file {
            config.state_file = path.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Command::Watch { log_file, .. } => log_file.clone(),
        _ => None,
    };
    init_tracing(log_file)?;

    match cli.command {
        Command::Check { common, json } => commands::check::run(&common.load_config()?, json),
        Command::Watch {
            common, interval, ..
        } => {
            let mut config = common.load_config()?;
            if let Some(secs) = interval {
                config.watchdog.interval = std::time::Duration::from_secs(secs);
            }
            commands::watch::run(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Simulate {
            common,
            iterations,
            pause,
            fail_every,
            keepalive,
        } => {
            let options = commands::simulate::Options {
                iterations,
                pause: std::time::Duration::from_secs(pause),
                fail_every,
                keepalive: std::time::Duration::from_secs(keepalive),
            };
            commands::simulate::run(&common.load_config()?, options).await
        }
    }
}

/// Logs go to stderr so stdout stays clean for status output; `log_file`
/// additionally receives a copy.
fn init_tracing(log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,schedwatch=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .with_ansi(false)
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
