//! schedwatch-watchdog — turning health checks into alerts.
//!
//! # State machine
//!
//! ```text
//!            unhealthy                 unhealthy (n == threshold)
//! Nominal ─────────────▶ Degraded(n) ─────────────────────────▶ Alerted(n)
//!    ▲                        │                                     │
//!    └──── healthy ───────────┴──── healthy (recovery alert) ───────┘
//! ```
//!
//! The state is a single consecutive-failure counter. Repeated alerts while
//! `Alerted` are governed by [`RealertPolicy`] and the alert cooldown.

pub mod watchdog;

pub use schedwatch_core::RealertPolicy;
pub use watchdog::{
    build_alert_message, CycleOutcome, StatusSource, Watchdog, WatchdogState, MIN_INTERVAL,
};
