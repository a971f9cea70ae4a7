//! schedwatch-health — deciding whether the monitored job is healthy.
//!
//! # Architecture
//!
//! ```text
//! job process                         observer process
//! ───────────                         ────────────────
//! Monitor                             HealthChecker
//!   ├── heartbeat / record_error        ├── StateStore::read
//!   ├── counters under one Mutex        ├── staleness correction
//!   └── StateStore::write ──snapshot──▶ └── HealthPolicy::evaluate
//! ```
//!
//! The writer always reports itself alive, so a crashed writer is only
//! visible from outside: the checker treats a snapshot older than the
//! staleness window as dead regardless of its contents.

pub mod checker;
pub mod monitor;
pub mod policy;

pub use checker::{HealthChecker, HealthReport};
pub use monitor::Monitor;
pub use policy::{Failure, HealthPolicy, Verdict};
