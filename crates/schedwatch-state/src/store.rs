//! The snapshot store contract.

use schedwatch_core::HealthStatus;

use crate::error::StateResult;

/// Reads and writes the shared health snapshot.
///
/// Only one writer is expected per store; there is no guarantee for
/// concurrent writers beyond "last write wins".
pub trait StateStore: Send + Sync {
    /// Replace the stored snapshot.
    fn write(&self, status: &HealthStatus) -> StateResult<()>;

    /// Fetch the stored snapshot, `Ok(None)` if none has been written.
    fn read(&self) -> StateResult<Option<HealthStatus>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}
