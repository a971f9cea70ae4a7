//! In-memory snapshot store for tests and single-process embedding.

use std::sync::{Arc, Mutex, PoisonError};

use schedwatch_core::HealthStatus;

use crate::error::{StateError, StateResult};
use crate::store::StateStore;

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Present(HealthStatus),
    Corrupt(String),
}

/// Snapshot held in memory. Clones share the same slot, so a writer and a
/// reader built from one store see each other's updates.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    slot: Arc<Mutex<Slot>>,
    fail_writes: Arc<Mutex<Option<String>>>,
    writes: Arc<Mutex<u64>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with `status`.
    pub fn with_status(status: HealthStatus) -> Self {
        let store = Self::new();
        *store.slot.lock().unwrap_or_else(PoisonError::into_inner) = Slot::Present(status);
        store
    }

    /// Make subsequent reads report a corrupt snapshot.
    pub fn corrupt(&self, reason: impl Into<String>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Slot::Corrupt(reason.into());
    }

    /// Make subsequent writes fail with `reason`; `None` restores them.
    pub fn fail_writes(&self, reason: Option<&str>) {
        *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) =
            reason.map(str::to_string);
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u64 {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last successfully written snapshot.
    pub fn snapshot(&self) -> Option<HealthStatus> {
        match &*self.slot.lock().unwrap_or_else(PoisonError::into_inner) {
            Slot::Present(status) => Some(status.clone()),
            Slot::Empty | Slot::Corrupt(_) => None,
        }
    }
}

impl StateStore for MemoryStateStore {
    fn write(&self, status: &HealthStatus) -> StateResult<()> {
        if let Some(reason) = &*self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(StateError::Write(reason.clone()));
        }
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Slot::Present(status.clone());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn read(&self) -> StateResult<Option<HealthStatus>> {
        match &*self.slot.lock().unwrap_or_else(PoisonError::into_inner) {
            Slot::Empty => Ok(None),
            Slot::Present(status) => Ok(Some(status.clone())),
            Slot::Corrupt(reason) => Err(StateError::Corrupt(reason.clone())),
        }
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
