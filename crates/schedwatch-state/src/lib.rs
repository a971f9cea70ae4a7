//! schedwatch-state — persistence for the health snapshot.
//!
//! The snapshot is the only channel between the monitored job process and
//! the processes observing it. Both sides receive a [`StateStore`] rather
//! than reaching for a well-known path, so the whole pipeline can run
//! against [`MemoryStateStore`] in tests.
//!
//! A read has three outcomes that callers must tell apart:
//!
//! ```text
//! Ok(Some(status))  snapshot present and valid
//! Ok(None)          nothing written yet
//! Err(Corrupt)      file exists but does not parse or validate
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use error::{StateError, StateResult};
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use store::StateStore;
