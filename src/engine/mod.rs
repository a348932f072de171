mod allocate;
mod availability;
mod conflict;
mod error;
mod hierarchy;
mod mutations;
mod queries;
mod render;
mod scheduler;
mod snapshot;
mod store;
#[cfg(test)]
mod tests;

pub use allocate::allocate;
pub use availability::{availability_between_dates, available_between};
pub use conflict::{conflicts, gap_days, validate_span};
pub use error::EngineError;
pub use render::{render_timeline, DEFAULT_DAYS};
pub use snapshot::Snapshot;
pub use store::InMemoryStore;

use std::sync::{Mutex, MutexGuard};

use crate::model::SnapshotFile;

/// Store plus the write path that keeps it schedulable.
///
/// Reads take a [`Snapshot`] and run without locks. Writes are serialized so
/// the check "does this booking still fit" and the insert see the same data.
pub struct Engine {
    store: InMemoryStore,
    writes: Mutex<()>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_store(InMemoryStore::new())
    }

    pub fn with_store(store: InMemoryStore) -> Self {
        Self {
            store,
            writes: Mutex::new(()),
        }
    }

    pub fn from_snapshot_file(file: SnapshotFile) -> Result<Self, EngineError> {
        Ok(Self::with_store(InMemoryStore::import(file)?))
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn snapshot(&self) -> Result<Snapshot, EngineError> {
        self.store.snapshot()
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }
}
