//! In-memory settings store.
//!
//! Holds the settings map behind a Tokio mutex. Writes can be made to fail on
//! demand, which is how the reconciler's degraded path is exercised.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, broadcast};
use tracing::trace;

use super::{CHANGE_CHANNEL_CAPACITY, SettingsStore, StorageChange, diff};
use crate::error::StorageError;
use crate::options::OptionMap;

#[derive(Debug)]
pub struct MemoryStore {
    values: Mutex<OptionMap>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::with_values(OptionMap::new())
    }

    /// A store pre-populated with `values`.
    pub fn with_values(values: OptionMap) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: Mutex::new(values),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
            changes,
        }
    }

    /// Make every subsequent `set` fail with `StorageError::Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of the stored map.
    pub async fn snapshot(&self) -> OptionMap {
        self.values.lock().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_all(&self) -> Result<OptionMap, StorageError> {
        Ok(self.values.lock().await.clone())
    }

    async fn set(&self, values: OptionMap) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        let mut stored = self.values.lock().await;
        let changes = diff(&stored, &values);
        stored.extend(values);
        drop(stored);

        self.writes.fetch_add(1, Ordering::SeqCst);
        trace!(target: "midnight::storage", store = "memory", changed = changes.len(), "Settings written");
        if !changes.is_empty() {
            // No subscribers is fine.
            let _ = self.changes.send(changes);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
