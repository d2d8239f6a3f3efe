/*!
Settings storage (orchestration layer).

This module defines the `SettingsStore` trait the reconciler and the page
decorators persist through, plus the change-notification types. Concrete
stores live in their own files:

- `memory.rs` -> `MemoryStore`   (process-local map, used by tests and dry runs)
- `file.rs`   -> `JsonFileStore` (pretty-printed JSON object on disk)
- `watch.rs`  -> change logger task (diagnostics only)

Every store:
- Treats `set` as a merge of the given keys into what is already stored
- Broadcasts a `StorageChange` for the keys whose value actually changed
- Never panics; failures surface as `StorageError`
*/

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use tokio::sync::broadcast;

use crate::error::StorageError;
use crate::options::OptionMap;

pub mod file;
pub mod memory;
pub mod watch;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use watch::{join_background, spawn_change_logger};

/// Capacity of each store's change broadcast channel.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Old and new value of a single key. `None` means absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    #[serde(rename = "oldValue", skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(rename = "newValue", skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// A batch of key changes produced by one write.
pub type StorageChange = BTreeMap<String, ValueChange>;

/// Key-value settings storage shared with the hosted page.
pub trait SettingsStore: Send + Sync {
    /// Static human-readable identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Everything currently stored. A store that was never written is empty.
    fn get_all(&self) -> impl Future<Output = Result<OptionMap, StorageError>> + Send;

    /// Merge `values` into the stored map; resolves after the write is durable.
    fn set(&self, values: OptionMap) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Compute the change set produced by merging `values` into `before`.
/// Keys whose value is unchanged are left out.
pub fn diff(before: &OptionMap, values: &OptionMap) -> StorageChange {
    values
        .iter()
        .filter(|(key, new)| before.get(*key) != Some(*new))
        .map(|(key, new)| {
            (
                key.clone(),
                ValueChange {
                    old_value: before.get(key).cloned(),
                    new_value: Some(new.clone()),
                },
            )
        })
        .collect()
}

/// Compute the change set between two complete snapshots (keys may vanish).
pub fn diff_snapshots(before: &OptionMap, after: &OptionMap) -> StorageChange {
    let mut changes = diff(before, after);
    for (key, old) in before {
        if !after.contains_key(key) {
            changes.insert(
                key.clone(),
                ValueChange {
                    old_value: Some(old.clone()),
                    new_value: None,
                },
            );
        }
    }
    changes
}
