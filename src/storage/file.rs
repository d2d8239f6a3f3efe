//! JSON file settings store.
//!
//! Persists the settings map as a pretty-printed JSON object.
//!
//! Behavior:
//! - A missing file reads as an empty map (first run).
//! - `set` re-reads the file, merges the new keys and rewrites it.
//! - The root must be a JSON object; anything else is `StorageError::NotAnObject`.
//! - `watch_external` uses `notify` to pick up edits made by other processes
//!   and broadcasts them like local writes. Our own writes are filtered out by
//!   diffing against the last known snapshot.

use notify::{EventKind, RecursiveMode, Watcher};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{
    fs as afs,
    sync::{Mutex, broadcast, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{CHANGE_CHANNEL_CAPACITY, SettingsStore, StorageChange, diff, diff_snapshots};
use crate::error::StorageError;
use crate::options::OptionMap;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    // Last map we read or wrote; guards read-modify-write and feeds the watcher diff.
    snapshot: Arc<Mutex<OptionMap>>,
    changes: broadcast::Sender<StorageChange>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            snapshot: Arc::new(Mutex::new(OptionMap::new())),
            changes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start watching the backing file for external modifications.
    ///
    /// The parent directory is watched so the file may be created later.
    /// The task ends when `cancel` fires.
    pub fn watch_external(&self, cancel: CancellationToken) -> notify::Result<JoinHandle<()>> {
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => warn!(target: "midnight::storage", error = %e, "File watch error"),
            }
        })?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let store = self.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());
        info!(target: "midnight::storage", path = %self.path.display(), "Watching settings file");

        Ok(tokio::spawn(async move {
            // Keep the watcher alive for the lifetime of the task.
            let _watcher = watcher;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
                            continue;
                        }
                        let ours = event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                        if ours {
                            store.reload_and_notify().await;
                        }
                    }
                }
            }
            debug!(target: "midnight::storage", path = %store.path.display(), "Settings watch ended");
        }))
    }

    async fn reload_and_notify(&self) {
        let current = match read_map(&self.path).await {
            Ok(map) => map,
            Err(e) => {
                // Editors often leave the file half-written; the next event retries.
                trace!(target: "midnight::storage", error = %e, "Ignoring unreadable settings file");
                return;
            }
        };
        let mut snapshot = self.snapshot.lock().await;
        let changes = diff_snapshots(&snapshot, &current);
        *snapshot = current;
        drop(snapshot);
        if !changes.is_empty() {
            debug!(target: "midnight::storage", changed = changes.len(), "External settings change");
            let _ = self.changes.send(changes);
        }
    }
}

async fn read_map(path: &Path) -> Result<OptionMap, StorageError> {
    let text = match afs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(OptionMap::new()),
        Err(e) => return Err(e.into()),
    };
    if text.trim().is_empty() {
        return Ok(OptionMap::new());
    }
    match serde_json::from_str::<serde_json::Value>(&text)? {
        serde_json::Value::Object(obj) => Ok(obj.into_iter().collect()),
        _ => Err(StorageError::NotAnObject),
    }
}

impl SettingsStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get_all(&self) -> Result<OptionMap, StorageError> {
        let map = read_map(&self.path).await?;
        *self.snapshot.lock().await = map.clone();
        Ok(map)
    }

    async fn set(&self, values: OptionMap) -> Result<(), StorageError> {
        let mut snapshot = self.snapshot.lock().await;
        let mut stored = read_map(&self.path).await?;
        let changes = diff(&stored, &values);
        stored.extend(values);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            afs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&stored)?;
        afs::write(&self.path, json).await?;
        *snapshot = stored;
        drop(snapshot);

        trace!(target: "midnight::storage", path = %self.path.display(), changed = changes.len(), "Settings written");
        if !changes.is_empty() {
            let _ = self.changes.send(changes);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_reads_empty_then_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("settings.json");
        let store = JsonFileStore::new(&path);
        assert!(store.get_all().await.unwrap().is_empty());

        store
            .set(OptionMap::from([("version".into(), json!("2.0.3"))]))
            .await
            .unwrap();
        store
            .set(OptionMap::from([("lastRun".into(), json!("2.0.3"))]))
            .await
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all["version"], json!("2.0.3"));
        assert_eq!(all["lastRun"], json!("2.0.3"));
    }

    #[tokio::test]
    async fn non_object_root_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = JsonFileStore::new(&path).get_all().await.unwrap_err();
        assert!(matches!(err, StorageError::NotAnObject));
    }

    #[tokio::test]
    async fn writes_broadcast_changes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let store = JsonFileStore::new(&path);
        let mut rx = store.subscribe();
        store
            .set(OptionMap::from([("queue".into(), json!(true))]))
            .await
            .unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change["queue"].new_value, Some(json!(true)));
    }
}
