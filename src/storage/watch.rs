//! Storage change logger.
//!
//! Subscribes to a store's change broadcast and logs every changed key. Used
//! for diagnostics only; changes never trigger re-reconciliation.

use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::StorageChange;

/// Spawn the logger. The task ends when `cancel` fires or the store is dropped.
pub fn spawn_change_logger(
    mut changes: broadcast::Receiver<StorageChange>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = changes.recv() => match received {
                    Ok(change) => log_change(&change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(target: "midnight::storage", skipped, "Change logger lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!(target: "midnight::storage", "Change logger stopped");
    })
}

/// Wait for a background task after cancellation. A panicked or aborted task
/// is logged and reported as `false`.
pub async fn join_background(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "midnight::storage", task = name, error = %e, "Background task failed");
            false
        }
    }
}

fn log_change(change: &StorageChange) {
    info!(target: "midnight::storage", keys = change.len(), "Option changed");
    for (key, value) in change {
        let rendered = serde_json::to_string(value).unwrap_or_default();
        info!(target: "midnight::storage", "{}: {}", key.to_uppercase(), rendered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionMap;
    use crate::storage::{MemoryStore, SettingsStore};
    use serde_json::json;

    #[tokio::test]
    async fn logger_stops_on_cancel() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let handle = spawn_change_logger(store.subscribe(), cancel.clone());

        store
            .set(OptionMap::from([("accent".into(), json!({ "color": "#fff" }))]))
            .await
            .unwrap();
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn join_background_reports_failed_tasks() {
        let cancel = CancellationToken::new();
        let logger = spawn_change_logger(MemoryStore::new().subscribe(), cancel.clone());
        cancel.cancel();
        assert!(join_background("change logger", logger).await);

        let panicked = tokio::spawn(async { panic!("boom"); });
        assert!(!join_background("watcher", panicked).await);

        let aborted = tokio::spawn(std::future::pending::<()>());
        aborted.abort();
        assert!(!join_background("watcher", aborted).await);
    }

    #[tokio::test]
    async fn logger_stops_when_store_dropped() {
        let store = MemoryStore::new();
        let handle = spawn_change_logger(store.subscribe(), CancellationToken::new());
        drop(store);
        handle.await.unwrap();
    }
}
