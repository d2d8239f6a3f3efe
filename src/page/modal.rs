use std::future::Future;
use tokio::sync::Mutex;
use tracing::info;

/// Displays a notification template; the returned future resolves when the
/// user dismisses it.
pub trait Modal: Send + Sync {
    fn show(&self, template: &str) -> impl Future<Output = ()> + Send;
}

/// Modal with no UI: logs the template, records it and dismisses immediately.
#[derive(Debug, Default)]
pub struct AutoDismissModal {
    shown: Mutex<Vec<String>>,
}

impl AutoDismissModal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Templates shown so far.
    pub async fn shown(&self) -> Vec<String> {
        self.shown.lock().await.clone()
    }
}

impl Modal for AutoDismissModal {
    async fn show(&self, template: &str) {
        info!(target: "midnight::page", bytes = template.len(), "Showing notification (auto-dismissed)");
        self.shown.lock().await.push(template.to_string());
    }
}
