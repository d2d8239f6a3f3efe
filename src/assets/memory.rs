//! In-memory assets.
//!
//! Each asset may carry an artificial fetch delay, and every fetch is
//! recorded, so callers can check ordering and whether a fetch happened at all.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{AssetSource, normalize};
use crate::error::AssetError;

/// Base URL used for in-memory assets.
pub const MEMORY_BASE_URL: &str = "memory://midnight";

#[derive(Debug, Default)]
pub struct MemoryAssets {
    files: HashMap<String, (String, Duration)>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an asset.
    pub fn with(self, path: &str, content: impl Into<String>) -> Self {
        self.with_delay(path, content, Duration::ZERO)
    }

    /// Add an asset whose fetch takes `delay`.
    pub fn with_delay(mut self, path: &str, content: impl Into<String>, delay: Duration) -> Self {
        self.files.insert(normalize(path), (content.into(), delay));
        self
    }

    /// Paths requested so far, in request order.
    pub async fn fetched(&self) -> Vec<String> {
        self.fetched.lock().await.clone()
    }
}

impl AssetSource for MemoryAssets {
    fn url(&self, path: &str) -> String {
        format!("{MEMORY_BASE_URL}/{}", normalize(path))
    }

    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        let key = normalize(path);
        self.fetched.lock().await.push(key.clone());
        let (content, delay) = self
            .files
            .get(&key)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(key.clone()))?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(content)
    }
}
