//! Assets read from a directory on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs as afs;
use tracing::trace;

use super::{AssetSource, normalize};
use crate::error::AssetError;

#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(normalize(path))
    }
}

impl AssetSource for DirectoryAssets {
    fn url(&self, path: &str) -> String {
        let root = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());
        let root = root.to_string_lossy().replace('\\', "/");
        format!("file://{}/{}", root.trim_end_matches('/'), normalize(path))
    }

    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        let full = self.resolve(path);
        trace!(target: "midnight::assets", path = %full.display(), "Fetching asset");
        afs::read_to_string(&full).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => AssetError::NotFound(path.to_string()),
            _ => AssetError::Io {
                path: path.to_string(),
                source: e,
            },
        })
    }
}
