/*!
Packaged assets (option schema, stylesheets, notification templates, favicon).

`AssetSource` is the seam to wherever the extension's files live:

- `directory.rs` -> `DirectoryAssets` (files under a root directory, read with Tokio)
- `memory.rs`    -> `MemoryAssets`    (in-process map, optional per-asset delay)

A missing asset is a normal condition reported as `AssetError::NotFound`;
callers decide whether that means "empty" or "skip".
*/

use std::future::Future;

use crate::error::AssetError;

pub mod directory;
pub mod memory;

pub use directory::DirectoryAssets;
pub use memory::MemoryAssets;

/// Resolves and fetches packaged assets by relative path (e.g. `dist/options.json`).
pub trait AssetSource: Send + Sync {
    /// Public URL of an asset, suitable for a `<link href>`.
    fn url(&self, path: &str) -> String;

    /// Fetch an asset's text content.
    fn fetch_text(&self, path: &str) -> impl Future<Output = Result<String, AssetError>> + Send;
}

/// Normalise an asset path: forward slashes, no leading slash.
pub(crate) fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_leading_slashes() {
        assert_eq!(normalize("/dist/css/a.css"), "dist/css/a.css");
        assert_eq!(normalize("dist\\a.css"), "dist/a.css");
    }
}
