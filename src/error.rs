//! Error types shared across the crate.
//!
//! Library code returns these typed errors; the CLI and the config loader wrap
//! them with `anyhow` context.

use thiserror::Error;

/// Failures reported by a [`crate::storage::SettingsStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("settings storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings storage is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings storage root must be a JSON object")]
    NotAnObject,

    #[error("settings storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by a [`crate::assets::AssetSource`].
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset '{0}' not found")]
    NotFound(String),

    #[error("failed to read asset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A version string that is not dotted numeric.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,

    #[error("invalid version segment '{segment}' in '{input}'")]
    InvalidSegment { input: String, segment: String },
}

/// The option schema document could not be loaded.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("option schema asset unavailable: {0}")]
    Asset(#[from] AssetError),

    #[error("option schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Umbrella error for the bootstrap sequence.
#[derive(Debug, Error)]
pub enum MidnightError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Version(#[from] VersionError),
}
