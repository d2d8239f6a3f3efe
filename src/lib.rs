#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Midnight — a dark theme for a hosted web music player.
//!
//! The crate covers everything the theme does besides drawing pixels:
//! - `options`: option schema, default flattening, version-driven reconciliation.
//! - `page`: stylesheet injection and the option-gated page decorators.
//! - `storage`: settings stores and change notifications.
//! - `assets`: where the schema, stylesheets and templates come from.
//! - `config`: static extension config (versions, asset paths, theme rules).
//! - `bootstrap`: the startup sequence tying them together.
//!
//! Use `midnight::prelude::*` to bring commonly used items into scope quickly.

/// Public module: packaged assets (directory, in-memory).
pub mod assets;
/// Public module: startup sequence.
pub mod bootstrap;
/// Public module: static configuration (models, loader).
pub mod config;
/// Public module: error types.
pub mod error;
/// Public module: option schema, defaults and reconciliation.
pub mod options;
/// Public module: page document, style injection and decorators.
pub mod page;
/// Public module: settings stores.
pub mod storage;
/// Public module: utilities (theme token interpolation).
pub mod utils;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "2.0.3").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a log level name (trace|debug|info|warn|error).
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging) with a reasonable default.
/// - Honors the `RUST_LOG` environment variable if set.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(tracing::Level::INFO);
    init_tracing_with(level);
}

/// Initialize tracing at an explicit level. Later calls are no-ops.
pub fn init_tracing_with(level: tracing::Level) {
    // Ignore the error if the global subscriber was already set.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use midnight::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    pub use crate as midnight;
    pub use crate::bootstrap::{Extension, PageLoadReport, Session};
    pub use crate::config::ExtensionConfig;
    pub use crate::options::{OptionsContext, UserOptions, Version};

    // Frequently used internal modules
    pub use crate::{assets, config, options, page, storage};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("WARNING"), Some(tracing::Level::WARN));
        assert_eq!(parse_level("debug"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn version_matches_manifest() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
        assert!(options::version::is_valid(version()));
    }
}
