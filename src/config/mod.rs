//! Configuration module for Midnight.
//!
//! This module wires together the static extension config model and its
//! loading/validation helpers. Import from here for a convenient, stable API.
//!
//! Example:
//! use midnight::config::{ExtensionConfig, load_from_path};
//!
//! let cfg = load_from_path("midnight.json")?;

pub mod loader;
pub mod models;

// Re-export core data models
pub use models::{ExtensionConfig, StylesheetConfig, ThemeRuleConfig};

// Re-export loader utilities
pub use loader::{
    generate_option_schema, generate_schema, load_from_path, load_from_path_async, load_from_reader, load_from_str,
    validate_config, write_schema_to_writer,
};
