use anyhow::{Context, Result, anyhow, bail};
use schemars::{Schema, schema_for};
use serde_valid::Validate;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, trace};

use super::models::ExtensionConfig;
use crate::options::Version;

/// Load configuration from a string slice.
pub fn load_from_str(s: &str) -> Result<ExtensionConfig> {
    let cfg: ExtensionConfig =
        serde_json::from_str(s).context("Failed to parse JSON config string into ExtensionConfig")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<ExtensionConfig> {
    let cfg: ExtensionConfig =
        serde_json::from_reader(reader).context("Failed to parse JSON config from reader")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<ExtensionConfig> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open config file {}", path_ref.display()))?;
    let cfg = load_from_reader(file)?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Load configuration from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<ExtensionConfig> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;
    let cfg: ExtensionConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse JSON config from {}", path_ref.display()))?;
    validate_config(&cfg)?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// JSON Schema of the extension config.
pub fn generate_schema() -> Schema {
    schema_for!(ExtensionConfig)
}

/// JSON Schema of the option schema document (`options.json`).
pub fn generate_option_schema() -> Schema {
    crate::options::schema::generate_schema()
}

/// Write the extension config's JSON Schema to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}

/// Field-level validation (derived `serde_valid` rules) plus cross-field checks:
/// - thresholds must not exceed the running version
/// - stylesheet ids must be unique
pub fn validate_config(cfg: &ExtensionConfig) -> Result<()> {
    cfg.validate()
        .map_err(|e| anyhow!("Invalid extension config: {e}"))?;
    trace!("Field validation passed");

    let running = Version::parse(&cfg.version).context("Invalid `version`")?;
    let nuke = Version::parse(&cfg.nuke_version).context("Invalid `nuke_version`")?;
    let reset = Version::parse(&cfg.reset_version).context("Invalid `reset_version`")?;

    if nuke > running {
        bail!(
            "`nuke_version` {} is newer than the running version {}",
            nuke,
            running
        );
    }
    if reset > running {
        bail!(
            "`reset_version` {} is newer than the running version {}",
            reset,
            running
        );
    }

    let mut ids = BTreeSet::new();
    for (idx, sheet) in cfg.stylesheets.iter().enumerate() {
        if !ids.insert(sheet.id.as_str()) {
            bail!("Duplicate stylesheet id '{}' at index {}", sheet.id, idx);
        }
    }

    Ok(())
}
