use serde_json::Value;
use std::ops::{Deref, DerefMut};

use super::OptionMap;
use super::version::Version;

/// Reserved key holding the version the options were written by.
pub const VERSION_KEY: &str = "version";
/// Reserved key holding the last version whose notification was seen.
pub const LAST_RUN_KEY: &str = "lastRun";

/// Option values currently in effect for this session.
///
/// Replaced wholesale by reconciliation, then updated per key by the
/// notification flow (`lastRun`) and version bumps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserOptions(OptionMap);

impl UserOptions {
    pub fn new(map: OptionMap) -> Self {
        Self(map)
    }

    pub fn into_map(self) -> OptionMap {
        self.0
    }

    /// JavaScript-style truthiness of an option; absent keys are false.
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(truthy)
    }

    /// Master switch for the theme.
    pub fn enabled(&self) -> bool {
        self.flag("enabled")
    }

    pub fn verbose(&self) -> bool {
        self.flag("verbose")
    }

    pub fn favicon(&self) -> bool {
        self.flag("favicon")
    }

    pub fn queue(&self) -> bool {
        self.flag("queue")
    }

    /// Selected accent color (`accent.color`), if set to a string.
    pub fn accent_color(&self) -> Option<&str> {
        self.lookup("accent.color").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<Version> {
        self.0.get(VERSION_KEY).and_then(Version::from_value)
    }

    /// Last version whose notification was handled. `None` on first run.
    pub fn last_run(&self) -> Option<Version> {
        self.0.get(LAST_RUN_KEY).and_then(Version::from_value)
    }

    /// Resolve a dotted path (`accent.color`) into nested option objects.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for seg in segments {
            current = current.as_object()?.get(seg)?;
        }
        Some(current)
    }
}

impl Deref for UserOptions {
    type Target = OptionMap;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for UserOptions {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<OptionMap> for UserOptions {
    fn from(map: OptionMap) -> Self {
        Self(map)
    }
}

/// Truthiness as the hosted page would see it.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(v: Value) -> UserOptions {
        let map: OptionMap = serde_json::from_value(v).unwrap();
        UserOptions::new(map)
    }

    #[test]
    fn flags_follow_truthiness() {
        let o = opts(json!({ "enabled": true, "queue": 0, "favicon": "yes", "verbose": null }));
        assert!(o.enabled());
        assert!(!o.queue());
        assert!(o.favicon());
        assert!(!o.verbose());
        assert!(!o.flag("missing"));
    }

    #[test]
    fn accent_color_from_nested_object() {
        let o = opts(json!({ "accent": { "name": "Teal", "color": "#00bcd4" } }));
        assert_eq!(o.accent_color(), Some("#00bcd4"));
        assert!(opts(json!({ "accent": "#fff" })).accent_color().is_none());
    }

    #[test]
    fn reserved_versions() {
        let o = opts(json!({ "version": "2.0.3", "lastRun": null }));
        assert_eq!(o.version().unwrap().as_str(), "2.0.3");
        assert!(o.last_run().is_none());
    }
}
