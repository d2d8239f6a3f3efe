use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

/// Static extension setup.
///
/// Unlike user options, nothing here is changed at runtime: it describes the
/// packaged assets, the version thresholds that drive reconciliation and the
/// page hooks. Every field has a default matching the stock extension, so an
/// empty JSON object is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, PartialEq)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Running extension version.
    #[validate(pattern = r"^[0-9]+(\.[0-9]+)*$")]
    pub version: String,

    /// Stored options older than this are discarded entirely.
    #[validate(pattern = r"^[0-9]+(\.[0-9]+)*$")]
    pub nuke_version: String,

    /// Stored options older than this are migrated key by key.
    #[validate(pattern = r"^[0-9]+(\.[0-9]+)*$")]
    pub reset_version: String,

    /// Inject stylesheets as `<link>` tags instead of inline `<style>`.
    /// Inline is required for accent color substitution.
    pub dev: bool,

    /// Path of the option schema document.
    #[validate(min_length = 1)]
    pub options_path: String,

    /// Stylesheets, injected in this order.
    #[validate]
    pub stylesheets: Vec<StylesheetConfig>,

    /// Theme substitutions applied to inline stylesheet text, in order.
    #[validate]
    pub replace_rules: Vec<ThemeRuleConfig>,

    /// Favicon asset path.
    #[validate(min_length = 1)]
    pub favicon_path: String,

    /// Directory holding `<version>.html` and `default.html` notification templates.
    #[validate(min_length = 1)]
    pub notifications_dir: String,

    /// Element id of the queue panel.
    #[validate(min_length = 1)]
    pub queue_element: String,

    /// Class that expands the queue panel.
    #[validate(min_length = 1)]
    pub queue_class: String,

    /// Option keys exempt from type-mismatch resets during migration.
    pub exempt_keys: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            version: "2.0.3".into(),
            nuke_version: "2.0.3".into(),
            reset_version: "2.0.3".into(),
            dev: false,
            options_path: "dist/options.json".into(),
            stylesheets: vec![
                StylesheetConfig {
                    id: "play-midnight-stylesheet".into(),
                    path: "dist/css/play-midnight.css".into(),
                    enabled_by: Some("enabled".into()),
                },
                StylesheetConfig {
                    id: "play-midnight-options".into(),
                    path: "dist/css/play-midnight-options.css".into(),
                    enabled_by: None,
                },
            ],
            replace_rules: vec![ThemeRuleConfig {
                name: "Accent Color".into(),
                token: "#fb8521".into(),
                option: "accent.color".into(),
            }],
            favicon_path: "dist/images/favicon.ico".into(),
            notifications_dir: "dist/templates/notifications".into(),
            queue_element: "queue-overlay".into(),
            queue_class: "pm-expanded-queue".into(),
            exempt_keys: crate::options::DEFAULT_EXEMPT_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

/// One injectable stylesheet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, PartialEq, Eq)]
pub struct StylesheetConfig {
    /// Element id of the injected `<style>`.
    #[validate(min_length = 1)]
    pub id: String,

    /// Asset path of the CSS text.
    #[validate(min_length = 1)]
    pub path: String,

    /// Option key that must be truthy for the sheet to be injected.
    /// `None` means always injected.
    #[serde(default)]
    pub enabled_by: Option<String>,
}

/// A theme substitution: every case-insensitive occurrence of `token` in the
/// stylesheet text is replaced by the value of the option at `option`
/// (a dotted path such as `accent.color`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, PartialEq, Eq)]
pub struct ThemeRuleConfig {
    pub name: String,

    #[validate(min_length = 1)]
    pub token: String,

    #[validate(min_length = 1)]
    pub option: String,
}
