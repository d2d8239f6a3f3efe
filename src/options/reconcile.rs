//! Options reconciliation.
//!
//! Merges persisted user options with freshly flattened defaults, choosing one
//! of four branches from the stored `version`:
//!
//! 1. absent, unparsable or older than `nuke` -> full reset to defaults
//! 2. older than `reset`                      -> selective migration
//! 3. older than the running version          -> persist the version bump only
//! 4. otherwise                               -> pass-through, no writes
//!
//! The decision is computed by [`Reconciler::plan`] without touching storage;
//! [`Reconciler::reconcile`] reads the store, applies the plan and resolves
//! only after the corrective write (if any) completed. A storage failure never
//! propagates: the session falls back to the defaults and nothing is retried.

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::defaults::DefaultOptions;
use super::user::{UserOptions, VERSION_KEY};
use super::version::Version;
use super::OptionMap;
use crate::storage::SettingsStore;

/// Keys whose legitimate value may change shape between versions.
pub const DEFAULT_EXEMPT_KEYS: [&str; 4] = ["lastRun", "accent", "accents", "queue"];

/// Coarse runtime type of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

/// Which branch reconciliation took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Stored options discarded; `previous` is the stored version, if any.
    Reset { previous: Option<String> },
    /// Selective migration; `restored` lists keys set back to their default.
    Migrated { restored: Vec<String> },
    /// Only the version field was rewritten.
    VersionBumped { from: String },
    /// Stored options already current.
    Unchanged,
    /// Storage failed; defaults adopted for this session only.
    Degraded { reason: String },
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub options: UserOptions,
    pub outcome: ReconcileOutcome,
}

/// A reconciliation decision before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Options to adopt once `write` succeeded.
    pub options: OptionMap,
    /// Keys to persist; `None` means no write.
    pub write: Option<OptionMap>,
    pub outcome: ReconcileOutcome,
}

/// Version thresholds and the migration exemption set.
#[derive(Debug, Clone)]
pub struct Reconciler {
    running: Version,
    nuke: Version,
    reset: Version,
    exempt: BTreeSet<String>,
}

impl Reconciler {
    pub fn new(running: Version, nuke: Version, reset: Version) -> Self {
        Self {
            running,
            nuke,
            reset,
            exempt: DEFAULT_EXEMPT_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Replace the set of keys exempt from type-mismatch overwrites.
    pub fn with_exempt_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exempt = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn running(&self) -> &Version {
        &self.running
    }

    pub fn is_exempt(&self, key: &str) -> bool {
        self.exempt.contains(key)
    }

    /// Decide what to adopt and persist for `stored`.
    pub fn plan(&self, stored: &OptionMap, defaults: &DefaultOptions) -> Plan {
        let stored_version = stored.get(VERSION_KEY).and_then(Version::from_value);

        match stored_version {
            None => {
                info!(target: "midnight::reconcile", "No current options found, setting to default");
                self.reset_plan(defaults, None)
            }
            Some(v) if v < self.nuke => {
                info!(target: "midnight::reconcile", stored = %v, nuke = %self.nuke, "Nuking all options to default");
                self.reset_plan(defaults, Some(v.to_string()))
            }
            Some(v) if v < self.reset => {
                info!(target: "midnight::reconcile", stored = %v, reset = %self.reset, "Options update, migrating");
                self.migrate_plan(stored, defaults)
            }
            Some(v) if v < self.running => {
                info!(target: "midnight::reconcile", from = %v, to = %self.running, "Updated version");
                let mut options = overlay(defaults, stored);
                let bump = Value::String(self.running.to_string());
                options.insert(VERSION_KEY.to_string(), bump.clone());
                Plan {
                    options,
                    write: Some(OptionMap::from([(VERSION_KEY.to_string(), bump)])),
                    outcome: ReconcileOutcome::VersionBumped { from: v.to_string() },
                }
            }
            Some(v) => {
                debug!(target: "midnight::reconcile", stored = %v, "Options current");
                Plan {
                    options: overlay(defaults, stored),
                    write: None,
                    outcome: ReconcileOutcome::Unchanged,
                }
            }
        }
    }

    fn reset_plan(&self, defaults: &DefaultOptions, previous: Option<String>) -> Plan {
        Plan {
            options: defaults.to_map(),
            write: Some(defaults.to_map()),
            outcome: ReconcileOutcome::Reset { previous },
        }
    }

    fn migrate_plan(&self, stored: &OptionMap, defaults: &DefaultOptions) -> Plan {
        let mut merged = stored.clone();
        let mut restored = Vec::new();

        for (key, default) in defaults.iter() {
            let replace = match stored.get(key) {
                None => true,
                Some(user) => ValueKind::of(user) != ValueKind::of(default) && !self.is_exempt(key),
            };
            if replace {
                debug!(
                    target: "midnight::reconcile",
                    %key,
                    user = %render(stored.get(key)),
                    default = %default,
                    "Setting option to default"
                );
                merged.insert(key.clone(), default.clone());
                restored.push(key.clone());
            } else {
                debug!(target: "midnight::reconcile", %key, user = %render(stored.get(key)), "Keeping user value");
            }
        }

        Plan {
            options: merged.clone(),
            write: Some(merged),
            outcome: ReconcileOutcome::Migrated { restored },
        }
    }

    /// Read `store`, reconcile against `defaults` and persist corrections.
    ///
    /// Resolves exactly once, after the write (if any) completed.
    pub async fn reconcile<S: SettingsStore>(&self, store: &S, defaults: &DefaultOptions) -> Reconciliation {
        let stored = match store.get_all().await {
            Ok(stored) => stored,
            Err(e) => return degraded(defaults, e.to_string()),
        };

        let plan = self.plan(&stored, defaults);
        if let Some(write) = plan.write {
            if let Err(e) = store.set(write).await {
                return degraded(defaults, e.to_string());
            }
        }

        Reconciliation {
            options: UserOptions::new(plan.options),
            outcome: plan.outcome,
        }
    }
}

fn degraded(defaults: &DefaultOptions, reason: String) -> Reconciliation {
    warn!(target: "midnight::reconcile", %reason, "Storage failed, using defaults for this session");
    Reconciliation {
        options: UserOptions::new(defaults.to_map()),
        outcome: ReconcileOutcome::Degraded { reason },
    }
}

/// Defaults with every stored value laid over them.
fn overlay(defaults: &DefaultOptions, stored: &OptionMap) -> OptionMap {
    let mut out = defaults.to_map();
    out.extend(stored.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}

fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| "undefined".to_string(), Value::to_string)
}
