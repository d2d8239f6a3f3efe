//! User options: schema, defaults, versions and reconciliation.
//!
//! Flow at startup:
//! 1. parse the option schema document (`schema`)
//! 2. flatten it into defaults, resolving template tokens (`defaults`)
//! 3. reconcile persisted options against the defaults (`reconcile`)
//!
//! The resulting [`OptionsContext`] is passed explicitly to the style injector
//! and the page decorators.

use serde_json::Value;
use std::collections::BTreeMap;

pub mod context;
pub mod defaults;
pub mod reconcile;
pub mod schema;
pub mod user;
pub mod version;

/// Flat option key -> value map.
pub type OptionMap = BTreeMap<String, Value>;

pub use context::OptionsContext;
pub use defaults::{DefaultOptions, TemplateTokens, VERSION_TOKEN, flatten};
pub use reconcile::{
    DEFAULT_EXEMPT_KEYS, Plan, ReconcileOutcome, Reconciler, Reconciliation, ValueKind,
};
pub use schema::{NodeShape, OptionNode, OptionSchema, parse_schema};
pub use user::{LAST_RUN_KEY, UserOptions, VERSION_KEY, truthy};
pub use version::Version;
