use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Deref;
use tracing::debug;

use super::OptionMap;
use super::schema::{NodeShape, OptionSchema};

/// Template token resolved to the running version.
pub const VERSION_TOKEN: &str = "{VERSION_NUMBER}";

/// Template tokens recognised in schema defaults: exact token string -> value.
#[derive(Debug, Clone, Default)]
pub struct TemplateTokens(BTreeMap<String, Value>);

impl TemplateTokens {
    /// Tokens for a given running version (currently only `{VERSION_NUMBER}`).
    pub fn for_version(version: &str) -> Self {
        let mut tokens = Self::default();
        tokens.insert(VERSION_TOKEN, Value::String(version.to_string()));
        tokens
    }

    pub fn insert(&mut self, token: &str, value: Value) {
        self.0.insert(token.to_string(), value);
    }

    /// Resolve a declared default: a string exactly equal to a known token is
    /// replaced, anything else is returned as-is.
    fn resolve(&self, default: Option<&Value>) -> Value {
        match default {
            Some(Value::String(s)) => self
                .0
                .get(s)
                .cloned()
                .unwrap_or_else(|| Value::String(s.clone())),
            Some(other) => other.clone(),
            None => Value::Null,
        }
    }
}

/// Flattened default option values, immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultOptions(OptionMap);

impl DefaultOptions {
    /// Flatten a schema tree into defaults.
    pub fn from_schema(schema: &OptionSchema, tokens: &TemplateTokens) -> Self {
        let out = flatten(schema, tokens);
        debug!(target: "midnight::options", keys = out.len(), "Default options flattened");
        Self(out)
    }

    /// Owned copy of the underlying map.
    pub fn to_map(&self) -> OptionMap {
        self.0.clone()
    }
}

impl Deref for DefaultOptions {
    type Target = OptionMap;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<OptionMap> for DefaultOptions {
    fn from(map: OptionMap) -> Self {
        Self(map)
    }
}

/// Flatten `schema` into a key -> default map. Malformed nodes (a section
/// without options, an array without `single`) contribute what they can.
pub fn flatten(schema: &OptionSchema, tokens: &TemplateTokens) -> OptionMap {
    let mut out = OptionMap::new();
    flatten_into(schema, tokens, &mut out);
    out
}

fn flatten_into(schema: &OptionSchema, tokens: &TemplateTokens, out: &mut OptionMap) {
    for (key, node) in schema {
        match node.shape() {
            NodeShape::Section(Some(children)) => flatten_into(children, tokens, out),
            NodeShape::Section(None) => {}
            NodeShape::Array {
                single,
                default,
                collection,
            } => {
                if let Some(single) = single {
                    out.insert(single.to_string(), tokens.resolve(default));
                }
                out.insert(key.clone(), collection.cloned().unwrap_or(Value::Null));
            }
            NodeShape::Leaf { default } => {
                out.insert(key.clone(), tokens.resolve(default));
            }
        }
    }
}
