//! Option schema document (`options.json`).
//!
//! The schema is a tree of nodes keyed by option name. A node's `type` selects
//! how it flattens into default values:
//! - `section`: a grouping node; only its children produce keys.
//! - `array`: produces the `single` key (the default pick) and its own key
//!   (the full `collection`).
//! - anything else: a leaf producing exactly one key.
//!
//! Presentation fields (`title`, `description`) are carried for the options
//! graph accessor and otherwise ignored.

use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::SchemaError;

/// Top-level schema: option key -> node.
pub type OptionSchema = BTreeMap<String, OptionNode>;

/// Node type tag for groupings.
pub const SECTION: &str = "section";
/// Node type tag for selectable collections.
pub const ARRAY: &str = "array";

/// One node of the option schema tree, as written in the schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OptionNode {
    /// `section`, `array`, or a leaf type such as `boolean` / `string`.
    #[serde(rename = "type", default)]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default value; may be a template token such as `{VERSION_NUMBER}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// For `array` nodes: the key holding the currently selected element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single: Option<String>,

    /// For `array` nodes: the full default collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<Value>,

    /// For `section` nodes: the nested options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionSchema>,
}

/// Borrowed, shape-checked view over an [`OptionNode`].
#[derive(Debug, Clone, Copy)]
pub enum NodeShape<'a> {
    Section(Option<&'a OptionSchema>),
    Array {
        single: Option<&'a str>,
        default: Option<&'a Value>,
        collection: Option<&'a Value>,
    },
    Leaf {
        default: Option<&'a Value>,
    },
}

impl OptionNode {
    /// Classify the node by its `type` tag.
    pub fn shape(&self) -> NodeShape<'_> {
        match self.node_type.as_str() {
            SECTION => NodeShape::Section(self.options.as_ref()),
            ARRAY => NodeShape::Array {
                single: self.single.as_deref(),
                default: self.default.as_ref(),
                collection: self.collection.as_ref(),
            },
            _ => NodeShape::Leaf {
                default: self.default.as_ref(),
            },
        }
    }

    /// Convenience constructor for a leaf node.
    pub fn leaf(node_type: &str, default: Value) -> Self {
        Self {
            node_type: node_type.to_string(),
            default: Some(default),
            ..Self::default()
        }
    }

    /// Convenience constructor for a section node.
    pub fn section(options: OptionSchema) -> Self {
        Self {
            node_type: SECTION.to_string(),
            options: Some(options),
            ..Self::default()
        }
    }

    /// Convenience constructor for an array node.
    pub fn array(single: &str, default: Value, collection: Value) -> Self {
        Self {
            node_type: ARRAY.to_string(),
            single: Some(single.to_string()),
            default: Some(default),
            collection: Some(collection),
            ..Self::default()
        }
    }
}

/// Parse a schema document.
pub fn parse_schema(text: &str) -> Result<OptionSchema, SchemaError> {
    Ok(serde_json::from_str(text)?)
}

/// JSON Schema describing the option schema document itself.
pub fn generate_schema() -> Schema {
    schema_for!(OptionSchema)
}
