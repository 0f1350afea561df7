//! Node representation in an assembled job graph

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Unique identifier for a node within one assembled graph.
///
/// The execution engine's job-graph format keys nodes by small decimal
/// strings, so ids are plain integers issued by the assembly's allocator.
/// Once issued, an id is never reused or renumbered within that assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a NodeId from a raw integer
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The engine's wire format carries ids as decimal strings ("7", not 7),
// both as graph keys and inside link arrays.
impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::String(s) => s
                .parse::<u64>()
                .map(NodeId)
                .map_err(|_| serde::de::Error::custom(format!("invalid node id: {}", s))),
            Value::Number(n) => n
                .as_u64()
                .map(NodeId)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid node id: {}", n))),
            other => Err(serde::de::Error::custom(format!(
                "invalid node id: {}",
                other
            ))),
        }
    }
}

/// A single input slot value on an assembled node.
///
/// Serializes to the engine's two wire shapes: a link is the array
/// `["<node id>", <output index>]`, a literal is the raw JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    /// A connection to another node's output
    Link(NodeId, u32),
    /// A literal value passed through to the engine unchanged
    Value(Value),
}

impl InputValue {
    /// Returns the link endpoints if this input is a link
    pub fn as_link(&self) -> Option<(NodeId, u32)> {
        match self {
            Self::Link(id, output) => Some((*id, *output)),
            Self::Value(_) => None,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link(..))
    }
}

impl From<Value> for InputValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Display metadata attached to a node, carried verbatim to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Display title shown in the engine's own UI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl NodeMeta {
    fn is_empty(&self) -> bool {
        self.title.is_none()
    }
}

/// A node in an assembled job graph
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Node {
    /// Operation type, resolved against the template registry
    #[serde(rename = "class_type")]
    pub op: String,
    /// Input slot values, keyed by slot name
    #[serde(default)]
    pub inputs: BTreeMap<String, InputValue>,
    /// Display metadata
    #[serde(default, rename = "_meta")]
    pub meta: NodeMeta,
}

impl Node {
    /// Create a new node with the given operation type and no inputs
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            inputs: BTreeMap::new(),
            meta: NodeMeta::default(),
        }
    }

    /// Set an input slot, replacing any existing value
    pub fn set_input(&mut self, slot: impl Into<String>, value: impl Into<InputValue>) {
        self.inputs.insert(slot.into(), value.into());
    }

    /// Add an input slot
    pub fn with_input(mut self, slot: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.set_input(slot, value);
        self
    }

    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }

    /// Get an input slot value
    pub fn input(&self, slot: &str) -> Option<&InputValue> {
        self.inputs.get(slot)
    }
}

// `_meta` is omitted entirely when empty; the engine treats a missing
// `_meta` and an empty one the same way.
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = if self.meta.is_empty() { 2 } else { 3 };
        let mut map = serializer.serialize_map(Some(entries))?;
        map.serialize_entry("class_type", &self.op)?;
        map.serialize_entry("inputs", &self.inputs)?;
        if !self.meta.is_empty() {
            map.serialize_entry("_meta", &self.meta)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_serializes_as_id_string_and_index() {
        let input = InputValue::Link(NodeId::from_raw(7), 1);
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json, json!(["7", 1]));
    }

    #[test]
    fn test_literal_serializes_verbatim() {
        let input = InputValue::Value(json!({"width": 512}));
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json, json!({"width": 512}));
    }

    #[test]
    fn test_node_serialization_shape() {
        let node = Node::new("ImageLoader")
            .with_input("path", json!("input.png"))
            .with_input("upstream", InputValue::Link(NodeId::from_raw(3), 0))
            .with_title("loader");

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            json!({
                "class_type": "ImageLoader",
                "inputs": {
                    "path": "input.png",
                    "upstream": ["3", 0],
                },
                "_meta": {"title": "loader"},
            })
        );
    }

    #[test]
    fn test_node_without_title_omits_meta() {
        let node = Node::new("ImageLoader");
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("_meta").is_none());
    }

    #[test]
    fn test_node_id_roundtrip() {
        let id = NodeId::from_raw(42);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, json!("42"));
        let back: NodeId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
