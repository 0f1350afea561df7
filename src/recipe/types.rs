//! Recipe document types
//!
//! A recipe is the declarative skeleton of a job graph: a static node
//! list plus attachment points for variable-length chains. Documents are
//! parsed from YAML or JSON after base/override merging; symbolic node
//! names exist only at assembly time and never reach the engine.

use chrono::{DateTime, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A single input binding declared on a recipe node.
///
/// Closed tagged union so every unresolved or mistyped binding is caught
/// at build time rather than surfacing as a bad literal in the engine.
///
/// Document syntax:
/// - a string `"${name}"` is a parameter reference
/// - a map `{from: <node>, output: <n>}` is a static link
/// - anything else is a literal
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Copied into the node input as-is
    Literal(Value),
    /// Substituted from the caller's parameter map, coerced to the
    /// template's declared slot type
    ParamRef(String),
    /// Resolved to `[node id, output index]` once all symbolic names
    /// are allocated
    StaticLink { node: String, output: u32 },
}

impl<'de> Deserialize<'de> for Binding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;

        if let Value::String(s) = &value {
            if let Some(name) = s.strip_prefix("${").and_then(|r| r.strip_suffix('}')) {
                if name.is_empty() {
                    return Err(D::Error::custom("empty parameter reference: ${}"));
                }
                return Ok(Binding::ParamRef(name.to_string()));
            }
        }

        if let Value::Object(map) = &value {
            if map.contains_key("from") {
                let node = map
                    .get("from")
                    .and_then(Value::as_str)
                    .ok_or_else(|| D::Error::custom("link binding: 'from' must be a node name"))?;
                let output = match map.get("output") {
                    None => 0,
                    Some(v) => v.as_u64().and_then(|n| u32::try_from(n).ok()).ok_or_else(
                        || D::Error::custom("link binding: 'output' must be a small integer"),
                    )?,
                };
                for key in map.keys() {
                    if key != "from" && key != "output" {
                        return Err(D::Error::custom(format!(
                            "link binding: unexpected key '{}'",
                            key
                        )));
                    }
                }
                return Ok(Binding::StaticLink {
                    node: node.to_string(),
                    output,
                });
            }
        }

        Ok(Binding::Literal(value))
    }
}

/// A statically-declared node in a recipe
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeDecl {
    /// Operation type, resolved against the template registry
    pub op: String,
    /// Input bindings overlaid on the template's defaults
    #[serde(default)]
    pub inputs: BTreeMap<String, Binding>,
    /// Display title; defaults to the symbolic name
    #[serde(default)]
    pub title: Option<String>,
}

/// The closed set of chain kinds with built-in injectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// Daisy-chained per-item units (adapter stacks, reference stacks)
    Stack,
    /// Seeded multi-chunk continuation with a merge tail
    Extension,
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stack => write!(f, "stack"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// Where a chain's first unit draws its running input from
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartAnchor {
    /// Symbolic name of the anchor node
    pub node: String,
    /// Output slot index on the anchor node
    #[serde(default)]
    pub output: u32,
}

/// An input that gets rewritten to the final unit's output
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndAnchor {
    /// Symbolic name of the anchor node
    pub node: String,
    /// Input slot name to rewrite
    pub input: String,
}

/// Declares *where* a variable-length chain attaches, not its contents.
///
/// The chain's units are the injector's business; the declaration only
/// names the parameter key supplying items, the anchors, and any shared
/// auxiliary nodes (e.g. an encoder every unit feeds from).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChainDecl {
    pub kind: ChainKind,
    /// Parameter-map key holding this chain's items
    pub param: String,
    pub start: StartAnchor,
    /// End anchor(s); a single map or a list in the document
    #[serde(rename = "end", deserialize_with = "one_or_many")]
    pub ends: Vec<EndAnchor>,
    /// Auxiliary node refs by role name (e.g. `encoder: clip_loader`)
    #[serde(default)]
    pub aux: BTreeMap<String, String>,
    /// Cap on spliced units; excess items are dropped with a warning
    #[serde(default)]
    pub max_items: Option<usize>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<EndAnchor>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(EndAnchor),
        Many(Vec<EndAnchor>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(anchor) => vec![anchor],
        OneOrMany::Many(anchors) => anchors,
    })
}

/// Load provenance for a cached recipe
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeMeta {
    /// Path of the base document
    pub path: PathBuf,
    /// Whether an override document contributed to the merge
    pub overridden: bool,
    /// When the merged document was loaded
    pub loaded_at: Option<DateTime<Utc>>,
}

/// An immutable, loaded-and-merged recipe document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recipe {
    /// Recipe name, as resolved by the store
    #[serde(skip)]
    pub name: String,
    /// Static node declarations, keyed by symbolic name
    pub nodes: BTreeMap<String, NodeDecl>,
    /// Chain attachment declarations
    #[serde(default)]
    pub chains: Vec<ChainDecl>,
    /// Load provenance, filled in by the store
    #[serde(skip)]
    pub meta: RecipeMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(doc: Value) -> Binding {
        serde_json::from_value(doc).unwrap()
    }

    #[test]
    fn test_binding_literal() {
        assert_eq!(binding(json!(512)), Binding::Literal(json!(512)));
        assert_eq!(binding(json!("euler")), Binding::Literal(json!("euler")));
        assert_eq!(
            binding(json!([1, 2, 3])),
            Binding::Literal(json!([1, 2, 3]))
        );
    }

    #[test]
    fn test_binding_param_ref() {
        assert_eq!(
            binding(json!("${seed}")),
            Binding::ParamRef("seed".to_string())
        );
    }

    #[test]
    fn test_binding_static_link() {
        assert_eq!(
            binding(json!({"from": "loader"})),
            Binding::StaticLink {
                node: "loader".to_string(),
                output: 0
            }
        );
        assert_eq!(
            binding(json!({"from": "loader", "output": 2})),
            Binding::StaticLink {
                node: "loader".to_string(),
                output: 2
            }
        );
    }

    #[test]
    fn test_binding_malformed_link_rejected() {
        assert!(serde_json::from_value::<Binding>(json!({"from": 3})).is_err());
        assert!(serde_json::from_value::<Binding>(json!({"from": "a", "extra": 1})).is_err());
    }

    #[test]
    fn test_binding_plain_map_is_literal() {
        // A map without a 'from' key is an ordinary literal object
        assert_eq!(
            binding(json!({"width": 512})),
            Binding::Literal(json!({"width": 512}))
        );
    }

    #[test]
    fn test_chain_decl_single_end_anchor() {
        let doc = json!({
            "kind": "stack",
            "param": "adapters",
            "start": {"node": "model_loader", "output": 0},
            "end": {"node": "sampler", "input": "model"},
        });
        let decl: ChainDecl = serde_json::from_value(doc).unwrap();
        assert_eq!(decl.kind, ChainKind::Stack);
        assert_eq!(decl.ends.len(), 1);
        assert_eq!(decl.ends[0].node, "sampler");
    }

    #[test]
    fn test_chain_decl_multiple_end_anchors() {
        let doc = json!({
            "kind": "stack",
            "param": "adapters",
            "start": {"node": "model_loader"},
            "end": [
                {"node": "sampler", "input": "model"},
                {"node": "refiner", "input": "model"},
            ],
        });
        let decl: ChainDecl = serde_json::from_value(doc).unwrap();
        assert_eq!(decl.start.output, 0);
        assert_eq!(decl.ends.len(), 2);
    }

    #[test]
    fn test_recipe_document_parses() {
        let doc = json!({
            "nodes": {
                "loader": {"op": "ImageLoader", "inputs": {"path": "${image}"}},
                "saver": {
                    "op": "ImageSave",
                    "inputs": {"image": {"from": "loader"}},
                    "title": "save output",
                },
            },
            "chains": [{
                "kind": "extension",
                "param": "extend",
                "start": {"node": "loader"},
                "end": {"node": "saver", "input": "image"},
                "max_items": 8,
            }],
        });
        let recipe: Recipe = serde_json::from_value(doc).unwrap();
        assert_eq!(recipe.nodes.len(), 2);
        assert_eq!(recipe.chains.len(), 1);
        assert_eq!(recipe.chains[0].max_items, Some(8));
        assert_eq!(
            recipe.nodes["loader"].inputs["path"],
            Binding::ParamRef("image".to_string())
        );
    }
}
