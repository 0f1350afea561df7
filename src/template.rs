//! Node template registry — the engine's operation-shape oracle
//!
//! The assembler never invents node shapes: every instantiated node is
//! cloned from a template describing the operation's input slots (with
//! defaults and declared types) and how many outputs it exposes. The
//! registry is read-only; `TemplateCatalog` is the in-memory document-
//! backed implementation used by the CLI and tests, and the trait seam
//! lets a live-engine client stand in for it.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Errors from loading a template catalog document
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(String),
}

/// Declared type of a template input slot.
///
/// Drives coercion of substituted parameters; `Any` passes values
/// through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Int,
    Float,
    Bool,
    String,
    #[default]
    Any,
}

impl std::fmt::Display for SlotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Any => "any",
        };
        write!(f, "{}", name)
    }
}

/// One input slot in a node template
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SlotTemplate {
    /// Default value cloned into every instantiated node; a slot with no
    /// default must be bound by the recipe or wired by an injector
    #[serde(default)]
    pub default: Option<Value>,
    /// Declared type, used to coerce substituted parameters
    #[serde(default, rename = "type")]
    pub ty: SlotType,
}

/// The canonical shape of one operation type
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeTemplate {
    /// Input slots keyed by name
    #[serde(default)]
    pub inputs: BTreeMap<String, SlotTemplate>,
    /// How many outputs the operation exposes
    #[serde(default = "default_outputs")]
    pub outputs: u32,
}

fn default_outputs() -> u32 {
    1
}

impl NodeTemplate {
    /// A template with the given output count and no inputs
    pub fn with_outputs(outputs: u32) -> Self {
        Self {
            inputs: BTreeMap::new(),
            outputs,
        }
    }

    /// Add an input slot
    pub fn with_input(mut self, slot: impl Into<String>, ty: SlotType, default: Option<Value>) -> Self {
        self.inputs.insert(slot.into(), SlotTemplate { default, ty });
        self
    }
}

impl Default for NodeTemplate {
    fn default() -> Self {
        Self::with_outputs(1)
    }
}

/// Read-only oracle mapping operation types to their canonical shapes
pub trait TemplateSource: Send + Sync {
    /// The template for an operation type, or None if the engine does
    /// not advertise it
    fn template(&self, op: &str) -> Option<NodeTemplate>;
}

/// In-memory template registry parsed from a catalog document.
///
/// The document is a mapping of operation type to template:
///
/// ```yaml
/// ImageLoader:
///   inputs:
///     path: {type: string}
///   outputs: 1
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<String, NodeTemplate>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from an already-loaded JSON value
    pub fn from_value(value: Value) -> Result<Self, CatalogError> {
        let templates: HashMap<String, NodeTemplate> =
            serde_json::from_value(value).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self { templates })
    }

    /// Load a catalog document (YAML or JSON, by extension)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&text).map_err(|e| CatalogError::Parse(e.to_string()))?
        } else {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(&text).map_err(|e| CatalogError::Parse(e.to_string()))?;
            serde_json::to_value(yaml).map_err(|e| CatalogError::Parse(e.to_string()))?
        };
        Self::from_value(value)
    }

    /// Register a template, replacing any existing entry for the op
    pub fn insert(&mut self, op: impl Into<String>, template: NodeTemplate) {
        self.templates.insert(op.into(), template);
    }

    /// Builder-style registration, for tests and embedders
    pub fn with_template(mut self, op: impl Into<String>, template: NodeTemplate) -> Self {
        self.insert(op, template);
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateSource for TemplateCatalog {
    fn template(&self, op: &str) -> Option<NodeTemplate> {
        self.templates.get(op).cloned()
    }
}
