//! Stack-kind injector — daisy-chained per-item adapter units
//!
//! Each item splices a three-node unit into the running stream:
//!
//! ```text
//! start ──▶ apply[0] ──▶ apply[1] ──▶ ... ──▶ apply[N-1] ──▶ end anchor(s)
//!             ▲             ▲
//!           scale[0]      scale[1]
//!             ▲             ▲
//!          loader[0]     loader[1]
//! ```
//!
//! The loader reads the item's source, the scale node weights it, and
//! the apply node folds it into the stream carried from the previous
//! unit (the start anchor's output for the first). A declared `encoder`
//! aux node, when present, is shared by every unit's loader.

use super::traits::{ChainInjector, InjectOutcome};
use super::{clamp_items, resolve_anchors};
use crate::assemble::{Assembly, AssembleError};
use crate::graph::InputValue;
use crate::recipe::{ChainDecl, ChainKind};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// One item record in a stack chain's parameter list
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StackItem {
    /// Resource the unit's loader reads (already staged by the caller)
    pub source: String,
    /// Strength applied by the unit's scale node
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Extra per-item inputs overlaid on the loader node
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

fn default_weight() -> f64 {
    1.0
}

/// Injector for [`ChainKind::Stack`]
pub struct StackInjector {
    loader_op: String,
    scale_op: String,
    apply_op: String,
}

impl StackInjector {
    pub fn new() -> Self {
        Self {
            loader_op: "AdapterLoader".to_string(),
            scale_op: "AdapterScale".to_string(),
            apply_op: "AdapterApply".to_string(),
        }
    }

    /// Override the unit's operation types (loader, scale, apply)
    pub fn with_ops(
        mut self,
        loader: impl Into<String>,
        scale: impl Into<String>,
        apply: impl Into<String>,
    ) -> Self {
        self.loader_op = loader.into();
        self.scale_op = scale.into();
        self.apply_op = apply.into();
        self
    }
}

impl Default for StackInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainInjector for StackInjector {
    fn kind(&self) -> ChainKind {
        ChainKind::Stack
    }

    fn inject(
        &self,
        asm: &mut Assembly,
        decl: &ChainDecl,
        items: &Value,
    ) -> Result<InjectOutcome, AssembleError> {
        let items: Vec<StackItem> = match serde_json::from_value(items.clone()) {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    param = %decl.param,
                    error = %e,
                    "stack chain items are not usable item records; skipping chain"
                );
                return Ok(InjectOutcome::Skipped);
            }
        };
        if items.is_empty() {
            return Ok(InjectOutcome::Skipped);
        }

        let anchors = match resolve_anchors(asm, decl) {
            Some(anchors) => anchors,
            None => return Ok(InjectOutcome::Skipped),
        };

        let take = clamp_items(items.len(), decl);
        let encoder = anchors.aux.get("encoder").copied();

        let (start_id, start_output) = anchors.start;
        let mut running = InputValue::Link(start_id, start_output);

        for (i, item) in items.iter().take(take).enumerate() {
            let loader = asm.instantiate(&self.loader_op)?;
            asm.graph.set_input(loader, "source", json!(item.source));
            for (slot, value) in &item.extra {
                asm.graph.set_input(loader, slot.clone(), value.clone());
            }
            if let Some(encoder_id) = encoder {
                asm.graph
                    .set_input(loader, "encoder", InputValue::Link(encoder_id, 0));
            }

            let scale = asm.instantiate(&self.scale_op)?;
            asm.graph
                .set_input(scale, "adapter", InputValue::Link(loader, 0));
            asm.graph.set_input(scale, "weight", json!(item.weight));

            let apply = asm.instantiate(&self.apply_op)?;
            asm.graph
                .set_input(apply, "adapter", InputValue::Link(scale, 0));
            asm.graph.set_input(apply, "stream", running.clone());
            if let Some(node) = asm.graph.get_mut(apply) {
                node.meta.title = Some(format!("adapter {}/{}", i + 1, take));
            }

            running = InputValue::Link(apply, 0);
        }

        for (end_id, input) in &anchors.ends {
            asm.graph.set_input(*end_id, input.clone(), running.clone());
        }

        Ok(InjectOutcome::Spliced { units: take })
    }
}
