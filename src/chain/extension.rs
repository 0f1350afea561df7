//! Extension-kind injector — seeded multi-chunk continuation
//!
//! Items are a descriptor rather than a list: `{count, seed, mode?}`.
//! The injector clones a sampler→decode→trim unit `count` times. Each
//! clone continues from the previous clone's trimmed hand-off (the
//! start anchor for the first) and samples with `seed + i`. Full
//! decoded outputs are folded left-to-right through binary combiner
//! nodes — N−1 combiners for N chunks — and the final combined sequence
//! replaces the end anchor input:
//!
//! ```text
//! start ─▶ sampler[0] ─▶ decode[0] ─┬─▶ join ─▶ join ─▶ end anchor(s)
//!                          trim[0] ─┘     ▲       ▲
//!                              ▼          │       │
//!                        sampler[1] ─▶ decode[1]  │
//!                          trim[1] ────▼          │
//!                        sampler[2] ─▶ decode[2] ─┘
//! ```
//!
//! The trimmed hand-off and the full output are distinct routes: the
//! trim output seeds continuity, the decode output feeds the merge.

use super::traits::{ChainInjector, InjectOutcome};
use super::{clamp_items, resolve_anchors};
use crate::assemble::{Assembly, AssembleError};
use crate::graph::InputValue;
use crate::recipe::{ChainDecl, ChainKind};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

/// Descriptor supplied under an extension chain's parameter key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtensionSpec {
    /// How many continuation chunks to splice
    pub count: u32,
    /// Seed for the first chunk; chunk i samples with `seed + i`
    pub seed: i64,
    /// Optional sampling mode forwarded to every chunk's sampler
    #[serde(default)]
    pub mode: Option<String>,
}

/// Injector for [`ChainKind::Extension`]
pub struct ExtensionInjector {
    sampler_op: String,
    decode_op: String,
    trim_op: String,
    join_op: String,
}

impl ExtensionInjector {
    pub fn new() -> Self {
        Self {
            sampler_op: "ChunkSampler".to_string(),
            decode_op: "ChunkDecode".to_string(),
            trim_op: "ChunkTrim".to_string(),
            join_op: "SequenceJoin".to_string(),
        }
    }

    /// Override the unit's operation types (sampler, decode, trim, join)
    pub fn with_ops(
        mut self,
        sampler: impl Into<String>,
        decode: impl Into<String>,
        trim: impl Into<String>,
        join: impl Into<String>,
    ) -> Self {
        self.sampler_op = sampler.into();
        self.decode_op = decode.into();
        self.trim_op = trim.into();
        self.join_op = join.into();
        self
    }
}

impl Default for ExtensionInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainInjector for ExtensionInjector {
    fn kind(&self) -> ChainKind {
        ChainKind::Extension
    }

    fn inject(
        &self,
        asm: &mut Assembly,
        decl: &ChainDecl,
        items: &Value,
    ) -> Result<InjectOutcome, AssembleError> {
        let spec: ExtensionSpec = match serde_json::from_value(items.clone()) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(
                    param = %decl.param,
                    error = %e,
                    "extension chain items are not a usable descriptor; skipping chain"
                );
                return Ok(InjectOutcome::Skipped);
            }
        };
        if spec.count == 0 {
            return Ok(InjectOutcome::Skipped);
        }

        let anchors = match resolve_anchors(asm, decl) {
            Some(anchors) => anchors,
            None => return Ok(InjectOutcome::Skipped),
        };

        let count = clamp_items(spec.count as usize, decl);

        let (start_id, start_output) = anchors.start;
        let mut continue_from = InputValue::Link(start_id, start_output);
        let mut decoded = Vec::with_capacity(count);

        for i in 0..count {
            let sampler = asm.instantiate(&self.sampler_op)?;
            asm.graph
                .set_input(sampler, "seed", json!(spec.seed + i as i64));
            asm.graph
                .set_input(sampler, "continue_from", continue_from.clone());
            if let Some(mode) = &spec.mode {
                asm.graph.set_input(sampler, "mode", json!(mode));
            }

            let decode = asm.instantiate(&self.decode_op)?;
            asm.graph
                .set_input(decode, "samples", InputValue::Link(sampler, 0));
            if let Some(node) = asm.graph.get_mut(decode) {
                node.meta.title = Some(format!("chunk {}/{}", i + 1, count));
            }

            // The trimmed hand-off seeds the next chunk; the full decode
            // output goes to the merge chain below.
            let trim = asm.instantiate(&self.trim_op)?;
            asm.graph
                .set_input(trim, "frames", InputValue::Link(decode, 0));

            continue_from = InputValue::Link(trim, 0);
            decoded.push(decode);
        }

        let mut merged = InputValue::Link(decoded[0], 0);
        for decode in &decoded[1..] {
            let join = asm.instantiate(&self.join_op)?;
            asm.graph.set_input(join, "a", merged);
            asm.graph.set_input(join, "b", InputValue::Link(*decode, 0));
            merged = InputValue::Link(join, 0);
        }

        for (end_id, input) in &anchors.ends {
            asm.graph.set_input(*end_id, input.clone(), merged.clone());
        }

        Ok(InjectOutcome::Spliced { units: count })
    }
}
