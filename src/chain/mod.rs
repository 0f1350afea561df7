//! Chain injection — variable-length repeated subgraphs
//!
//! Chains let a recipe splice N repeated units into an otherwise fixed
//! graph: a stack of style adapters, a run of continuation chunks. The
//! static graph must already be valid without them; injection is
//! strictly additive and degrades to a logged no-op when a chain's
//! anchors are not present in the current recipe.

mod extension;
mod registry;
mod stack;
mod traits;

pub use extension::{ExtensionInjector, ExtensionSpec};
pub use registry::InjectorRegistry;
pub use stack::{StackInjector, StackItem};
pub use traits::{ChainInjector, InjectOutcome};

use crate::assemble::Assembly;
use crate::graph::NodeId;
use crate::recipe::ChainDecl;
use std::collections::BTreeMap;
use tracing::warn;

/// Anchor ids looked up from the node map at injection time
pub(crate) struct ResolvedAnchors {
    /// Start anchor node and output slot index
    pub start: (NodeId, u32),
    /// End anchors: node id and the input slot to rewrite
    pub ends: Vec<(NodeId, String)>,
    /// Auxiliary nodes by role name
    pub aux: BTreeMap<String, NodeId>,
}

/// Resolve every symbolic anchor in a chain declaration.
///
/// Any missing name soft-fails the whole chain: the warning names the
/// chain and the symbol, and the caller leaves the graph untouched.
pub(crate) fn resolve_anchors(asm: &Assembly, decl: &ChainDecl) -> Option<ResolvedAnchors> {
    let missing = |symbol: &str| {
        warn!(
            chain = %decl.kind,
            param = %decl.param,
            symbol,
            "chain anchor not in this recipe; skipping chain"
        );
    };

    let start = match asm.resolve(&decl.start.node) {
        Some(id) => (id, decl.start.output),
        None => {
            missing(&decl.start.node);
            return None;
        }
    };

    let mut ends = Vec::with_capacity(decl.ends.len());
    for end in &decl.ends {
        match asm.resolve(&end.node) {
            Some(id) => ends.push((id, end.input.clone())),
            None => {
                missing(&end.node);
                return None;
            }
        }
    }

    let mut aux = BTreeMap::new();
    for (role, symbol) in &decl.aux {
        match asm.resolve(symbol) {
            Some(id) => {
                aux.insert(role.clone(), id);
            }
            None => {
                missing(symbol);
                return None;
            }
        }
    }

    Some(ResolvedAnchors { start, ends, aux })
}

/// Apply the declaration's max-item cap, warning about dropped items
pub(crate) fn clamp_items(count: usize, decl: &ChainDecl) -> usize {
    match decl.max_items {
        Some(cap) if count > cap => {
            warn!(
                chain = %decl.kind,
                param = %decl.param,
                count,
                cap,
                "chain items exceed cap; dropping excess"
            );
            cap
        }
        _ => count,
    }
}
