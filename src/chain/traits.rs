//! Chain injector contract
//!
//! An injector splices one chain kind into an in-progress assembly. It
//! draws ids from the assembly's shared allocator and may rewrite only
//! its declared end anchors; everything else in the graph is off-limits.

use crate::assemble::{Assembly, AssembleError};
use crate::recipe::{ChainDecl, ChainKind};
use serde_json::Value;

/// What a single inject call did to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    /// Units were spliced in and the end anchors rewired
    Spliced { units: usize },
    /// The graph was left untouched — empty items, an unresolved anchor,
    /// or unusable item records (all logged, none fatal)
    Skipped,
}

/// The contract chain injectors implement.
///
/// `inject` must uphold the shared rules: empty/absent items are a
/// no-op; a missing anchor logs a warning and leaves the graph
/// unchanged; items are processed in order into a strict sequential
/// chain; the end anchors are rewritten to the final unit's output.
/// Fatal errors are reserved for conditions that would corrupt the
/// graph (e.g. an operation type the template registry does not know).
pub trait ChainInjector: Send + Sync {
    /// Which chain kind this injector handles
    fn kind(&self) -> ChainKind;

    /// Splice the chain described by `decl` and `items` into `asm`
    fn inject(
        &self,
        asm: &mut Assembly,
        decl: &ChainDecl,
        items: &Value,
    ) -> Result<InjectOutcome, AssembleError>;
}
