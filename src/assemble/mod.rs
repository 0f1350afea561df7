//! Assembler core — static graph construction and shared assembly state

mod builder;
mod ids;
mod params;

pub use builder::{Assembly, GraphBuilder};
pub use ids::IdAllocator;
pub use params::{coerce, ParamMap};

pub(crate) use builder::chain_items_present;

use crate::recipe::RecipeError;
use crate::template::{CatalogError, SlotType};
use thiserror::Error;

/// Fatal assembly failures.
///
/// Every variant aborts the whole build; no partial graph is returned.
/// Chain anchor-resolution failures are not in this set: they degrade
/// to a logged no-op for the one chain affected.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("unknown operation type: {0}")]
    UnknownOperation(String),

    #[error("node '{node}': no value for parameter ${{{param}}} bound to slot '{slot}' and the template has no default")]
    MissingParameter {
        node: String,
        slot: String,
        param: String,
    },

    #[error("node '{node}': parameter ${{{param}}} bound to slot '{slot}' is not a valid {expected}")]
    InvalidParameter {
        node: String,
        slot: String,
        param: String,
        expected: SlotType,
    },

    #[error("node '{node}': input '{slot}' references undeclared node '{target}'")]
    DanglingReference {
        node: String,
        slot: String,
        target: String,
    },

    #[error("node '{node}': input '{slot}' links to output {output} of '{target}', which has {available} output(s)")]
    OutputOutOfRange {
        node: String,
        slot: String,
        target: String,
        output: u32,
        available: u32,
    },
}

/// Result type for assembly operations
pub type AssembleResult<T> = Result<T, AssembleError>;
