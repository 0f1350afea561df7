//! Recipe documents — loading, merging, and the declaration types

mod merge;
mod store;
mod types;

pub use merge::deep_merge;
pub use store::{RecipeError, RecipeStore};
pub use types::{
    Binding, ChainDecl, ChainKind, EndAnchor, NodeDecl, Recipe, RecipeMeta, StartAnchor,
};
