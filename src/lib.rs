//! Graphsmith: recipe-driven job graph assembler
//!
//! Compiles a declarative *recipe* plus a bag of runtime parameters into
//! a fully-resolved, executable job graph for an external node-based
//! execution engine.
//!
//! # Core Concepts
//!
//! - **Recipes**: static node skeleton + attachment points for chains,
//!   loaded and deep-merged with user overrides
//! - **Templates**: the engine's advertised operation shapes, cloned
//!   into every instantiated node
//! - **Chains**: variable-length repeated subgraphs (adapter stacks,
//!   multi-chunk continuations) spliced in by injector plugins
//!
//! # Example
//!
//! ```
//! use graphsmith::{Assembler, RecipeStore, TemplateCatalog};
//! use std::sync::Arc;
//!
//! let store = RecipeStore::new("recipes");
//! let catalog = Arc::new(TemplateCatalog::new());
//! let assembler = Assembler::new(store, catalog);
//! // assembler.assemble("txt2img", &params) -> engine-ready graph
//! ```

mod api;
pub mod assemble;
pub mod chain;
pub mod graph;
pub mod recipe;
pub mod template;

pub use api::Assembler;
pub use assemble::{coerce, AssembleError, AssembleResult, Assembly, GraphBuilder, IdAllocator, ParamMap};
pub use chain::{
    ChainInjector, ExtensionInjector, ExtensionSpec, InjectOutcome, InjectorRegistry,
    StackInjector, StackItem,
};
pub use graph::{Graph, InputValue, Node, NodeId, NodeMeta};
pub use recipe::{
    Binding, ChainDecl, ChainKind, EndAnchor, NodeDecl, Recipe, RecipeError, RecipeStore,
    StartAnchor,
};
pub use template::{
    CatalogError, NodeTemplate, SlotTemplate, SlotType, TemplateCatalog, TemplateSource,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
