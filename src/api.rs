//! Assembler facade — the single entry point for graph assembly
//!
//! Callers (UI layer, job submission, CLI) construct one `Assembler`
//! and call [`Assembler::assemble`] per request. Apart from the recipe
//! cache inside the store, the assembler holds no mutable state: every
//! call builds a fresh graph and discards its symbolic layer on return.

use crate::assemble::{chain_items_present, AssembleError, GraphBuilder, ParamMap};
use crate::chain::{InjectOutcome, InjectorRegistry};
use crate::graph::Graph;
use crate::recipe::RecipeStore;
use crate::template::TemplateSource;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns a recipe name plus runtime parameters into a finished job graph
pub struct Assembler {
    store: RecipeStore,
    templates: Arc<dyn TemplateSource>,
    injectors: InjectorRegistry,
}

impl Assembler {
    /// Create an assembler with the built-in chain injectors
    pub fn new(store: RecipeStore, templates: Arc<dyn TemplateSource>) -> Self {
        Self {
            store,
            templates,
            injectors: InjectorRegistry::with_builtins(),
        }
    }

    /// Replace the injector registry (e.g. to add a custom chain kind's
    /// implementation behind an existing kind tag)
    pub fn with_injectors(mut self, injectors: InjectorRegistry) -> Self {
        self.injectors = injectors;
        self
    }

    /// The underlying recipe store
    pub fn store(&self) -> &RecipeStore {
        &self.store
    }

    /// Assemble the named recipe against a parameter map.
    ///
    /// Fatal errors abort with no partial graph. Chains whose parameter
    /// key is absent or empty, or whose anchors are not in this recipe,
    /// are skipped without affecting the rest of the graph.
    pub fn assemble(&self, recipe_name: &str, params: &ParamMap) -> Result<Graph, AssembleError> {
        let recipe = self.store.load(recipe_name)?;

        let mut asm = GraphBuilder::new(self.templates.as_ref()).build(&recipe, params)?;
        let static_count = asm.graph.node_count();

        for decl in &recipe.chains {
            let items = match params.get(&decl.param) {
                Some(items) if chain_items_present(items) => items,
                _ => continue,
            };
            let injector = match self.injectors.get(decl.kind) {
                Some(injector) => injector,
                None => {
                    warn!(
                        chain = %decl.kind,
                        param = %decl.param,
                        "no injector registered for chain kind; skipping chain"
                    );
                    continue;
                }
            };
            match injector.inject(&mut asm, decl, items)? {
                InjectOutcome::Spliced { units } => {
                    debug!(chain = %decl.kind, param = %decl.param, units, "chain spliced");
                }
                InjectOutcome::Skipped => {}
            }
        }

        let graph = asm.into_graph();
        debug!(
            recipe = recipe_name,
            static_nodes = static_count,
            total_nodes = graph.node_count(),
            "assembled graph"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{NodeTemplate, SlotType, TemplateCatalog};
    use serde_json::json;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, Assembler) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("stacked.yaml"),
            r#"
nodes:
  model:
    op: ModelLoader
  sampler:
    op: Sampler
    inputs:
      model: {from: model}
      seed: ${seed}
chains:
  - kind: stack
    param: adapters
    start: {node: model}
    end: {node: sampler, input: model}
"#,
        )
        .unwrap();

        let catalog = TemplateCatalog::new()
            .with_template("ModelLoader", NodeTemplate::with_outputs(1))
            .with_template(
                "Sampler",
                NodeTemplate::with_outputs(1)
                    .with_input("model", SlotType::Any, None)
                    .with_input("seed", SlotType::Int, Some(json!(0))),
            )
            .with_template(
                "AdapterLoader",
                NodeTemplate::with_outputs(1).with_input("source", SlotType::String, None),
            )
            .with_template(
                "AdapterScale",
                NodeTemplate::with_outputs(1)
                    .with_input("adapter", SlotType::Any, None)
                    .with_input("weight", SlotType::Float, Some(json!(1.0))),
            )
            .with_template(
                "AdapterApply",
                NodeTemplate::with_outputs(1)
                    .with_input("adapter", SlotType::Any, None)
                    .with_input("stream", SlotType::Any, None),
            );

        let assembler = Assembler::new(RecipeStore::new(dir.path()), Arc::new(catalog));
        (dir, assembler)
    }

    fn params(doc: serde_json::Value) -> ParamMap {
        serde_json::from_value(doc).unwrap()
    }

    #[test]
    fn test_assemble_without_chain_params() {
        let (_dir, assembler) = fixture();
        let graph = assembler.assemble("stacked", &params(json!({"seed": 3}))).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(graph.dangling_links().is_empty());
    }

    #[test]
    fn test_assemble_with_stack_items() {
        let (_dir, assembler) = fixture();
        let graph = assembler
            .assemble(
                "stacked",
                &params(json!({
                    "seed": 3,
                    "adapters": [{"source": "a.bin"}, {"source": "b.bin"}],
                })),
            )
            .unwrap();
        assert_eq!(graph.node_count(), 2 + 2 * 3);
        assert!(graph.dangling_links().is_empty());
    }

    #[test]
    fn test_empty_chain_items_match_baseline_topology() {
        let (_dir, assembler) = fixture();
        let baseline = assembler.assemble("stacked", &params(json!({"seed": 3}))).unwrap();
        let empty = assembler
            .assemble("stacked", &params(json!({"seed": 3, "adapters": []})))
            .unwrap();
        assert_eq!(baseline.to_value(), empty.to_value());
    }

    #[test]
    fn test_unregistered_kind_degrades_to_skip() {
        let (_dir, assembler) = fixture();
        let assembler = assembler.with_injectors(InjectorRegistry::new());
        let graph = assembler
            .assemble(
                "stacked",
                &params(json!({"seed": 3, "adapters": [{"source": "a.bin"}]})),
            )
            .unwrap();
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_fatal_error_returns_no_graph() {
        let (_dir, assembler) = fixture();
        assert!(matches!(
            assembler.assemble("stacked", &params(json!({"seed": "NaN"}))),
            Err(AssembleError::InvalidParameter { .. })
        ));
    }
}
