//! Graph builder — instantiates a recipe's static portion
//!
//! Two-phase construction: every declared node is instantiated from its
//! template and registered in the node map first, then deferred link
//! bindings are resolved once all symbolic names are known. The result
//! is a valid, fully-wired graph even if zero chains are injected —
//! chains are strictly additive.

use super::ids::IdAllocator;
use super::params::{coerce, ParamMap};
use super::AssembleError;
use crate::graph::{Graph, InputValue, Node, NodeId};
use crate::recipe::{Binding, Recipe};
use crate::template::{SlotType, TemplateSource};
use serde_json::Value;
use std::collections::HashMap;

/// In-progress assembly state shared by the builder and chain injectors.
///
/// Holds the graph, the symbolic-name map, and the single id allocator
/// every component must draw from. Created fresh per build call and
/// discarded once the graph is extracted — the assembler is stateless
/// across calls.
pub struct Assembly<'a> {
    /// The graph under construction
    pub graph: Graph,
    /// Symbolic name → allocated id, assembly-local
    pub node_map: HashMap<String, NodeId>,
    /// The one id counter for this graph
    pub ids: IdAllocator,
    templates: &'a dyn TemplateSource,
}

impl<'a> Assembly<'a> {
    fn new(templates: &'a dyn TemplateSource) -> Self {
        Self {
            graph: Graph::new(),
            node_map: HashMap::new(),
            ids: IdAllocator::new(),
            templates,
        }
    }

    /// Resolve a symbolic name to its allocated id
    pub fn resolve(&self, symbolic: &str) -> Option<NodeId> {
        self.node_map.get(symbolic).copied()
    }

    /// Instantiate a fresh node from its template: clone the default
    /// input shape, allocate an id, insert into the graph.
    ///
    /// This is the injector-facing primitive; slots beyond the defaults
    /// are wired by the caller afterwards.
    pub fn instantiate(&mut self, op: &str) -> Result<NodeId, AssembleError> {
        let template = self
            .templates
            .template(op)
            .ok_or_else(|| AssembleError::UnknownOperation(op.to_string()))?;

        let mut node = Node::new(op);
        for (slot, slot_template) in &template.inputs {
            if let Some(default) = &slot_template.default {
                node.set_input(slot.clone(), default.clone());
            }
        }

        let id = self.ids.next_id();
        self.graph.insert(id, node);
        Ok(id)
    }

    /// Output count advertised for an operation type
    pub fn outputs_of(&self, op: &str) -> Option<u32> {
        self.templates.template(op).map(|t| t.outputs)
    }

    /// Finish the assembly, discarding the symbolic layer
    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

/// A link binding waiting for the node map to be complete
struct DeferredLink {
    node: String,
    slot: String,
    target: String,
    output: u32,
}

/// Builds the static portion of a recipe into an [`Assembly`]
pub struct GraphBuilder<'a> {
    templates: &'a dyn TemplateSource,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(templates: &'a dyn TemplateSource) -> Self {
        Self { templates }
    }

    /// Instantiate every static node declaration, substitute parameters,
    /// and perform static wiring.
    ///
    /// Deterministic: two calls with identical inputs produce identical
    /// graphs (ids included — the allocator walks declaration order).
    pub fn build(
        &self,
        recipe: &Recipe,
        params: &ParamMap,
    ) -> Result<Assembly<'a>, AssembleError> {
        let mut asm = Assembly::new(self.templates);
        let mut deferred: Vec<DeferredLink> = Vec::new();

        for (name, decl) in &recipe.nodes {
            let template = self
                .templates
                .template(&decl.op)
                .ok_or_else(|| AssembleError::UnknownOperation(decl.op.clone()))?;

            let mut node = Node::new(&decl.op);
            node.meta.title = Some(decl.title.clone().unwrap_or_else(|| name.clone()));

            for (slot, slot_template) in &template.inputs {
                if let Some(default) = &slot_template.default {
                    node.set_input(slot.clone(), default.clone());
                }
            }

            for (slot, binding) in &decl.inputs {
                match binding {
                    Binding::Literal(value) => {
                        node.set_input(slot.clone(), value.clone());
                    }
                    Binding::ParamRef(param) => {
                        let ty = template
                            .inputs
                            .get(slot)
                            .map(|s| s.ty)
                            .unwrap_or(SlotType::Any);
                        match params.get(param).filter(|v| !v.is_null()) {
                            Some(value) => {
                                let coerced = coerce(value, ty).ok_or_else(|| {
                                    AssembleError::InvalidParameter {
                                        node: name.clone(),
                                        slot: slot.clone(),
                                        param: param.clone(),
                                        expected: ty,
                                    }
                                })?;
                                node.set_input(slot.clone(), coerced);
                            }
                            // Absent param falls back to the template
                            // default already in place; no default is
                            // fatal.
                            None if node.input(slot).is_some() => {}
                            None => {
                                return Err(AssembleError::MissingParameter {
                                    node: name.clone(),
                                    slot: slot.clone(),
                                    param: param.clone(),
                                });
                            }
                        }
                    }
                    Binding::StaticLink { node: target, output } => {
                        deferred.push(DeferredLink {
                            node: name.clone(),
                            slot: slot.clone(),
                            target: target.clone(),
                            output: *output,
                        });
                    }
                }
            }

            let id = asm.ids.next_id();
            asm.graph.insert(id, node);
            asm.node_map.insert(name.clone(), id);
        }

        for link in deferred {
            self.resolve_link(&mut asm, link)?;
        }

        Ok(asm)
    }

    /// Resolve one deferred link now that every symbolic name is known.
    ///
    /// Unresolvable references are fatal here — static wiring has no
    /// soft-skip policy, unlike chains.
    fn resolve_link(&self, asm: &mut Assembly, link: DeferredLink) -> Result<(), AssembleError> {
        let target_id =
            asm.resolve(&link.target)
                .ok_or_else(|| AssembleError::DanglingReference {
                    node: link.node.clone(),
                    slot: link.slot.clone(),
                    target: link.target.clone(),
                })?;

        let target_op = asm
            .graph
            .get(target_id)
            .expect("node map entries always point at graph nodes")
            .op
            .clone();
        let available = asm.outputs_of(&target_op).unwrap_or(1);
        if link.output >= available {
            return Err(AssembleError::OutputOutOfRange {
                node: link.node,
                slot: link.slot,
                target: link.target,
                output: link.output,
                available,
            });
        }

        let node_id = asm
            .resolve(&link.node)
            .expect("deferred links originate from registered nodes");
        asm.graph
            .set_input(node_id, link.slot, InputValue::Link(target_id, link.output));
        Ok(())
    }
}

/// True when a parameter value counts as "present and non-empty" for
/// chain dispatch: null and empty lists do not.
pub(crate) fn chain_items_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
