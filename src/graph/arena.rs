//! Graph arena — the assembled job graph under construction
//!
//! Nodes live in a vector and are addressed through a stable-id index,
//! so injectors can mutate wiring without invalidating existing ids.
//! Serialization reproduces the engine's id-keyed mapping shape.

use super::node::{InputValue, Node, NodeId};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// The fully resolved, executable job graph handed to the execution engine.
///
/// Ids are issued by the assembly's allocator; `insert` never renumbers.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under the given id.
    ///
    /// Ids come from a single allocator per assembly, so a collision here
    /// is a programming error.
    pub fn insert(&mut self, id: NodeId, node: Node) {
        debug_assert!(
            !self.index.contains_key(&id),
            "node id {} inserted twice",
            id
        );
        self.index.insert(id, self.nodes.len());
        self.nodes.push(node);
    }

    /// Get a node by id
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    /// Get a mutable reference to a node
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.index.get(&id).map(|&pos| &mut self.nodes[pos])
    }

    /// Check whether a node id exists in this graph
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Rewire one input slot on an existing node.
    ///
    /// Returns false if the node id is not present.
    pub fn set_input(
        &mut self,
        id: NodeId,
        slot: impl Into<String>,
        value: impl Into<InputValue>,
    ) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.set_input(slot, value);
                true
            }
            None => false,
        }
    }

    /// Number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over (id, node) pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        let mut ids: Vec<(NodeId, usize)> = self.index.iter().map(|(id, &pos)| (*id, pos)).collect();
        ids.sort_by_key(|(id, _)| *id);
        ids.into_iter().map(move |(id, pos)| (id, &self.nodes[pos]))
    }

    /// All node ids, in id order
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.index.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Link inputs that reference a node id not present in this graph.
    ///
    /// A finished assembly must report none; the builder fails fast on
    /// unresolvable references, so this is a consistency check for tests
    /// and for injector development.
    pub fn dangling_links(&self) -> Vec<(NodeId, String, NodeId)> {
        let mut dangling = Vec::new();
        for (id, node) in self.iter() {
            for (slot, value) in &node.inputs {
                if let Some((target, _)) = value.as_link() {
                    if !self.contains(target) {
                        dangling.push((id, slot.clone(), target));
                    }
                }
            }
        }
        dangling
    }

    /// Serialize to a `serde_json::Value` in the engine's wire shape
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("graph serialization is infallible")
    }
}

// The wire shape: `{"<id>": {"class_type": ..., "inputs": ...}, ...}`,
// keys in ascending id order.
impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for (id, node) in self.iter() {
            map.serialize_entry(&id, node)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: u64) -> NodeId {
        NodeId::from_raw(raw)
    }

    #[test]
    fn test_insert_and_get() {
        let mut graph = Graph::new();
        graph.insert(id(1), Node::new("ImageLoader"));
        graph.insert(id(2), Node::new("ImageSave"));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.get(id(1)).unwrap().op, "ImageLoader");
        assert!(graph.get(id(3)).is_none());
    }

    #[test]
    fn test_set_input_rewires_existing_node() {
        let mut graph = Graph::new();
        graph.insert(id(1), Node::new("ImageLoader"));
        graph.insert(id(2), Node::new("ImageSave").with_input("image", InputValue::Link(id(1), 0)));

        assert!(graph.set_input(id(2), "image", InputValue::Link(id(1), 1)));
        assert_eq!(
            graph.get(id(2)).unwrap().input("image").unwrap().as_link(),
            Some((id(1), 1))
        );

        assert!(!graph.set_input(id(9), "image", json!(0)));
    }

    #[test]
    fn test_dangling_links_detected() {
        let mut graph = Graph::new();
        graph.insert(id(1), Node::new("ImageSave").with_input("image", InputValue::Link(id(5), 0)));

        let dangling = graph.dangling_links();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0], (id(1), "image".to_string(), id(5)));
    }

    #[test]
    fn test_serializes_as_id_keyed_map() {
        let mut graph = Graph::new();
        graph.insert(id(2), Node::new("ImageSave").with_input("image", InputValue::Link(id(1), 0)));
        graph.insert(id(1), Node::new("ImageLoader").with_input("path", json!("in.png")));

        assert_eq!(
            graph.to_value(),
            json!({
                "1": {"class_type": "ImageLoader", "inputs": {"path": "in.png"}},
                "2": {"class_type": "ImageSave", "inputs": {"image": ["1", 0]}},
            })
        );
    }

    #[test]
    fn test_iteration_in_id_order() {
        let mut graph = Graph::new();
        graph.insert(id(3), Node::new("C"));
        graph.insert(id(1), Node::new("A"));
        graph.insert(id(2), Node::new("B"));

        let ops: Vec<&str> = graph.iter().map(|(_, n)| n.op.as_str()).collect();
        assert_eq!(ops, vec!["A", "B", "C"]);
    }
}
