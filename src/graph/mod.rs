//! Validated, immutable view over a graph document.
//!
//! [`GraphModel`] checks a [`GraphDescriptor`] once, up front, and then
//! answers the structural queries the traversal machine needs: node lookup,
//! incident edges in declaration order, entry nodes, required ports, and
//! named sub-graphs. Integrity problems are raised here, before any node
//! runs; a running traversal never sees a malformed document.

use std::collections::BTreeSet;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::descriptor::{Edge, GraphDescriptor, NodeDescriptor, NodeIdentifier, PortName};
use crate::kits::KitRegistry;

/// Structural defects in a board document. Fatal, raised before any node runs.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphIntegrityError {
    #[error("edge references unknown node: {node}")]
    #[diagnostic(
        code(wireboard::graph::dangling_edge),
        help("Every edge endpoint must name a node declared in the same graph.")
    )]
    DanglingEdge { node: NodeIdentifier },

    #[error("duplicate node id: {id}")]
    #[diagnostic(code(wireboard::graph::duplicate_node))]
    DuplicateNode { id: NodeIdentifier },

    #[error("no handler registered for type `{node_type}` (node {id})")]
    #[diagnostic(
        code(wireboard::graph::unresolvable_type),
        help("Install a kit providing this node type before constructing the model.")
    )]
    UnresolvableType {
        id: NodeIdentifier,
        node_type: String,
    },

    #[error("unknown sub-graph: {id}")]
    #[diagnostic(code(wireboard::graph::unknown_subgraph))]
    UnknownSubgraph { id: String },

    #[error("board invocation re-enters an active board: {reference}")]
    #[diagnostic(
        code(wireboard::graph::recursive_invocation),
        help("A board must not invoke itself, directly or through a chain of sub-boards.")
    )]
    RecursiveInvocation { reference: String },
}

/// Validated graph view shared by the traversal machine and runner.
///
/// Cheap to clone: the descriptor is `Arc`-shared and the index is small.
#[derive(Clone, Debug)]
pub struct GraphModel {
    descriptor: Arc<GraphDescriptor>,
    index: FxHashMap<NodeIdentifier, usize>,
}

impl GraphModel {
    /// Validate a descriptor against a registry.
    ///
    /// Checks node id uniqueness, edge endpoints, and that every node type
    /// (including those of nested sub-graphs) resolves to a handler.
    /// Unknown *ports* are deliberately not an error: delivery to a port a
    /// handler does not declare is treated as a silent extra value, which
    /// tolerates schema evolution between documents and kits.
    pub fn new(
        descriptor: Arc<GraphDescriptor>,
        registry: &KitRegistry,
    ) -> Result<Self, GraphIntegrityError> {
        Self::check(&descriptor, registry)?;
        let index = descriptor
            .nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id.clone(), position))
            .collect();
        Ok(Self { descriptor, index })
    }

    fn check(
        descriptor: &GraphDescriptor,
        registry: &KitRegistry,
    ) -> Result<(), GraphIntegrityError> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for node in &descriptor.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphIntegrityError::DuplicateNode {
                    id: node.id.clone(),
                });
            }
            if !registry.contains(&node.node_type) {
                return Err(GraphIntegrityError::UnresolvableType {
                    id: node.id.clone(),
                    node_type: node.node_type.clone(),
                });
            }
        }
        for edge in &descriptor.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(GraphIntegrityError::DanglingEdge {
                        node: endpoint.clone(),
                    });
                }
            }
        }
        for nested in descriptor.graphs.values() {
            Self::check(nested, registry)?;
        }
        Ok(())
    }

    pub fn descriptor(&self) -> &GraphDescriptor {
        &self.descriptor
    }

    pub fn node(&self, id: &str) -> Option<&NodeDescriptor> {
        self.index.get(id).map(|&position| &self.descriptor.nodes[position])
    }

    /// Declaration-order position of a node, used to build invocation paths.
    pub fn node_position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Outgoing edges in declaration order (the propagation tie-break).
    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.descriptor.edges.iter().filter(move |edge| edge.from == id)
    }

    /// Incoming edges in declaration order.
    pub fn edges_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.descriptor.edges.iter().filter(move |edge| edge.to == id)
    }

    pub fn subgraph(&self, id: &str) -> Result<&GraphDescriptor, GraphIntegrityError> {
        self.descriptor
            .graphs
            .get(id)
            .ok_or_else(|| GraphIntegrityError::UnknownSubgraph { id: id.to_string() })
    }

    /// Nodes with no incoming readiness-gating edge; these seed the traversal.
    pub fn entry_nodes(&self) -> Vec<&NodeDescriptor> {
        self.descriptor
            .nodes
            .iter()
            .filter(|node| !self.descriptor.edges.iter().any(|e| !e.side && e.to == node.id))
            .collect()
    }

    /// Input ports that gate a node's readiness: the in-ports of its
    /// incoming non-side edges. Side wiring delivers values without
    /// participating here.
    pub fn required_ports(&self, id: &str) -> BTreeSet<PortName> {
        self.edges_to(id)
            .filter(|edge| !edge.side)
            .map(|edge| edge.r#in.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::NodeDescriptor;
    use crate::kits::{FnHandler, Kit, KitRegistry};

    fn registry() -> KitRegistry {
        let kit = Kit::new("test").with_handler(
            "noop",
            FnHandler::new(|inputs, _ctx| async move { Ok(inputs) }),
        );
        KitRegistry::from_kits(vec![kit])
    }

    fn board() -> GraphDescriptor {
        GraphDescriptor::new("fixture")
            .with_node(NodeDescriptor::new("a", "noop"))
            .with_node(NodeDescriptor::new("b", "noop"))
            .with_edge(Edge::wire("a", "out", "b", "in"))
    }

    #[test]
    fn validates_a_well_formed_board() {
        let model = GraphModel::new(Arc::new(board()), &registry()).unwrap();
        assert_eq!(model.entry_nodes().len(), 1);
        assert_eq!(model.entry_nodes()[0].id, "a");
        assert_eq!(model.edges_from("a").count(), 1);
        assert_eq!(model.edges_to("b").count(), 1);
        assert!(model.required_ports("b").contains("in"));
    }

    #[test]
    fn rejects_dangling_edges() {
        let bad = board().with_edge(Edge::wire("a", "out", "ghost", "in"));
        let err = GraphModel::new(Arc::new(bad), &registry()).unwrap_err();
        assert!(matches!(err, GraphIntegrityError::DanglingEdge { node } if node == "ghost"));
    }

    #[test]
    fn rejects_duplicate_node_ids() {
        let bad = board().with_node(NodeDescriptor::new("a", "noop"));
        let err = GraphModel::new(Arc::new(bad), &registry()).unwrap_err();
        assert!(matches!(err, GraphIntegrityError::DuplicateNode { id } if id == "a"));
    }

    #[test]
    fn rejects_unresolvable_types() {
        let bad = board().with_node(NodeDescriptor::new("c", "nonsense"));
        let err = GraphModel::new(Arc::new(bad), &registry()).unwrap_err();
        assert!(
            matches!(err, GraphIntegrityError::UnresolvableType { node_type, .. } if node_type == "nonsense")
        );
    }

    #[test]
    fn side_edges_do_not_gate_readiness() {
        let doc = board()
            .with_node(NodeDescriptor::new("c", "noop"))
            .with_edge(Edge::wire("a", "out", "c", "hint").side());
        let model = GraphModel::new(Arc::new(doc), &registry()).unwrap();
        assert!(model.required_ports("c").is_empty());
        // c has only a side incoming edge, so it still counts as an entry.
        assert!(model.entry_nodes().iter().any(|n| n.id == "c"));
    }
}
