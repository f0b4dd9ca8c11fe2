//! Graph document model for the wireboard engine.
//!
//! A board is a declarative graph document: an ordered set of typed nodes,
//! the edges that carry values between their ports, optional named
//! sub-graphs, and optional source-code modules consumed by `runModule`
//! nodes. Descriptors are plain serde data; once a traversal starts they
//! are never mutated.
//!
//! All descriptor maps use [`BTreeMap`] so serialized documents and
//! run-state tokens are byte-for-byte deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique identifier of a node within its owning graph.
pub type NodeIdentifier = String;

/// Identifier of a node type, resolved against the kit registry.
pub type NodeTypeIdentifier = String;

/// Name of an input or output port.
pub type PortName = String;

/// Values gathered for a node invocation, keyed by input port.
pub type InputValues = BTreeMap<PortName, Value>;

/// Values produced by a node invocation, keyed by output port.
pub type OutputValues = BTreeMap<PortName, Value>;

/// A complete board document: nodes, edges, sub-graphs, and modules.
///
/// Node order and edge order are significant: declaration order is the
/// stable tie-break for propagation, so two loads of the same document
/// always traverse identically.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub nodes: Vec<NodeDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<Edge>,
    /// Named sub-graphs, invocable via a `#name` board reference.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub graphs: BTreeMap<String, GraphDescriptor>,
    /// Named source-code units consumed by `runModule` nodes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modules: BTreeMap<String, Module>,
}

impl GraphDescriptor {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_node(mut self, node: NodeDescriptor) -> Self {
        self.nodes.push(node);
        self
    }

    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    #[must_use]
    pub fn with_subgraph(mut self, name: impl Into<String>, graph: GraphDescriptor) -> Self {
        self.graphs.insert(name.into(), graph);
        self
    }

    #[must_use]
    pub fn with_module(mut self, name: impl Into<String>, module: Module) -> Self {
        self.modules.insert(name.into(), module);
        self
    }
}

/// A single typed unit of work within a board.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Unique within the owning graph.
    pub id: NodeIdentifier,
    /// Resolved against the kit registry before any node runs.
    #[serde(rename = "type")]
    pub node_type: NodeTypeIdentifier,
    /// Literal values available to the node in addition to wired inputs.
    /// Wired values take precedence over configuration for the same port.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configuration: BTreeMap<PortName, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodeMetadata>,
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_config(mut self, port: impl Into<String>, value: Value) -> Self {
        self.configuration.insert(port.into(), value);
        self
    }
}

/// Presentation hints carried alongside a node; never read by the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Editor positioning and similar visual hints, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<Value>,
}

/// A directed, port-addressed connection between two nodes.
///
/// Edges are the only mutation channel between nodes. An omitted `out`
/// port is shorthand for an output port named like `in`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeIdentifier,
    /// Source port; defaults to the name of `in` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<PortName>,
    pub to: NodeIdentifier,
    pub r#in: PortName,
    /// A constant edge keeps re-delivering its last value across firings
    /// instead of being consumed once.
    #[serde(default, skip_serializing_if = "is_false")]
    pub constant: bool,
    /// Side wiring delivers values but does not gate the target's readiness.
    #[serde(default, skip_serializing_if = "is_false")]
    pub side: bool,
}

fn is_false(flag: &bool) -> bool {
    !flag
}

impl Edge {
    /// Wire `from.out` to `to.in`.
    pub fn wire(
        from: impl Into<String>,
        out: impl Into<String>,
        to: impl Into<String>,
        r#in: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            out: Some(out.into()),
            to: to.into(),
            r#in: r#in.into(),
            constant: false,
            side: false,
        }
    }

    #[must_use]
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    #[must_use]
    pub fn side(mut self) -> Self {
        self.side = true;
        self
    }

    /// The output port this edge listens on.
    pub fn source_port(&self) -> &PortName {
        self.out.as_ref().unwrap_or(&self.r#in)
    }
}

/// A named source-code unit executed inside the sandbox boundary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Module {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            language: None,
            code: code.into(),
            metadata: None,
        }
    }
}
