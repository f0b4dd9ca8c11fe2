//! Lifecycle events emitted during traversal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::descriptor::{Edge, InputValues, NodeIdentifier, OutputValues, PortName};

/// One lifecycle transition of a traversal.
///
/// Events are observational only: consumers subscribe externally and a
/// missing or slow consumer never blocks or alters the traversal. The
/// `path` on every variant is the sequence of positional indices that
/// addresses the node (or graph) across arbitrary sub-board nesting.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProbeEvent {
    GraphStart {
        path: Vec<usize>,
        timestamp: DateTime<Utc>,
    },
    GraphEnd {
        path: Vec<usize>,
        timestamp: DateTime<Utc>,
    },
    NodeStart {
        node: NodeIdentifier,
        node_type: String,
        path: Vec<usize>,
        inputs: InputValues,
        timestamp: DateTime<Utc>,
    },
    NodeEnd {
        node: NodeIdentifier,
        node_type: String,
        path: Vec<usize>,
        outputs: OutputValues,
        timestamp: DateTime<Utc>,
    },
    Skip {
        node: NodeIdentifier,
        path: Vec<usize>,
        missing_inputs: Vec<PortName>,
        timestamp: DateTime<Utc>,
    },
    Edge {
        edge: Edge,
        path: Vec<usize>,
        timestamp: DateTime<Utc>,
    },
}

impl ProbeEvent {
    pub fn graph_start(path: Vec<usize>) -> Self {
        Self::GraphStart {
            path,
            timestamp: Utc::now(),
        }
    }

    pub fn graph_end(path: Vec<usize>) -> Self {
        Self::GraphEnd {
            path,
            timestamp: Utc::now(),
        }
    }

    pub fn node_start(
        node: impl Into<String>,
        node_type: impl Into<String>,
        path: Vec<usize>,
        inputs: InputValues,
    ) -> Self {
        Self::NodeStart {
            node: node.into(),
            node_type: node_type.into(),
            path,
            inputs,
            timestamp: Utc::now(),
        }
    }

    pub fn node_end(
        node: impl Into<String>,
        node_type: impl Into<String>,
        path: Vec<usize>,
        outputs: OutputValues,
    ) -> Self {
        Self::NodeEnd {
            node: node.into(),
            node_type: node_type.into(),
            path,
            outputs,
            timestamp: Utc::now(),
        }
    }

    pub fn skip(node: impl Into<String>, path: Vec<usize>, missing_inputs: Vec<PortName>) -> Self {
        Self::Skip {
            node: node.into(),
            path,
            missing_inputs,
            timestamp: Utc::now(),
        }
    }

    pub fn edge(edge: Edge, path: Vec<usize>) -> Self {
        Self::Edge {
            edge,
            path,
            timestamp: Utc::now(),
        }
    }

    /// Stable discriminant for filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GraphStart { .. } => "graphStart",
            Self::GraphEnd { .. } => "graphEnd",
            Self::NodeStart { .. } => "nodeStart",
            Self::NodeEnd { .. } => "nodeEnd",
            Self::Skip { .. } => "skip",
            Self::Edge { .. } => "edge",
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::NodeStart { node, .. } | Self::NodeEnd { node, .. } | Self::Skip { node, .. } => {
                Some(node)
            }
            _ => None,
        }
    }

    pub fn path(&self) -> &[usize] {
        match self {
            Self::GraphStart { path, .. }
            | Self::GraphEnd { path, .. }
            | Self::NodeStart { path, .. }
            | Self::NodeEnd { path, .. }
            | Self::Skip { path, .. }
            | Self::Edge { path, .. } => path,
        }
    }

    /// Normalized JSON shape for log lines and streaming consumers.
    pub fn to_json_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "type": self.kind() }))
    }
}

impl fmt::Display for ProbeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GraphStart { path, .. } => write!(f, "graph start {path:?}"),
            Self::GraphEnd { path, .. } => write!(f, "graph end {path:?}"),
            Self::NodeStart { node, path, .. } => write!(f, "[{node}@{path:?}] start"),
            Self::NodeEnd { node, path, .. } => write!(f, "[{node}@{path:?}] end"),
            Self::Skip {
                node,
                missing_inputs,
                ..
            } => write!(f, "[{node}] skipped, missing {missing_inputs:?}"),
            Self::Edge { edge, .. } => {
                write!(f, "edge {} -> {}:{}", edge.from, edge.to, edge.r#in)
            }
        }
    }
}
