//! The synchronous core of the firing loop.
//!
//! [`TraversalMachine`] owns the graph model, the wiring state, and the
//! opportunity list. It decides which node fires next and how outputs
//! propagate; it performs no I/O and invokes no handlers. The board runner
//! layers dispatch, bubbling, and sub-boards on top. Keeping this core
//! synchronous is what makes a run checkpointable between any two steps.

use std::collections::VecDeque;

use tracing::debug;

use super::result::TraversalResult;
use crate::descriptor::{Edge, InputValues, OutputValues};
use crate::graph::GraphModel;
use crate::wiring::QueuedNodeValues;

/// Synthetic source node id for the opportunities that seed a run.
pub const ENTRY_SOURCE: &str = "$entry";

/// Resumable traversal core: readiness, selection, and propagation.
#[derive(Clone, Debug)]
pub struct TraversalMachine {
    model: GraphModel,
    wiring: QueuedNodeValues,
    opportunities: VecDeque<Edge>,
}

impl TraversalMachine {
    /// Start a fresh traversal, seeding one opportunity per entry node.
    pub fn new(model: GraphModel) -> Self {
        let opportunities = model
            .entry_nodes()
            .into_iter()
            .map(|node| Edge {
                from: ENTRY_SOURCE.to_string(),
                out: None,
                to: node.id.clone(),
                r#in: String::new(),
                constant: false,
                side: false,
            })
            .collect();
        Self {
            model,
            wiring: QueuedNodeValues::new(),
            opportunities,
        }
    }

    /// Reassemble a machine from checkpointed parts.
    pub fn from_parts(
        model: GraphModel,
        wiring: QueuedNodeValues,
        opportunities: Vec<Edge>,
    ) -> Self {
        Self {
            model,
            wiring,
            opportunities: opportunities.into(),
        }
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn wiring(&self) -> &QueuedNodeValues {
        &self.wiring
    }

    /// Outstanding opportunities in selection order.
    pub fn opportunities(&self) -> impl Iterator<Item = &Edge> {
        self.opportunities.iter()
    }

    pub fn is_done(&self) -> bool {
        self.opportunities.is_empty()
    }

    /// Select the next opportunity and resolve the target's inputs.
    ///
    /// Opportunities are consumed in insertion order: edges sourced earlier
    /// in the document propagate first, giving a deterministic,
    /// left-to-right, breadth-first-per-step traversal rather than a pure
    /// topological order. Returns `None` when no opportunity remains.
    pub fn next_candidate(&mut self) -> Option<TraversalResult> {
        let current = self.opportunities.pop_front()?;
        let descriptor = self
            .model
            .node(&current.to)
            .expect("validated model has no dangling opportunity targets")
            .clone();

        let mut inputs: InputValues = descriptor.configuration.clone();
        for (port, value) in self.wiring.available_inputs(&descriptor.id) {
            inputs.insert(port, value);
        }
        let missing_inputs: Vec<_> = self
            .model
            .required_ports(&descriptor.id)
            .into_iter()
            .filter(|port| !inputs.contains_key(port))
            .collect();
        let skip = !missing_inputs.is_empty();
        debug!(
            node = %descriptor.id,
            edge_from = %current.from,
            missing = missing_inputs.len(),
            skip,
            "selected traversal candidate"
        );

        Some(TraversalResult {
            descriptor,
            inputs,
            missing_inputs,
            current,
            new_opportunities: Vec::new(),
            skip,
        })
    }

    /// Commit a completed firing: consume the queued inputs that backed it,
    /// deliver `outputs` along the node's outgoing edges, and append the
    /// newly satisfiable edges to the opportunity list.
    ///
    /// Outgoing edges are walked in declaration order, and opportunities
    /// are appended in producer completion order, the explicit tie-break
    /// for ports fed by multiple producers within one step. Must not be
    /// called for a skipped result.
    pub fn commit(&mut self, mut result: TraversalResult, outputs: &OutputValues) -> TraversalResult {
        debug_assert!(!result.skip, "skipped firings are never committed");
        self.wiring.use_inputs(&result.descriptor.id, &result.inputs);

        let edges: Vec<Edge> = self
            .model
            .edges_from(&result.descriptor.id)
            .cloned()
            .collect();
        self.wiring.wire_outputs(&edges, outputs);

        result.new_opportunities = edges
            .into_iter()
            .filter(|edge| outputs.contains_key(edge.source_port()))
            .collect();
        for edge in &result.new_opportunities {
            self.opportunities.push_back(edge.clone());
        }
        debug!(
            node = %result.descriptor.id,
            outputs = outputs.len(),
            opportunities = result.new_opportunities.len(),
            "committed firing"
        );
        result
    }
}
