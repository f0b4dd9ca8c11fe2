//! Per-node input accumulation: queued values and constants.
//!
//! [`QueuedNodeValues`] owns, for every node, a FIFO queue of delivered
//! values per input port plus a separate constants map whose entries stay
//! available across firings. This is the only state edges ever mutate;
//! handlers never see shared mutable state.
//!
//! Invariants:
//! - a queued value was produced by exactly one completed upstream firing;
//! - constants never participate in FIFO ordering and are never dequeued;
//! - a single [`use_inputs`](QueuedNodeValues::use_inputs) call removes at
//!   most one value per port.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::descriptor::{Edge, InputValues, NodeIdentifier, OutputValues, PortName};

type PortQueues = FxHashMap<PortName, VecDeque<Value>>;
type PortConstants = FxHashMap<PortName, Value>;

/// Wiring state for one traversal instance.
#[derive(Clone, Debug, Default)]
pub struct QueuedNodeValues {
    pub(crate) queues: FxHashMap<NodeIdentifier, PortQueues>,
    pub(crate) constants: FxHashMap<NodeIdentifier, PortConstants>,
}

impl QueuedNodeValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `outputs` along `edges`.
    ///
    /// For every edge whose source port matches an output entry, the value
    /// is appended to the target port's queue, or overwrites the target's
    /// constant when the edge is marked constant. Edges whose source port
    /// is absent from `outputs` are dropped silently: a node may produce a
    /// subset of its declared outputs. Only target-node state is mutated.
    pub fn wire_outputs(&mut self, edges: &[Edge], outputs: &OutputValues) {
        for edge in edges {
            let Some(value) = outputs.get(edge.source_port()) else {
                continue;
            };
            if edge.constant {
                self.constants
                    .entry(edge.to.clone())
                    .or_default()
                    .insert(edge.r#in.clone(), value.clone());
            } else {
                self.queues
                    .entry(edge.to.clone())
                    .or_default()
                    .entry(edge.r#in.clone())
                    .or_default()
                    .push_back(value.clone());
            }
        }
    }

    /// Merge constants with FIFO heads for a node.
    ///
    /// A constant is visible every time; a queued value is visible once and
    /// removed by [`use_inputs`](Self::use_inputs). When both exist for the
    /// same port the queued value wins: freshness over defaults.
    pub fn available_inputs(&self, node: &str) -> InputValues {
        let mut inputs = InputValues::new();
        if let Some(constants) = self.constants.get(node) {
            for (port, value) in constants {
                inputs.insert(port.clone(), value.clone());
            }
        }
        if let Some(queues) = self.queues.get(node) {
            for (port, queue) in queues {
                if let Some(head) = queue.front() {
                    inputs.insert(port.clone(), head.clone());
                }
            }
        }
        inputs
    }

    /// Consume the queued values that backed a firing.
    ///
    /// Dequeues one value from each named port's FIFO; ports satisfied only
    /// by a constant (or by node configuration) have an empty queue and are
    /// untouched, so constants re-deliver idempotently.
    pub fn use_inputs(&mut self, node: &str, inputs: &InputValues) {
        let Some(queues) = self.queues.get_mut(node) else {
            return;
        };
        for port in inputs.keys() {
            if let Some(queue) = queues.get_mut(port) {
                queue.pop_front();
            }
        }
        queues.retain(|_, queue| !queue.is_empty());
        if queues.is_empty() {
            self.queues.remove(node);
        }
    }

    /// Required ports with neither a queued value nor a constant.
    pub fn missing_inputs<'a, I>(&self, node: &str, required: I) -> Vec<PortName>
    where
        I: IntoIterator<Item = &'a PortName>,
    {
        let available = self.available_inputs(node);
        required
            .into_iter()
            .filter(|port| !available.contains_key(*port))
            .cloned()
            .collect()
    }

    /// Number of values currently queued for a port. Test and diagnostic aid.
    pub fn queued_len(&self, node: &str, port: &str) -> usize {
        self.queues
            .get(node)
            .and_then(|queues| queues.get(port))
            .map_or(0, VecDeque::len)
    }

    pub fn constant(&self, node: &str, port: &str) -> Option<&Value> {
        self.constants.get(node).and_then(|ports| ports.get(port))
    }
}
