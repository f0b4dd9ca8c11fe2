//! The unit of traversal progress.

use crate::descriptor::{Edge, InputValues, NodeDescriptor, PortName};

/// One step of traversal: the node about to run (or just run), its resolved
/// inputs, the ports still missing, the edge that triggered the step, and,
/// once committed, the propagation opportunities the firing created.
///
/// Created fresh each step and immutable once returned; the caller consumes
/// it to decide whether to continue, pause for bubbled input, or terminate.
/// The backing wiring snapshot is reachable through the machine that
/// produced the result.
#[derive(Clone, Debug)]
pub struct TraversalResult {
    /// The node selected by this step.
    pub descriptor: NodeDescriptor,
    /// Configuration merged under wired values (wired wins per port).
    pub inputs: InputValues,
    /// Required ports with no value; non-empty forces `skip`.
    pub missing_inputs: Vec<PortName>,
    /// The opportunity edge that triggered this step.
    pub current: Edge,
    /// Edges newly satisfiable after this firing, in propagation order.
    /// Empty until the firing is committed, and always empty for a skip.
    pub new_opportunities: Vec<Edge>,
    /// The node fired with required inputs missing: no handler invocation,
    /// no outputs, one skip event.
    pub skip: bool,
}

impl TraversalResult {
    pub fn node_id(&self) -> &str {
        &self.descriptor.id
    }
}
