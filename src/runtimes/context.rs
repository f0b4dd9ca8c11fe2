//! Execution context passed to node handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::abort::AbortSignal;
use super::runner::RunHost;
use crate::boundaries::datastore::DataStore;
use crate::boundaries::loader::Loader;
use crate::descriptor::{InputValues, Module, NodeDescriptor, OutputValues};
use crate::kits::handler::HandlerError;
use crate::probe::ProbeEmitter;

/// Everything a handler may reach during one invocation.
///
/// Handlers receive no ambient or global state: bubbled input/output goes
/// through the optional host hooks, effects go through the loader and data
/// store handles, and cancellation arrives on the abort signal.
#[derive(Clone)]
pub struct InvocationContext {
    /// The node being invoked.
    pub node: NodeDescriptor,
    /// Positional path addressing this node across sub-board nesting.
    pub path: Vec<usize>,
    /// Cooperative cancellation; observe and fail fast.
    pub signal: AbortSignal,
    pub loader: Arc<dyn Loader>,
    pub store: Arc<dyn DataStore>,
    /// Modules of the board this node belongs to.
    pub modules: Arc<BTreeMap<String, Module>>,
    pub probe: ProbeEmitter,
    /// Host hooks for interactive input/output, when a host is attached.
    pub host: Option<Arc<dyn RunHost>>,
}

impl InvocationContext {
    /// Ask the enclosing host for input. Errors when no host is attached.
    pub async fn request_input(&self, schema: Option<Value>) -> Result<InputValues, HandlerError> {
        match &self.host {
            Some(host) => host
                .request_handler_input(&self.node, schema)
                .await
                .map_err(|error| HandlerError::Capability(error.to_string())),
            None => Err(HandlerError::Unsupported("request_input without a host")),
        }
    }

    /// Route values directly to the enclosing host, outside edge wiring.
    pub async fn provide_output(&self, values: OutputValues) -> Result<(), HandlerError> {
        match &self.host {
            Some(host) => host
                .provide_output(&self.node, &values)
                .await
                .map_err(|error| HandlerError::Capability(error.to_string())),
            None => Err(HandlerError::Unsupported("provide_output without a host")),
        }
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("node", &self.node.id)
            .field("path", &self.path)
            .field("host", &self.host.is_some())
            .finish()
    }
}
