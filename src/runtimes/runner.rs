//! The board runner: dispatch, bubbling, sub-boards, checkpointing.
//!
//! [`BoardRunner`] wraps the synchronous [`TraversalMachine`] and drives
//! one run, one node at a time. Each [`step`](BoardRunner::step) performs
//! exactly one transition and returns control to the caller, which makes
//! every point between steps a valid suspension point: pause for bubbled
//! input, [`save`](BoardRunner::save) a token, resume in another process.
//!
//! No two nodes of the same runner ever execute concurrently, so wiring
//! and run state have a single writer and need no locks. Independent
//! top-level runs may execute concurrently; they share only `Arc`-held
//! read-only collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::abort::AbortSignal;
use super::context::InvocationContext;
use super::run_state::{
    PersistedFiring, PersistedPhase, PersistedRunFrame, PersistedRunState, PersistedWiring,
    RunStateError, RunToken,
};
use crate::boundaries::datastore::{DataStore, InMemoryDataStore};
use crate::boundaries::loader::{BoardReference, Loader, LoaderError, NullLoader};
use crate::descriptor::{
    GraphDescriptor, InputValues, Module, NodeDescriptor, NodeIdentifier, OutputValues,
};
use crate::graph::{GraphIntegrityError, GraphModel};
use crate::kits::{
    BOARD_PORT, BUBBLE_PORT, HandlerError, INPUT_TYPE, INVOKE_TYPE, KitRegistry, NodeHandler,
    OUTPUT_TYPE, SCHEMA_PORT,
};
use crate::probe::{ProbeEmitter, ProbeEvent};
use crate::traversal::{ENTRY_SOURCE, TraversalMachine, TraversalResult};
use crate::wiring::QueuedNodeValues;

/// Terminal-failure payload: what failed, where, and with which inputs.
///
/// Created exactly once per run, when a node's invocation raises; the run
/// halts immediately and its state is preserved at the failing node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Message string or structured error object.
    pub error: Value,
    /// The offending node.
    pub node: NodeDescriptor,
    /// Inputs gathered for the failing invocation.
    pub inputs: InputValues,
}

#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Integrity(#[from] GraphIntegrityError),

    #[error("handler failed at node {}: {}", .0.node.id, .0.error)]
    #[diagnostic(code(wireboard::runner::handler))]
    Handler(Box<ErrorResponse>),

    /// A failure with a distinguished reason: the abort signal was observed.
    #[error("run cancelled at node {}", .0.node.id)]
    #[diagnostic(code(wireboard::runner::cancelled))]
    Cancelled(Box<ErrorResponse>),

    #[error(transparent)]
    #[diagnostic(code(wireboard::runner::loader))]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    State(#[from] RunStateError),

    #[error("run already halted in a failed state")]
    #[diagnostic(
        code(wireboard::runner::halted),
        help("Inspect failure() and the preserved wiring state; a failed run cannot be stepped.")
    )]
    Halted,

    #[error("no pending input request to satisfy")]
    #[diagnostic(code(wireboard::runner::no_pending_input))]
    NoPendingInput,

    #[error("input required at node {node} but no host is attached")]
    #[diagnostic(
        code(wireboard::runner::input_required),
        help("Drive the run with run_with_host, or answer AwaitingInput with provide_input.")
    )]
    InputRequired { node: NodeIdentifier },

    #[error("host error: {message}")]
    #[diagnostic(code(wireboard::runner::host))]
    Host { message: String },
}

impl RunError {
    /// The error response carried by handler and cancellation failures.
    pub fn error_response(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Handler(response) | Self::Cancelled(response) => Some(response),
            _ => None,
        }
    }
}

/// Host side of bubbled input/output.
#[async_trait]
pub trait RunHost: Send + Sync {
    /// Answer a bubbled input request.
    async fn request_input(&self, pending: &PendingInput) -> Result<InputValues, RunError>;

    /// Receive a bubbled output.
    async fn provide_output(
        &self,
        node: &NodeDescriptor,
        values: &OutputValues,
    ) -> Result<(), RunError>;

    /// Answer an input request issued by a handler mid-invocation.
    async fn request_handler_input(
        &self,
        node: &NodeDescriptor,
        schema: Option<Value>,
    ) -> Result<InputValues, RunError> {
        self.request_input(&PendingInput {
            node: node.clone(),
            path: Vec::new(),
            schema,
        })
        .await
    }
}

/// A bubbled input request awaiting the host.
#[derive(Clone, Debug)]
pub struct PendingInput {
    pub node: NodeDescriptor,
    /// Path addressing the requesting node across nesting.
    pub path: Vec<usize>,
    /// The `schema` value of the input node, when present.
    pub schema: Option<Value>,
}

/// What one step accomplished.
#[derive(Clone, Debug)]
pub struct StepReport {
    pub step: u64,
    /// Path of the graph the step ran in (empty for the top level).
    pub path: Vec<usize>,
    pub result: TraversalResult,
}

/// Result of one runner transition.
#[derive(Debug)]
pub enum StepOutcome {
    /// A node fired or was skipped; see the report's `skip` flag.
    Ran(StepReport),
    /// An input node bubbled a request; satisfy it with `provide_input`.
    AwaitingInput(PendingInput),
    /// An output node delivered values. Bubbled deliveries are side-channel
    /// only; the rest accumulate into the run's final outputs.
    DeliveredOutput {
        node: NodeDescriptor,
        path: Vec<usize>,
        values: OutputValues,
        bubbled: bool,
    },
    /// No opportunities remain; the accumulated graph outputs.
    Done(OutputValues),
}

/// Lifecycle of a runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    AwaitingInput,
    Failed,
    Done,
}

/// Collaborators and policy for one run.
///
/// Cloned into child runners so a sub-board sees the same kits, loader,
/// store, probe, and abort signal as its parent.
#[derive(Clone)]
pub struct RunConfig {
    pub kits: KitRegistry,
    pub loader: Arc<dyn Loader>,
    pub store: Arc<dyn DataStore>,
    pub probe: ProbeEmitter,
    pub signal: AbortSignal,
    pub host: Option<Arc<dyn RunHost>>,
}

impl RunConfig {
    pub fn new(kits: KitRegistry) -> Self {
        Self {
            kits,
            loader: Arc::new(NullLoader),
            store: Arc::new(InMemoryDataStore::new()),
            probe: ProbeEmitter::disconnected(),
            signal: AbortSignal::never(),
            host: None,
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_probe(mut self, probe: ProbeEmitter) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = signal;
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn RunHost>) -> Self {
        self.host = Some(host);
        self
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("kits", &self.kits)
            .field("host", &self.host.is_some())
            .finish()
    }
}

/// A selected firing waiting on the host.
struct PendingFiring {
    result: TraversalResult,
    schema: Option<Value>,
    provided: Option<InputValues>,
}

/// An invoke node whose sub-board run is in flight.
struct ChildRun {
    result: TraversalResult,
    runner: Box<BoardRunner>,
}

/// Drives one traversal instance to completion, one node per step.
pub struct BoardRunner {
    machine: TraversalMachine,
    config: RunConfig,
    path: Vec<usize>,
    reference: Option<String>,
    active_boards: Vec<String>,
    modules: Arc<BTreeMap<String, Module>>,
    step: u64,
    started: bool,
    phase: RunPhase,
    supplied_inputs: InputValues,
    outputs: OutputValues,
    pending_input: Option<PendingFiring>,
    child: Option<ChildRun>,
    failure: Option<ErrorResponse>,
}

impl BoardRunner {
    /// Validate `descriptor` and prepare a fresh run.
    ///
    /// `inputs` are the run-level values that satisfy `input` nodes without
    /// bubbling; pass an empty map for a fully interactive run.
    pub fn new(
        descriptor: GraphDescriptor,
        inputs: InputValues,
        config: RunConfig,
    ) -> Result<Self, GraphIntegrityError> {
        Self::with_scope(
            Arc::new(descriptor),
            inputs,
            config,
            Vec::new(),
            None,
            Vec::new(),
        )
    }

    fn with_scope(
        descriptor: Arc<GraphDescriptor>,
        inputs: InputValues,
        config: RunConfig,
        path: Vec<usize>,
        reference: Option<String>,
        active_boards: Vec<String>,
    ) -> Result<Self, GraphIntegrityError> {
        let model = GraphModel::new(descriptor.clone(), &config.kits)?;
        let modules = Arc::new(descriptor.modules.clone());
        Ok(Self {
            machine: TraversalMachine::new(model),
            config,
            path,
            reference,
            active_boards,
            modules,
            step: 0,
            started: false,
            phase: RunPhase::Running,
            supplied_inputs: inputs,
            outputs: OutputValues::new(),
            pending_input: None,
            child: None,
            failure: None,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn steps_taken(&self) -> u64 {
        self.step
    }

    /// The wiring state behind the most recent step.
    pub fn wiring(&self) -> &QueuedNodeValues {
        self.machine.wiring()
    }

    /// Graph-level outputs accumulated so far.
    pub fn outputs(&self) -> &OutputValues {
        &self.outputs
    }

    /// The preserved error response after a failed run.
    pub fn failure(&self) -> Option<&ErrorResponse> {
        self.failure.as_ref()
    }

    /// Perform exactly one transition of the run.
    pub async fn step(&mut self) -> Result<StepOutcome, RunError> {
        self.step_inner().await
    }

    fn step_boxed(&mut self) -> BoxFuture<'_, Result<StepOutcome, RunError>> {
        Box::pin(self.step_inner())
    }

    async fn step_inner(&mut self) -> Result<StepOutcome, RunError> {
        match self.phase {
            RunPhase::Failed => return Err(RunError::Halted),
            RunPhase::Done => return Ok(StepOutcome::Done(self.outputs.clone())),
            RunPhase::Running | RunPhase::AwaitingInput => {}
        }
        if !self.started {
            self.started = true;
            self.config
                .probe
                .emit(ProbeEvent::graph_start(self.path.clone()));
        }

        // A satisfied input request completes before anything else runs.
        if self.pending_input.is_some() {
            return self.finish_pending_input();
        }

        // An in-flight sub-board is driven before the parent's own nodes;
        // sub-graph execution is never interleaved with them.
        if self.child.is_some() {
            return self.step_child().await;
        }

        let Some(mut result) = self.machine.next_candidate() else {
            self.phase = RunPhase::Done;
            self.config
                .probe
                .emit(ProbeEvent::graph_end(self.path.clone()));
            info!(path = ?self.path, steps = self.step, "board run completed");
            return Ok(StepOutcome::Done(self.outputs.clone()));
        };
        self.step += 1;
        if result.current.from != ENTRY_SOURCE {
            self.config
                .probe
                .emit(ProbeEvent::edge(result.current.clone(), self.path.clone()));
        }

        let handler = self
            .config
            .kits
            .resolve(&result.descriptor.node_type)
            .map_err(|_| GraphIntegrityError::UnresolvableType {
                id: result.descriptor.id.clone(),
                node_type: result.descriptor.node_type.clone(),
            })?;

        // Ports the handler's schema marks required extend the edge-derived
        // readiness gate.
        if !result.skip {
            match handler.describe(Some(&result.inputs)).await {
                Ok(description) => {
                    for port in description.input_schema.required {
                        if !result.inputs.contains_key(&port)
                            && !result.missing_inputs.contains(&port)
                        {
                            result.missing_inputs.push(port);
                        }
                    }
                    result.skip = !result.missing_inputs.is_empty();
                }
                Err(error) => {
                    warn!(
                        node = %result.descriptor.id,
                        %error,
                        "describe failed; proceeding without schema",
                    );
                }
            }
        }
        if result.skip {
            debug!(node = %result.descriptor.id, missing = ?result.missing_inputs, "node skipped");
            self.config.probe.emit(ProbeEvent::skip(
                result.descriptor.id.clone(),
                self.node_path(result.node_id()),
                result.missing_inputs.clone(),
            ));
            return Ok(StepOutcome::Ran(StepReport {
                step: self.step,
                path: self.path.clone(),
                result,
            }));
        }

        // Cancellation is observed between selection and dispatch.
        if self.config.signal.aborted() {
            return Err(self.fail_cancelled(&result));
        }

        match result.descriptor.node_type.as_str() {
            INPUT_TYPE => self.begin_input(result),
            OUTPUT_TYPE => Ok(self.deliver_output(result)),
            INVOKE_TYPE => self.begin_invoke(result).await,
            _ => self.dispatch(handler, result).await,
        }
    }

    /// Satisfy the outstanding bubbled input request, at whatever nesting
    /// depth it originated.
    pub fn provide_input(&mut self, values: InputValues) -> Result<(), RunError> {
        if let Some(child) = self.child.as_mut() {
            return child.runner.provide_input(values);
        }
        match self.pending_input.as_mut() {
            Some(pending) if pending.provided.is_none() => {
                pending.provided = Some(values);
                self.phase = RunPhase::Running;
                Ok(())
            }
            _ => Err(RunError::NoPendingInput),
        }
    }

    /// Run to completion with a host answering bubbled input and receiving
    /// bubbled output.
    #[instrument(skip(self, host), err)]
    pub async fn run_with_host(
        &mut self,
        host: Arc<dyn RunHost>,
    ) -> Result<OutputValues, RunError> {
        self.config.host = Some(host.clone());
        loop {
            match self.step().await? {
                StepOutcome::Ran(_) => {}
                StepOutcome::AwaitingInput(pending) => {
                    let values = host.request_input(&pending).await?;
                    self.provide_input(values)?;
                }
                StepOutcome::DeliveredOutput {
                    node,
                    values,
                    bubbled,
                    ..
                } => {
                    if bubbled {
                        host.provide_output(&node, &values).await?;
                    }
                }
                StepOutcome::Done(outputs) => return Ok(outputs),
            }
        }
    }

    /// Run to completion without a host; a bubbled input request is an
    /// error.
    pub async fn run_to_completion(&mut self) -> Result<OutputValues, RunError> {
        loop {
            match self.step().await? {
                StepOutcome::AwaitingInput(pending) => {
                    return Err(RunError::InputRequired {
                        node: pending.node.id,
                    });
                }
                StepOutcome::Done(outputs) => return Ok(outputs),
                StepOutcome::Ran(_) | StepOutcome::DeliveredOutput { .. } => {}
            }
        }
    }

    /// Serialize the run, including any in-flight sub-boards, into an
    /// opaque versioned token.
    pub fn save(&self) -> Result<RunToken, RunStateError> {
        PersistedRunState::new(self.to_frame()).to_token()
    }

    /// Reconstruct a run from a token such that resuming is observationally
    /// identical to never having paused.
    pub fn restore(token: &RunToken, config: RunConfig) -> Result<Self, RunError> {
        let state = PersistedRunState::from_token(token)?;
        Self::from_frame(state.root, config, Vec::new())
    }

    // ---- internals -------------------------------------------------------

    fn finish_pending_input(&mut self) -> Result<StepOutcome, RunError> {
        let satisfied = self
            .pending_input
            .as_ref()
            .is_some_and(|pending| pending.provided.is_some());
        if !satisfied {
            let view = self
                .pending_view()
                .expect("awaiting-input phase implies a pending firing");
            return Ok(StepOutcome::AwaitingInput(view));
        }
        let PendingFiring {
            result, provided, ..
        } = self
            .pending_input
            .take()
            .expect("satisfied pending firing checked above");
        self.phase = RunPhase::Running;
        let outputs = provided.unwrap_or_default();
        let path = self.node_path(result.node_id());
        self.emit_node_events(&result, &outputs, path);
        Ok(self.commit_and_report(result, outputs))
    }

    async fn step_child(&mut self) -> Result<StepOutcome, RunError> {
        let child = self
            .child
            .as_mut()
            .expect("step_child requires an active child");
        match child.runner.step_boxed().await {
            Ok(StepOutcome::Done(child_outputs)) => {
                let ChildRun { result, .. } =
                    self.child.take().expect("active child checked above");
                self.active_boards.pop();
                let path = self.node_path(result.node_id());
                self.config.probe.emit(ProbeEvent::node_end(
                    result.node_id(),
                    &result.descriptor.node_type,
                    path,
                    child_outputs.clone(),
                ));
                Ok(self.commit_and_report(result, child_outputs))
            }
            Ok(other) => Ok(other),
            Err(error) => {
                self.phase = RunPhase::Failed;
                self.failure = error.error_response().cloned();
                Err(error)
            }
        }
    }

    fn begin_input(&mut self, result: TraversalResult) -> Result<StepOutcome, RunError> {
        let schema = result.inputs.get(SCHEMA_PORT).cloned();
        // Values wired to the node or supplied to the run satisfy the
        // request without bubbling; run-level answers win per port.
        let mut provided = result.inputs.clone();
        provided.remove(SCHEMA_PORT);
        provided.extend(self.supplied_inputs.clone());
        if provided.is_empty() {
            let view = PendingInput {
                node: result.descriptor.clone(),
                path: self.node_path(result.node_id()),
                schema: schema.clone(),
            };
            debug!(node = %result.descriptor.id, "input node bubbled a request");
            self.pending_input = Some(PendingFiring {
                result,
                schema,
                provided: None,
            });
            self.phase = RunPhase::AwaitingInput;
            return Ok(StepOutcome::AwaitingInput(view));
        }
        let path = self.node_path(result.node_id());
        self.emit_node_events(&result, &provided, path);
        Ok(self.commit_and_report(result, provided))
    }

    fn deliver_output(&mut self, result: TraversalResult) -> StepOutcome {
        let path = self.node_path(result.node_id());
        let mut values = result.inputs.clone();
        values.remove(SCHEMA_PORT);
        values.remove(BUBBLE_PORT);
        let bubbled = result
            .descriptor
            .configuration
            .get(BUBBLE_PORT)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.emit_node_events(&result, &values, path.clone());
        if bubbled {
            // Side-channel delivery only; bubbled values never join the
            // board's own outputs.
            debug!(node = %result.descriptor.id, "output node bubbled values");
        } else {
            self.outputs.extend(values.clone());
        }
        let committed = self.machine.commit(result, &OutputValues::new());
        StepOutcome::DeliveredOutput {
            node: committed.descriptor,
            path,
            values,
            bubbled,
        }
    }

    async fn begin_invoke(&mut self, result: TraversalResult) -> Result<StepOutcome, RunError> {
        let Some(board_value) = result.inputs.get(BOARD_PORT).cloned() else {
            return Err(self.fail(&result, HandlerError::msg("invoke requires a `$board` value")));
        };
        let Some(reference) = BoardReference::from_value(&board_value) else {
            return Err(self.fail(
                &result,
                HandlerError::msg("`$board` is neither a board reference nor an inline graph"),
            ));
        };
        let identity = reference.identity();
        if self.active_boards.contains(&identity) {
            self.phase = RunPhase::Failed;
            return Err(GraphIntegrityError::RecursiveInvocation {
                reference: identity,
            }
            .into());
        }

        let descriptor = match &reference {
            BoardReference::Inline(graph) => graph.clone(),
            BoardReference::Reference(name) => {
                if let Some(subgraph) = name.strip_prefix('#') {
                    match self.machine.model().subgraph(subgraph) {
                        Ok(graph) => graph.clone(),
                        Err(error) => {
                            self.phase = RunPhase::Failed;
                            return Err(error.into());
                        }
                    }
                } else {
                    match self.config.loader.load(name).await {
                        Ok(graph) => graph,
                        Err(error) => {
                            self.phase = RunPhase::Failed;
                            return Err(error.into());
                        }
                    }
                }
            }
        };

        let mut child_inputs = result.inputs.clone();
        child_inputs.remove(BOARD_PORT);
        let mut active = self.active_boards.clone();
        active.push(identity.clone());
        let child_path = self.node_path(result.node_id());
        let child = match Self::with_scope(
            Arc::new(descriptor),
            child_inputs,
            self.config.clone(),
            child_path.clone(),
            Some(identity.clone()),
            active,
        ) {
            Ok(child) => child,
            Err(error) => {
                self.phase = RunPhase::Failed;
                return Err(error.into());
            }
        };
        self.active_boards.push(identity);

        self.config.probe.emit(ProbeEvent::node_start(
            result.node_id(),
            &result.descriptor.node_type,
            child_path,
            result.inputs.clone(),
        ));
        debug!(node = %result.descriptor.id, "sub-board invocation started");
        let report = StepReport {
            step: self.step,
            path: self.path.clone(),
            result: result.clone(),
        };
        self.child = Some(ChildRun {
            result,
            runner: Box::new(child),
        });
        Ok(StepOutcome::Ran(report))
    }

    async fn dispatch(
        &mut self,
        handler: Arc<dyn NodeHandler>,
        result: TraversalResult,
    ) -> Result<StepOutcome, RunError> {
        let path = self.node_path(result.node_id());
        self.config.probe.emit(ProbeEvent::node_start(
            result.node_id(),
            &result.descriptor.node_type,
            path.clone(),
            result.inputs.clone(),
        ));
        let ctx = InvocationContext {
            node: result.descriptor.clone(),
            path: path.clone(),
            signal: self.config.signal.clone(),
            loader: self.config.loader.clone(),
            store: self.config.store.clone(),
            modules: self.modules.clone(),
            probe: self.config.probe.clone(),
            host: self.config.host.clone(),
        };
        match handler.invoke(result.inputs.clone(), ctx).await {
            Ok(outputs) => {
                self.config.probe.emit(ProbeEvent::node_end(
                    result.node_id(),
                    &result.descriptor.node_type,
                    path,
                    outputs.clone(),
                ));
                Ok(self.commit_and_report(result, outputs))
            }
            Err(_) if self.config.signal.aborted() => Err(self.fail_cancelled(&result)),
            Err(error) => Err(self.fail(&result, error)),
        }
    }

    fn commit_and_report(&mut self, result: TraversalResult, outputs: OutputValues) -> StepOutcome {
        let committed = self.machine.commit(result, &outputs);
        StepOutcome::Ran(StepReport {
            step: self.step,
            path: self.path.clone(),
            result: committed,
        })
    }

    fn emit_node_events(&self, result: &TraversalResult, outputs: &OutputValues, path: Vec<usize>) {
        self.config.probe.emit(ProbeEvent::node_start(
            result.node_id(),
            &result.descriptor.node_type,
            path.clone(),
            result.inputs.clone(),
        ));
        self.config.probe.emit(ProbeEvent::node_end(
            result.node_id(),
            &result.descriptor.node_type,
            path,
            outputs.clone(),
        ));
    }

    fn node_path(&self, id: &str) -> Vec<usize> {
        let mut path = self.path.clone();
        if let Some(position) = self.machine.model().node_position(id) {
            path.push(position);
        }
        path
    }

    fn pending_view(&self) -> Option<PendingInput> {
        self.pending_input.as_ref().map(|pending| PendingInput {
            node: pending.result.descriptor.clone(),
            path: self.node_path(pending.result.node_id()),
            schema: pending.schema.clone(),
        })
    }

    fn fail(&mut self, result: &TraversalResult, error: HandlerError) -> RunError {
        let response = ErrorResponse {
            error: error.to_error_value(),
            node: result.descriptor.clone(),
            inputs: result.inputs.clone(),
        };
        warn!(node = %result.descriptor.id, error = %response.error, "run failed");
        self.phase = RunPhase::Failed;
        self.failure = Some(response.clone());
        RunError::Handler(Box::new(response))
    }

    fn fail_cancelled(&mut self, result: &TraversalResult) -> RunError {
        let response = ErrorResponse {
            error: Value::String("cancelled".to_string()),
            node: result.descriptor.clone(),
            inputs: result.inputs.clone(),
        };
        info!(node = %result.descriptor.id, "run cancelled");
        self.phase = RunPhase::Failed;
        self.failure = Some(response.clone());
        RunError::Cancelled(Box::new(response))
    }

    fn to_frame(&self) -> PersistedRunFrame {
        PersistedRunFrame {
            descriptor: self.machine.model().descriptor().clone(),
            reference: self.reference.clone(),
            wiring: PersistedWiring::from(self.machine.wiring()),
            opportunities: self.machine.opportunities().cloned().collect(),
            path: self.path.clone(),
            step: self.step,
            started: self.started,
            phase: match self.phase {
                RunPhase::Running => PersistedPhase::Running,
                RunPhase::AwaitingInput => PersistedPhase::AwaitingInput,
                RunPhase::Failed => PersistedPhase::Failed,
                RunPhase::Done => PersistedPhase::Done,
            },
            supplied_inputs: self.supplied_inputs.clone(),
            outputs: self.outputs.clone(),
            pending_input: self.pending_input.as_ref().map(|pending| PersistedFiring {
                node: pending.result.descriptor.id.clone(),
                inputs: pending.result.inputs.clone(),
                current: pending.result.current.clone(),
                provided: pending.provided.clone(),
            }),
            pending_invoke: self.child.as_ref().map(|child| PersistedFiring {
                node: child.result.descriptor.id.clone(),
                inputs: child.result.inputs.clone(),
                current: child.result.current.clone(),
                provided: None,
            }),
            failure: self
                .failure
                .as_ref()
                .and_then(|failure| serde_json::to_value(failure).ok()),
            child: self
                .child
                .as_ref()
                .map(|child| Box::new(child.runner.to_frame())),
        }
    }

    fn from_frame(
        frame: PersistedRunFrame,
        config: RunConfig,
        parent_active: Vec<String>,
    ) -> Result<Self, RunError> {
        let descriptor = Arc::new(frame.descriptor);
        let model = GraphModel::new(descriptor.clone(), &config.kits)?;
        for edge in &frame.opportunities {
            if model.node(&edge.to).is_none() {
                return Err(RunStateError::Corrupt {
                    detail: format!("opportunity targets unknown node {}", edge.to),
                }
                .into());
            }
        }
        let wiring = QueuedNodeValues::from(frame.wiring);
        let machine = TraversalMachine::from_parts(model, wiring, frame.opportunities);

        let mut active = parent_active;
        if let Some(reference) = &frame.reference {
            active.push(reference.clone());
        }

        let mut runner = Self {
            machine,
            config: config.clone(),
            path: frame.path,
            reference: frame.reference,
            active_boards: active.clone(),
            modules: Arc::new(descriptor.modules.clone()),
            step: frame.step,
            started: frame.started,
            phase: match frame.phase {
                PersistedPhase::Running => RunPhase::Running,
                PersistedPhase::AwaitingInput => RunPhase::AwaitingInput,
                PersistedPhase::Failed => RunPhase::Failed,
                PersistedPhase::Done => RunPhase::Done,
            },
            supplied_inputs: frame.supplied_inputs,
            outputs: frame.outputs,
            pending_input: None,
            child: None,
            failure: frame
                .failure
                .and_then(|value| serde_json::from_value(value).ok()),
        };

        if let Some(firing) = frame.pending_input {
            let provided = firing.provided.clone();
            let result = runner.rebuild_firing(firing)?;
            runner.pending_input = Some(PendingFiring {
                schema: result.inputs.get(SCHEMA_PORT).cloned(),
                result,
                provided,
            });
        }
        if let Some(firing) = frame.pending_invoke {
            let result = runner.rebuild_firing(firing)?;
            let child_frame = frame.child.ok_or_else(|| RunStateError::Corrupt {
                detail: "pending invoke without a child frame".to_string(),
            })?;
            let child = Self::from_frame(*child_frame, config, active.clone())?;
            if let Some(reference) = child.reference.clone() {
                runner.active_boards.push(reference);
            }
            runner.child = Some(ChildRun {
                result,
                runner: Box::new(child),
            });
        }
        Ok(runner)
    }

    fn rebuild_firing(&self, firing: PersistedFiring) -> Result<TraversalResult, RunStateError> {
        let descriptor = self
            .machine
            .model()
            .node(&firing.node)
            .cloned()
            .ok_or_else(|| RunStateError::Corrupt {
                detail: format!("pending firing references unknown node {}", firing.node),
            })?;
        Ok(TraversalResult {
            descriptor,
            inputs: firing.inputs,
            missing_inputs: Vec::new(),
            current: firing.current,
            new_opportunities: Vec::new(),
            skip: false,
        })
    }
}

impl std::fmt::Debug for BoardRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardRunner")
            .field("path", &self.path)
            .field("step", &self.step)
            .field("phase", &self.phase)
            .field("child", &self.child.is_some())
            .finish()
    }
}
