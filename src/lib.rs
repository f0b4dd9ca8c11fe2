//! Wireboard: a resumable dataflow runner for boards of typed nodes.
//!
//! A board is a JSON-friendly [`GraphDescriptor`](descriptor::GraphDescriptor):
//! nodes carry a type and static configuration, edges wire output ports to
//! input ports either as FIFO queues or as sticky constants. Node types
//! resolve to handlers through a [`KitRegistry`](kits::KitRegistry), and a
//! [`BoardRunner`](runtimes::BoardRunner) drives the traversal one node per
//! step, so a run can pause between any two steps, serialize itself into a
//! [`RunToken`](runtimes::RunToken), and resume later as if it had never
//! stopped.
//!
//! Key pieces:
//! - [`descriptor`]: the board document model and its builders.
//! - [`graph`]: validated graph views and structural integrity checks.
//! - [`wiring`]: queued and constant port values between nodes.
//! - [`traversal`]: the deterministic opportunity-driven state machine.
//! - [`kits`]: the handler trait, registries, and the core node types.
//! - [`runtimes`]: the runner, host bubbling, abort, and checkpoint state.
//! - [`probe`]: the structured event stream observing a run.
//! - [`boundaries`]: loader, sandbox, and data store seams to the host.
//!
//! ```no_run
//! use wireboard::descriptor::{Edge, GraphDescriptor, NodeDescriptor};
//! use wireboard::kits::{core_kit, KitRegistry};
//! use wireboard::runtimes::{BoardRunner, RunConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let board = GraphDescriptor::new("echo")
//!     .with_node(NodeDescriptor::new("in", "input"))
//!     .with_node(NodeDescriptor::new("out", "output"))
//!     .with_edge(Edge::wire("in", "text", "out", "text"));
//!
//! let config = RunConfig::new(KitRegistry::from_kits(vec![core_kit()]));
//! let mut runner = BoardRunner::new(board, Default::default(), config)?;
//! let outputs = runner.run_to_completion().await?;
//! # let _ = outputs;
//! # Ok(())
//! # }
//! ```

pub mod boundaries;
pub mod descriptor;
pub mod graph;
pub mod kits;
pub mod probe;
pub mod runtimes;
pub mod traversal;
pub mod wiring;

pub use descriptor::{Edge, GraphDescriptor, InputValues, NodeDescriptor, OutputValues};
pub use graph::{GraphIntegrityError, GraphModel};
pub use kits::{Kit, KitRegistry, NodeHandler, core_kit};
pub use probe::{ProbeBus, ProbeEvent, ProbeSink};
pub use runtimes::{BoardRunner, RunConfig, RunError, RunToken, StepOutcome};
