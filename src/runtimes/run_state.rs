//! Serializable run state and the opaque checkpoint token.
//!
//! These are explicit serde shapes decoupled from the in-memory
//! representations, so the runner code stays lean and the wire format is
//! stable. Every map here is a `BTreeMap`: the token must satisfy
//! save → restore → save token equality, which rules out hash-ordered
//! serialization. This module performs no I/O.

use std::collections::{BTreeMap, VecDeque};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{Edge, GraphDescriptor, InputValues, NodeIdentifier, OutputValues};
use crate::wiring::QueuedNodeValues;

/// Version stamp embedded in every token.
pub const RUN_STATE_VERSION: u32 = 1;

#[derive(Debug, Error, Diagnostic)]
pub enum RunStateError {
    #[error("unsupported run-state token version: {found} (expected {RUN_STATE_VERSION})")]
    #[diagnostic(
        code(wireboard::run_state::version),
        help("The token was produced by an incompatible engine build.")
    )]
    VersionMismatch { found: u32 },

    #[error("run-state token is corrupt: {detail}")]
    #[diagnostic(code(wireboard::run_state::corrupt))]
    Corrupt { detail: String },

    #[error("run-state serialization failed: {source}")]
    #[diagnostic(code(wireboard::run_state::serde))]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

/// Opaque, versioned serialization of a paused run.
///
/// The format is an implementation detail; the only contract is exact
/// round-tripping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunToken(String);

impl RunToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn from_string(token: String) -> Self {
        Self(token)
    }
}

/// Wiring state in its persisted, ordered shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedWiring {
    #[serde(default)]
    pub queues: BTreeMap<NodeIdentifier, BTreeMap<String, Vec<Value>>>,
    #[serde(default)]
    pub constants: BTreeMap<NodeIdentifier, BTreeMap<String, Value>>,
}

impl From<&QueuedNodeValues> for PersistedWiring {
    fn from(wiring: &QueuedNodeValues) -> Self {
        let queues = wiring
            .queues
            .iter()
            .filter(|(_, ports)| !ports.is_empty())
            .map(|(node, ports)| {
                let ports = ports
                    .iter()
                    .map(|(port, queue)| (port.clone(), queue.iter().cloned().collect()))
                    .collect();
                (node.clone(), ports)
            })
            .collect();
        let constants = wiring
            .constants
            .iter()
            .filter(|(_, ports)| !ports.is_empty())
            .map(|(node, ports)| {
                (
                    node.clone(),
                    ports
                        .iter()
                        .map(|(port, value)| (port.clone(), value.clone()))
                        .collect(),
                )
            })
            .collect();
        Self { queues, constants }
    }
}

impl From<PersistedWiring> for QueuedNodeValues {
    fn from(persisted: PersistedWiring) -> Self {
        let mut wiring = QueuedNodeValues::new();
        for (node, ports) in persisted.queues {
            let entry = wiring.queues.entry(node).or_default();
            for (port, values) in ports {
                entry.insert(port, values.into_iter().collect::<VecDeque<_>>());
            }
        }
        for (node, ports) in persisted.constants {
            wiring.constants.entry(node).or_default().extend(ports);
        }
        wiring
    }
}

/// A firing that was selected but has not completed: an input node waiting
/// for bubbled values, or an invoke node whose sub-board is in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedFiring {
    pub node: NodeIdentifier,
    pub inputs: InputValues,
    pub current: Edge,
    /// Host answer already supplied but not yet committed at save time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided: Option<InputValues>,
}

/// Runner lifecycle in its persisted shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistedPhase {
    Running,
    AwaitingInput,
    Failed,
    Done,
}

/// One level of a (possibly nested) run.
///
/// The child's descriptor is carried inline so restoring never needs a
/// loader round-trip; `reference` keeps the recursion guard intact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedRunFrame {
    pub descriptor: GraphDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub wiring: PersistedWiring,
    pub opportunities: Vec<Edge>,
    pub path: Vec<usize>,
    pub step: u64,
    pub started: bool,
    pub phase: PersistedPhase,
    #[serde(default)]
    pub supplied_inputs: InputValues,
    #[serde(default)]
    pub outputs: OutputValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_input: Option<PersistedFiring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_invoke: Option<PersistedFiring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<Box<PersistedRunFrame>>,
}

/// The full persisted run: version stamp plus the root frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedRunState {
    pub version: u32,
    pub root: PersistedRunFrame,
}

impl PersistedRunState {
    pub fn new(root: PersistedRunFrame) -> Self {
        Self {
            version: RUN_STATE_VERSION,
            root,
        }
    }

    pub fn to_token(&self) -> Result<RunToken, RunStateError> {
        serde_json::to_string(self)
            .map(RunToken)
            .map_err(|source| RunStateError::Serde { source })
    }

    pub fn from_token(token: &RunToken) -> Result<Self, RunStateError> {
        let state: Self = serde_json::from_str(token.as_str())
            .map_err(|source| RunStateError::Serde { source })?;
        if state.version != RUN_STATE_VERSION {
            return Err(RunStateError::VersionMismatch {
                found: state.version,
            });
        }
        Ok(state)
    }
}
