//! Run orchestration: the board runner, invocation context, cooperative
//! abort, and checkpoint/restore state.

pub mod abort;
pub mod context;
pub mod run_state;
pub mod runner;

pub use abort::{AbortController, AbortSignal};
pub use context::InvocationContext;
pub use run_state::{
    PersistedRunFrame, PersistedRunState, PersistedWiring, RunStateError, RunToken,
    RUN_STATE_VERSION,
};
pub use runner::{
    BoardRunner, ErrorResponse, PendingInput, RunConfig, RunError, RunHost, RunPhase, StepOutcome,
    StepReport,
};
