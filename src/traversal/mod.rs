//! Traversal core: deterministic selection, readiness, and propagation.

pub mod machine;
pub mod result;

pub use machine::{ENTRY_SOURCE, TraversalMachine};
pub use result::TraversalResult;
