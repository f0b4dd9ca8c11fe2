//! Loader boundary: resolving board references to graph documents.
//!
//! Document storage and retrieval live outside the engine; the traversal
//! only needs `load(reference) -> GraphDescriptor | NotFound`. References
//! starting with `#` name a sub-graph of the current board and are
//! resolved by the runner before the loader is consulted.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::GraphDescriptor;

/// A board-capability value: a graph carried inline, or referenced by URL
/// or unresolved path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoardReference {
    Reference(String),
    Inline(GraphDescriptor),
}

impl BoardReference {
    /// Interpret a wired value as a board reference.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(reference) => Some(Self::Reference(reference.clone())),
            Value::Object(_) => serde_json::from_value(value.clone())
                .ok()
                .map(Self::Inline),
            _ => None,
        }
    }

    /// Identity used for recursion detection; inline boards fall back to
    /// their title.
    pub fn identity(&self) -> String {
        match self {
            Self::Reference(reference) => reference.clone(),
            Self::Inline(graph) => graph
                .title
                .clone()
                .unwrap_or_else(|| "<inline>".to_string()),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("board not found: {reference}")]
    #[diagnostic(code(wireboard::loader::not_found))]
    NotFound { reference: String },

    #[error("failed to load board {reference}: {message}")]
    #[diagnostic(code(wireboard::loader::failed))]
    Failed { reference: String, message: String },
}

/// Resolves a reference to a graph document.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, reference: &str) -> Result<GraphDescriptor, LoaderError>;
}

/// Loader that knows no boards; every lookup is a `NotFound`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLoader;

#[async_trait]
impl Loader for NullLoader {
    async fn load(&self, reference: &str) -> Result<GraphDescriptor, LoaderError> {
        Err(LoaderError::NotFound {
            reference: reference.to_string(),
        })
    }
}

/// Map-backed loader for tests and embedded catalogs.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLoader {
    boards: FxHashMap<String, GraphDescriptor>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_board(mut self, reference: impl Into<String>, board: GraphDescriptor) -> Self {
        self.boards.insert(reference.into(), board);
        self
    }

    pub fn insert(&mut self, reference: impl Into<String>, board: GraphDescriptor) {
        self.boards.insert(reference.into(), board);
    }
}

#[async_trait]
impl Loader for InMemoryLoader {
    async fn load(&self, reference: &str) -> Result<GraphDescriptor, LoaderError> {
        self.boards
            .get(reference)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound {
                reference: reference.to_string(),
            })
    }
}
