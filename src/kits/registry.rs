//! Kits and the handler registry.
//!
//! A kit is a named bundle of node types. The registry composes installed
//! kits in order; the first kit providing a type wins, so applications can
//! shadow built-ins by installing their own kit first.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::handler::NodeHandler;
use crate::descriptor::NodeTypeIdentifier;

/// Typed resolution failure; never a panic.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("no handler registered for type: {node_type}")]
    #[diagnostic(
        code(wireboard::kits::not_found),
        help("Install a kit providing this node type.")
    )]
    NotFound { node_type: NodeTypeIdentifier },
}

/// A named bundle of node handlers.
#[derive(Clone, Default)]
pub struct Kit {
    name: String,
    handlers: FxHashMap<NodeTypeIdentifier, Arc<dyn NodeHandler>>,
}

impl Kit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_handler(
        mut self,
        node_type: impl Into<String>,
        handler: impl NodeHandler + 'static,
    ) -> Self {
        self.add_handler(node_type, Arc::new(handler));
        self
    }

    pub fn add_handler(&mut self, node_type: impl Into<String>, handler: Arc<dyn NodeHandler>) {
        self.handlers.insert(node_type.into(), handler);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.handlers.contains_key(node_type)
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(node_type).cloned()
    }

    /// Node types provided by this kit, in no particular order.
    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Kit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kit")
            .field("name", &self.name)
            .field("types", &self.handlers.len())
            .finish()
    }
}

/// Handler registry composed from installed kits.
#[derive(Clone, Debug, Default)]
pub struct KitRegistry {
    kits: Vec<Kit>,
}

impl KitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_kits(kits: Vec<Kit>) -> Self {
        Self { kits }
    }

    pub fn install(&mut self, kit: Kit) {
        self.kits.push(kit);
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.kits.iter().any(|kit| kit.contains(node_type))
    }

    /// Resolve a type identifier to its handler, first installed kit wins.
    pub fn resolve(&self, node_type: &str) -> Result<Arc<dyn NodeHandler>, ResolveError> {
        self.kits
            .iter()
            .find_map(|kit| kit.get(node_type))
            .ok_or_else(|| ResolveError::NotFound {
                node_type: node_type.to_string(),
            })
    }

    pub fn kits(&self) -> &[Kit] {
        &self.kits
    }
}
