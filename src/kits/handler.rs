//! The node handler contract.
//!
//! A handler is polymorphic over `{invoke, describe, metadata}`: `invoke`
//! is the only required capability. Trait implementors are the "bundled
//! object" variant; [`FnHandler`] adapts a plain async function.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{InputValues, OutputValues, PortName};
use crate::runtimes::InvocationContext;

/// Failure raised by a handler invocation. Fatal to the current run.
#[derive(Debug, Error, Diagnostic)]
pub enum HandlerError {
    #[error("{0}")]
    #[diagnostic(code(wireboard::handler::message))]
    Message(String),

    /// Structured failure payload surfaced verbatim in the error response.
    #[error("{0}")]
    #[diagnostic(code(wireboard::handler::structured))]
    Structured(Value),

    #[error(transparent)]
    #[diagnostic(code(wireboard::handler::serde))]
    Serde(#[from] serde_json::Error),

    #[error("capability failed: {0}")]
    #[diagnostic(code(wireboard::handler::capability))]
    Capability(String),

    #[error("unsupported operation: {0}")]
    #[diagnostic(
        code(wireboard::handler::unsupported),
        help("This node type is driven by the board runner and cannot be invoked directly.")
    )]
    Unsupported(&'static str),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// The error payload carried into an `ErrorResponse`: the structured
    /// value as-is, or the display form as a JSON string.
    pub fn to_error_value(&self) -> Value {
        match self {
            Self::Structured(value) => value.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

/// Minimal port schema: named ports plus required markers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortSchema {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<PortName, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<PortName>,
}

impl PortSchema {
    #[must_use]
    pub fn with_required(mut self, port: impl Into<String>) -> Self {
        self.required.push(port.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, port: impl Into<String>, schema: Value) -> Self {
        self.properties.insert(port.into(), schema);
        self
    }
}

/// Result of a handler's `describe`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub input_schema: PortSchema,
    pub output_schema: PortSchema,
}

/// Optional presentation metadata for a handler.
#[derive(Clone, Debug, Default)]
pub struct HandlerMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// An executable node type.
///
/// Returning an empty output map means "no outputs produced"; downstream
/// edges listening on absent ports are simply not triggered.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn invoke(
        &self,
        inputs: InputValues,
        ctx: InvocationContext,
    ) -> Result<OutputValues, HandlerError>;

    /// Describe input/output schemas, optionally specialized to concrete
    /// inputs. The runner uses the input schema's required markers as an
    /// additional readiness gate. Default: no declared schema.
    async fn describe(
        &self,
        _inputs: Option<&InputValues>,
    ) -> Result<NodeDescription, HandlerError> {
        Ok(NodeDescription::default())
    }

    fn metadata(&self) -> Option<&HandlerMetadata> {
        None
    }
}

impl std::fmt::Debug for dyn NodeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NodeHandler")
    }
}

type InvokeFn =
    dyn Fn(InputValues, InvocationContext) -> BoxFuture<'static, Result<OutputValues, HandlerError>>
        + Send
        + Sync;

/// Adapter turning a plain async function into a [`NodeHandler`].
#[derive(Clone)]
pub struct FnHandler {
    invoke: Arc<InvokeFn>,
    description: Option<NodeDescription>,
}

impl FnHandler {
    pub fn new<F, Fut>(invoke: F) -> Self
    where
        F: Fn(InputValues, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OutputValues, HandlerError>> + Send + 'static,
    {
        Self {
            invoke: Arc::new(move |inputs, ctx| Box::pin(invoke(inputs, ctx))),
            description: None,
        }
    }

    /// Attach a static schema, making its required ports gate readiness.
    #[must_use]
    pub fn with_description(mut self, description: NodeDescription) -> Self {
        self.description = Some(description);
        self
    }
}

#[async_trait]
impl NodeHandler for FnHandler {
    async fn invoke(
        &self,
        inputs: InputValues,
        ctx: InvocationContext,
    ) -> Result<OutputValues, HandlerError> {
        (self.invoke)(inputs, ctx).await
    }

    async fn describe(
        &self,
        _inputs: Option<&InputValues>,
    ) -> Result<NodeDescription, HandlerError> {
        Ok(self.description.clone().unwrap_or_default())
    }
}
