//! Sandbox boundary: running untrusted code modules.
//!
//! The engine never executes user-authored code itself. A `runModule` node
//! hands the module source and its inputs to an external [`Sandbox`]; the
//! only way sandboxed code affects the outside world is through the
//! [`Capabilities`] the host supplies to the sandbox. Capability failures
//! are reported back to the module as an `$error` field in its output, not
//! by aborting the host traversal; the module decides whether to turn
//! that into a handler failure.

use std::collections::BTreeMap;

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use super::loader::BoardReference;
use crate::descriptor::{InputValues, Module, OutputValues};

/// Key under which capability failures surface inside module results.
pub const ERROR_KEY: &str = "$error";

/// Which entry point of a module to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleMethod {
    Default,
    Describe,
}

impl ModuleMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Describe => "describe",
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum SandboxError {
    #[error("module not found: {name}")]
    #[diagnostic(code(wireboard::sandbox::module_not_found))]
    ModuleNotFound { name: String },

    #[error("module {name} failed: {message}")]
    #[diagnostic(code(wireboard::sandbox::module_failed))]
    ModuleFailed { name: String, message: String },

    #[error("sandbox unavailable: {message}")]
    #[diagnostic(code(wireboard::sandbox::unavailable))]
    Unavailable { message: String },
}

/// Executes named code modules in isolation.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run_module(
        &self,
        invocation_id: &str,
        method: ModuleMethod,
        modules: &BTreeMap<String, Module>,
        module_name: &str,
        inputs: InputValues,
    ) -> Result<OutputValues, SandboxError>;
}

/// Outbound request a sandboxed module may issue through `fetch`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub response: Value,
    pub status: u16,
    pub status_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub response_headers: BTreeMap<String, String>,
}

/// A capability call failed. Reported to the sandboxed module as an
/// `$error` value; the host traversal is unaffected.
#[derive(Debug, Error, Diagnostic)]
pub enum CapabilityError {
    #[error("fetch failed: {message}")]
    #[diagnostic(code(wireboard::capability::fetch))]
    Fetch { message: String },

    #[error("secrets unavailable: {keys:?}")]
    #[diagnostic(code(wireboard::capability::secrets))]
    Secrets { keys: Vec<String> },

    #[error("board invocation failed: {message}")]
    #[diagnostic(code(wireboard::capability::invoke))]
    Invoke { message: String },

    #[error("output delivery failed: {message}")]
    #[diagnostic(code(wireboard::capability::output))]
    Output { message: String },
}

impl CapabilityError {
    /// The `{"$error": ...}` shape handed back to sandboxed code.
    pub fn to_error_value(&self) -> Value {
        json!({ ERROR_KEY: self.to_string() })
    }
}

/// Host-provided effectful operations exposed to sandboxed code.
///
/// Each call must be independently retried or short-circuited by the
/// caller; the sandbox itself never retries.
#[async_trait]
pub trait Capabilities: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, CapabilityError>;

    async fn secrets(&self, keys: &[String]) -> Result<BTreeMap<String, String>, CapabilityError>;

    async fn invoke(
        &self,
        board: BoardReference,
        inputs: InputValues,
    ) -> Result<OutputValues, CapabilityError>;

    /// Deliver intermediate output toward the host. Returns whether the
    /// values were delivered.
    async fn output(
        &self,
        values: OutputValues,
        schema: Option<Value>,
    ) -> Result<bool, CapabilityError>;
}
