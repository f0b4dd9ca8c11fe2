//! The built-in core kit.
//!
//! Provides the node types every board can rely on: `input`, `output`,
//! `invoke`, `passthrough`, and (when a sandbox is supplied) `runModule`.
//! `input`, `output`, and `invoke` are intercepted by the board runner:
//! their registered handlers exist so type resolution validates, and they
//! fail loudly if something invokes them outside a runner.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::handler::{FnHandler, HandlerError, NodeHandler};
use super::registry::Kit;
use crate::boundaries::sandbox::{ModuleMethod, Sandbox};
use crate::descriptor::{InputValues, OutputValues};
use crate::runtimes::InvocationContext;

/// Node type intercepted by the runner to bubble an input request.
pub const INPUT_TYPE: &str = "input";
/// Node type intercepted by the runner to record graph-level outputs.
pub const OUTPUT_TYPE: &str = "output";
/// Node type intercepted by the runner to invoke a sub-board.
pub const INVOKE_TYPE: &str = "invoke";
/// Identity node: outputs whatever it received.
pub const PASSTHROUGH_TYPE: &str = "passthrough";
/// Node type delegating a named module to the sandbox boundary.
pub const RUN_MODULE_TYPE: &str = "runModule";

/// Configuration/input port naming the board a sub-board node invokes.
pub const BOARD_PORT: &str = "$board";
/// Configuration/input port naming the module a `runModule` node executes.
pub const MODULE_PORT: &str = "$module";
/// Schema port on `input`/`output` nodes; not forwarded as a value.
pub const SCHEMA_PORT: &str = "schema";
/// Marker configuration on `output` nodes requesting bubbled delivery.
pub const BUBBLE_PORT: &str = "bubble";

/// The core kit without sandbox support.
pub fn core_kit() -> Kit {
    base_kit()
}

/// The core kit plus a `runModule` handler backed by `sandbox`.
pub fn core_kit_with_sandbox(sandbox: Arc<dyn Sandbox>) -> Kit {
    let mut kit = base_kit();
    kit.add_handler(RUN_MODULE_TYPE, Arc::new(ModuleHandler { sandbox }));
    kit
}

fn base_kit() -> Kit {
    Kit::new("core")
        .with_handler(
            PASSTHROUGH_TYPE,
            FnHandler::new(|inputs, _ctx| async move { Ok(inputs) }),
        )
        .with_handler(
            INPUT_TYPE,
            FnHandler::new(|_inputs, _ctx| async move {
                Err::<OutputValues, _>(HandlerError::Unsupported(INPUT_TYPE))
            }),
        )
        .with_handler(
            OUTPUT_TYPE,
            FnHandler::new(|_inputs, _ctx| async move {
                Err::<OutputValues, _>(HandlerError::Unsupported(OUTPUT_TYPE))
            }),
        )
        .with_handler(
            INVOKE_TYPE,
            FnHandler::new(|_inputs, _ctx| async move {
                Err::<OutputValues, _>(HandlerError::Unsupported(INVOKE_TYPE))
            }),
        )
}

/// Delegates a board module to the sandbox boundary.
///
/// The module name comes from the `$module` port (configuration or wired);
/// every other gathered input is passed to the module verbatim.
pub struct ModuleHandler {
    sandbox: Arc<dyn Sandbox>,
}

impl ModuleHandler {
    pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl NodeHandler for ModuleHandler {
    async fn invoke(
        &self,
        mut inputs: InputValues,
        ctx: InvocationContext,
    ) -> Result<OutputValues, HandlerError> {
        let module = inputs
            .remove(MODULE_PORT)
            .and_then(|value| value.as_str().map(str::to_owned))
            .ok_or_else(|| {
                HandlerError::msg(format!("runModule requires a `{MODULE_PORT}` string value"))
            })?;
        let invocation_id = Uuid::new_v4().to_string();
        self.sandbox
            .run_module(
                &invocation_id,
                ModuleMethod::Default,
                &ctx.modules,
                &module,
                inputs,
            )
            .await
            .map_err(|error| HandlerError::Capability(error.to_string()))
    }
}
