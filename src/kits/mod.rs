//! Node handlers, kits, and the handler registry.

pub mod core;
pub mod handler;
pub mod registry;

pub use core::{
    BOARD_PORT, BUBBLE_PORT, INPUT_TYPE, INVOKE_TYPE, MODULE_PORT, ModuleHandler, OUTPUT_TYPE,
    PASSTHROUGH_TYPE, RUN_MODULE_TYPE, SCHEMA_PORT, core_kit, core_kit_with_sandbox,
};
pub use handler::{
    FnHandler, HandlerError, HandlerMetadata, NodeDescription, NodeHandler, PortSchema,
};
pub use registry::{Kit, KitRegistry, ResolveError};
