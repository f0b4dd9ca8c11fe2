//! Shared fixtures for integration tests.
#![allow(dead_code)]

use serde_json::{Value, json};

use wireboard::descriptor::{Edge, GraphDescriptor, NodeDescriptor, OutputValues};
use wireboard::kits::{
    FnHandler, HandlerError, Kit, KitRegistry, NodeDescription, PortSchema, core_kit,
};
use wireboard::probe::{MemorySink, ProbeBus};
use wireboard::runtimes::RunConfig;

/// A small arithmetic/string kit exercising the traversal paths.
///
/// - `emit`: copies its inputs (typically static configuration) to
///   same-named output ports.
/// - `double`: doubles the number on `value`, requires it via schema.
/// - `concat`: joins `left` and `right` into `text`.
/// - `boom`: always fails with the message "boom".
pub fn test_kit() -> Kit {
    Kit::new("test")
        .with_handler(
            "emit",
            FnHandler::new(|inputs, _ctx| async move {
                Ok(inputs.into_iter().collect::<OutputValues>())
            }),
        )
        .with_handler(
            "double",
            FnHandler::new(|inputs, _ctx| async move {
                let value = inputs
                    .get("value")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| HandlerError::msg("double requires a numeric `value`"))?;
                let mut outputs = OutputValues::new();
                outputs.insert("value".to_string(), json!(value * 2.0));
                Ok(outputs)
            })
            .with_description(NodeDescription {
                input_schema: PortSchema::default().with_required("value"),
                output_schema: PortSchema::default(),
            }),
        )
        .with_handler(
            "concat",
            FnHandler::new(|inputs, _ctx| async move {
                let left = inputs.get("left").and_then(Value::as_str).unwrap_or("");
                let right = inputs.get("right").and_then(Value::as_str).unwrap_or("");
                let mut outputs = OutputValues::new();
                outputs.insert("text".to_string(), json!(format!("{left}{right}")));
                Ok(outputs)
            }),
        )
        .with_handler(
            "boom",
            FnHandler::new(|_inputs, _ctx| async move {
                Err(HandlerError::msg("boom"))
            }),
        )
}

pub fn registry() -> KitRegistry {
    KitRegistry::from_kits(vec![core_kit(), test_kit()])
}

pub fn config() -> RunConfig {
    RunConfig::new(registry())
}

/// A run config whose probe feeds a memory sink through a live bus.
pub fn observed_config() -> (RunConfig, ProbeBus, MemorySink) {
    let sink = MemorySink::new();
    let bus = ProbeBus::with_sink(sink.clone());
    bus.listen();
    let config = RunConfig::new(registry()).with_probe(bus.emitter());
    (config, bus, sink)
}

/// input("start") -> double -> output("result"): doubles a supplied number.
pub fn doubling_board() -> GraphDescriptor {
    GraphDescriptor::new("doubling")
        .with_node(NodeDescriptor::new("start", "input"))
        .with_node(NodeDescriptor::new("calc", "double"))
        .with_node(NodeDescriptor::new("finish", "output"))
        .with_edge(Edge::wire("start", "value", "calc", "value"))
        .with_edge(Edge::wire("calc", "value", "finish", "value"))
}
