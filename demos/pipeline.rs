//! Demo: building and running a board end to end.
//!
//! Wires an input node through a handler into an output node, attaches a
//! probe bus that prints every traversal event as a JSON line, and runs
//! the board to completion.
//!
//! ```bash
//! cargo run --example pipeline
//! ```

use miette::{IntoDiagnostic, Result};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wireboard::descriptor::{Edge, GraphDescriptor, NodeDescriptor, OutputValues};
use wireboard::kits::{FnHandler, HandlerError, Kit, KitRegistry, core_kit};
use wireboard::probe::{ProbeBus, StdOutSink};
use wireboard::runtimes::{BoardRunner, RunConfig};

fn greeting_kit() -> Kit {
    Kit::new("demo").with_handler(
        "greet",
        FnHandler::new(|inputs, _ctx| async move {
            let name = inputs
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| HandlerError::msg("greet requires a `name`"))?;
            let mut outputs = OutputValues::new();
            outputs.insert("greeting".to_string(), json!(format!("Hello, {name}!")));
            Ok(outputs)
        }),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let board = GraphDescriptor::new("greeter")
        .with_node(NodeDescriptor::new("who", "input"))
        .with_node(NodeDescriptor::new("greet", "greet"))
        .with_node(NodeDescriptor::new("done", "output"))
        .with_edge(Edge::wire("who", "name", "greet", "name"))
        .with_edge(Edge::wire("greet", "greeting", "done", "greeting"));

    let bus = ProbeBus::with_sink(StdOutSink::default());
    bus.listen();

    let config = RunConfig::new(KitRegistry::from_kits(vec![core_kit(), greeting_kit()]))
        .with_probe(bus.emitter());
    let mut runner = BoardRunner::new(
        board,
        [("name".to_string(), json!("world"))].into_iter().collect(),
        config,
    )?;

    let outputs = runner.run_to_completion().await?;
    bus.stop().await;

    println!("outputs: {}", serde_json::to_string_pretty(&outputs).into_diagnostic()?);
    Ok(())
}
