//! Demo: pausing a run for input and resuming it from a token.
//!
//! The board asks for a value, the run is saved while waiting, and a
//! second runner built from the token answers the request and finishes.
//!
//! ```bash
//! cargo run --example checkpoint
//! ```

use miette::Result;
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wireboard::descriptor::{Edge, GraphDescriptor, InputValues, NodeDescriptor, OutputValues};
use wireboard::kits::{FnHandler, HandlerError, Kit, KitRegistry, core_kit};
use wireboard::runtimes::{BoardRunner, RunConfig, StepOutcome};

fn math_kit() -> Kit {
    Kit::new("math").with_handler(
        "square",
        FnHandler::new(|inputs, _ctx| async move {
            let value = inputs
                .get("value")
                .and_then(Value::as_f64)
                .ok_or_else(|| HandlerError::msg("square requires a numeric `value`"))?;
            let mut outputs = OutputValues::new();
            outputs.insert("value".to_string(), json!(value * value));
            Ok(outputs)
        }),
    )
}

fn board() -> GraphDescriptor {
    GraphDescriptor::new("squarer")
        .with_node(NodeDescriptor::new("ask", "input"))
        .with_node(NodeDescriptor::new("square", "square"))
        .with_node(NodeDescriptor::new("done", "output"))
        .with_edge(Edge::wire("ask", "value", "square", "value"))
        .with_edge(Edge::wire("square", "value", "done", "value"))
}

fn config() -> RunConfig {
    RunConfig::new(KitRegistry::from_kits(vec![core_kit(), math_kit()]))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let mut runner = BoardRunner::new(board(), InputValues::new(), config())?;
    loop {
        match runner.step().await? {
            StepOutcome::AwaitingInput(pending) => {
                println!("paused at `{}` asking for input", pending.node.id);
                break;
            }
            StepOutcome::Done(_) => unreachable!("the board always asks for input"),
            _ => {}
        }
    }

    let token = runner.save()?;
    println!("token: {} bytes", token.as_str().len());
    drop(runner);

    let mut resumed = BoardRunner::restore(&token, config())?;
    resumed.provide_input([("value".to_string(), json!(12))].into_iter().collect())?;
    let outputs = resumed.run_to_completion().await?;
    println!("outputs: {outputs:?}");
    Ok(())
}
