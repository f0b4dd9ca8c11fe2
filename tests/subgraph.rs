//! Sub-board invocation: inline boards, references, bubbling, recursion.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use wireboard::boundaries::InMemoryLoader;
use wireboard::descriptor::{
    Edge, GraphDescriptor, InputValues, NodeDescriptor, OutputValues,
};
use wireboard::graph::GraphIntegrityError;
use wireboard::runtimes::{
    BoardRunner, PendingInput, RunError, RunHost, StepOutcome,
};

fn inputs(pairs: &[(&str, Value)]) -> InputValues {
    pairs
        .iter()
        .map(|(port, value)| (port.to_string(), value.clone()))
        .collect()
}

/// emit -> invoke -> output, with the invoke target left to each test.
fn invoking_board(board_value: Value) -> GraphDescriptor {
    GraphDescriptor::new("parent")
        .with_node(NodeDescriptor::new("src", "emit").with_config("value", json!(3)))
        .with_node(NodeDescriptor::new("call", "invoke").with_config("$board", board_value))
        .with_node(NodeDescriptor::new("sink", "output"))
        .with_edge(Edge::wire("src", "value", "call", "value"))
        .with_edge(Edge::wire("call", "value", "sink", "value"))
}

#[tokio::test]
async fn invoking_an_inline_board_runs_it_to_completion() {
    let inline =
        serde_json::to_value(common::doubling_board()).expect("descriptors serialize");
    let mut runner = BoardRunner::new(invoking_board(inline), InputValues::new(), common::config())
        .expect("board validates");

    let outputs = runner.run_to_completion().await.expect("run succeeds");
    assert_eq!(outputs.get("value"), Some(&json!(6.0)));
}

#[tokio::test]
async fn hash_references_resolve_against_declared_subgraphs() {
    let board = invoking_board(json!("#child")).with_subgraph("child", common::doubling_board());
    let mut runner =
        BoardRunner::new(board, InputValues::new(), common::config()).expect("board validates");

    let outputs = runner.run_to_completion().await.expect("run succeeds");
    assert_eq!(outputs.get("value"), Some(&json!(6.0)));
}

#[tokio::test]
async fn plain_references_resolve_through_the_loader() {
    let loader = InMemoryLoader::new().with_board("boards/child", common::doubling_board());
    let config = common::config().with_loader(Arc::new(loader));
    let mut runner = BoardRunner::new(
        invoking_board(json!("boards/child")),
        InputValues::new(),
        config,
    )
    .expect("board validates");

    let outputs = runner.run_to_completion().await.expect("run succeeds");
    assert_eq!(outputs.get("value"), Some(&json!(6.0)));
}

#[tokio::test]
async fn unknown_loader_references_fail_the_run() {
    let mut runner = BoardRunner::new(
        invoking_board(json!("boards/missing")),
        InputValues::new(),
        common::config(),
    )
    .expect("board validates");

    let error = runner
        .run_to_completion()
        .await
        .expect_err("null loader knows no boards");
    assert!(matches!(error, RunError::Loader(_)));
}

#[tokio::test]
async fn self_invocation_is_rejected() {
    let board = GraphDescriptor::new("self")
        .with_node(NodeDescriptor::new("again", "invoke").with_config("$board", json!("boards/self")));
    let loader = InMemoryLoader::new().with_board("boards/self", board.clone());
    let config = common::config().with_loader(Arc::new(loader));
    let mut runner = BoardRunner::new(
        invoking_board(json!("boards/self")),
        InputValues::new(),
        config,
    )
    .expect("board validates");

    let error = runner
        .run_to_completion()
        .await
        .expect_err("the child re-enters itself");
    assert!(matches!(
        error,
        RunError::Integrity(GraphIntegrityError::RecursiveInvocation { ref reference })
            if reference == "boards/self"
    ));
}

#[tokio::test]
async fn nested_input_requests_bubble_with_their_full_path() {
    // The invoke node receives no wired values, so the child's input node
    // has nothing to consume and the request bubbles through the parent.
    let board = GraphDescriptor::new("parent")
        .with_node(NodeDescriptor::new("call", "invoke").with_config("$board", json!("#child")))
        .with_node(NodeDescriptor::new("sink", "output"))
        .with_edge(Edge::wire("call", "value", "sink", "value"))
        .with_subgraph("child", common::doubling_board());
    let mut runner =
        BoardRunner::new(board, InputValues::new(), common::config()).expect("board validates");

    let pending = loop {
        match runner.step().await.expect("step succeeds") {
            StepOutcome::AwaitingInput(pending) => break pending,
            StepOutcome::Done(_) => panic!("run finished without bubbling"),
            _ => {}
        }
    };
    assert_eq!(pending.node.id, "start");
    // invoke is node 0 of the parent, `start` is node 0 of the child.
    assert_eq!(pending.path, vec![0, 0]);

    runner
        .provide_input(inputs(&[("value", json!(4))]))
        .expect("request routes to the nested runner");
    let outputs = runner.run_to_completion().await.expect("run succeeds");
    assert_eq!(outputs.get("value"), Some(&json!(8.0)));
}

#[derive(Default)]
struct RecordingHost {
    answers: Mutex<Vec<InputValues>>,
    delivered: Mutex<Vec<(String, OutputValues)>>,
}

#[async_trait]
impl RunHost for RecordingHost {
    async fn request_input(&self, _pending: &PendingInput) -> Result<InputValues, RunError> {
        self.answers
            .lock()
            .pop()
            .ok_or_else(|| RunError::Host {
                message: "no scripted answer left".to_string(),
            })
    }

    async fn provide_output(
        &self,
        node: &NodeDescriptor,
        values: &OutputValues,
    ) -> Result<(), RunError> {
        self.delivered.lock().push((node.id.clone(), values.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn a_host_answers_bubbled_input_and_receives_bubbled_output() {
    let board = GraphDescriptor::new("interactive")
        .with_node(NodeDescriptor::new("ask", "input"))
        .with_node(NodeDescriptor::new("calc", "double"))
        .with_node(NodeDescriptor::new("notify", "output").with_config("bubble", json!(true)))
        .with_node(NodeDescriptor::new("finish", "output"))
        .with_edge(Edge::wire("ask", "value", "calc", "value"))
        .with_edge(Edge::wire("calc", "value", "notify", "progress"))
        .with_edge(Edge::wire("calc", "value", "finish", "value"));
    let host = Arc::new(RecordingHost::default());
    host.answers.lock().push(inputs(&[("value", json!(7))]));

    let mut runner =
        BoardRunner::new(board, InputValues::new(), common::config()).expect("board validates");
    let outputs = runner.run_with_host(host.clone()).await.expect("run succeeds");

    // The bubbled delivery went to the host, not into the graph outputs.
    assert_eq!(outputs.get("value"), Some(&json!(14.0)));
    assert!(!outputs.contains_key("progress"));
    let delivered = host.delivered.lock();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "notify");
    assert_eq!(delivered[0].1.get("progress"), Some(&json!(14.0)));
}
