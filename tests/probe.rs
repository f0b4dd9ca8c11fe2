//! Probe event stream: ordering, skip reporting, serialization shape.

mod common;

use serde_json::{Value, json};

use wireboard::descriptor::{Edge, GraphDescriptor, InputValues, NodeDescriptor};
use wireboard::probe::{ChannelSink, ProbeBus, ProbeEvent};
use wireboard::runtimes::BoardRunner;

fn inputs(pairs: &[(&str, Value)]) -> InputValues {
    pairs
        .iter()
        .map(|(port, value)| (port.to_string(), value.clone()))
        .collect()
}

#[tokio::test]
async fn a_run_emits_a_well_ordered_event_stream() {
    let (config, bus, sink) = common::observed_config();
    let mut runner = BoardRunner::new(
        common::doubling_board(),
        inputs(&[("value", json!(2))]),
        config,
    )
    .expect("board validates");
    runner.run_to_completion().await.expect("run succeeds");
    bus.stop().await;

    let kinds: Vec<&str> = sink.snapshot().iter().map(ProbeEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "graphStart",
            "nodeStart", // start (entry, no edge event)
            "nodeEnd",
            "edge",
            "nodeStart", // calc
            "nodeEnd",
            "edge",
            "nodeStart", // finish
            "nodeEnd",
            "graphEnd",
        ]
    );
}

#[tokio::test]
async fn node_events_carry_inputs_outputs_and_path() {
    let (config, bus, sink) = common::observed_config();
    let mut runner = BoardRunner::new(
        common::doubling_board(),
        inputs(&[("value", json!(2))]),
        config,
    )
    .expect("board validates");
    runner.run_to_completion().await.expect("run succeeds");
    bus.stop().await;

    let events = sink.snapshot();
    let calc_end = events
        .iter()
        .find(|event| event.kind() == "nodeEnd" && event.node_id() == Some("calc"))
        .expect("calc produced an end event");
    match calc_end {
        ProbeEvent::NodeEnd { outputs, path, .. } => {
            assert_eq!(outputs.get("value"), Some(&json!(4.0)));
            // `calc` is the second node of the top-level board.
            assert_eq!(path, &vec![1]);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn skipped_nodes_produce_a_skip_event() {
    let (config, bus, sink) = common::observed_config();
    let board = GraphDescriptor::new("skipping")
        .with_node(NodeDescriptor::new("src", "emit").with_config("other", json!("x")))
        .with_node(NodeDescriptor::new("calc", "double"))
        .with_edge(Edge::wire("src", "other", "calc", "other"));
    let mut runner =
        BoardRunner::new(board, InputValues::new(), config).expect("board validates");
    runner.run_to_completion().await.expect("run succeeds");
    bus.stop().await;

    let events = sink.snapshot();
    let skip = events
        .iter()
        .find(|event| event.kind() == "skip")
        .expect("calc was skipped");
    match skip {
        ProbeEvent::Skip {
            node,
            missing_inputs,
            ..
        } => {
            assert_eq!(node, "calc");
            assert_eq!(missing_inputs, &vec!["value".to_string()]);
        }
        _ => unreachable!(),
    }
    // A skip never produces node start/end events.
    assert!(
        !events
            .iter()
            .any(|event| event.kind() == "nodeStart" && event.node_id() == Some("calc"))
    );
}

#[tokio::test]
async fn events_serialize_with_a_type_tag() {
    let event = ProbeEvent::skip("n".to_string(), vec![0], vec!["port".to_string()]);
    let value = event.to_json_value();
    assert_eq!(value["type"], json!("skip"));
    assert_eq!(value["node"], json!("n"));
    assert_eq!(value["missingInputs"], json!(["port"]));

    let parsed: ProbeEvent =
        serde_json::from_value(value).expect("events deserialize from their JSON shape");
    assert_eq!(parsed.kind(), "skip");
}

#[tokio::test]
async fn channel_sinks_forward_to_async_consumers() {
    let (tx, rx) = flume::unbounded();
    let bus = ProbeBus::with_sink(ChannelSink::new(tx));
    bus.listen();
    let config = common::config().with_probe(bus.emitter());

    let mut runner = BoardRunner::new(
        common::doubling_board(),
        inputs(&[("value", json!(1))]),
        config,
    )
    .expect("board validates");
    runner.run_to_completion().await.expect("run succeeds");
    bus.stop().await;

    let received: Vec<ProbeEvent> = rx.drain().collect();
    assert_eq!(received.first().map(ProbeEvent::kind), Some("graphStart"));
    assert_eq!(received.last().map(ProbeEvent::kind), Some("graphEnd"));
}

#[tokio::test]
async fn a_disconnected_probe_never_disturbs_the_run() {
    // Default config carries a disconnected emitter; the run must proceed.
    let mut runner = BoardRunner::new(
        common::doubling_board(),
        inputs(&[("value", json!(5))]),
        common::config(),
    )
    .expect("board validates");
    let outputs = runner.run_to_completion().await.expect("run succeeds");
    assert_eq!(outputs.get("value"), Some(&json!(10.0)));
}
