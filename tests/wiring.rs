//! Port wiring semantics: FIFO queues, sticky constants, readiness.

use serde_json::json;

use wireboard::descriptor::{Edge, InputValues, OutputValues};
use wireboard::wiring::QueuedNodeValues;

fn outputs(pairs: &[(&str, serde_json::Value)]) -> OutputValues {
    pairs
        .iter()
        .map(|(port, value)| (port.to_string(), value.clone()))
        .collect()
}

#[test]
fn queued_values_drain_in_fifo_order() {
    let mut wiring = QueuedNodeValues::new();
    let edges = [Edge::wire("a", "value", "b", "value")];

    wiring.wire_outputs(&edges, &outputs(&[("value", json!(1))]));
    wiring.wire_outputs(&edges, &outputs(&[("value", json!(2))]));
    wiring.wire_outputs(&edges, &outputs(&[("value", json!(3))]));
    assert_eq!(wiring.queued_len("b", "value"), 3);

    for expected in [json!(1), json!(2), json!(3)] {
        let available = wiring.available_inputs("b");
        assert_eq!(available.get("value"), Some(&expected));
        wiring.use_inputs("b", &available);
    }
    assert_eq!(wiring.queued_len("b", "value"), 0);
    assert!(wiring.available_inputs("b").is_empty());
}

#[test]
fn constants_persist_across_use_and_take_last_write() {
    let mut wiring = QueuedNodeValues::new();
    let edges = [Edge::wire("a", "value", "b", "value").constant()];

    wiring.wire_outputs(&edges, &outputs(&[("value", json!("first"))]));
    wiring.wire_outputs(&edges, &outputs(&[("value", json!("second"))]));
    assert_eq!(wiring.constant("b", "value"), Some(&json!("second")));

    let available = wiring.available_inputs("b");
    assert_eq!(available.get("value"), Some(&json!("second")));
    wiring.use_inputs("b", &available);

    // Consumption does not erase a constant.
    assert_eq!(
        wiring.available_inputs("b").get("value"),
        Some(&json!("second"))
    );
}

#[test]
fn queued_value_shadows_constant_until_drained() {
    let mut wiring = QueuedNodeValues::new();
    let constant = [Edge::wire("a", "value", "c", "value").constant()];
    let queued = [Edge::wire("b", "value", "c", "value")];

    wiring.wire_outputs(&constant, &outputs(&[("value", json!("base"))]));
    wiring.wire_outputs(&queued, &outputs(&[("value", json!("fresh"))]));

    let available = wiring.available_inputs("c");
    assert_eq!(available.get("value"), Some(&json!("fresh")));
    wiring.use_inputs("c", &available);

    // Queue drained: the constant shows through again.
    assert_eq!(
        wiring.available_inputs("c").get("value"),
        Some(&json!("base"))
    );
}

#[test]
fn absent_output_ports_are_dropped_silently() {
    let mut wiring = QueuedNodeValues::new();
    let edges = [
        Edge::wire("a", "present", "b", "present"),
        Edge::wire("a", "absent", "b", "absent"),
    ];

    wiring.wire_outputs(&edges, &outputs(&[("present", json!(true))]));
    assert_eq!(wiring.queued_len("b", "present"), 1);
    assert_eq!(wiring.queued_len("b", "absent"), 0);
}

#[test]
fn missing_inputs_reports_unsatisfied_required_ports() {
    let mut wiring = QueuedNodeValues::new();
    let edges = [Edge::wire("a", "left", "c", "left")];
    wiring.wire_outputs(&edges, &outputs(&[("left", json!("x"))]));

    let required = vec!["left".to_string(), "right".to_string()];
    let missing = wiring.missing_inputs("c", &required);
    assert_eq!(missing, vec!["right".to_string()]);
}

#[test]
fn use_inputs_consumes_only_named_ports() {
    let mut wiring = QueuedNodeValues::new();
    let edges = [
        Edge::wire("a", "keep", "b", "keep"),
        Edge::wire("a", "take", "b", "take"),
    ];
    wiring.wire_outputs(
        &edges,
        &outputs(&[("keep", json!(1)), ("take", json!(2))]),
    );

    let mut taken = InputValues::new();
    taken.insert("take".to_string(), json!(2));
    wiring.use_inputs("b", &taken);

    assert_eq!(wiring.queued_len("b", "keep"), 1);
    assert_eq!(wiring.queued_len("b", "take"), 0);
}
