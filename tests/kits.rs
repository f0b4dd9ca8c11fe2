//! Kit registry resolution, core node types, and boundary fakes.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use wireboard::boundaries::datastore::{DataStore, DataStoreError, InMemoryDataStore, InlineData};
use wireboard::boundaries::sandbox::{ModuleMethod, Sandbox, SandboxError};
use wireboard::descriptor::{
    Edge, GraphDescriptor, InputValues, Module, NodeDescriptor, OutputValues,
};
use wireboard::kits::{
    FnHandler, Kit, KitRegistry, NodeDescription, NodeHandler, PortSchema, core_kit,
    core_kit_with_sandbox,
};
use wireboard::runtimes::{BoardRunner, RunConfig};

#[tokio::test]
async fn the_first_installed_kit_shadows_later_ones() {
    let shadow = Kit::new("shadow").with_handler(
        "emit",
        FnHandler::new(|_inputs, _ctx| async move { Ok(OutputValues::new()) }).with_description(
            NodeDescription {
                input_schema: PortSchema::default().with_required("shadow-only"),
                output_schema: PortSchema::default(),
            },
        ),
    );
    let registry = KitRegistry::from_kits(vec![shadow, common::test_kit()]);
    assert!(registry.kits()[1].contains("emit"));

    let handler = registry.resolve("emit").expect("emit resolves");
    let description = handler.describe(None).await.expect("describe succeeds");
    assert_eq!(description.input_schema.required, vec!["shadow-only"]);
}

#[test]
fn resolving_an_unknown_type_is_a_typed_error() {
    let registry = common::registry();
    let error = registry.resolve("no-such-type").expect_err("unknown type");
    assert!(error.to_string().contains("no-such-type"));
}

#[test]
fn the_core_kit_covers_the_builtin_node_types() {
    let kit = core_kit();
    for node_type in ["input", "output", "invoke", "passthrough"] {
        assert!(kit.contains(node_type), "core kit missing {node_type}");
    }
    assert!(!kit.contains("runModule"));
}

#[tokio::test]
async fn passthrough_copies_inputs_to_outputs() {
    let board = GraphDescriptor::new("echo")
        .with_node(NodeDescriptor::new("pipe", "passthrough").with_config("note", json!("kept")))
        .with_node(NodeDescriptor::new("sink", "output"))
        .with_edge(Edge::wire("pipe", "note", "sink", "note"));
    let mut runner =
        BoardRunner::new(board, InputValues::new(), common::config()).expect("board validates");

    let outputs = runner.run_to_completion().await.expect("run succeeds");
    assert_eq!(outputs.get("note"), Some(&json!("kept")));
}

/// Sandbox fake that upper-cases the `text` input of any known module.
struct UppercaseSandbox;

#[async_trait]
impl Sandbox for UppercaseSandbox {
    async fn run_module(
        &self,
        _invocation_id: &str,
        _method: ModuleMethod,
        modules: &BTreeMap<String, Module>,
        module_name: &str,
        inputs: InputValues,
    ) -> Result<OutputValues, SandboxError> {
        if !modules.contains_key(module_name) {
            return Err(SandboxError::ModuleNotFound {
                name: module_name.to_string(),
            });
        }
        let text = inputs.get("text").and_then(Value::as_str).unwrap_or("");
        Ok(inputs
            .keys()
            .filter(|port| *port == "text")
            .map(|port| (port.clone(), json!(text.to_uppercase())))
            .collect())
    }
}

#[tokio::test]
async fn run_module_nodes_delegate_to_the_sandbox() {
    let board = GraphDescriptor::new("shouting")
        .with_node(
            NodeDescriptor::new("shout", "runModule")
                .with_config("$module", json!("upper"))
                .with_config("text", json!("hello")),
        )
        .with_node(NodeDescriptor::new("sink", "output"))
        .with_edge(Edge::wire("shout", "text", "sink", "text"))
        .with_module("upper", Module::new("export default uppercase"));
    let registry = KitRegistry::from_kits(vec![
        core_kit_with_sandbox(Arc::new(UppercaseSandbox)),
        common::test_kit(),
    ]);
    let mut runner = BoardRunner::new(board, InputValues::new(), RunConfig::new(registry))
        .expect("board validates");

    let outputs = runner.run_to_completion().await.expect("run succeeds");
    assert_eq!(outputs.get("text"), Some(&json!("HELLO")));
}

#[tokio::test]
async fn run_module_failures_surface_in_the_error_response() {
    let board = GraphDescriptor::new("missing-module").with_node(
        NodeDescriptor::new("shout", "runModule").with_config("$module", json!("absent")),
    );
    let registry =
        KitRegistry::from_kits(vec![core_kit_with_sandbox(Arc::new(UppercaseSandbox))]);
    let mut runner = BoardRunner::new(board, InputValues::new(), RunConfig::new(registry))
        .expect("board validates");

    let error = runner
        .run_to_completion()
        .await
        .expect_err("module does not exist");
    let response = error.error_response().expect("handler failure carries one");
    assert_eq!(response.node.id, "shout");
    assert!(response.error.as_str().is_some_and(|msg| msg.contains("absent")));
}

#[tokio::test]
async fn the_memory_data_store_round_trips_blobs() {
    let store = InMemoryDataStore::new();
    let stored = store
        .store(InlineData {
            mime_type: "text/plain".to_string(),
            data: "aGVsbG8=".to_string(),
        })
        .await
        .expect("store succeeds");
    assert_eq!(stored.mime_type, "text/plain");
    assert_eq!(store.len(), 1);

    let retrieved = store.retrieve(&stored.handle).await.expect("handle resolves");
    assert_eq!(retrieved.data, "aGVsbG8=");

    let error = store.retrieve("no-such-handle").await.expect_err("unknown handle");
    assert!(matches!(error, DataStoreError::NotFound { .. }));
}

#[tokio::test]
async fn stored_handles_are_unique_per_blob() {
    let store = InMemoryDataStore::new();
    let first = store
        .store(InlineData {
            mime_type: "text/plain".to_string(),
            data: "one".to_string(),
        })
        .await
        .expect("store succeeds");
    let second = store
        .store(InlineData {
            mime_type: "text/plain".to_string(),
            data: "two".to_string(),
        })
        .await
        .expect("store succeeds");
    assert_ne!(first.handle, second.handle);
}
