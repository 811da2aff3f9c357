//! Tool dispatcher contract tests.

mod common;

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use pretty_assertions::assert_eq;

use common::FixedStreamTool;
use pulse::error::PulseError;
use pulse::tools::dispatch::{dispatch_stream, dispatch_sync, DispatchItem};
use pulse::tools::{FnTool, ToolParameters, ToolRegistry};

fn recording_tool(
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail: bool,
) -> Arc<FnTool> {
    Arc::new(FnTool::new(
        name,
        "records invocations",
        ToolParameters::empty(),
        move |params| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name.to_string());
                if fail {
                    return Err(PulseError::ToolExecution {
                        tool_name: name.to_string(),
                        message: "deliberate failure".into(),
                    });
                }
                Ok(serde_json::Value::Object(params))
            }
        },
    ))
}

#[tokio::test]
async fn prose_yields_no_tool_outputs_and_no_error() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    registry.register(recording_tool("a", log.clone(), false)).unwrap();

    let results = dispatch_sync(&registry, "Bitcoin looks strong today.").await;

    assert!(results.is_empty());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_descriptor_invokes_exactly_once_with_parameters() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    registry
        .register(recording_tool("known_tool", log.clone(), false))
        .unwrap();

    let results = dispatch_sync(
        &registry,
        r#"{"name": "known_tool", "parameters": {"x": 1, "y": "two"}}"#,
    )
    .await;

    assert_eq!(log.lock().unwrap().as_slice(), ["known_tool"]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "known_tool");
    assert_eq!(results[0].1["x"], 1);
    assert_eq!(results[0].1["y"], "two");
}

#[tokio::test]
async fn batch_runs_in_order_and_survives_a_failure() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    registry.register(recording_tool("a", log.clone(), true)).unwrap();
    registry.register(recording_tool("b", log.clone(), false)).unwrap();

    let results = dispatch_sync(
        &registry,
        r#"{"functions": [{"name": "a", "parameters": {}}, {"name": "b", "parameters": {}}]}"#,
    )
    .await;

    // `a` ran first and failed; its failure did not prevent `b`.
    assert_eq!(log.lock().unwrap().as_slice(), ["a", "b"]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "b");
}

#[tokio::test]
async fn fenced_invocation_is_unwrapped() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    registry.register(recording_tool("a", log.clone(), false)).unwrap();

    let response = "```json\n{\"name\": \"a\", \"parameters\": {}}\n```";
    let results = dispatch_sync(&registry, response).await;

    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn unknown_names_are_silently_skipped() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    registry.register(recording_tool("a", log.clone(), false)).unwrap();

    let results = dispatch_sync(
        &registry,
        r#"{"functions": [{"name": "ghost", "parameters": {}}, {"name": "a", "parameters": {}}]}"#,
    )
    .await;

    assert_eq!(results.len(), 1);
    assert_eq!(log.lock().unwrap().as_slice(), ["a"]);
}

#[tokio::test]
async fn stream_dispatch_yields_items_in_order() {
    let mut registry = ToolRegistry::new();
    registry
        .register_stream(Arc::new(FixedStreamTool::new(
            "reporter",
            vec![Ok("one".into()), Ok("two".into())],
        )))
        .unwrap();

    let items: Vec<_> = dispatch_stream(
        Arc::new(registry),
        r#"{"function": {"name": "reporter", "parameters": {}}}"#.into(),
    )
    .collect()
    .await;

    assert_eq!(
        items,
        [
            DispatchItem::Invoked { tool: "reporter".into() },
            DispatchItem::Output("one".into()),
            DispatchItem::Output("two".into()),
        ]
    );
}

#[tokio::test]
async fn stream_tool_error_is_yielded_inline_and_tagged() {
    let mut registry = ToolRegistry::new();
    registry
        .register_stream(Arc::new(FixedStreamTool::new(
            "flaky",
            vec![
                Ok("before".into()),
                Err(PulseError::Stream("upstream gone".into())),
            ],
        )))
        .unwrap();
    registry
        .register_stream(Arc::new(FixedStreamTool::new(
            "steady",
            vec![Ok("after".into())],
        )))
        .unwrap();

    let items: Vec<_> = dispatch_stream(
        Arc::new(registry),
        r#"{"functions": [{"name": "flaky", "parameters": {}}, {"name": "steady", "parameters": {}}]}"#
            .into(),
    )
    .collect()
    .await;

    let outputs: Vec<_> = items
        .iter()
        .filter_map(|i| match i {
            DispatchItem::Output(text) => Some(text.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[0], "before");
    assert!(outputs[1].starts_with("flaky Error:"));
    // The failure in `flaky` did not abort dispatch of `steady`.
    assert_eq!(outputs[2], "after");
}

#[tokio::test]
async fn stream_dispatch_of_prose_yields_nothing() {
    let registry = Arc::new(ToolRegistry::new());
    let items: Vec<_> = dispatch_stream(registry, "just words".into()).collect().await;
    assert!(items.is_empty());
}
