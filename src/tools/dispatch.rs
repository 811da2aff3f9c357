//! Tool dispatch: turn raw model output into tool invocations.
//!
//! Model output that encodes a tool call is a JSON object, optionally
//! wrapped in a markdown code fence. Three shapes are accepted and
//! normalized to a descriptor list: a bare `{name, parameters}` object,
//! a `{function: {...}}` wrapper, and a `{functions: [...]}` batch.
//! Text that is not JSON at all is ordinary prose and dispatches
//! nothing; that is the common case, not an error.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{error, warn};

use super::{ToolParams, ToolRegistry};

/// A structured request to call a named tool with parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub parameters: ToolParams,
}

/// One item produced while dispatching streaming tools.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchItem {
    /// A registered tool is about to run.
    Invoked { tool: String },
    /// One value produced by a streaming tool (or an inline error
    /// string tagged with the tool name).
    Output(String),
}

/// Strip a markdown code fence (with optional language tag) if present.
pub fn extract_code_from_markdown(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse model output into a list of tool invocations.
///
/// Returns `None` when the text is not a JSON object (plain prose).
/// Descriptors missing a `name` are skipped with a warning.
pub fn parse_invocations(text: &str) -> Option<Vec<ToolInvocation>> {
    let stripped = extract_code_from_markdown(text);
    let data: serde_json::Value = serde_json::from_str(stripped).ok()?;
    let data = data.as_object()?;

    let descriptors: Vec<serde_json::Value> = if let Some(list) = data.get("functions") {
        list.as_array().cloned().unwrap_or_default()
    } else if let Some(single) = data.get("function") {
        vec![single.clone()]
    } else {
        vec![serde_json::Value::Object(data.clone())]
    };

    let mut invocations = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let Some(obj) = descriptor.as_object() else {
            continue;
        };
        let Some(name) = obj.get("name").and_then(|n| n.as_str()) else {
            warn!("tool descriptor missing name field");
            continue;
        };
        let parameters = obj
            .get("parameters")
            .and_then(|p| p.as_object())
            .cloned()
            .unwrap_or_default();
        invocations.push(ToolInvocation {
            name: name.to_string(),
            parameters,
        });
    }
    Some(invocations)
}

/// Dispatch model output against the registry's streaming tools.
///
/// Descriptors whose name does not match a registered streaming tool
/// are silently skipped. Matching tools run in descriptor order; each
/// produced value is yielded as it arrives. A tool error is logged and
/// yielded as a formatted error string without aborting dispatch of
/// subsequent descriptors.
pub fn dispatch_stream(
    registry: Arc<ToolRegistry>,
    response: String,
) -> BoxStream<'static, DispatchItem> {
    Box::pin(async_stream::stream! {
        let Some(invocations) = parse_invocations(&response) else {
            return;
        };
        for invocation in invocations {
            let Some(tool) = registry.stream_tool(&invocation.name) else {
                continue;
            };
            yield DispatchItem::Invoked {
                tool: invocation.name.clone(),
            };
            let mut outputs = tool.call(invocation.parameters);
            while let Some(item) = outputs.next().await {
                match item {
                    Ok(value) => yield DispatchItem::Output(value),
                    Err(e) => {
                        error!(tool = %invocation.name, error = %e, "tool execution failed");
                        yield DispatchItem::Output(format!("{} Error: {e}", invocation.name));
                        break;
                    }
                }
            }
        }
    })
}

/// Dispatch model output against the registry's synchronous tools.
///
/// Returns the `(name, result)` pairs of the tools that ran. Execution
/// errors are logged and skipped; a synchronous tool's effect is only
/// re-observed by the model on the next loop iteration, so they cannot
/// halt the user-visible stream.
pub async fn dispatch_sync(
    registry: &ToolRegistry,
    response: &str,
) -> Vec<(String, serde_json::Value)> {
    let Some(invocations) = parse_invocations(response) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for invocation in invocations {
        let Some(tool) = registry.sync_tool(&invocation.name) else {
            continue;
        };
        match tool.call(invocation.parameters).await {
            Ok(value) => results.push((invocation.name, value)),
            Err(e) => {
                error!(tool = %invocation.name, error = %e, "tool execution failed");
            }
        }
    }
    results
}
