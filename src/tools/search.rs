//! AI-search streaming tool.
//!
//! Proxies the upstream research-report service: an SSE endpoint whose
//! lines are forwarded to the caller verbatim as they arrive. The
//! stream is open-ended; dropping it cancels the upstream request.

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;

use super::{ParamsExt, StreamTool, ToolParameters, ToolParams};
use crate::error::PulseError;
use crate::llm::http::shared_client;

/// Streaming research-report tool backed by the AI-search service.
pub struct AiSearchTool {
    host: String,
    api_key: String,
    parameters: ToolParameters,
}

impl AiSearchTool {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            parameters: ToolParameters::object()
                .string(
                    "query",
                    "coin symbol, coin name, or one or more comma-separated token contract addresses",
                    true,
                )
                .build(),
        }
    }
}

impl StreamTool for AiSearchTool {
    fn name(&self) -> &str {
        "ai_search"
    }

    fn description(&self) -> &str {
        "Generate a coins research report for a given query."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn call(&self, params: ToolParams) -> BoxStream<'static, crate::error::Result<String>> {
        let url = format!("{}/api/pulse/ai/search", self.host);
        let api_key = self.api_key.clone();
        let query = params.get_str_opt("query").unwrap_or_default().to_string();

        Box::pin(async_stream::stream! {
            debug!(%query, "ai search request");
            let resp = shared_client()
                .get(&url)
                .header("accept", "text/event-stream")
                .header("x-api-key", &api_key)
                .query(&[("query", &query)])
                .send()
                .await;

            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    yield Err(PulseError::Network(e));
                    return;
                }
            };

            let status = resp.status().as_u16();
            if status != 200 {
                yield Ok(format!("Request failed with status code: {status}"));
                return;
            }

            let mut buffer = String::new();
            let byte_stream = resp.bytes_stream();
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(PulseError::Network(e));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end + 1].to_string();
                    buffer = buffer[line_end + 1..].to_string();
                    yield Ok(line);
                }
            }

            if !buffer.is_empty() {
                yield Ok(buffer);
            }
        })
    }
}
