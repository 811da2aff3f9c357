//! OpenAI Chat Completions streaming client.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use super::http::{bearer_headers, parse_sse_data, shared_client, status_to_error};
use super::{CompletionClient, CompletionStream};
use crate::error::{PulseError, Result};

const TEMPERATURE_DEFAULT: f64 = 0.01;

/// Streaming client for an OpenAI-compatible chat completions API.
pub struct OpenAiClient {
    model: String,
    api_key: String,
    base_url: String,
    temperature: f64,
}

impl OpenAiClient {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            temperature: TEMPERATURE_DEFAULT,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request_body(&self, prompt: &str, image: Option<&str>) -> serde_json::Value {
        // The loop renders the whole transcript into one prompt string,
        // so each call carries a single user message.
        let content = match image {
            None => serde_json::json!(prompt),
            Some(url) => serde_json::json!([
                { "type": "text", "text": prompt },
                { "type": "image_url", "image_url": { "url": url } },
            ]),
        };

        serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "temperature": self.temperature,
            "stream": true,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_completion(
        &self,
        prompt: &str,
        image: Option<&str>,
    ) -> Result<CompletionStream> {
        let body = self.build_request_body(prompt, image);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, "streaming completion");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(PulseError::Network(e));
                        break;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(data) = parse_sse_data(&line) {
                        match serde_json::from_str::<StreamChunk>(data) {
                            Ok(chunk) => {
                                if let Some(choice) = chunk.choices.into_iter().next() {
                                    if let Some(text) = choice.delta.content {
                                        if !text.is_empty() {
                                            yield Ok(text);
                                        }
                                    }
                                }
                            }
                            Err(_) => {} // skip unparseable chunks
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}
