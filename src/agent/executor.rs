//! The per-turn execution state machine.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, error, info};

use super::events::{AgentOutput, StatusEvent};
use super::output::{FinalOutput, MaxLoops, OutputType, TurnDump};
use super::transcript::Transcript;
use crate::error::{PulseError, Result};
use crate::llm::CompletionClient;
use crate::stop::StopCondition;
use crate::tools::dispatch::{self, DispatchItem};
use crate::tools::ToolRegistry;

/// User-supplied stopping function checked against finalized responses.
pub type StoppingFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Loop configuration.
#[derive(Clone)]
pub struct ExecutorConfig {
    /// Role name responses are appended under.
    pub agent_name: String,
    /// Role name the task is appended under.
    pub user_name: String,
    pub max_loops: MaxLoops,
    /// Attempt budget per loop iteration.
    pub retry_attempts: u32,
    pub output_type: OutputType,
    /// Emit progress status events alongside output.
    pub emit_status: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            agent_name: "Agent".into(),
            user_name: "User".into(),
            max_loops: MaxLoops::Bounded(5),
            retry_attempts: 3,
            output_type: OutputType::Text,
            emit_status: false,
        }
    }
}

/// Drives one user turn across reasoning iterations.
///
/// Owned exclusively by one turn: [`AgentExecutor::complete`] consumes
/// the executor, so turn state is never shared.
pub struct AgentExecutor {
    client: Arc<dyn CompletionClient>,
    registry: Arc<ToolRegistry>,
    stop_condition: Option<Arc<dyn StopCondition>>,
    stopping_fn: Option<StoppingFn>,
    config: ExecutorConfig,
    transcript: Transcript,
}

impl AgentExecutor {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        registry: Arc<ToolRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            client,
            registry,
            stop_condition: None,
            stopping_fn: None,
            config,
            transcript: Transcript::new(),
        }
    }

    pub fn with_stop_condition(mut self, condition: Arc<dyn StopCondition>) -> Self {
        self.stop_condition = Some(condition);
        self
    }

    pub fn with_stopping_fn(mut self, f: StoppingFn) -> Self {
        self.stopping_fn = Some(f);
        self
    }

    /// Pre-seed the transcript (system prompt, tool schema, history).
    pub fn seed(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.transcript.add(role, content);
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    fn check_stop(&self, text: &str) -> bool {
        self.stop_condition
            .as_ref()
            .is_some_and(|c| c.should_stop(text))
    }

    /// Run the turn to completion, yielding output as it is produced.
    ///
    /// The stream ends with exactly one [`AgentOutput::Final`] on
    /// success, or an error once the per-iteration retry budget is
    /// exhausted. Dropping the stream cancels any in-flight model call.
    pub fn complete(
        mut self,
        task: String,
        image: Option<String>,
    ) -> BoxStream<'static, Result<AgentOutput>> {
        Box::pin(async_stream::try_stream! {
            validate_task(&task)?;

            if self.config.emit_status {
                yield AgentOutput::Status(StatusEvent::new("task understanding"));
            }

            self.transcript.add(&self.config.user_name, &task);

            let mut loop_count: u32 = 0;
            let mut all_responses: Vec<String> = Vec::new();
            let mut finalized = false;

            'turn: while self.config.max_loops.allows(loop_count) {
                loop_count += 1;
                debug!(loop_count, "agent loop iteration");

                let task_prompt = self.transcript.render();

                let mut attempt: u32 = 0;
                let mut success = false;
                let mut should_stop = false;
                let mut response = String::new();
                let mut last_error: Option<PulseError> = None;

                while attempt < self.config.retry_attempts && !success {
                    let mut stream = match self
                        .client
                        .stream_completion(&task_prompt, image.as_deref())
                        .await
                    {
                        Ok(stream) => stream,
                        Err(e) => {
                            error!(attempt = attempt + 1, error = %e, "model call failed");
                            attempt += 1;
                            last_error = Some(e);
                            continue;
                        }
                    };

                    // Stream fragments, re-checking the stop condition
                    // against the pending buffer after every token so
                    // the condition can fire mid-stream.
                    let mut whole = String::new();
                    let mut pending = String::new();
                    let mut stream_error: Option<PulseError> = None;

                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(token) => {
                                whole.push_str(&token);
                                pending.push_str(&token);

                                if should_stop || self.check_stop(&pending) {
                                    if !should_stop {
                                        info!("stopping condition met");
                                        if self.config.emit_status {
                                            yield AgentOutput::Status(StatusEvent::new(
                                                "generate response",
                                            ));
                                        }
                                    }
                                    should_stop = true;
                                    if !pending.is_empty() {
                                        yield AgentOutput::Fragment(std::mem::take(&mut pending));
                                    }
                                }
                            }
                            Err(e) => {
                                stream_error = Some(e);
                                break;
                            }
                        }
                    }

                    if let Some(e) = stream_error {
                        error!(attempt = attempt + 1, error = %e, "error generating response");
                        attempt += 1;
                        last_error = Some(e);
                        continue;
                    }

                    match normalize_response(&whole) {
                        Ok(normalized) => response = normalized,
                        Err(e) => {
                            error!(attempt = attempt + 1, error = %e, "error generating response");
                            attempt += 1;
                            last_error = Some(e);
                            continue;
                        }
                    }

                    if !should_stop {
                        // Stream tools short-circuit the turn: their
                        // output goes straight to the caller.
                        if self.registry.has_stream_tools() {
                            let mut items =
                                dispatch::dispatch_stream(self.registry.clone(), response.clone());
                            while let Some(item) = items.next().await {
                                match item {
                                    DispatchItem::Invoked { tool } => {
                                        if self.config.emit_status {
                                            yield AgentOutput::Status(StatusEvent::for_tool(
                                                "executing tool",
                                                tool,
                                            ));
                                        }
                                    }
                                    DispatchItem::Output(value) => {
                                        finalized = true;
                                        yield AgentOutput::ToolOutput(value);
                                    }
                                }
                            }
                            if finalized {
                                should_stop = true;
                                success = true;
                                break;
                            }
                        }

                        // Synchronous tool results are only observed by
                        // the model on the next iteration; their errors
                        // are logged inside dispatch and never fatal.
                        if self.registry.has_sync_tools() {
                            for (name, value) in
                                dispatch::dispatch_sync(&self.registry, &response).await
                            {
                                self.transcript
                                    .add("Tool Executor", format!("{name}: {value}"));
                            }
                        }
                    }

                    self.transcript.add(&self.config.agent_name, &response);
                    all_responses.push(response.clone());
                    success = true;
                }

                if !success {
                    error!("failed to generate a valid response after retry attempts");
                    fail_turn(last_error)?;
                }

                if should_stop {
                    break 'turn;
                }
                if self.check_stop(&response) {
                    info!("stopping condition met");
                    break 'turn;
                }
                if self.stopping_fn.as_ref().is_some_and(|f| f(&response)) {
                    info!("stopping function met");
                    break 'turn;
                }
            }

            let final_output = match self.config.output_type {
                OutputType::Text => FinalOutput::Text(all_responses.concat()),
                OutputType::List => FinalOutput::List(all_responses),
                OutputType::Json => {
                    let full_history = self.transcript.render();
                    let dump = TurnDump {
                        task: task.clone(),
                        steps: self.transcript.entries().to_vec(),
                        // Rough estimate: 1 token is about 4 chars.
                        total_tokens: full_history.len() / 4,
                        full_history,
                    };
                    FinalOutput::Json(serde_json::to_string_pretty(&dump)?)
                }
            };
            yield AgentOutput::Final(final_output);
        })
    }
}

fn validate_task(task: &str) -> Result<()> {
    if task.trim().is_empty() {
        return Err(PulseError::Configuration("task cannot be empty".into()));
    }
    Ok(())
}

fn fail_turn(last_error: Option<PulseError>) -> Result<()> {
    Err(last_error
        .unwrap_or_else(|| PulseError::Model("failed to generate a valid response".into())))
}

/// Normalize a raw model response to plain text.
///
/// A structured payload with a nested message field is unwrapped one
/// level; any other structured payload carrying `choices` without text
/// fails the attempt. Everything else (prose, tool-call JSON) passes
/// through unchanged.
fn normalize_response(raw: &str) -> Result<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Ok(raw.to_string());
    };
    let Some(object) = value.as_object() else {
        return Ok(raw.to_string());
    };
    if !object.contains_key("choices") {
        return Ok(raw.to_string());
    }

    object
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| PulseError::Model(format!("unexpected response format: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(normalize_response("Final Answer: 42").unwrap(), "Final Answer: 42");
    }

    #[test]
    fn tool_call_json_passes_through() {
        let raw = r#"{"name": "query_price_by_ids", "parameters": {}}"#;
        assert_eq!(normalize_response(raw).unwrap(), raw);
    }

    #[test]
    fn chat_payload_is_unwrapped_one_level() {
        let raw = r#"{"choices": [{"message": {"content": "hello"}}]}"#;
        assert_eq!(normalize_response(raw).unwrap(), "hello");
    }

    #[test]
    fn malformed_chat_payload_fails_the_attempt() {
        let raw = r#"{"choices": [{"message": {}}]}"#;
        assert!(matches!(normalize_response(raw), Err(PulseError::Model(_))));
    }
}
