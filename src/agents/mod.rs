//! Conversation agents: thin facades over the execution loop.
//!
//! A [`ConversationAgent`] wires a system prompt, tool set, and stop
//! markers to an executor, translates loop output into wire-protocol
//! events, and persists the final exchange. The concrete wiring for the
//! crypto agent lives in [`coin_agent`].

mod coin;
pub mod prompts;

pub use coin::{coin_agent, coin_client};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use tracing::{error, warn};

use crate::agent::{AgentExecutor, AgentOutput, ExecutorConfig, FinalOutput};
use crate::llm::CompletionClient;
use crate::memory::{Exchange, MemoryStore};
use crate::stop::MarkerStop;
use crate::tools::ToolRegistry;

/// Fallback reply when a turn produces no output before failing.
pub const DEFAULT_FINAL_ANSWER: &str =
    "Sorry, I can't help with that. Try rephrasing or asking a related question for better results!";

/// One wire-protocol event of the chat stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatEvent {
    Message {
        text: String,
    },
    Status {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
    },
}

impl ChatEvent {
    pub fn message(text: impl Into<String>) -> Self {
        ChatEvent::Message { text: text.into() }
    }

    /// SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::Message { .. } => "message",
            ChatEvent::Status { .. } => "status",
        }
    }

    /// JSON payload for the `data:` field.
    pub fn payload_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Full SSE frame: `event: <type>\ndata: <json>\n\n`.
    pub fn to_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_type(), self.payload_json())
    }
}

/// A named agent bound to a model client, tool registry, and memory.
pub struct ConversationAgent {
    name: String,
    system_prompt: String,
    tool_prompt: String,
    client: Arc<dyn CompletionClient>,
    registry: Arc<ToolRegistry>,
    memory: Arc<dyn MemoryStore>,
    stop: Arc<MarkerStop>,
    config: ExecutorConfig,
    default_final_answer: String,
}

impl ConversationAgent {
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn CompletionClient>,
        registry: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        let name = name.into();
        let config = ExecutorConfig {
            agent_name: name.clone(),
            ..ExecutorConfig::default()
        };
        Self {
            name,
            system_prompt: String::new(),
            tool_prompt: String::new(),
            client,
            registry,
            memory,
            stop: Arc::new(MarkerStop::final_answer()),
            config,
            default_final_answer: DEFAULT_FINAL_ANSWER.into(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_tool_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.tool_prompt = prompt.into();
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_stop(mut self, stop: MarkerStop) -> Self {
        self.stop = Arc::new(stop);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assemble a fresh executor seeded with prompts and tool schema.
    fn build_executor(&self) -> AgentExecutor {
        let mut executor = AgentExecutor::new(
            self.client.clone(),
            self.registry.clone(),
            self.config.clone(),
        )
        .with_stop_condition(self.stop.clone());

        if !self.system_prompt.is_empty() {
            executor.seed("system", &self.system_prompt);
        }
        if !self.registry.is_empty() {
            if !self.tool_prompt.is_empty() {
                executor.seed("system", &self.tool_prompt);
            }
            executor.seed("system", self.registry.openai_schema().to_string());
        }
        executor
    }

    /// Run one turn, yielding wire events.
    ///
    /// Memory is loaded before the turn and the final exchange is saved
    /// after it, including on error and on caller disconnect: whatever
    /// partial output accumulated is still persisted.
    pub fn run(&self, query: String, conversation_id: String) -> BoxStream<'static, ChatEvent> {
        let mut executor = self.build_executor();
        let memory = self.memory.clone();
        let stop = self.stop.clone();
        let fallback = self.default_final_answer.clone();

        Box::pin(async_stream::stream! {
            let guard = PersistGuard::new(memory.clone(), conversation_id.clone(), query.clone());

            let now = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
            executor.seed("System Time", format!("UTC Now: {now}"));

            match memory.get(&conversation_id).await {
                Ok(history) => {
                    for exchange in history {
                        executor.seed(
                            "History data",
                            format!("user: {}\n\nassistant: {}", exchange.input, exchange.output),
                        );
                    }
                }
                Err(e) => warn!(%conversation_id, error = %e, "failed to load memory"),
            }

            let mut finalized = false;
            let mut emitted_text = false;
            let mut outputs = executor.complete(query, None);

            while let Some(item) = outputs.next().await {
                match item {
                    Ok(AgentOutput::Status(status)) => {
                        yield ChatEvent::Status {
                            message: status.message,
                            tool_name: status.tool_name,
                        };
                    }
                    Ok(AgentOutput::ToolOutput(text)) => {
                        guard.set("...");
                        finalized = true;
                        emitted_text = true;
                        yield ChatEvent::message(text);
                    }
                    Ok(AgentOutput::Fragment(text)) | Ok(AgentOutput::Final(FinalOutput::Text(text))) => {
                        let mut clean = stop.strip(&text);
                        if !emitted_text {
                            // Stripping a leading marker leaves its
                            // trailing space behind.
                            clean = clean.trim_start().to_string();
                        }
                        guard.append(&clean);
                        finalized = true;
                        if !clean.is_empty() {
                            emitted_text = true;
                            yield ChatEvent::message(clean);
                        }
                    }
                    // List and structured forms are superseded by the
                    // fragments already streamed.
                    Ok(AgentOutput::Final(_)) => {}
                    Err(e) => {
                        error!(error = %e, "error executing agent run");
                        break;
                    }
                }
            }

            if !finalized {
                yield ChatEvent::message(fallback);
            }

            guard.persist().await;
        })
    }
}

/// Saves the turn's exchange exactly once: on the normal path via
/// [`PersistGuard::persist`], or from `Drop` when the caller disconnects
/// mid-stream.
struct PersistGuard {
    store: Arc<dyn MemoryStore>,
    conversation_id: String,
    input: String,
    buffer: Arc<Mutex<String>>,
    armed: AtomicBool,
}

impl PersistGuard {
    fn new(store: Arc<dyn MemoryStore>, conversation_id: String, input: String) -> Self {
        Self {
            store,
            conversation_id,
            input,
            buffer: Arc::new(Mutex::new(String::new())),
            armed: AtomicBool::new(true),
        }
    }

    fn append(&self, text: &str) {
        self.buffer.lock().unwrap().push_str(text);
    }

    fn set(&self, text: &str) {
        *self.buffer.lock().unwrap() = text.to_string();
    }

    fn take_exchange(&self) -> Option<Exchange> {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return None;
        }
        let output = self.buffer.lock().unwrap().clone();
        Some(Exchange::new(self.input.clone(), output))
    }

    async fn persist(&self) {
        let Some(exchange) = self.take_exchange() else {
            return;
        };
        if let Err(e) = self.store.save(&self.conversation_id, exchange).await {
            warn!(conversation_id = %self.conversation_id, error = %e, "failed to save memory");
        }
    }
}

impl Drop for PersistGuard {
    fn drop(&mut self) {
        let Some(exchange) = self.take_exchange() else {
            return;
        };
        let store = self.store.clone();
        let conversation_id = self.conversation_id.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = store.save(&conversation_id, exchange).await {
                    warn!(%conversation_id, error = %e, "failed to save memory");
                }
            });
        }
    }
}
