//! Shared test doubles.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use pulse::error::{PulseError, Result};
use pulse::llm::{CompletionClient, CompletionStream};
use pulse::tools::{StreamTool, ToolParameters, ToolParams};

/// One scripted model call.
pub enum Step {
    /// Stream these tokens, then end successfully.
    Respond(Vec<&'static str>),
    /// Fail before any token is produced.
    Fail(&'static str),
    /// Stream some tokens, then fail mid-stream.
    FailAfter(Vec<&'static str>, &'static str),
}

/// Completion client that replays a script and records every prompt.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn stream_completion(
        &self,
        prompt: &str,
        _image: Option<&str>,
    ) -> Result<CompletionStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Respond(vec!["Final Answer: done"]));

        match step {
            Step::Fail(message) => Err(PulseError::Stream(message.to_string())),
            Step::Respond(tokens) => {
                let items: Vec<Result<String>> =
                    tokens.into_iter().map(|t| Ok(t.to_string())).collect();
                Ok(futures::stream::iter(items).boxed())
            }
            Step::FailAfter(tokens, message) => {
                let mut items: Vec<Result<String>> =
                    tokens.into_iter().map(|t| Ok(t.to_string())).collect();
                items.push(Err(PulseError::Stream(message.to_string())));
                Ok(futures::stream::iter(items).boxed())
            }
        }
    }
}

/// Streaming tool that replays fixed items.
pub struct FixedStreamTool {
    name: &'static str,
    items: Vec<Result<String>>,
    parameters: ToolParameters,
    pub calls: AtomicUsize,
}

impl FixedStreamTool {
    pub fn new(name: &'static str, items: Vec<Result<String>>) -> Self {
        Self {
            name,
            items,
            parameters: ToolParameters::empty(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl StreamTool for FixedStreamTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test stream tool"
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn call(&self, _params: ToolParams) -> BoxStream<'static, Result<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let items: Vec<Result<String>> = self
            .items
            .iter()
            .map(|item| match item {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(PulseError::Stream(e.to_string())),
            })
            .collect();
        futures::stream::iter(items).boxed()
    }
}
