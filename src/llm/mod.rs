//! Language model client boundary.
//!
//! The agent loop talks to a [`CompletionClient`]: a streaming call
//! taking a rendered prompt (plus optional image reference) and yielding
//! text fragments. The stream is pull-driven; dropping it cancels the
//! underlying request.

pub mod http;
mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Streaming text fragments from one completion call.
pub type CompletionStream = BoxStream<'static, Result<String>>;

/// A streaming completion source.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// The model identifier this client serves.
    fn model_id(&self) -> &str;

    /// Stream a completion for the rendered prompt.
    async fn stream_completion(
        &self,
        prompt: &str,
        image: Option<&str>,
    ) -> Result<CompletionStream>;
}
