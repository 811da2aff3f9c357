//! Bounded per-conversation exchange history.
//!
//! Each conversation owns an ordered list of [`Exchange`]s (oldest
//! first). Saving appends and then truncates from the front so the list
//! never exceeds the configured capacity. Two interchangeable backends
//! implement the same contract: [`InMemoryStore`] for process-lifetime
//! storage and [`RedisStore`] for durable TTL-backed storage.

mod local;
mod redis_store;

pub use local::InMemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One persisted (input, output) pair representing a completed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub input: String,
    pub output: String,
}

impl Exchange {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Build an exchange from a structured output, stringifying it.
    pub fn structured(input: impl Into<String>, output: &serde_json::Value) -> Self {
        let output = match output {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            input: input.into(),
            output,
        }
    }
}

/// Storage of a bounded, ordered exchange history per conversation.
///
/// Saves to different conversation ids never interfere; concurrent saves
/// to the same id are last-write-appends with no further guarantee.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// All retained exchanges for a conversation, oldest first.
    async fn get(&self, conversation_id: &str) -> Result<Vec<Exchange>>;

    /// Append an exchange, evicting the oldest beyond capacity.
    async fn save(&self, conversation_id: &str, exchange: Exchange) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_roundtrips_through_json() {
        let ex = Exchange::new("what's bitcoin price", "Final Answer: 50000");
        let json = serde_json::to_string(&ex).unwrap();
        let back: Exchange = serde_json::from_str(&json).unwrap();
        assert_eq!(ex, back);
    }

    #[test]
    fn structured_output_is_stringified() {
        let ex = Exchange::structured("q", &serde_json::json!({"bitcoin": {"usd": 50000}}));
        assert_eq!(ex.output, r#"{"bitcoin":{"usd":50000}}"#);

        let ex = Exchange::structured("q", &serde_json::json!("plain"));
        assert_eq!(ex.output, "plain");
    }
}
