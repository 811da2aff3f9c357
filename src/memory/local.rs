//! In-process memory backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Exchange, MemoryStore};
use crate::error::Result;

/// Process-lifetime exchange store backed by a map.
#[derive(Debug)]
pub struct InMemoryStore {
    capacity: usize,
    conversations: Mutex<HashMap<String, Vec<Exchange>>>,
}

impl InMemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            conversations: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(10)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, conversation_id: &str) -> Result<Vec<Exchange>> {
        let conversations = self.conversations.lock().unwrap();
        Ok(conversations.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn save(&self, conversation_id: &str, exchange: Exchange) -> Result<()> {
        let mut conversations = self.conversations.lock().unwrap();
        let list = conversations.entry(conversation_id.to_string()).or_default();
        list.push(exchange);
        if list.len() > self.capacity {
            let excess = list.len() - self.capacity;
            list.drain(..excess);
        }
        Ok(())
    }
}
