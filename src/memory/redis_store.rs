//! Durable Redis-backed memory backend.
//!
//! One Redis list per conversation under a namespaced key. Saves are a
//! single pipeline (RPUSH + EXPIRE + LTRIM) so the append, the TTL
//! refresh, and the capacity truncation travel together.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::warn;

use super::{Exchange, MemoryStore};
use crate::error::Result;

const KEY_PREFIX: &str = "pulse.memory";
const MEMORY_TTL_SECS: i64 = 5 * 24 * 60 * 60;

/// Exchange store backed by Redis lists with a rolling expiry.
#[derive(Clone)]
pub struct RedisStore {
    manager: redis::aio::ConnectionManager,
    capacity: usize,
}

impl RedisStore {
    /// Connect to Redis and return a store with the given capacity.
    pub async fn connect(url: &str, capacity: usize) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager, capacity })
    }

    fn key(conversation_id: &str) -> String {
        format!("{KEY_PREFIX}.{conversation_id}")
    }
}

#[async_trait]
impl MemoryStore for RedisStore {
    async fn get(&self, conversation_id: &str) -> Result<Vec<Exchange>> {
        let key = Self::key(conversation_id);
        let mut conn = self.manager.clone();
        let raw: Vec<String> = conn.lrange(&key, 0, -1).await?;

        let mut exchanges = Vec::with_capacity(raw.len());
        for item in raw {
            match serde_json::from_str::<Exchange>(&item) {
                Ok(ex) => exchanges.push(ex),
                Err(error) => {
                    warn!(%key, %error, "skipping undecodable memory entry");
                }
            }
        }
        Ok(exchanges)
    }

    async fn save(&self, conversation_id: &str, exchange: Exchange) -> Result<()> {
        let key = Self::key(conversation_id);
        let payload = serde_json::to_string(&exchange)?;
        let mut conn = self.manager.clone();

        let mut pipe = redis::pipe();
        pipe.rpush(&key, payload)
            .ignore()
            .expire(&key, MEMORY_TTL_SECS)
            .ignore()
            .ltrim(&key, -(self.capacity as isize), -1)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_conversation() {
        assert_eq!(RedisStore::key("abc-123"), "pulse.memory.abc-123");
    }

    #[test]
    fn ttl_is_five_days() {
        assert_eq!(MEMORY_TTL_SECS, 432_000);
    }
}
