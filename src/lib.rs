//! Pulse: conversational agent service for crypto market intelligence.
//!
//! Exposes LLM-driven agents over HTTP server-sent events, backed by
//! domain tools (CoinGecko market data, social search, scoring) and
//! persisted per-conversation memory.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pulse::agents::{coin_agent, coin_client};
//! use pulse::config::Settings;
//! use pulse::memory::InMemoryStore;
//!
//! # fn example() -> pulse::error::Result<()> {
//! let settings = Settings::from_env();
//! let memory = Arc::new(InMemoryStore::new(settings.memory_size));
//! let agent = coin_agent(&settings, memory, coin_client(&settings))?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod server;
pub mod stop;
pub mod tools;
