//! Crypto market agent wiring.

use std::sync::Arc;

use crate::agent::{ExecutorConfig, MaxLoops, OutputType};
use crate::config::Settings;
use crate::error::Result;
use crate::llm::OpenAiClient;
use crate::memory::MemoryStore;
use crate::tools::coin::{coin_tools, CoinClient};
use crate::tools::search::AiSearchTool;
use crate::tools::twitter::TwitterSearchTool;
use crate::tools::ToolRegistry;

use super::prompts::{tool_prompt, PULSE_SYSTEM_PROMPT};
use super::ConversationAgent;

const COIN_AGENT_MAX_LOOPS: u32 = 6;

/// Build the Pulse crypto agent: CoinGecko market tools, social search,
/// and the streaming AI-search report tool.
///
/// The coin client is passed in so the caller owns its index refresh
/// lifecycle.
pub fn coin_agent(
    settings: &Settings,
    memory: Arc<dyn MemoryStore>,
    coin: Arc<CoinClient>,
) -> Result<ConversationAgent> {
    let client = Arc::new(OpenAiClient::new(
        &settings.model_name,
        &settings.openai_api_key,
        &settings.openai_base_url,
    ));

    let mut registry = ToolRegistry::new();
    for tool in coin_tools(coin) {
        registry.register(tool)?;
    }
    registry.register(Arc::new(TwitterSearchTool::new(&settings.twitter_token)))?;
    registry.register_stream(Arc::new(AiSearchTool::new(
        &settings.ai_search_host,
        &settings.ai_search_key,
    )))?;

    let agent = ConversationAgent::new("Pulse Agent", client, Arc::new(registry), memory)
        .with_system_prompt(PULSE_SYSTEM_PROMPT)
        .with_tool_prompt(tool_prompt())
        .with_config(ExecutorConfig {
            agent_name: "Pulse Agent".into(),
            user_name: "User".into(),
            max_loops: MaxLoops::Bounded(COIN_AGENT_MAX_LOOPS),
            retry_attempts: 3,
            output_type: OutputType::List,
            emit_status: true,
        });

    Ok(agent)
}

/// Shared CoinGecko client for the agent's tool set.
pub fn coin_client(settings: &Settings) -> Arc<CoinClient> {
    Arc::new(CoinClient::new(&settings.coin_host, &settings.coin_api_key))
}
