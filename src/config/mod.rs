//! Service configuration loaded from the environment.
//!
//! All knobs come from env vars (with a `.env` file honored in
//! development). The binary reads [`Settings::from_env`] once at startup
//! and threads the value through construction; nothing reads the
//! environment after that.

const MEMORY_SIZE_DEFAULT: usize = 10;

/// Runtime settings for the service.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    /// OpenAI-compatible completion endpoint base URL.
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub model_name: String,
    /// CoinGecko API base URL.
    pub coin_host: String,
    pub coin_api_key: String,
    /// Upstream AI-search service (SSE).
    pub ai_search_host: String,
    pub ai_search_key: String,
    pub twitter_token: String,
    /// Redis connection URL; when unset the in-process memory store is used.
    pub redis_url: Option<String>,
    /// Max exchanges retained per conversation.
    pub memory_size: usize,
}

impl Settings {
    /// Load settings from the environment, reading `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            app_name: env_or("PULSE_APP_NAME", "pulse"),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            model_name: env_or("MODEL_NAME", "gpt-4-turbo"),
            coin_host: env_or("COIN_HOST", "https://pro-api.coingecko.com"),
            coin_api_key: env_or("COIN_API_KEY", ""),
            ai_search_host: env_or("AI_SEARCH_HOST", ""),
            ai_search_key: env_or("AI_SEARCH_KEY", ""),
            twitter_token: env_or("TWITTER_TOKEN", ""),
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            memory_size: std::env::var("MEMORY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MEMORY_SIZE_DEFAULT),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "pulse".into(),
            openai_base_url: "https://api.openai.com/v1".into(),
            openai_api_key: String::new(),
            model_name: "gpt-4-turbo".into(),
            coin_host: "https://pro-api.coingecko.com".into(),
            coin_api_key: String::new(),
            ai_search_host: String::new(),
            ai_search_key: String::new(),
            twitter_token: String::new(),
            redis_url: None,
            memory_size: MEMORY_SIZE_DEFAULT,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
