//! CoinGecko market-data client and tools.
//!
//! The client keeps a process-wide read-mostly index of coin and asset
//! platform listings, populated by an explicit [`CoinClient::refresh_index`]
//! call at startup (and refreshable at any time). Symbols and platform
//! names from the model are resolved against the index before hitting
//! the API.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{FnTool, Tool, ToolParameters, ParamsExt};
use crate::error::{PulseError, Result};

/// Byte budget for tool responses handed back to the model.
const TOOL_OUTPUT_MAX_BYTES: usize = 16_384;

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let mut cutoff = max_bytes;
    while cutoff > 0 && !s.is_char_boundary(cutoff) {
        cutoff -= 1;
    }
    s[..cutoff].to_string()
}

/// Cap a tool response to the output byte budget.
fn limit_output(value: serde_json::Value) -> serde_json::Value {
    let serialized = value.to_string();
    if serialized.len() <= TOOL_OUTPUT_MAX_BYTES {
        return value;
    }
    let mut truncated = truncate_utf8(&serialized, TOOL_OUTPUT_MAX_BYTES);
    truncated.push_str("... (truncated)");
    serde_json::Value::String(truncated)
}

#[derive(Debug, Clone, Deserialize)]
struct CoinListing {
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PlatformListing {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    native_coin_id: String,
}

/// Client for the CoinGecko API with a cached listing index.
pub struct CoinClient {
    host: String,
    api_key: String,
    coins: RwLock<HashMap<String, CoinListing>>,
    platforms: RwLock<HashMap<String, PlatformListing>>,
}

impl CoinClient {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            coins: RwLock::new(HashMap::new()),
            platforms: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the coin and platform listings and replace the index.
    pub async fn refresh_index(&self) -> Result<()> {
        let coins: Vec<CoinListing> = self.get_json("/api/v3/coins/list", &[]).await?;
        let platforms: Vec<PlatformListing> = self.get_json("/api/v3/asset_platforms", &[]).await?;

        info!(coins = coins.len(), platforms = platforms.len(), "coin index refreshed");

        *self.coins.write().await = coins.into_iter().map(|c| (c.id.clone(), c)).collect();
        *self.platforms.write().await =
            platforms.into_iter().map(|p| (p.id.clone(), p)).collect();
        Ok(())
    }

    /// Resolve a symbol or name to a CoinGecko coin id, falling back
    /// through id, exact symbol, then name containment.
    pub async fn resolve_coin(&self, symbol: &str, default: &str) -> String {
        let symbol = symbol.to_lowercase();
        let symbol = symbol.trim();
        let coins = self.coins.read().await;
        if coins.contains_key(symbol) {
            return symbol.to_string();
        }
        for (id, listing) in coins.iter() {
            if listing.symbol.to_lowercase() == symbol {
                return id.clone();
            }
        }
        for (id, listing) in coins.iter() {
            if listing.name.to_lowercase().contains(symbol) {
                return id.clone();
            }
        }
        default.to_string()
    }

    /// Resolve a chain name to a CoinGecko platform id.
    pub async fn resolve_platform(&self, platform: &str, default: &str) -> String {
        let platform = platform.to_lowercase();
        let platform = platform.trim();
        let platforms = self.platforms.read().await;
        if platforms.contains_key(platform) {
            return platform.to_string();
        }
        for (id, listing) in platforms.iter() {
            if listing.name.to_lowercase() == platform {
                return id.clone();
            }
        }
        for (id, listing) in platforms.iter() {
            if listing.native_coin_id.to_lowercase().contains(platform) {
                return id.clone();
            }
        }
        default.to_string()
    }

    /// Resolve each comma-separated symbol and rejoin.
    async fn resolve_coin_list(&self, symbols: &str, default: &str) -> String {
        let mut ids = Vec::new();
        for symbol in symbols.split(',') {
            ids.push(self.resolve_coin(symbol, default).await);
        }
        ids.join(",")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.host);
        let mut request = crate::llm::http::shared_client()
            .get(&url)
            .header("accept", "application/json")
            .query(params);
        if !self.api_key.is_empty() {
            request = request.header("x-cg-pro-api-key", &self.api_key);
        }

        let resp = request.send().await?;
        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(PulseError::api(status, body));
        }
        Ok(resp.json().await?)
    }

    /// Perform a market-data query, folding failures into an error value
    /// the model can observe.
    async fn query(&self, path: &str, params: Vec<(&str, String)>) -> serde_json::Value {
        match self.get_json::<serde_json::Value>(path, &params).await {
            Ok(value) => limit_output(value),
            Err(error) => {
                warn!(path, %error, "market data request failed");
                serde_json::json!({ "error": "request error" })
            }
        }
    }
}

/// Build the CoinGecko tool set over a shared client.
pub fn coin_tools(client: Arc<CoinClient>) -> Vec<Arc<dyn Tool>> {
    let price = {
        let client = client.clone();
        FnTool::new(
            "query_price_by_ids",
            "Query the current price of one or more cryptocurrencies.",
            ToolParameters::object()
                .string("symbols", "coin symbol or coin name, comma-separated if querying more than 1 coin", true)
                .string("vs_currencies", "target currency of coins, comma-separated if querying more than 1 currency", true)
                .build(),
            move |params| {
                let client = client.clone();
                async move {
                    let symbols = params.get_str("symbols").unwrap_or("bitcoin");
                    let vs_currencies = params.get_str("vs_currencies").unwrap_or("usd").to_string();
                    let ids = client.resolve_coin_list(symbols, "bitcoin").await;
                    Ok(client
                        .query(
                            "/api/v3/simple/price",
                            vec![("ids", ids), ("vs_currencies", vs_currencies)],
                        )
                        .await)
                }
            },
        )
    };

    let historical = {
        let client = client.clone();
        FnTool::new(
            "query_historical_data_by_ids",
            "Get historical chart data of a coin: time, price, market cap and 24h volume.",
            ToolParameters::object()
                .string("symbol", "coin symbol or coin name", true)
                .string("vs_currency", "target currency of market data", true)
                .number("days", "number of days to retrieve data for", true)
                .build(),
            move |params| {
                let client = client.clone();
                async move {
                    let symbol = params.get_str("symbol").unwrap_or("bitcoin");
                    let vs_currency = params.get_str("vs_currency").unwrap_or("usd").to_string();
                    let days = params.get_i64_opt("days").unwrap_or(7);
                    let id = client.resolve_coin(symbol, "bitcoin").await;
                    Ok(client
                        .query(
                            &format!("/api/v3/coins/{id}/market_chart"),
                            vec![("vs_currency", vs_currency), ("days", days.to_string())],
                        )
                        .await)
                }
            },
        )
    };

    let markets = {
        let client = client.clone();
        FnTool::new(
            "query_markets_by_currency",
            "Query supported coins with price, market cap, volume and market related data.",
            ToolParameters::object()
                .string("vs_currency", "target currency of coins and market data", true)
                .string("symbols", "coin symbol or coin name, comma-separated if querying more than 1 coin", false)
                .string("price_change_percentage", "price change timeframe: 1h, 24h, 7d, 14d, 30d, 200d, 1y", false)
                .build(),
            move |params| {
                let client = client.clone();
                async move {
                    let vs_currency = params.get_str("vs_currency").unwrap_or("usd").to_string();
                    let timeframe = params
                        .get_str_opt("price_change_percentage")
                        .unwrap_or("24h")
                        .to_string();
                    let mut query = vec![
                        ("vs_currency", vs_currency),
                        ("price_change_percentage", timeframe),
                    ];
                    if let Some(symbols) = params.get_str_opt("symbols") {
                        let ids = client.resolve_coin_list(symbols, "bitcoin").await;
                        query.push(("ids", ids));
                    }
                    Ok(client.query("/api/v3/coins/markets", query).await)
                }
            },
        )
    };

    let gainers = {
        let client = client.clone();
        FnTool::new(
            "query_top_gainers_losers",
            "Query the top gaining and losing coins over a time range.",
            ToolParameters::object()
                .string("vs_currency", "target currency of coins", true)
                .string("duration", "time range: 1h, 24h, 7d, 14d, 30d, 200d, 1y", false)
                .number("top_coins", "market cap ranking filter, top 300 to 1000", false)
                .build(),
            move |params| {
                let client = client.clone();
                async move {
                    let vs_currency = params.get_str("vs_currency").unwrap_or("usd").to_string();
                    let duration = params.get_str_opt("duration").unwrap_or("24h").to_string();
                    let top_coins = params.get_i64_opt("top_coins").unwrap_or(50);
                    Ok(client
                        .query(
                            "/api/v3/coins/top_gainers_losers",
                            vec![
                                ("vs_currency", vs_currency),
                                ("duration", duration),
                                ("per_page", top_coins.to_string()),
                            ],
                        )
                        .await)
                }
            },
        )
    };

    let token_price = {
        let client = client.clone();
        FnTool::new(
            "query_token_price_by_id",
            "Query the price of a token by its contract address on a chain.",
            ToolParameters::object()
                .string("platform", "chain name, such as ethereum, polygon-pos, binance-smart-chain", true)
                .string("contract_addresses", "token contract addresses, comma-separated if querying more than 1", true)
                .string("vs_currencies", "target currency of coins, comma-separated if querying more than 1", true)
                .build(),
            move |params| {
                let client = client.clone();
                async move {
                    let platform = params.get_str("platform").unwrap_or("ethereum");
                    let contract_addresses =
                        params.get_str("contract_addresses").unwrap_or_default().to_string();
                    let vs_currencies = params.get_str("vs_currencies").unwrap_or("usd").to_string();
                    let id = client.resolve_platform(platform, "ethereum").await;
                    Ok(client
                        .query(
                            &format!("/api/v3/simple/token_price/{id}"),
                            vec![
                                ("contract_addresses", contract_addresses),
                                ("vs_currencies", vs_currencies),
                            ],
                        )
                        .await)
                }
            },
        )
    };

    vec![
        Arc::new(price),
        Arc::new(historical),
        Arc::new(markets),
        Arc::new(gainers),
        Arc::new(token_price),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_client() -> CoinClient {
        let client = CoinClient::new("https://api.example", "");
        {
            let mut coins = client.coins.try_write().unwrap();
            coins.insert(
                "bitcoin".into(),
                CoinListing {
                    id: "bitcoin".into(),
                    symbol: "btc".into(),
                    name: "Bitcoin".into(),
                },
            );
            coins.insert(
                "ethereum".into(),
                CoinListing {
                    id: "ethereum".into(),
                    symbol: "eth".into(),
                    name: "Ethereum".into(),
                },
            );
        }
        {
            let mut platforms = client.platforms.try_write().unwrap();
            platforms.insert(
                "polygon-pos".into(),
                PlatformListing {
                    id: "polygon-pos".into(),
                    name: "Polygon POS".into(),
                    native_coin_id: "matic-network".into(),
                },
            );
        }
        client
    }

    #[tokio::test]
    async fn resolve_coin_by_id_symbol_and_name() {
        let client = seeded_client();
        assert_eq!(client.resolve_coin("bitcoin", "x").await, "bitcoin");
        assert_eq!(client.resolve_coin("BTC", "x").await, "bitcoin");
        assert_eq!(client.resolve_coin("ether", "x").await, "ethereum");
        assert_eq!(client.resolve_coin("dogecoin", "fallback").await, "fallback");
    }

    #[tokio::test]
    async fn resolve_platform_by_name() {
        let client = seeded_client();
        assert_eq!(client.resolve_platform("polygon pos", "x").await, "polygon-pos");
        assert_eq!(client.resolve_platform("unknown-chain", "ethereum").await, "ethereum");
    }

    #[tokio::test]
    async fn resolve_coin_list_joins_ids() {
        let client = seeded_client();
        assert_eq!(
            client.resolve_coin_list("btc,eth", "bitcoin").await,
            "bitcoin,ethereum"
        );
    }

    #[test]
    fn oversized_output_is_truncated() {
        let big = "x".repeat(TOOL_OUTPUT_MAX_BYTES * 2);
        let value = serde_json::json!({ "data": big });
        let limited = limit_output(value);
        let text = limited.as_str().unwrap();
        assert!(text.len() < TOOL_OUTPUT_MAX_BYTES + 32);
        assert!(text.ends_with("... (truncated)"));
    }

    #[test]
    fn small_output_passes_through() {
        let value = serde_json::json!({ "bitcoin": { "usd": 50000 } });
        assert_eq!(limit_output(value.clone()), value);
    }

    #[test]
    fn tool_set_covers_market_endpoints() {
        let client = Arc::new(CoinClient::new("https://api.example", ""));
        let tools = coin_tools(client);
        let names: Vec<_> = tools.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(
            names,
            [
                "query_price_by_ids",
                "query_historical_data_by_ids",
                "query_markets_by_currency",
                "query_top_gainers_losers",
                "query_token_price_by_id",
            ]
        );
    }
}
