//! Pulse server binary.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulse::agents::{coin_agent, coin_client};
use pulse::config::Settings;
use pulse::error::Result;
use pulse::memory::{InMemoryStore, MemoryStore, RedisStore};
use pulse::server::{router, AppState};

#[derive(Debug, Parser)]
#[command(name = "pulse-server")]
struct Args {
    #[arg(long, env = "PULSE_HTTP_ADDR", default_value = "0.0.0.0:8080")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();

    let memory: Arc<dyn MemoryStore> = match &settings.redis_url {
        Some(url) => {
            info!(%url, "using redis memory store");
            Arc::new(RedisStore::connect(url, settings.memory_size).await?)
        }
        None => {
            info!("using in-process memory store");
            Arc::new(InMemoryStore::new(settings.memory_size))
        }
    };

    let coin = coin_client(&settings);
    if let Err(error) = coin.refresh_index().await {
        warn!(%error, "coin index refresh failed; symbol resolution will use defaults");
    }

    let agent = coin_agent(&settings, memory, coin)?;
    let app = router(AppState {
        agent: Arc::new(agent),
    });

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    info!(addr = %args.addr, "pulse server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
