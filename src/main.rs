//! EventGenie agents - HTTP server entry point.

use eventgenie_agents::{api, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "eventgenie_agents=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "Starting eventgenie-agents v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_addr()
    );

    api::serve(config).await
}
