// =============================================================================
// Market maker — symmetric quote ladder around the index price
// =============================================================================

use tracing::info;
use tracing_subscriber::EnvFilter;

use perp_agents::agent::market_maker;
use perp_agents::config::{self, Credentials, MarketMakerConfig};
use perp_agents::exchange::client::FuturesClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting market maker");

    let creds = Credentials::from_env()?;
    let cfg = MarketMakerConfig::from_env()?;
    info!(
        symbol = %cfg.symbol,
        order_pairs = cfg.order_pairs,
        min_spread = cfg.min_spread,
        spread_adjust = cfg.spread_adjust,
        step_size = cfg.step_size,
        loop_interval_secs = cfg.loop_interval_secs,
        "configuration loaded"
    );

    let client = FuturesClient::new(
        creds.api_key,
        creds.secret,
        creds.passphrase,
        config::base_url_override(),
    );

    market_maker::run(&client, &cfg, &config::ws_url()).await
}
