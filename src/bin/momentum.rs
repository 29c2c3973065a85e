// =============================================================================
// Momentum trader — dual-momentum crossover over index-price candles
// =============================================================================

use tracing::info;
use tracing_subscriber::EnvFilter;

use perp_agents::agent::directional;
use perp_agents::config::{self, Credentials, MomentumConfig};
use perp_agents::exchange::client::FuturesClient;
use perp_agents::market_data::stream::Topic;
use perp_agents::signal::MomentumEvaluator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting momentum trader");

    // Fail fast on missing credentials or placeholder parameters — a bad
    // span must never surface mid-loop as a rejected order.
    let creds = Credentials::from_env()?;
    let cfg = MomentumConfig::from_env()?;
    info!(
        symbol = %cfg.base.symbol,
        slow = cfg.slow_span,
        fast = cfg.fast_span,
        interval_ms = cfg.base.interval_ms,
        "configuration loaded"
    );

    let client = FuturesClient::new(
        creds.api_key,
        creds.secret,
        creds.passphrase,
        config::base_url_override(),
    );

    // Seed the tick buffer with recent index history so the indicators have
    // closed candles to chew on from the first stream tick.
    let warmup = client.get_index_history(&cfg.index_symbol, 100).await?;

    let evaluator = MomentumEvaluator {
        slow_span: cfg.slow_span,
        fast_span: cfg.fast_span,
    };

    directional::run(
        &client,
        &cfg.base,
        &evaluator,
        warmup,
        &config::ws_url(),
        Topic::Instrument(&cfg.base.symbol),
    )
    .await
}
