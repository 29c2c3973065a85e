// =============================================================================
// RSI / Bollinger %B trader — mean reversion over trade-execution candles
// =============================================================================

use tracing::info;
use tracing_subscriber::EnvFilter;

use perp_agents::agent::directional;
use perp_agents::config::{self, Credentials, RsiBbConfig};
use perp_agents::exchange::client::FuturesClient;
use perp_agents::market_data::stream::Topic;
use perp_agents::signal::RsiBbEvaluator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting RSI/BBand trader");

    let creds = Credentials::from_env()?;
    let cfg = RsiBbConfig::from_env()?;
    info!(
        symbol = %cfg.base.symbol,
        rsi_span = cfg.rsi_span,
        bb_span = cfg.bb_span,
        interval_ms = cfg.base.interval_ms,
        "configuration loaded"
    );

    let client = FuturesClient::new(
        creds.api_key,
        creds.secret,
        creds.passphrase,
        config::base_url_override(),
    );

    // This agent candles the execution feed, so warm-up comes from recent
    // fills (which carry sizes — the OHLCV variant).
    let warmup = client.get_trade_history(&cfg.base.symbol).await?;

    let evaluator = RsiBbEvaluator {
        rsi_span: cfg.rsi_span,
        bb_span: cfg.bb_span,
    };

    directional::run(
        &client,
        &cfg.base,
        &evaluator,
        warmup,
        &config::ws_url(),
        Topic::Execution(&cfg.base.symbol),
    )
    .await
}
