// =============================================================================
// Market maker — ladder quoting on a fixed wall-clock interval
// =============================================================================
//
// A spawned task follows the index-price stream and publishes the latest
// value; the quoting loop wakes on a fixed interval, diffs the desired
// ladder against the live book and applies the plan. Quotes are post-only:
// a level that would cross the book is rejected by the gateway rather than
// taking liquidity.
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::{cancel_resting_orders, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_SECS};
use crate::config::MarketMakerConfig;
use crate::error::AgentError;
use crate::exchange::client::FuturesClient;
use crate::ladder::build_ladder;
use crate::market_data::stream::{TickStream, Topic};
use crate::reconcile::{apply_plan, plan_ladder};

/// Latest index price shared between the stream task and the quoting loop.
pub struct IndexFeed {
    price: RwLock<f64>,
    lost: AtomicBool,
}

impl IndexFeed {
    pub fn new(seed: f64) -> Self {
        Self {
            price: RwLock::new(seed),
            lost: AtomicBool::new(false),
        }
    }

    pub fn latest(&self) -> f64 {
        *self.price.read()
    }

    fn publish(&self, price: f64) {
        *self.price.write() = price;
    }

    /// True once the stream task has given up reconnecting.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Relaxed)
    }
}

/// Follow the index stream, publishing into `feed`. Reconnects a few times
/// on disconnect; marks the feed lost when the endpoint stays unreachable.
/// On the shutdown signal the subscription is unsubscribed and the transport
/// closed before returning.
async fn run_index_stream(
    ws_url: String,
    symbol: String,
    feed: Arc<IndexFeed>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempts_left = MAX_RECONNECT_ATTEMPTS;

    loop {
        match TickStream::connect(&ws_url, Topic::Instrument(&symbol)).await {
            Ok(mut stream) => {
                attempts_left = MAX_RECONNECT_ATTEMPTS;
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            stream.close().await;
                            return;
                        }
                        tick = stream.next_tick() => match tick {
                            Some(tick) => feed.publish(tick.price),
                            None => break,
                        }
                    }
                }
                warn!(symbol = %symbol, "index stream ended — reconnecting");
            }
            Err(e) => {
                attempts_left -= 1;
                warn!(
                    symbol = %symbol,
                    attempts_left,
                    error = %e,
                    "index stream connect failed"
                );
                if attempts_left == 0 {
                    error!(symbol = %symbol, "index stream lost for good");
                    feed.lost.store(true, Ordering::Relaxed);
                    return;
                }
            }
        }
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(tokio::time::Duration::from_secs(RECONNECT_DELAY_SECS)) => {}
        }
    }
}

/// Run the market maker until the index feed is lost or ctrl-c arrives,
/// then cancel the resting ladder.
pub async fn run(client: &FuturesClient, cfg: &MarketMakerConfig, ws_url: &str) -> Result<()> {
    // Seed from REST so the first pass has a price before any stream tick.
    let seed = client.get_index_price(&cfg.symbol).await?;
    let feed = Arc::new(IndexFeed::new(seed));
    info!(
        symbol = %cfg.symbol,
        index_price = seed,
        order_pairs = cfg.order_pairs,
        min_spread = cfg.min_spread,
        "market maker starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stream_task = tokio::spawn(run_index_stream(
        ws_url.to_string(),
        cfg.symbol.clone(),
        feed.clone(),
        shutdown_rx,
    ));

    let mut interval =
        tokio::time::interval(tokio::time::Duration::from_secs(cfg.loop_interval_secs));
    let mut stream_lost = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                if feed.is_lost() {
                    error!(symbol = %cfg.symbol, "index feed lost — shutting down");
                    stream_lost = true;
                    break;
                }
                if let Err(e) = quote_pass(client, cfg, feed.latest()).await {
                    if e.is_recoverable() {
                        // One bad pass never crashes the process.
                        error!(symbol = %cfg.symbol, error = %e, "quote pass failed — retrying next interval");
                    } else {
                        error!(symbol = %cfg.symbol, error = %e, "quote pass failed irrecoverably — shutting down");
                        break;
                    }
                }
            }
        }
    }

    // Shutdown sequence: cancel the resting ladder first, then tell the
    // stream task to unsubscribe and close its transport.
    cancel_resting_orders(client, &cfg.symbol).await;
    let _ = shutdown_tx.send(true);
    let _ = stream_task.await;

    if stream_lost {
        return Err(AgentError::Stream(format!(
            "index stream for {} lost after {MAX_RECONNECT_ATTEMPTS} reconnect attempts",
            cfg.symbol
        ))
        .into());
    }
    info!(symbol = %cfg.symbol, "market maker stopped");
    Ok(())
}

/// One quoting pass: snapshot position and book, rebuild the desired ladder,
/// apply the diff. Gateway failures are classified as recoverable and retried
/// on the next interval.
async fn quote_pass(
    client: &FuturesClient,
    cfg: &MarketMakerConfig,
    index_price: f64,
) -> Result<(), AgentError> {
    let position = client
        .get_position(&cfg.symbol)
        .await
        .map_err(|e| AgentError::gateway(format!("{e:#}")))?;
    let live = client
        .get_open_orders(&cfg.symbol)
        .await
        .map_err(|e| AgentError::gateway(format!("{e:#}")))?;

    info!(
        symbol = %cfg.symbol,
        index_price,
        qty = position.current_qty,
        open_orders = live.len(),
        entry = position.avg_entry_price,
        liquidation = position.liquidation_price,
        pnl_pct = position.unrealized_pnl_pct * 100.0,
        "quote pass"
    );

    let ladder = build_ladder(cfg, index_price, chrono::Utc::now().timestamp());
    let plan = plan_ladder(&ladder, &live, &position, cfg);

    if plan.is_empty() {
        debug!(symbol = %cfg.symbol, "ladder already in shape — nothing to do");
        return Ok(());
    }
    if live.is_empty() {
        info!(symbol = %cfg.symbol, "no live orders found — placing starting ladder");
    }

    apply_plan(client, &cfg.symbol, cfg.leverage, true, &plan)
        .await
        .map_err(|e| AgentError::gateway(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_feed_publishes_latest_price() {
        let feed = IndexFeed::new(10_000.0);
        assert!((feed.latest() - 10_000.0).abs() < f64::EPSILON);
        feed.publish(10_050.0);
        assert!((feed.latest() - 10_050.0).abs() < f64::EPSILON);
        assert!(!feed.is_lost());
    }

    #[tokio::test]
    async fn shutdown_signal_stops_the_index_stream_task() {
        let feed = Arc::new(IndexFeed::new(0.0));
        let (tx, rx) = watch::channel(false);
        // Endpoint that refuses the connection: the task sits in its
        // reconnect backoff, where the shutdown signal must still reach it.
        let task = tokio::spawn(run_index_stream(
            "ws://127.0.0.1:9".into(),
            "BTCUSDTPERP".into(),
            feed,
            rx,
        ));
        let _ = tx.send(true);
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("stream task must exit on shutdown")
            .expect("stream task must not panic");
    }
}
