// =============================================================================
// Directional agents — one reconciliation pass per market-data tick
// =============================================================================
//
// Shared run loop for the momentum and RSI/%B traders. Each incoming tick
// drives one synchronous pass: append → prune → aggregate → evaluate →
// reconcile. A recoverable failure inside a pass (transient gateway error,
// not-yet-warmed indicators) is logged and the loop moves on to the next
// tick; it must never crash the process. Losing the stream for good runs the
// shutdown sequence instead.
// =============================================================================

use anyhow::Result;
use tracing::{debug, error, info, warn};

use super::{cancel_resting_orders, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_SECS};
use crate::config::DirectionalConfig;
use crate::error::AgentError;
use crate::exchange::client::FuturesClient;
use crate::market_data::candles::{aggregate, Candle};
use crate::market_data::stream::{TickStream, Topic};
use crate::market_data::tick_buffer::{Tick, TickBuffer};
use crate::reconcile::{apply_plan, plan_directional, OrderAction};
use crate::signal::{Decision, MomentumEvaluator, RsiBbEvaluator, SignalState};

/// Strategy seam: both directional evaluators plug into the same loop.
pub trait Evaluate {
    fn evaluate(&self, candles: &[Candle], state: &mut SignalState) -> Option<Decision>;
}

impl Evaluate for MomentumEvaluator {
    fn evaluate(&self, candles: &[Candle], state: &mut SignalState) -> Option<Decision> {
        MomentumEvaluator::evaluate(self, candles, state)
    }
}

impl Evaluate for RsiBbEvaluator {
    fn evaluate(&self, candles: &[Candle], state: &mut SignalState) -> Option<Decision> {
        RsiBbEvaluator::evaluate(self, candles, state)
    }
}

/// Run a directional agent until the stream is lost or ctrl-c arrives, then
/// cancel resting orders and close the transport.
pub async fn run(
    client: &FuturesClient,
    cfg: &DirectionalConfig,
    evaluator: &impl Evaluate,
    warmup: Vec<Tick>,
    ws_url: &str,
    topic: Topic<'_>,
) -> Result<()> {
    let mut buffer = TickBuffer::from_history(warmup);
    buffer.prune(cfg.max_rows);
    info!(
        symbol = %cfg.symbol,
        warmup_ticks = buffer.len(),
        interval_ms = cfg.interval_ms,
        "directional agent starting"
    );

    let mut state = SignalState::default();
    let mut stream = TickStream::connect(ws_url, topic).await?;
    let mut stream_lost = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("shutdown signal received");
                break;
            }
            tick = stream.next_tick() => {
                match tick {
                    Some(tick) => {
                        if let Err(e) = pass(client, cfg, evaluator, &mut buffer, &mut state, tick).await {
                            if e.is_recoverable() {
                                // One bad pass never crashes the process.
                                error!(symbol = %cfg.symbol, error = %e, "pass failed — skipping to next tick");
                            } else {
                                error!(symbol = %cfg.symbol, error = %e, "pass failed irrecoverably");
                                break;
                            }
                        }
                    }
                    None => {
                        match reconnect(ws_url, topic).await {
                            Some(new_stream) => {
                                stream = new_stream;
                                continue;
                            }
                            None => {
                                error!(symbol = %cfg.symbol, "market-data stream lost for good");
                                stream_lost = true;
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    cancel_resting_orders(client, &cfg.symbol).await;
    stream.close().await;

    if stream_lost {
        return Err(AgentError::Stream(format!(
            "market-data stream for {} lost after {MAX_RECONNECT_ATTEMPTS} reconnect attempts",
            cfg.symbol
        ))
        .into());
    }
    info!(symbol = %cfg.symbol, "directional agent stopped");
    Ok(())
}

/// One full tick-to-order pass. Gateway failures come back as recoverable
/// errors; the loop skips the pass and waits for the next tick.
async fn pass(
    client: &FuturesClient,
    cfg: &DirectionalConfig,
    evaluator: &impl Evaluate,
    buffer: &mut TickBuffer,
    state: &mut SignalState,
    tick: Tick,
) -> Result<(), AgentError> {
    buffer.push(tick);
    buffer.prune(cfg.max_rows);

    let candles = aggregate(buffer.iter(), cfg.interval_ms);
    let decision = match evaluator.evaluate(&candles, state) {
        Some(d) => d,
        None => return Ok(()),
    };

    // Only the risk gate consumes the snapshot, so it is refreshed when an
    // intent fires rather than on every tick.
    let position = client
        .get_position(&cfg.symbol)
        .await
        .map_err(|e| AgentError::gateway(format!("{e:#}")))?;
    debug!(
        symbol = %cfg.symbol,
        qty = position.current_qty,
        entry = position.avg_entry_price,
        liquidation = position.liquidation_price,
        pnl_pct = position.unrealized_pnl_pct * 100.0,
        "position snapshot"
    );

    let order = match plan_directional(&decision, cfg, &position, chrono::Utc::now().timestamp()) {
        Some(order) => order,
        None => return Ok(()), // risk gate suppressed the order, already logged
    };

    let plan = [OrderAction::Create(order)];
    apply_plan(client, &cfg.symbol, cfg.leverage, false, &plan)
        .await
        .map_err(|e| AgentError::gateway(format!("{e:#}")))
}

/// Try to re-establish the subscription a few times before declaring the
/// stream lost.
async fn reconnect(ws_url: &str, topic: Topic<'_>) -> Option<TickStream> {
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        warn!(attempt, "market-data stream ended — reconnecting");
        tokio::time::sleep(tokio::time::Duration::from_secs(RECONNECT_DELAY_SECS)).await;
        match TickStream::connect(ws_url, topic).await {
            Ok(stream) => return Some(stream),
            Err(e) => warn!(attempt, error = %e, "reconnect attempt failed"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskLimits;

    fn cfg() -> DirectionalConfig {
        DirectionalConfig {
            symbol: "BTCUSDTPERP".into(),
            prefix: "POLO_MOM".into(),
            leverage: 25,
            trade_size: 5,
            max_slippage: 0.025,
            interval_ms: 15_000,
            max_rows: 500,
            risk: RiskLimits {
                long: 500,
                short: -500,
            },
        }
    }

    fn rising_ticks(n: usize) -> Vec<Tick> {
        (0..n)
            .map(|i| Tick {
                timestamp_ms: i as i64 * 15_000,
                price: 100.0 + i as f64,
                size: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn gateway_failure_in_a_pass_is_recoverable() {
        // Gateway that refuses connections: the pass must fail with a
        // recoverable error, never tear the loop down.
        let client = FuturesClient::new("key", "secret", "pass", Some("http://127.0.0.1:9".into()));
        let cfg = cfg();
        let evaluator = MomentumEvaluator {
            slow_span: 4,
            fast_span: 2,
        };
        let mut buffer = TickBuffer::from_history(rising_ticks(8));
        let mut state = SignalState::default();

        // Rising closes fire a buy intent, which then needs the position
        // snapshot from the dead gateway.
        let tick = Tick {
            timestamp_ms: 8 * 15_000,
            price: 108.0,
            size: None,
        };
        let err = pass(&client, &cfg, &evaluator, &mut buffer, &mut state, tick)
            .await
            .unwrap_err();
        assert!(err.is_recoverable(), "gateway failures must be retryable");
        assert!(matches!(err, AgentError::Gateway(_)));
    }
}
