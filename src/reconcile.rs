// =============================================================================
// Order reconciliation — desired orders vs the live book
// =============================================================================
//
// Planning is pure: given the desired order set, the live open orders and the
// current position, produce a list of actions. Applying the plan is the only
// part that touches the gateway. Both directional agents and the market maker
// go through this split so the diff logic is testable without an exchange.
//
// Replacement is cancel-then-create, never amend. That leaves a brief window
// with no resting order at the level; accepted tradeoff for a single, simple
// code path.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{DirectionalConfig, MarketMakerConfig};
use crate::exchange::client::{FuturesClient, LimitOrderRequest};
use crate::ladder::LadderLevel;
use crate::signal::Decision;
use crate::types::{client_order_id, DesiredOrder, LiveOrder, Position, Side};

/// One step of a reconciliation plan.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderAction {
    /// Place a fresh order at a level with no live counterpart.
    Create(DesiredOrder),
    /// Cancel a drifted live order, then place its replacement.
    Replace {
        cancel_id: String,
        order: DesiredOrder,
    },
}

// ---------------------------------------------------------------------------
// Directional mode
// ---------------------------------------------------------------------------

/// Turn an actioned signal into a single limit order, or nothing when the
/// risk gate suppresses it.
///
/// The limit price concedes `max_slippage` in the trader's favourite
/// direction to fill — above the close for a buy, below for a sell — and is
/// truncated to whole price units.
pub fn plan_directional(
    decision: &Decision,
    cfg: &DirectionalConfig,
    position: &Position,
    ts_secs: i64,
) -> Option<DesiredOrder> {
    if cfg.risk.check(decision.intent, position.current_qty).is_blocked() {
        // The gate already logged side, qty and limit.
        return None;
    }

    let price = match decision.intent {
        Side::Buy => (decision.reference_close * (1.0 + cfg.max_slippage)).trunc() as i64,
        Side::Sell => (decision.reference_close * (1.0 - cfg.max_slippage)).trunc() as i64,
    };

    Some(DesiredOrder {
        side: decision.intent,
        price,
        size: cfg.trade_size,
        client_id: client_order_id(&cfg.prefix, decision.intent, cfg.trade_size, price, ts_secs),
    })
}

// ---------------------------------------------------------------------------
// Ladder mode
// ---------------------------------------------------------------------------

/// Diff the desired ladder against the live book.
///
/// Desired levels are matched to live orders by `(side, size)`. Unmatched
/// levels are created while the book (live plus already-planned creates)
/// stays under `2 * order_pairs`. Matched levels whose live price has
/// drifted beyond `min_spread * (1 + spread_adjust)` from the target are
/// cancelled and re-created. Every prospective order passes the per-side
/// risk gate.
pub fn plan_ladder(
    ladder: &[LadderLevel],
    live: &[LiveOrder],
    position: &Position,
    cfg: &MarketMakerConfig,
) -> Vec<OrderAction> {
    let max_orders = (cfg.order_pairs * 2) as usize;
    let replace_threshold = cfg.min_spread * (1.0 + cfg.spread_adjust);

    let mut actions = Vec::new();
    let mut matched: Vec<bool> = vec![false; live.len()];
    let mut planned_creates = 0usize;

    for level in ladder {
        if cfg
            .risk
            .check(level.order.side, position.current_qty)
            .is_blocked()
        {
            continue;
        }

        let found = live.iter().enumerate().find(|(i, o)| {
            !matched[*i] && o.side == level.order.side && o.size == level.order.size
        });

        match found {
            None => {
                if live.len() + planned_creates < max_orders {
                    debug!(
                        side = %level.order.side,
                        size = level.order.size,
                        price = level.order.price,
                        "no live order at level — creating"
                    );
                    planned_creates += 1;
                    actions.push(OrderAction::Create(level.order.clone()));
                }
            }
            Some((i, order)) => {
                matched[i] = true;
                let spread_move = (level.order.price as f64 / order.price - 1.0).abs();
                if spread_move > replace_threshold {
                    info!(
                        side = %order.side,
                        size = order.size,
                        live_price = order.price,
                        target_price = level.order.price,
                        spread_move,
                        "live order drifted beyond tolerance — replacing"
                    );
                    actions.push(OrderAction::Replace {
                        cancel_id: order.id.clone(),
                        order: level.order.clone(),
                    });
                }
            }
        }
    }

    actions
}

// ---------------------------------------------------------------------------
// Plan application
// ---------------------------------------------------------------------------

/// Issue the gateway calls for a plan, in order. Replacements cancel first so
/// the level is never double-booked.
pub async fn apply_plan(
    client: &FuturesClient,
    symbol: &str,
    leverage: u32,
    post_only: bool,
    plan: &[OrderAction],
) -> Result<()> {
    for action in plan {
        match action {
            OrderAction::Create(order) => {
                let order_id = client
                    .create_limit_order(&LimitOrderRequest {
                        symbol: symbol.to_string(),
                        side: order.side,
                        leverage,
                        size: order.size,
                        price: order.price.to_string(),
                        post_only,
                        client_oid: Some(order.client_id.clone()),
                    })
                    .await
                    .with_context(|| {
                        format!(
                            "create failed: {} {} @ {}",
                            order.side, order.size, order.price
                        )
                    })?;
                info!(
                    client_id = %order.client_id,
                    server_id = %order_id,
                    side = %order.side,
                    size = order.size,
                    price = order.price,
                    "order placed"
                );
            }
            OrderAction::Replace { cancel_id, order } => {
                client
                    .cancel_order(cancel_id)
                    .await
                    .with_context(|| format!("cancel failed for order {cancel_id}"))?;
                let order_id = client
                    .create_limit_order(&LimitOrderRequest {
                        symbol: symbol.to_string(),
                        side: order.side,
                        leverage,
                        size: order.size,
                        price: order.price.to_string(),
                        post_only,
                        client_oid: Some(order.client_id.clone()),
                    })
                    .await
                    .with_context(|| {
                        format!(
                            "replacement create failed: {} {} @ {}",
                            order.side, order.size, order.price
                        )
                    })?;
                info!(
                    cancelled = %cancel_id,
                    client_id = %order.client_id,
                    server_id = %order_id,
                    side = %order.side,
                    size = order.size,
                    price = order.price,
                    "order adjusted"
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::build_ladder;
    use crate::risk::RiskLimits;

    fn mm_cfg() -> MarketMakerConfig {
        MarketMakerConfig {
            symbol: "BTCUSDTPERP".into(),
            prefix: "POLO_MM".into(),
            leverage: 25,
            loop_interval_secs: 15,
            order_pairs: 5,
            min_spread: 0.001,
            spread_adjust: 0.002,
            step_size: 5,
            risk: RiskLimits {
                long: 2000,
                short: -2000,
            },
        }
    }

    fn dir_cfg() -> DirectionalConfig {
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

    fn flat() -> Position {
        Position::default()
    }

    fn live(id: &str, side: Side, price: f64, size: u64) -> LiveOrder {
        LiveOrder {
            id: id.into(),
            client_id: format!("cid-{id}"),
            side,
            price,
            size,
            status: "active".into(),
        }
    }

    // ---- directional ------------------------------------------------------

    #[test]
    fn sell_limit_sits_below_close() {
        let decision = Decision {
            intent: Side::Sell,
            reference_close: 10_000.0,
            bucket: 0,
        };
        let order = plan_directional(&decision, &dir_cfg(), &flat(), 1_700_000_000).unwrap();
        assert_eq!(order.price, 9_750); // 10000 * 0.975
        assert_eq!(order.size, 5);
    }

    #[test]
    fn buy_limit_sits_above_close() {
        let decision = Decision {
            intent: Side::Buy,
            reference_close: 10_000.0,
            bucket: 0,
        };
        let order = plan_directional(&decision, &dir_cfg(), &flat(), 0).unwrap();
        assert_eq!(order.price, 10_250); // 10000 * 1.025
    }

    #[test]
    fn risk_gate_suppresses_directional_order() {
        let decision = Decision {
            intent: Side::Buy,
            reference_close: 10_000.0,
            bucket: 0,
        };
        let long_position = Position {
            current_qty: 501,
            ..Position::default()
        };
        assert!(plan_directional(&decision, &dir_cfg(), &long_position, 0).is_none());

        // The opposite side is unaffected.
        let sell = Decision {
            intent: Side::Sell,
            ..decision
        };
        assert!(plan_directional(&sell, &dir_cfg(), &long_position, 0).is_some());
    }

    // ---- ladder -----------------------------------------------------------

    #[test]
    fn empty_book_creates_the_full_ladder() {
        let cfg = mm_cfg();
        let ladder = build_ladder(&cfg, 10_000.0, 0);
        let plan = plan_ladder(&ladder, &[], &flat(), &cfg);

        assert_eq!(plan.len(), 10);
        let creates: Vec<&DesiredOrder> = plan
            .iter()
            .map(|a| match a {
                OrderAction::Create(o) => o,
                other => panic!("expected create, got {other:?}"),
            })
            .collect();
        assert_eq!(creates.iter().filter(|o| o.side == Side::Buy).count(), 5);
        assert_eq!(creates.iter().filter(|o| o.side == Side::Sell).count(), 5);
    }

    #[test]
    fn matched_order_within_tolerance_is_left_alone() {
        let cfg = mm_cfg();
        let ladder = build_ladder(&cfg, 10_000.0, 0);
        // Live book mirrors the desired ladder exactly.
        let book: Vec<LiveOrder> = ladder
            .iter()
            .enumerate()
            .map(|(i, l)| live(&i.to_string(), l.order.side, l.order.price as f64, l.order.size))
            .collect();

        let plan = plan_ladder(&ladder, &book, &flat(), &cfg);
        assert!(plan.is_empty());
    }

    #[test]
    fn drifted_order_is_cancelled_and_recreated() {
        // Scenario from the strategy definition: live sell size 25 at 10000,
        // target 10050; spread_move 0.005 > 0.001 * 1.002.
        let cfg = mm_cfg();
        let ladder = build_ladder(&cfg, 10_000.0, 0);
        let target = ladder
            .iter()
            .find(|l| l.order.side == Side::Sell && l.order.size == 25)
            .unwrap();
        assert_eq!(target.order.price, 10_050);

        let mut book: Vec<LiveOrder> = ladder
            .iter()
            .enumerate()
            .map(|(i, l)| live(&i.to_string(), l.order.side, l.order.price as f64, l.order.size))
            .collect();
        let drifted = book
            .iter_mut()
            .find(|o| o.side == Side::Sell && o.size == 25)
            .unwrap();
        drifted.price = 10_000.0;
        let drifted_id = drifted.id.clone();

        let plan = plan_ladder(&ladder, &book, &flat(), &cfg);
        assert_eq!(plan.len(), 1);
        match &plan[0] {
            OrderAction::Replace { cancel_id, order } => {
                assert_eq!(*cancel_id, drifted_id);
                assert_eq!(order.price, 10_050);
                assert_eq!(order.size, 25);
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn creates_stop_at_the_order_cap() {
        let cfg = mm_cfg();
        let ladder = build_ladder(&cfg, 10_000.0, 0);
        // Eight live orders that match nothing: only two creates fit under
        // the 10-order cap.
        let book: Vec<LiveOrder> = (0..8)
            .map(|i| live(&i.to_string(), Side::Sell, 20_000.0, 999))
            .collect();
        let plan = plan_ladder(&ladder, &book, &flat(), &cfg);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn long_breach_gates_buy_levels_only() {
        let cfg = mm_cfg();
        let ladder = build_ladder(&cfg, 10_000.0, 0);
        let long_position = Position {
            current_qty: 2_001,
            ..Position::default()
        };
        let plan = plan_ladder(&ladder, &[], &long_position, &cfg);
        assert_eq!(plan.len(), 5);
        for action in &plan {
            match action {
                OrderAction::Create(o) => assert_eq!(o.side, Side::Sell),
                other => panic!("expected create, got {other:?}"),
            }
        }
    }

    #[test]
    fn short_breach_gates_sell_levels() {
        let cfg = mm_cfg();
        let ladder = build_ladder(&cfg, 10_000.0, 0);
        let short_position = Position {
            current_qty: -2_001,
            ..Position::default()
        };
        let plan = plan_ladder(&ladder, &[], &short_position, &cfg);
        assert_eq!(plan.len(), 5);
        for action in &plan {
            match action {
                OrderAction::Create(o) => assert_eq!(o.side, Side::Buy),
                other => panic!("expected create, got {other:?}"),
            }
        }
    }
}
