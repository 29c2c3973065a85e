// =============================================================================
// Ladder generation — symmetric quote levels around the index price
// =============================================================================
//
// Level k (innermost = 1) quotes at k * min_spread away from the index:
// sells above, buys below. Size grows linearly with distance, k * step_size
// lots, so the outer levels absorb larger moves. With order_pairs = 5 the
// desired book is exactly 10 orders.
// =============================================================================

use crate::config::MarketMakerConfig;
use crate::types::{client_order_id, DesiredOrder, Side};

/// One desired quote level before matching against the live book.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderLevel {
    /// 1-based distance from the index price.
    pub level: u64,
    pub order: DesiredOrder,
    /// Signed target spread as a fraction (+ above index, - below).
    pub spread_target: f64,
}

/// Build the full desired ladder for the given index price, sells first
/// (outermost to innermost) then buys (innermost to outermost).
///
/// Prices are truncated to whole price units, matching the gateway's integer
/// tick for this contract.
pub fn build_ladder(cfg: &MarketMakerConfig, index_price: f64, ts_secs: i64) -> Vec<LadderLevel> {
    let mut levels = Vec::with_capacity(cfg.order_pairs as usize * 2);

    for k in (1..=cfg.order_pairs).rev() {
        levels.push(level_at(cfg, index_price, Side::Sell, k, ts_secs));
    }
    for k in 1..=cfg.order_pairs {
        levels.push(level_at(cfg, index_price, Side::Buy, k, ts_secs));
    }

    levels
}

fn level_at(
    cfg: &MarketMakerConfig,
    index_price: f64,
    side: Side,
    level: u64,
    ts_secs: i64,
) -> LadderLevel {
    let spread_target = match side {
        Side::Sell => cfg.min_spread * level as f64,
        Side::Buy => -cfg.min_spread * level as f64,
    };
    let price = ((1.0 + spread_target) * index_price).trunc() as i64;
    let size = level * cfg.step_size;

    LadderLevel {
        level,
        spread_target,
        order: DesiredOrder {
            side,
            price,
            size,
            client_id: client_order_id(&cfg.prefix, side, size, price, ts_secs),
        },
    }
}
