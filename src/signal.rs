// =============================================================================
// Signal evaluation — indicator thresholds to trade intent
// =============================================================================
//
// Both directional strategies evaluate only the last CLOSED candle; the
// still-forming bucket is never decision-eligible. Signal state is sticky:
// the tracked position is the last non-none intent and persists across
// evaluations until overridden (there is no flattening signal). De-dup is by
// bucket identity — an intent is actioned at most once per closed bucket, and
// the guard only ever moves forward.
//
// Momentum entry:  fast MOM > 0 AND slow MOM > 0  => buy
//                  fast MOM < 0 AND slow MOM < 0  => sell
//
// RSI/%B entry:    RSI < 40 AND %B < 0            => buy
//                  RSI > 60 AND %B > 1            => sell
//      cool-off:   holding long  AND RSI > 60     => sell (close)
//                  holding short AND RSI < 40     => buy  (close)
//
// Indicator warm-up values are None and never satisfy a comparison, so no
// intent can fire before the largest look-back span has filled.
// =============================================================================

use tracing::{debug, info};

use crate::indicators::{momentum, percent_b, rsi};
use crate::market_data::candles::{closed_closes, last_closed, Candle};
use crate::types::Side;

/// RSI entry/exit thresholds (cool-off levels from the strategy definition).
const RSI_LOW: f64 = 40.0;
const RSI_HIGH: f64 = 60.0;

/// An actionable trading decision for one closed candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub intent: Side,
    /// Close price of the candle that produced the intent; the limit price
    /// is derived from it.
    pub reference_close: f64,
    /// Bucket identity, used for de-duplication.
    pub bucket: i64,
}

/// Per-agent mutable signal state. Lives for the process lifetime, never
/// persisted to storage.
#[derive(Debug, Default)]
pub struct SignalState {
    /// Last non-none intent, held until flipped ("sticky" position).
    pub position: Option<Side>,
    /// Bucket of the last actioned intent; monotonically increasing.
    pub last_acted_bucket: Option<i64>,
}

impl SignalState {
    /// Record `intent` and emit a decision unless this bucket was already
    /// acted upon.
    fn act(&mut self, intent: Side, candle: &Candle) -> Option<Decision> {
        self.position = Some(intent);

        let fresh = self
            .last_acted_bucket
            .map_or(true, |acted| candle.bucket_start > acted);
        if !fresh {
            debug!(
                bucket = candle.bucket_start,
                intent = %intent,
                "bucket already acted upon — intent suppressed"
            );
            return None;
        }

        self.last_acted_bucket = Some(candle.bucket_start);
        info!(
            intent = %intent,
            close = candle.close,
            bucket = candle.bucket_start,
            "signal fired"
        );
        Some(Decision {
            intent,
            reference_close: candle.close,
            bucket: candle.bucket_start,
        })
    }
}

// ---------------------------------------------------------------------------
// Dual momentum
// ---------------------------------------------------------------------------

/// Dual-momentum crossover evaluator: both the fast and the slow momentum
/// must agree on a direction.
#[derive(Debug, Clone, Copy)]
pub struct MomentumEvaluator {
    pub slow_span: usize,
    pub fast_span: usize,
}

impl MomentumEvaluator {
    pub fn evaluate(&self, candles: &[Candle], state: &mut SignalState) -> Option<Decision> {
        let candle = last_closed(candles)?;
        let closes = closed_closes(candles);
        let idx = closes.len() - 1;

        let slow = momentum(&closes, self.slow_span)[idx];
        let fast = momentum(&closes, self.fast_span)[idx];

        let intent = match (slow, fast) {
            (Some(s), Some(f)) if s > 0.0 && f > 0.0 => Side::Buy,
            (Some(s), Some(f)) if s < 0.0 && f < 0.0 => Side::Sell,
            // Disagreement or warm-up: prior position persists, no action.
            _ => return None,
        };

        state.act(intent, candle)
    }
}

// ---------------------------------------------------------------------------
// RSI / Bollinger %B mean reversion
// ---------------------------------------------------------------------------

/// Mean-reversion evaluator: enters on band excursions confirmed by RSI,
/// exits early on an RSI cool-off while holding.
#[derive(Debug, Clone, Copy)]
pub struct RsiBbEvaluator {
    pub rsi_span: usize,
    pub bb_span: usize,
}

impl RsiBbEvaluator {
    pub fn evaluate(&self, candles: &[Candle], state: &mut SignalState) -> Option<Decision> {
        let candle = last_closed(candles)?;
        let closes = closed_closes(candles);
        let idx = closes.len() - 1;

        let rsi_now = rsi(&closes, self.rsi_span)[idx];
        let bbp_now = percent_b(&closes, self.bb_span, 2.0, 2.0)[idx];

        let entry = match (rsi_now, bbp_now) {
            (Some(r), Some(b)) if r < RSI_LOW && b < 0.0 => Some(Side::Buy),
            (Some(r), Some(b)) if r > RSI_HIGH && b > 1.0 => Some(Side::Sell),
            _ => None,
        };

        // The entry takes effect before the cool-off is considered for the
        // same candle, so a fresh entry never immediately cancels itself.
        if let Some(intent) = entry {
            return state.act(intent, candle);
        }

        // RSI cool-off closes a held position even without a band excursion.
        let exit = match (state.position, rsi_now) {
            (Some(Side::Buy), Some(r)) if r > RSI_HIGH => Some(Side::Sell),
            (Some(Side::Sell), Some(r)) if r < RSI_LOW => Some(Side::Buy),
            _ => None,
        };

        exit.and_then(|intent| state.act(intent, candle))
    }
}
