// =============================================================================
// Risk gating — per-side position limits
// =============================================================================
//
// A breached limit is a gating decision, not an error: the offending order is
// suppressed and logged, everything else in the pass proceeds. Buy orders are
// gated by the long limit, sell orders by the short limit.
//
// Sides are always "buy"/"sell" here; the sell gate compares against the
// short limit directly, so both directions are enforced symmetrically.
// =============================================================================

use tracing::warn;

use crate::error::AgentError;
use crate::types::Side;

/// Maximum allowable position in lots on each side.
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    /// Upper bound for a long position, e.g. 2000.
    pub long: i64,
    /// Lower bound for a short position, e.g. -2000.
    pub short: i64,
}

/// Outcome of a single gating check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    /// The order was suppressed; the limit that tripped is carried for logs.
    Blocked(i64),
}

impl GateDecision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.long <= 0 {
            return Err(AgentError::config(format!(
                "RISK_LIMIT_LONG must be positive, got {}",
                self.long
            )));
        }
        if self.short >= 0 {
            return Err(AgentError::config(format!(
                "RISK_LIMIT_SHORT must be negative, got {}",
                self.short
            )));
        }
        Ok(())
    }

    /// Gate one prospective order against the current position.
    ///
    /// A buy is blocked once the position already exceeds the long limit; a
    /// sell is blocked once the position is already below the short limit.
    /// The decision is logged with enough context to reconstruct intent.
    pub fn check(&self, side: Side, current_qty: i64) -> GateDecision {
        match side {
            Side::Buy if current_qty > self.long => {
                warn!(
                    side = %side,
                    current_qty,
                    limit = self.long,
                    "long risk limit exceeded — order suppressed"
                );
                GateDecision::Blocked(self.long)
            }
            Side::Sell if current_qty < self.short => {
                warn!(
                    side = %side,
                    current_qty,
                    limit = self.short,
                    "short risk limit exceeded — order suppressed"
                );
                GateDecision::Blocked(self.short)
            }
            _ => GateDecision::Allowed,
        }
    }
}
