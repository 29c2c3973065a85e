// =============================================================================
// Shared types used across the trading agents
// =============================================================================

use serde::{Deserialize, Serialize};

/// Order side as the exchange understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire representation expected by the trading gateway.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Single-letter tag used inside client order IDs.
    pub fn tag(&self) -> char {
        match self {
            Self::Buy => 'b',
            Self::Sell => 's',
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only position snapshot from the exchange, refreshed every pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    /// Current position in lots; negative when short.
    #[serde(rename = "currentQty", default)]
    pub current_qty: i64,
    #[serde(rename = "avgEntryPrice", default)]
    pub avg_entry_price: f64,
    #[serde(rename = "liquidationPrice", default)]
    pub liquidation_price: f64,
    /// Unrealised return on equity as a fraction (0.01 = 1 %).
    #[serde(rename = "unrealisedRoePcnt", default)]
    pub unrealized_pnl_pct: f64,
}

/// An open order as reported by the exchange. Fetched fresh each pass and
/// never cached beyond the current reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveOrder {
    pub id: String,
    #[serde(rename = "clientOid", default)]
    pub client_id: String,
    pub side: Side,
    pub price: f64,
    pub size: u64,
    #[serde(default)]
    pub status: String,
}

/// An order the agent wants resting on the book. Recomputed every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredOrder {
    pub side: Side,
    pub price: i64,
    pub size: u64,
    pub client_id: String,
}

/// Build the deterministic client order ID:
/// `{prefix}-{s|b}{size}at{price}ts{unix_secs}`.
///
/// Used for operator traceability in logs, not for idempotency enforcement
/// by the exchange.
pub fn client_order_id(prefix: &str, side: Side, size: u64, price: i64, ts_secs: i64) -> String {
    format!("{prefix}-{}{size}at{price}ts{ts_secs}", side.tag())
}
