// =============================================================================
// perp-agents — automated trading agents for a perpetual-futures exchange
// =============================================================================
//
// Three agents share one signal-to-order decision loop:
//
//   tick stream -> TickBuffer -> candle aggregation -> indicators ->
//   signal evaluation -> order reconciliation -> gateway calls
//
// The market maker replaces the indicator/signal stage with a static ladder
// generated straight off the latest index price. Each agent ships as its own
// binary under src/bin/.
// =============================================================================

pub mod agent;
pub mod config;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod ladder;
pub mod market_data;
pub mod reconcile;
pub mod risk;
pub mod signal;
pub mod types;
