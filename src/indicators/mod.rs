// =============================================================================
// Technical indicators over the closed-candle close series
// =============================================================================
//
// Every function returns a vector the same length as its input. Positions
// before the warm-up window (and degenerate values such as a zero-width
// Bollinger band) are `None`. `None` never satisfies a threshold comparison,
// so an agent can never act on a half-warmed indicator.

pub mod bollinger;
pub mod momentum;
pub mod rsi;

pub use bollinger::percent_b;
pub use momentum::momentum;
pub use rsi::rsi;
