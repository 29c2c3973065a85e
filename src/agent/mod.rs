// =============================================================================
// Agent run loops
// =============================================================================
//
// One cooperative task per agent owns every piece of mutable state; the
// gateway REST calls and the websocket read are the only suspension points,
// so reconciliation passes for a symbol are serialized by construction.

pub mod directional;
pub mod market_maker;

use tracing::{error, info};

use crate::exchange::client::FuturesClient;

/// Seconds between websocket reconnect attempts.
pub(crate) const RECONNECT_DELAY_SECS: u64 = 5;
/// Consecutive failed reconnects before the stream counts as lost for good.
pub(crate) const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// The shutdown sequence shared by every agent: cancel all resting limit
/// orders for the symbol before the process exits, so no unmanaged exposure
/// survives a crash or ctrl-c. The transport is dropped by the caller
/// afterwards.
pub async fn cancel_resting_orders(client: &FuturesClient, symbol: &str) {
    info!(symbol, "cancelling resting orders before exit");
    if let Err(e) = client.cancel_all_limit_orders(symbol).await {
        // Nothing left to do but make the failure loud; the operator has to
        // clear the book by hand.
        error!(symbol, error = %e, "failed to cancel resting orders on shutdown");
    }
}
