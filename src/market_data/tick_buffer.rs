// =============================================================================
// TickBuffer — bounded, append-only window of raw ticks
// =============================================================================
//
// Source of truth for candle construction. Owned exclusively by the agent's
// single run-loop task, so there is no internal locking. Ticks accumulate for
// the process lifetime but are pruned to a maximum row count (oldest first)
// to bound memory; the window is always far larger than one candle bucket,
// so pruning never touches the still-open bucket.
// =============================================================================

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single raw market-data tick. Immutable once appended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Milliseconds since the UNIX epoch.
    pub timestamp_ms: i64,
    pub price: f64,
    /// Trade size in lots; index-price ticks carry no size.
    pub size: Option<f64>,
}

/// Append-only tick window backed by a deque.
#[derive(Debug, Default)]
pub struct TickBuffer {
    ticks: VecDeque<Tick>,
}

impl TickBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the buffer with REST warm-up history (assumed oldest-first).
    pub fn from_history(history: impl IntoIterator<Item = Tick>) -> Self {
        Self {
            ticks: history.into_iter().collect(),
        }
    }

    /// Append a tick.
    ///
    /// Equal timestamps are normal (execution streams emit several fills at
    /// the same millisecond). A tick older than the buffer tail is still
    /// accepted — the aggregator sorts by bucket — but it is worth a warning
    /// since it usually means the feed replayed a message.
    pub fn push(&mut self, tick: Tick) {
        if let Some(last) = self.ticks.back() {
            if tick.timestamp_ms < last.timestamp_ms {
                warn!(
                    tick_ts = tick.timestamp_ms,
                    tail_ts = last.timestamp_ms,
                    "out-of-order tick accepted"
                );
            }
        }
        self.ticks.push_back(tick);
    }

    /// Drop oldest ticks until at most `max_rows` remain.
    pub fn prune(&mut self, max_rows: usize) {
        while self.ticks.len() > max_rows {
            self.ticks.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Oldest-first view of the current window.
    pub fn iter(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter()
    }
}
