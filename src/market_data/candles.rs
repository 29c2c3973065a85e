// =============================================================================
// Candle aggregation — fixed-width time buckets over the tick window
// =============================================================================
//
// Candles are rebuilt in full from the pruned tick window on every update;
// at a few hundred rows this is cheaper than getting incremental updates
// right. Buckets with zero ticks are dropped, never zero-filled. The final
// candle in the output always contains the newest tick and is therefore the
// still-forming bucket: decisions read index len-2, the last closed candle.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::tick_buffer::Tick;

/// One OHLC(V) bucket. `volume` is present only when the underlying ticks
/// carry a size (trade executions do, index ticks do not).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start in milliseconds, aligned to the interval.
    pub bucket_start: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

struct Accum {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    has_volume: bool,
}

/// Bucket `ticks` into `interval_ms`-wide candles, oldest first.
///
/// OHLC is first/max/min/last price within the bucket; ticks are consumed in
/// buffer order, which is timestamp order for a well-behaved feed. Empty
/// buckets between populated ones simply do not appear in the output.
pub fn aggregate<'a>(ticks: impl IntoIterator<Item = &'a Tick>, interval_ms: i64) -> Vec<Candle> {
    debug_assert!(interval_ms > 0);

    let mut buckets: BTreeMap<i64, Accum> = BTreeMap::new();

    for tick in ticks {
        let bucket_start = tick.timestamp_ms - tick.timestamp_ms.rem_euclid(interval_ms);
        let entry = buckets.entry(bucket_start).or_insert(Accum {
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: 0.0,
            has_volume: false,
        });
        entry.high = entry.high.max(tick.price);
        entry.low = entry.low.min(tick.price);
        entry.close = tick.price;
        if let Some(size) = tick.size {
            entry.volume += size;
            entry.has_volume = true;
        }
    }

    buckets
        .into_iter()
        .map(|(bucket_start, acc)| Candle {
            bucket_start,
            open: acc.open,
            high: acc.high,
            low: acc.low,
            close: acc.close,
            volume: acc.has_volume.then_some(acc.volume),
        })
        .collect()
}

/// The last **closed** candle: second-from-last, since the final bucket is
/// still accumulating. `None` until at least one bucket has closed.
pub fn last_closed(candles: &[Candle]) -> Option<&Candle> {
    if candles.len() < 2 {
        return None;
    }
    candles.get(candles.len() - 2)
}

/// Close prices of the closed portion of the series (everything but the
/// final, still-forming bucket).
pub fn closed_closes(candles: &[Candle]) -> Vec<f64> {
    if candles.len() < 2 {
        return Vec::new();
    }
    candles[..candles.len() - 1].iter().map(|c| c.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(ts: i64, price: f64, size: Option<f64>) -> Tick {
        Tick {
            timestamp_ms: ts,
            price,
            size,
        }
    }

    #[test]
    fn ohlc_within_a_bucket() {
        let ticks = vec![
            tick(1_000, 100.0, None),
            tick(2_000, 105.0, None),
            tick(3_000, 95.0, None),
            tick(4_000, 101.0, None),
            tick(15_500, 102.0, None), // next bucket
        ];
        let candles = aggregate(&ticks, 15_000);
        assert_eq!(candles.len(), 2);

        let c = &candles[0];
        assert_eq!(c.bucket_start, 0);
        assert_eq!(c.open, 100.0);
        assert_eq!(c.high, 105.0);
        assert_eq!(c.low, 95.0);
        assert_eq!(c.close, 101.0);
        assert_eq!(c.volume, None);
    }

    #[test]
    fn buckets_are_strictly_ordered_and_aligned() {
        let ticks = vec![
            tick(61_000, 1.0, None),
            tick(1_000, 2.0, None),
            tick(181_000, 3.0, None),
        ];
        let candles = aggregate(&ticks, 60_000);
        let starts: Vec<i64> = candles.iter().map(|c| c.bucket_start).collect();
        assert_eq!(starts, vec![0, 60_000, 180_000]);
        for c in &candles {
            assert_eq!(c.bucket_start % 60_000, 0);
        }
    }

    #[test]
    fn empty_buckets_are_dropped_not_zero_filled() {
        // Ticks in bucket 0 and bucket 4; buckets 1-3 must not appear.
        let ticks = vec![tick(500, 10.0, None), tick(4 * 15_000 + 1, 11.0, None)];
        let candles = aggregate(&ticks, 15_000);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].bucket_start, 60_000);
    }

    #[test]
    fn volume_is_summed_when_sizes_present() {
        let ticks = vec![
            tick(1_000, 100.0, Some(2.0)),
            tick(2_000, 101.0, Some(3.0)),
        ];
        let candles = aggregate(&ticks, 60_000);
        assert_eq!(candles[0].volume, Some(5.0));
    }

    #[test]
    fn low_open_close_high_invariant() {
        let ticks = vec![
            tick(1_000, 100.0, None),
            tick(2_000, 90.0, None),
            tick(3_000, 110.0, None),
            tick(4_000, 104.0, None),
        ];
        let candles = aggregate(&ticks, 60_000);
        let c = &candles[0];
        assert!(c.low <= c.open && c.open <= c.high);
        assert!(c.low <= c.close && c.close <= c.high);
    }

    #[test]
    fn last_closed_excludes_forming_bucket() {
        let ticks = vec![
            tick(0, 1.0, None),
            tick(15_000, 2.0, None),
            tick(30_000, 3.0, None),
        ];
        let candles = aggregate(&ticks, 15_000);
        assert_eq!(candles.len(), 3);
        // The candle at 30_000 holds the newest tick and is still forming.
        assert_eq!(last_closed(&candles).unwrap().bucket_start, 15_000);
    }

    #[test]
    fn last_closed_needs_two_buckets() {
        let ticks = vec![tick(0, 1.0, None)];
        let candles = aggregate(&ticks, 15_000);
        assert!(last_closed(&candles).is_none());
    }

    #[test]
    fn prune_spares_the_open_bucket() {
        use super::super::tick_buffer::TickBuffer;

        // 10 ticks in the first bucket, 3 in the open one.
        let mut buf = TickBuffer::new();
        for i in 0..10 {
            buf.push(tick(i * 1_000, 100.0 + i as f64, None));
        }
        for (j, price) in [50.0, 60.0, 55.0].into_iter().enumerate() {
            buf.push(tick(15_000 + j as i64 * 1_000, price, None));
        }
        let before = aggregate(buf.iter(), 15_000);
        let open_before = before.last().unwrap().clone();

        // Cap below the total but above the open bucket's tick count.
        // Eviction is oldest-first, so only closed-bucket ticks drop and the
        // forming candle survives pruning untouched.
        buf.prune(5);
        let after = aggregate(buf.iter(), 15_000);
        assert_eq!(*after.last().unwrap(), open_before);
    }

    #[test]
    fn closed_closes_matches_closed_prefix() {
        let ticks = vec![
            tick(0, 1.0, None),
            tick(15_000, 2.0, None),
            tick(30_000, 3.0, None),
        ];
        let candles = aggregate(&ticks, 15_000);
        assert_eq!(closed_closes(&candles), vec![1.0, 2.0]);
    }
}
