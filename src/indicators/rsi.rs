// =============================================================================
// Relative Strength Index (RSI) — Wilder's smoothing
// =============================================================================
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Seed average gain / average loss with the SMA of the first `span`
//          gains / losses.
// Step 3 — Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (span - 1) + current_gain) / span
//            avg_loss = (prev_avg_loss * (span - 1) + current_loss) / span
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The mean-reversion agent trades RSI < 40 (entry long) and RSI > 60 (entry
// short / cool-off exit). Values are bounded [0, 100].

/// Compute the RSI series, aligned 1:1 with `closes`.
///
/// The first `span` positions are `None` (the seed consumes `span` deltas).
///
/// # Edge cases
/// - Average loss of zero (only gains) clamps to 100; only losses to 0; no
///   movement at all to 50.
/// - A non-finite intermediate stops the series; remaining positions stay
///   `None`.
pub fn rsi(closes: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if span == 0 || closes.len() < span + 1 {
        return result;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // Seed averages with the SMA of the first `span` deltas.
    let (sum_gain, sum_loss) = deltas[..span].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l + d.abs())
        }
    });

    let span_f = span as f64;
    let mut avg_gain = sum_gain / span_f;
    let mut avg_loss = sum_loss / span_f;

    match rsi_from_averages(avg_gain, avg_loss) {
        Some(v) => result[span] = Some(v),
        None => return result,
    }

    // Wilder's smoothing for subsequent values.
    for (offset, &delta) in deltas[span..].iter().enumerate() {
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (span_f - 1.0) + gain) / span_f;
        avg_loss = (avg_loss * (span_f - 1.0) + loss) / span_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(v) => result[span + 1 + offset] = Some(v),
            None => break,
        }
    }

    result
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // No movement at all — neutral.
    } else if avg_loss == 0.0 {
        100.0 // All gains, no losses.
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_up_positions_are_none() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = rsi(&closes, 14);
        assert_eq!(series.len(), 30);
        assert!(series[..14].iter().all(Option::is_none));
        assert!(series[14..].iter().all(Option::is_some));
    }

    #[test]
    fn insufficient_data_is_all_none() {
        // Need span+1 closes (span deltas). 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(rsi(&closes, 14).iter().all(Option::is_none));
    }

    #[test]
    fn all_gains_clamp_to_100() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in rsi(&closes, 14).into_iter().flatten() {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn all_losses_clamp_to_0() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in rsi(&closes, 14).into_iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn flat_market_is_neutral() {
        let closes = vec![100.0; 30];
        for v in rsi(&closes, 14).into_iter().flatten() {
            assert!((v - 50.0).abs() < 1e-10, "expected 50.0, got {v}");
        }
    }

    #[test]
    fn bounded_zero_to_hundred() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for v in rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }
}
