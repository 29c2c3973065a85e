// =============================================================================
// Bollinger %B — position of price within the bands
// =============================================================================
//
// Bands are SMA ± k*σ over the look-back window; %B normalises the close to
// the band range:
//
//   %B = (close - lower) / (upper - lower)
//
// %B < 0 means the close sits below the lower band, %B > 1 above the upper
// band. The mean-reversion agent enters on those excursions.

/// Compute the %B series, aligned 1:1 with `closes`.
///
/// The first `span - 1` positions are `None` (warm-up). A zero-width band
/// (perfectly flat window) is undefined — `None`, never a division error.
/// σ is the population standard deviation over the window.
pub fn percent_b(closes: &[f64], span: usize, nbdev_up: f64, nbdev_dn: f64) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if span < 2 || closes.len() < span {
        return result;
    }

    for i in (span - 1)..closes.len() {
        let window = &closes[i + 1 - span..=i];
        let mean = window.iter().sum::<f64>() / span as f64;
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / span as f64;
        let std_dev = variance.sqrt();

        let upper = mean + nbdev_up * std_dev;
        let lower = mean - nbdev_dn * std_dev;
        let width = upper - lower;

        if width > 0.0 {
            let value = (closes[i] - lower) / width;
            if value.is_finite() {
                result[i] = Some(value);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_up_positions_are_none() {
        let closes: Vec<f64> = (1..=25).map(|x| x as f64).collect();
        let series = percent_b(&closes, 20, 2.0, 2.0);
        assert_eq!(series.len(), 25);
        assert!(series[..19].iter().all(Option::is_none));
        assert!(series[19..].iter().all(Option::is_some));
    }

    #[test]
    fn flat_window_is_undefined() {
        let closes = vec![100.0; 25];
        let series = percent_b(&closes, 20, 2.0, 2.0);
        assert!(series.iter().all(Option::is_none));
    }

    #[test]
    fn close_at_mean_is_half() {
        // Symmetric window ending on its own mean: %B = 0.5.
        let closes = vec![90.0, 110.0, 90.0, 110.0, 100.0];
        let series = percent_b(&closes, 5, 2.0, 2.0);
        let v = series[4].unwrap();
        assert!((v - 0.5).abs() < 1e-9, "expected 0.5, got {v}");
    }

    #[test]
    fn excursion_below_lower_band_is_negative() {
        // Mostly flat window with a hard drop at the end.
        let mut closes = vec![100.0; 19];
        closes.push(50.0);
        let series = percent_b(&closes, 20, 2.0, 2.0);
        let v = series[19].unwrap();
        assert!(v < 0.0, "expected %B < 0, got {v}");
    }

    #[test]
    fn excursion_above_upper_band_exceeds_one() {
        let mut closes = vec![100.0; 19];
        closes.push(150.0);
        let series = percent_b(&closes, 20, 2.0, 2.0);
        let v = series[19].unwrap();
        assert!(v > 1.0, "expected %B > 1, got {v}");
    }

    #[test]
    fn short_series_is_all_none() {
        let series = percent_b(&[1.0, 2.0, 3.0], 20, 2.0, 2.0);
        assert!(series.iter().all(Option::is_none));
    }
}
