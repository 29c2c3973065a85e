// =============================================================================
// Momentum (MOM) — absolute price change over a look-back span
// =============================================================================
//
//   MOM[i] = close[i] - close[i - span]
//
// Positive momentum indicates upward pressure; negative, downward. The dual
// momentum strategy reads a fast and a slow span of this series.

/// Compute the momentum series, aligned 1:1 with `closes`.
///
/// The first `span` positions are `None` (warm-up). `span == 0` yields a
/// vector of all `None`, since zero-span momentum is meaningless.
pub fn momentum(closes: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if span == 0 {
        return result;
    }
    for i in span..closes.len() {
        result[i] = Some(closes[i] - closes[i - span]);
    }
    result
}
