//! Confidence derived from the dispersion of yield predictions.

use crate::utils::types::{ProtocolId, ProtocolMap};
use statrs::statistics::Statistics;

/// Variance multiplier. Yield variances of 1e-4..1e-3 map to 0.99..0.9.
pub const DEFAULT_CONFIDENCE_SCALE: f64 = 100.0;

/// `clamp(1 - population_variance(yields) * scale, 0, 1)`.
///
/// Identical yields give exactly 1.0; any other input stays strictly below it.
pub fn confidence(yields: &ProtocolMap<f64>, scale: f64) -> f64 {
    let first = *yields.get(ProtocolId::Aave);
    if yields.values().all(|y| *y == first) {
        return 1.0;
    }
    let variance = yields.values().population_variance();
    if !variance.is_finite() {
        return 0.0;
    }
    // any spread at all stays below full confidence, even when it rounds away
    (1.0 - variance * scale).clamp(0.0, 1.0 - f64::EPSILON)
}
