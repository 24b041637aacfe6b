//! Risk-adjusted capital allocation across protocols.
//!
//! The pipeline is: score each protocol as `yield / (1 + risk)`, normalise the
//! scores into weights, lift every weight below the diversification floor up
//! to the floor, pay for that lift out of the protocols above the floor in
//! proportion to their weight, and renormalise.

pub mod confidence;
pub mod encoder;

use crate::utils::error::{Error, Result};
use crate::utils::types::{AllocationVector, ProtocolEstimate, ProtocolId, ProtocolMap};
use log::debug;
use serde::Serialize;

pub use confidence::{confidence, DEFAULT_CONFIDENCE_SCALE};
pub use encoder::{encode_bps, truncate_bps, TOTAL_BPS};

/// Default diversification floor (5% per protocol).
pub const MIN_SHARE: f64 = 0.05;

/// Intermediate values of one allocation run.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationBreakdown {
    /// Risk-adjusted score per protocol.
    pub scores: ProtocolMap<f64>,
    /// Normalised weights before the floor is applied.
    pub pre_floor: ProtocolMap<f64>,
    /// Protocols lifted to the floor.
    pub floored: Vec<ProtocolId>,
    /// Final weights.
    pub weights: AllocationVector,
}

/// Allocation engine with a fixed diversification floor.
#[derive(Debug, Clone, Copy)]
pub struct AllocationEngine {
    min_share: f64,
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self { min_share: MIN_SHARE }
    }
}

impl AllocationEngine {
    /// Create an engine; fails when the floor cannot be honoured for every protocol.
    pub fn new(min_share: f64) -> Result<Self> {
        if !min_share.is_finite() || min_share < 0.0 || min_share * ProtocolId::COUNT as f64 > 1.0
        {
            return Err(Error::InfeasibleFloor { min_share, protocols: ProtocolId::COUNT });
        }
        Ok(Self { min_share })
    }

    /// Compute allocation weights from yield and risk estimates.
    pub fn allocate(
        &self, yields: &ProtocolMap<f64>, risks: &ProtocolMap<f64>,
    ) -> Result<AllocationVector> {
        Ok(self.allocate_detailed(yields, risks)?.weights)
    }

    /// Same as [`allocate`](Self::allocate) but keeps the intermediate stages.
    pub fn allocate_detailed(
        &self, yields: &ProtocolMap<f64>, risks: &ProtocolMap<f64>,
    ) -> Result<AllocationBreakdown> {
        if let Some((protocol, y)) = yields.iter().find(|(_, y)| !y.is_finite()) {
            return Err(Error::DataError(format!("yield for {} is not finite: {}", protocol, y)));
        }
        let estimates = ProtocolMap::from_fn(|p| ProtocolEstimate::new(p, yields[p], risks[p]));
        let scores = risk_adjusted_scores(&estimates);
        let pre_floor = normalize_scores(&scores);
        let (weights, floored) = enforce_floor(&pre_floor, self.min_share);
        if !floored.is_empty() {
            debug!("Diversification floor {} applied to {:?}", self.min_share, floored);
        }
        Ok(AllocationBreakdown {
            scores,
            pre_floor,
            floored,
            weights: AllocationVector::new_unchecked(weights),
        })
    }
}

/// Risk-adjusted score per protocol; negative scores count as zero.
pub fn risk_adjusted_scores(estimates: &ProtocolMap<ProtocolEstimate>) -> ProtocolMap<f64> {
    estimates.map(|_, e| e.score().max(0.0))
}

/// Scores to weights summing to one. Falls back to equal weights when the
/// scores carry no information (zero or non-finite sum, or all equal).
pub fn normalize_scores(scores: &ProtocolMap<f64>) -> ProtocolMap<f64> {
    let total = scores.sum();
    let first = *scores.get(ProtocolId::Aave);
    let all_equal = scores.values().all(|s| *s == first);
    if !(total > 0.0) || !total.is_finite() || all_equal {
        return ProtocolMap::splat(1.0 / ProtocolId::COUNT as f64);
    }
    scores.map(|_, s| s / total)
}

/// Lift weights below `min_share` to the floor and take the shortfall from the
/// rest in proportion to their weight. A protocol pushed under the floor by
/// that payment is floored as well, and the pass repeats.
///
/// Returns the renormalised weights and the floored protocols.
pub fn enforce_floor(weights: &ProtocolMap<f64>, min_share: f64) -> (ProtocolMap<f64>, Vec<ProtocolId>) {
    let mut floored = weights.map(|_, w| *w < min_share);

    let (budget, free_total) = loop {
        let floored_count = floored.values().filter(|f| **f).count();
        let budget = 1.0 - floored_count as f64 * min_share;
        let free_total: f64 =
            weights.iter().filter(|(p, _)| !floored[*p]).map(|(_, w)| *w).sum();
        if !(free_total > 0.0) {
            break (budget, free_total);
        }

        let mut changed = false;
        for protocol in ProtocolId::ALL {
            if !floored[protocol] && weights[protocol] * budget / free_total < min_share {
                floored[protocol] = true;
                changed = true;
            }
        }
        if !changed {
            break (budget, free_total);
        }
    };

    let adjusted = ProtocolMap::from_fn(|p| {
        if floored[p] {
            min_share
        } else if free_total > 0.0 {
            weights[p] * budget / free_total
        } else {
            0.0
        }
    });

    let total = adjusted.sum();
    let normalized = if total > 0.0 {
        adjusted.map(|_, w| w / total)
    } else {
        ProtocolMap::splat(1.0 / ProtocolId::COUNT as f64)
    };
    let floored_list = ProtocolId::ALL.iter().copied().filter(|p| floored[*p]).collect();
    (normalized, floored_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn map(values: [f64; 4]) -> ProtocolMap<f64> {
        ProtocolMap::from_fn(|p| values[p.index()])
    }

    #[test]
    fn test_new_rejects_infeasible_floor() {
        assert_matches!(
            AllocationEngine::new(0.26),
            Err(Error::InfeasibleFloor { protocols: 4, .. })
        );
        assert!(AllocationEngine::new(0.25).is_ok());
        assert!(AllocationEngine::new(0.0).is_ok());
        assert!(AllocationEngine::new(-0.1).is_err());
        assert!(AllocationEngine::new(f64::NAN).is_err());
    }

    #[test]
    fn test_reference_scenario_needs_no_floor() {
        let engine = AllocationEngine::default();
        let yields = map([0.072, 0.068, 0.070, 0.065]);
        let risks = map([0.30, 0.25, 0.35, 0.40]);
        let out = engine.allocate_detailed(&yields, &risks).unwrap();

        assert!((out.scores[ProtocolId::Aave] - 0.0554).abs() < 1e-4);
        assert!((out.scores[ProtocolId::Morpho] - 0.0544).abs() < 1e-4);
        assert!((out.scores[ProtocolId::Spark] - 0.0519).abs() < 1e-4);
        assert!((out.scores[ProtocolId::Uniswap] - 0.0464).abs() < 1e-4);
        assert!(out.floored.is_empty());

        let w = out.weights;
        assert!((w.weight(ProtocolId::Aave) - 0.266).abs() < 1e-3);
        assert!((w.weight(ProtocolId::Morpho) - 0.262).abs() < 1e-3);
        assert!((w.weight(ProtocolId::Spark) - 0.250).abs() < 1e-3);
        assert!((w.weight(ProtocolId::Uniswap) - 0.223).abs() < 1e-3);
        assert!((w.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_score_is_floored_and_paid_proportionally() {
        let engine = AllocationEngine::default();
        let yields = map([0.0, 0.07, 0.07, 0.05]);
        let risks = map([0.0, 0.0, 0.0, 0.0]);
        let out = engine.allocate_detailed(&yields, &risks).unwrap();

        assert_eq!(out.floored, vec![ProtocolId::Aave]);
        let w = out.weights;
        assert!((w.weight(ProtocolId::Aave) - 0.05).abs() < 1e-12);
        assert!((w.weight(ProtocolId::Morpho) - 0.35).abs() < 1e-12);
        assert!((w.weight(ProtocolId::Spark) - 0.35).abs() < 1e-12);
        assert!((w.weight(ProtocolId::Uniswap) - 0.25).abs() < 1e-12);

        // ratios among the above-floor group are unchanged
        let before = out.pre_floor[ProtocolId::Morpho] / out.pre_floor[ProtocolId::Uniswap];
        let after = w.weight(ProtocolId::Morpho) / w.weight(ProtocolId::Uniswap);
        assert!((before - after).abs() < 1e-12);
    }

    #[test]
    fn test_zero_sum_falls_back_to_uniform() {
        let engine = AllocationEngine::default();
        let out = engine.allocate(&ProtocolMap::splat(0.0), &map([0.1, 0.2, 0.3, 0.4])).unwrap();
        for (_, w) in out.weights().iter() {
            assert_eq!(*w, 0.25);
        }
    }

    #[test]
    fn test_equal_inputs_give_exact_uniform() {
        let engine = AllocationEngine::default();
        let out = engine.allocate(&ProtocolMap::splat(0.0731), &ProtocolMap::splat(0.33)).unwrap();
        for (_, w) in out.weights().iter() {
            assert_eq!(*w, 0.25);
        }
    }

    #[test]
    fn test_cascading_floor_keeps_every_weight_above_minimum() {
        // Spark sits just above the floor before redistribution and would
        // drop below it after paying its share of the shortfall.
        let weights = map([0.0, 0.0, 0.051, 0.949]);
        let (out, floored) = enforce_floor(&weights, MIN_SHARE);
        assert_eq!(floored, vec![ProtocolId::Aave, ProtocolId::Morpho, ProtocolId::Spark]);
        for (_, w) in out.iter() {
            assert!(*w >= MIN_SHARE - 1e-12);
        }
        assert!((out[ProtocolId::Uniswap] - 0.85).abs() < 1e-12);
        assert!((out.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_floor_at_quarter_is_uniform() {
        let engine = AllocationEngine::new(0.25).unwrap();
        let out = engine.allocate(&map([0.2, 0.01, 0.01, 0.01]), &ProtocolMap::splat(0.0)).unwrap();
        for (_, w) in out.weights().iter() {
            assert!((*w - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_negative_yield_treated_as_zero_score() {
        let engine = AllocationEngine::default();
        let out = engine
            .allocate_detailed(&map([-0.02, 0.07, 0.07, 0.07]), &ProtocolMap::splat(0.2))
            .unwrap();
        assert_eq!(out.scores[ProtocolId::Aave], 0.0);
        assert!((out.weights.weight(ProtocolId::Aave) - MIN_SHARE).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_risk_is_clamped() {
        let engine = AllocationEngine::default();
        let clamped = engine.allocate(&ProtocolMap::splat(0.07), &map([1.0, 0.0, 0.5, 0.5])).unwrap();
        let raw = engine.allocate(&ProtocolMap::splat(0.07), &map([7.0, -3.0, 0.5, 0.5])).unwrap();
        assert_eq!(clamped, raw);
    }

    #[test]
    fn test_non_finite_yield_rejected() {
        let engine = AllocationEngine::default();
        assert_matches!(
            engine.allocate(&map([f64::NAN, 0.07, 0.07, 0.07]), &ProtocolMap::splat(0.2)),
            Err(Error::DataError(_))
        );
    }
}
