//! Basis-point encoding of allocation weights.
//!
//! Weights are truncated to integer basis points, rescaled by
//! `TOTAL_BPS / observed_total` when truncation drifted from the target, and
//! any units still missing are handed out by the largest-remainder method.
//! The result always sums to exactly [`TOTAL_BPS`].

use crate::utils::types::{AllocationVector, EncodedAllocation, ProtocolId, ProtocolMap};

/// 100% in basis points.
pub const TOTAL_BPS: u32 = 10_000;

/// Two-pass truncating conversion. May fall short of [`TOTAL_BPS`] by at most
/// the protocol count; never exceeds it.
///
/// Returns the truncated values and the remainder left by the rescaling pass,
/// used to rank protocols when distributing the shortfall.
fn truncate_with_remainders(weights: &AllocationVector) -> (ProtocolMap<u64>, ProtocolMap<u64>) {
    let target = TOTAL_BPS as u64;
    let first_pass = weights.weights().map(|_, w| {
        let bps = (w.max(0.0) * TOTAL_BPS as f64).floor();
        (bps as u64).min(target)
    });
    let observed: u64 = first_pass.values().sum();

    if observed == target || observed == 0 {
        return (first_pass, ProtocolMap::splat(0));
    }

    let scaled = first_pass.map(|_, bps| bps * target / observed);
    let remainders = first_pass.map(|_, bps| bps * target % observed);
    (scaled, remainders)
}

/// Two-pass truncating conversion without remainder distribution.
pub fn truncate_bps(weights: &AllocationVector) -> ProtocolMap<u32> {
    truncate_with_remainders(weights).0.map(|_, bps| *bps as u32)
}

/// Encode weights as basis points summing exactly to [`TOTAL_BPS`].
pub fn encode_bps(weights: &AllocationVector) -> EncodedAllocation {
    let (mut bps, remainders) = truncate_with_remainders(weights);
    let total: u64 = bps.values().sum();
    let mut residual = (TOTAL_BPS as u64).saturating_sub(total);

    if residual > 0 {
        // Largest remainder first; ties keep canonical protocol order.
        let mut order = ProtocolId::ALL;
        order.sort_by(|a, b| remainders[*b].cmp(&remainders[*a]).then(a.index().cmp(&b.index())));

        let n = order.len() as u64;
        let each = residual / n;
        residual %= n;
        for (rank, protocol) in order.iter().enumerate() {
            bps[*protocol] += each + u64::from((rank as u64) < residual);
        }
    }

    EncodedAllocation::new(bps.map(|_, v| *v as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vector(values: [f64; 4]) -> AllocationVector {
        AllocationVector::from_weights(ProtocolMap::from_fn(|p| values[p.index()])).unwrap()
    }

    #[test]
    fn test_exact_weights_need_no_correction() {
        let encoded = encode_bps(&vector([0.4, 0.3, 0.2, 0.1]));
        assert_eq!(encoded.bps(ProtocolId::Aave), 4000);
        assert_eq!(encoded.bps(ProtocolId::Morpho), 3000);
        assert_eq!(encoded.bps(ProtocolId::Spark), 2000);
        assert_eq!(encoded.bps(ProtocolId::Uniswap), 1000);
    }

    #[test]
    fn test_thirds_residual_goes_to_largest_remainder() {
        let third = 0.95 / 3.0;
        let encoded = encode_bps(&vector([third, third, third, 0.05]));
        assert_eq!(encoded.total(), TOTAL_BPS);
        assert_eq!(encoded.bps(ProtocolId::Uniswap), 500);
        // 3166 each after truncation; leftovers go to the first in order on ties
        assert_eq!(encoded.bps(ProtocolId::Aave), 3167);
        assert_eq!(encoded.bps(ProtocolId::Morpho), 3167);
        assert_eq!(encoded.bps(ProtocolId::Spark), 3166);
    }

    #[rstest]
    #[case([0.266_190, 0.261_462, 0.249_210, 0.223_138])]
    #[case([0.123_456_7, 0.234_567_8, 0.345_678_9, 0.296_296_6])]
    #[case([0.05, 0.05, 0.05, 0.85])]
    #[case([0.999_97, 0.000_01, 0.000_01, 0.000_01])]
    #[case([0.25, 0.25, 0.25, 0.25])]
    fn test_truncation_residual_is_bounded(#[case] values: [f64; 4]) {
        let v = vector(values);
        let truncated: u32 = truncate_bps(&v).values().sum();
        assert!(truncated <= TOTAL_BPS);
        assert!(TOTAL_BPS - truncated <= ProtocolId::COUNT as u32);

        let encoded = encode_bps(&v);
        assert_eq!(encoded.total(), TOTAL_BPS);
        for (protocol, bps) in encoded.as_map().iter() {
            let exact = v.weight(protocol) * TOTAL_BPS as f64;
            assert!((*bps as f64 - exact).abs() <= ProtocolId::COUNT as f64 + 1.0);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let v = vector([0.31, 0.29, 0.2, 0.2]);
        assert_eq!(encode_bps(&v), encode_bps(&v));
    }
}
