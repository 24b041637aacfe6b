//! Property checks for the allocation pipeline over many generated inputs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use yield_allocator::allocation::{confidence, encode_bps, truncate_bps, DEFAULT_CONFIDENCE_SCALE, TOTAL_BPS};
use yield_allocator::{AllocationEngine, ProtocolId, ProtocolMap, MIN_SHARE};

const CASES: usize = 500;

fn random_inputs(rng: &mut StdRng) -> (ProtocolMap<f64>, ProtocolMap<f64>) {
    let yields = ProtocolMap::from_fn(|_| {
        // one in five protocols reports a zero yield
        if rng.gen_bool(0.2) {
            0.0
        } else {
            rng.gen_range(0.0..0.15)
        }
    });
    let risks = ProtocolMap::from_fn(|_| rng.gen_range(0.0..=1.0));
    (yields, risks)
}

#[test]
fn weights_sum_to_one_and_respect_floor() {
    let engine = AllocationEngine::default();
    let mut rng = StdRng::seed_from_u64(0xA110C);
    for _ in 0..CASES {
        let (yields, risks) = random_inputs(&mut rng);
        let weights = engine.allocate(&yields, &risks).unwrap();
        assert!((weights.sum() - 1.0).abs() < 1e-9, "sum {} for {:?}", weights.sum(), yields);
        for (protocol, w) in weights.weights().iter() {
            assert!(*w >= MIN_SHARE - 1e-9, "{} got {} for {:?}", protocol, w, yields);
        }
    }
}

#[test]
fn encoded_allocation_sums_exactly() {
    let engine = AllocationEngine::default();
    let mut rng = StdRng::seed_from_u64(0xB95);
    for _ in 0..CASES {
        let (yields, risks) = random_inputs(&mut rng);
        let weights = engine.allocate(&yields, &risks).unwrap();

        let truncated: u32 = truncate_bps(&weights).values().sum();
        assert!(truncated <= TOTAL_BPS);
        assert!(TOTAL_BPS - truncated <= ProtocolId::COUNT as u32);

        let encoded = encode_bps(&weights);
        assert_eq!(encoded.total(), TOTAL_BPS);
    }
}

#[test]
fn raising_yield_never_lowers_own_weight() {
    let engine = AllocationEngine::default();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let (mut yields, risks) = random_inputs(&mut rng);
        let target = ProtocolId::ALL[rng.gen_range(0..ProtocolId::COUNT)];
        let mut previous = engine.allocate(&yields, &risks).unwrap().weight(target);
        for _ in 0..20 {
            yields[target] += 0.005;
            let current = engine.allocate(&yields, &risks).unwrap().weight(target);
            assert!(current >= previous - 1e-12, "{} fell from {} to {}", target, previous, current);
            previous = current;
        }
    }
}

#[test]
fn lowering_risk_never_lowers_own_weight() {
    let engine = AllocationEngine::default();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let (yields, mut risks) = random_inputs(&mut rng);
        let target = ProtocolId::ALL[rng.gen_range(0..ProtocolId::COUNT)];
        risks[target] = 1.0;
        let mut previous = engine.allocate(&yields, &risks).unwrap().weight(target);
        for _ in 0..10 {
            risks[target] -= 0.1;
            let current = engine.allocate(&yields, &risks).unwrap().weight(target);
            assert!(current >= previous - 1e-12, "{} fell from {} to {}", target, previous, current);
            previous = current;
        }
    }
}

#[test]
fn uniform_inputs_give_uniform_weights() {
    let engine = AllocationEngine::default();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..50 {
        let y = rng.gen_range(0.0..0.2);
        let r = rng.gen_range(0.0..=1.0);
        let weights = engine.allocate(&ProtocolMap::splat(y), &ProtocolMap::splat(r)).unwrap();
        for (_, w) in weights.weights().iter() {
            assert_eq!(*w, 1.0 / ProtocolId::COUNT as f64);
        }
        assert_eq!(confidence(&ProtocolMap::splat(y), DEFAULT_CONFIDENCE_SCALE), 1.0);
    }
}

#[test]
fn dispersed_yields_lower_confidence() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..CASES {
        let (yields, _) = random_inputs(&mut rng);
        let first = yields[ProtocolId::Aave];
        if yields.values().all(|y| *y == first) {
            continue;
        }
        let c = confidence(&yields, DEFAULT_CONFIDENCE_SCALE);
        assert!((0.0..1.0).contains(&c), "confidence {} for {:?}", c, yields);
    }
}
