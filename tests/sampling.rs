//! Integration tests for samplers over state spaces

use std::sync::Arc;

use factorlab::data::{GroundTruthData, SharedData, StateSpace};
use factorlab::sampling::{
    l1_dist, make_adversarial_sampler, num_differing, with_temp_seed, FactorSampler, KChoice, SameKConfig,
    SameKSampler, SamplingError,
};
use factorlab::Error;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_case::test_case;

fn space(sizes: &[usize]) -> SharedData {
    Arc::new(StateSpace::new(sizes.to_vec()).unwrap())
}

proptest! {
    #[test]
    fn prop_same_k_changes_exactly_k_factors(anchor in 0usize..64, seed in any::<u64>()) {
        let data = space(&[4, 4, 4]);
        let mut sampler = SameKSampler::new(SameKConfig {
            k: KChoice::Fixed(2),
            sample_p_close: false,
            seed: Some(seed),
        });
        sampler.init(data.clone()).unwrap();

        let (a, p, n) = sampler.sample_triple(anchor).unwrap();
        let a = data.idx_to_pos(a).unwrap();
        let p = data.idx_to_pos(p).unwrap();
        let n = data.idx_to_pos(n).unwrap();

        prop_assert_eq!(num_differing(&a, &p), 2);
        prop_assert_eq!(num_differing(&a, &n), 2);
        prop_assert!(l1_dist(&a, &p) <= l1_dist(&a, &n));
    }

    #[test]
    fn prop_random_k_stays_in_range(anchor in 0usize..120, seed in any::<u64>()) {
        let data = space(&[2, 3, 4, 5]);
        let mut sampler = make_adversarial_sampler("same_k_close", Some(seed)).unwrap();
        sampler.init(data.clone()).unwrap();

        let (a, p, n) = sampler.sample_triple(anchor).unwrap();
        let a = data.idx_to_pos(a).unwrap();
        let p = data.idx_to_pos(p).unwrap();
        let n = data.idx_to_pos(n).unwrap();

        let k = num_differing(&a, &p);
        prop_assert!((1..=4).contains(&k));
        prop_assert_eq!(num_differing(&a, &n), k);
        prop_assert!(l1_dist(&a, &p) <= l1_dist(&a, &n));
    }
}

#[test_case("random_swap_k")]
#[test_case("random_swap_manhattan")]
#[test_case("random_swap_manhattan_norm")]
#[test_case("random_swap_euclidean")]
#[test_case("random_swap_euclidean_norm")]
#[test_case("close_far")]
#[test_case("close_p_random_n")]
#[test_case("same_k")]
#[test_case("same_k_close")]
#[test_case("same_k1_close")]
#[test_case("random")]
fn test_mode_samples_valid_triples(mode: &str) {
    let data = space(&[3, 4, 5]);
    let mut sampler = make_adversarial_sampler(mode, Some(42)).unwrap();
    assert!(!sampler.is_init());
    sampler.init(data.clone()).unwrap();

    for idx in 0..data.len() {
        let triple = sampler.sample(idx).unwrap();
        assert_eq!(triple.len(), 3);
        assert_eq!(triple[0], idx);
        assert!(triple.iter().all(|&i| i < data.len()));
    }
}

#[test]
fn test_unknown_mode_is_a_key_error() {
    let Err(err) = make_adversarial_sampler("same_factor", None) else {
        panic!("same_factor should not be a sampler mode");
    };
    assert!(matches!(err, Error::Registry(_)));
    let message = err.to_string();
    assert!(message.contains("same_factor"));
    assert!(message.contains("close_far"));
}

#[test]
fn test_sampling_requires_single_init() {
    let mut sampler = make_adversarial_sampler("same_k", Some(0)).unwrap();
    assert!(matches!(sampler.sample(0), Err(SamplingError::NotInitialized)));

    let data = space(&[4, 4]);
    sampler.init(data.clone()).unwrap();
    assert!(matches!(sampler.init(data.clone()), Err(SamplingError::AlreadyInitialized)));
    assert!(matches!(sampler.sample(16), Err(SamplingError::Data(_))));
}

#[test]
fn test_uninit_copy_can_bind_another_space() {
    let mut sampler = make_adversarial_sampler("close_far", Some(3)).unwrap();
    sampler.init(space(&[5, 5])).unwrap();

    let mut copy = sampler.uninit_copy();
    assert!(!copy.is_init());
    let other = space(&[2, 2, 2]);
    copy.init(other.clone()).unwrap();
    let (a, p, _) = copy.sample_triple(7).unwrap();
    assert_eq!(l1_dist(&other.idx_to_pos(a).unwrap(), &other.idx_to_pos(p).unwrap()), 1);
}

#[test]
fn test_temp_seed_scopes_a_sampling_stream() {
    let data = StateSpace::new([6, 6, 6]).unwrap();
    let mut rng = StdRng::seed_from_u64(123);

    let first = with_temp_seed(&mut rng, 7, |r| data.sample_factors(r));
    let after_first: u64 = rng.clone().random();
    let second = with_temp_seed(&mut rng, 7, |r| data.sample_factors(r));

    assert_eq!(first, second);
    assert_eq!(rng.random::<u64>(), after_first);
}
