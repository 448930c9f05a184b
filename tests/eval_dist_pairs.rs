//! Both evaluation backends must agree on random masks

use approx::assert_relative_eq;
use factorlab::eval::{eval_masked_dist_pairs, EvalBackend, FitnessMode};
use ndarray::{Array1, Array2};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NUM_OBS: usize = 32;
const NUM_PAIRS: usize = 6;

fn distance_fixture(seed: u64) -> (Array2<f64>, Array2<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let dists = Array2::from_shape_fn((NUM_OBS, NUM_PAIRS), |_| rng.random_range(0.0..10.0));
    let idxs = Array2::from_shape_fn((NUM_OBS, NUM_PAIRS), |_| rng.random_range(0..NUM_OBS));
    (dists, idxs)
}

fn random_mask(seed: u64, p_keep: f64) -> Array1<bool> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array1::from_shape_fn(NUM_OBS, |_| rng.random_bool(p_keep))
}

#[test]
fn test_backends_agree_on_seeded_masks() {
    let (dists, idxs) = distance_fixture(0);
    for seed in 0..5 {
        let mask = random_mask(100 + seed, 0.6);
        for fitness_mode in [FitnessMode::Std, FitnessMode::Range] {
            for increment_single in [true, false] {
                let run = |backend| {
                    eval_masked_dist_pairs(
                        mask.view(),
                        dists.view(),
                        idxs.view(),
                        fitness_mode,
                        increment_single,
                        backend,
                    )
                    .unwrap()
                };
                let (ref_score, ref_kept) = run(EvalBackend::Reference);
                let (fast_score, fast_kept) = run(EvalBackend::Fast);
                assert_relative_eq!(ref_score, fast_score, epsilon = 1e-9);
                assert_eq!(ref_kept, fast_kept);
            }
        }
    }
}

#[test]
fn test_empty_mask_scores_negative_infinity() {
    let (dists, idxs) = distance_fixture(1);
    let mask = Array1::from_elem(NUM_OBS, false);
    for backend in [EvalBackend::Reference, EvalBackend::Fast] {
        let (score, kept) =
            eval_masked_dist_pairs(mask.view(), dists.view(), idxs.view(), FitnessMode::Std, true, backend).unwrap();
        assert_eq!(score, f64::NEG_INFINITY);
        assert_eq!(kept, 0.0);
    }
}

#[test]
fn test_full_mask_keeps_everything() {
    let (dists, idxs) = distance_fixture(2);
    let mask = Array1::from_elem(NUM_OBS, true);
    let (score, kept) = eval_masked_dist_pairs(
        mask.view(),
        dists.view(),
        idxs.view(),
        FitnessMode::Range,
        false,
        EvalBackend::Fast,
    )
    .unwrap();
    assert_eq!(kept, 1.0);
    assert!(score > 0.0 && score < 10.0);
}

proptest! {
    #[test]
    fn prop_backends_agree(matrix_seed in any::<u64>(), mask_seed in any::<u64>(), p_keep in 0.05f64..1.0) {
        let (dists, idxs) = distance_fixture(matrix_seed);
        let mask = random_mask(mask_seed, p_keep);
        let run = |backend| {
            eval_masked_dist_pairs(mask.view(), dists.view(), idxs.view(), FitnessMode::Std, true, backend).unwrap()
        };
        let (ref_score, _) = run(EvalBackend::Reference);
        let (fast_score, _) = run(EvalBackend::Fast);
        if ref_score.is_infinite() {
            prop_assert_eq!(fast_score, f64::NEG_INFINITY);
        } else {
            prop_assert!((ref_score - fast_score).abs() < 1e-9);
        }
    }
}
