//! Integration tests for adversarial loss shaping

use approx::assert_relative_eq;
use candle_core::{Device, Tensor};
use factorlab::loss::{
    adversarial_loss, sort_samples, AdversarialLossConfig, AdversarialMode, LossError, PixelLoss, SortMode,
    TensorTriple,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use test_case::test_case;

fn constant_triple(a: f32, p: f32, n: f32) -> TensorTriple {
    let full = |v: f32| Tensor::full(v, (2, 3, 4), &Device::Cpu).unwrap();
    (full(a), full(p), full(n))
}

fn scalar_loss(config: &AdversarialLossConfig, ys: &TensorTriple) -> f32 {
    let mut rng = StdRng::seed_from_u64(0);
    adversarial_loss(ys, None, config, &mut rng)
        .unwrap()
        .loss
        .to_scalar::<f32>()
        .unwrap()
}

#[test]
fn test_invert_margin_adds_margin_to_deltas() {
    let mut config = AdversarialLossConfig::new("invert_margin_0.01").unwrap();
    config.pixel_loss_mode = PixelLoss::Mae;

    let loss = scalar_loss(&config, &constant_triple(0.0, 0.01, 0.03));
    assert_relative_eq!(loss, 0.03, epsilon = 1e-6);
}

#[test]
fn test_margin_mode_without_margin_fails_early() {
    let err = AdversarialLossConfig::new("invert_margin").unwrap_err();
    assert!(matches!(err, LossError::MissingMargin { .. }));
    assert!(err.to_string().contains("specify the margin"));

    let err = AdversarialLossConfig::new("triplet_margin_abc").unwrap_err();
    assert!(matches!(err, LossError::InvalidMargin { .. }));
}

#[test_case("self", 0.02 ; "self delta is absolute")]
#[test_case("invert", 0.02 ; "invert keeps positive deltas")]
#[test_case("invert_unbounded", 0.02 ; "invert unbounded")]
#[test_case("triplet", 0.0 ; "triplet clips well ordered triples")]
#[test_case("triplet_margin_0.05", 0.03 ; "triplet margin")]
#[test_case("triplet_unbounded", -0.02 ; "triplet unbounded")]
fn test_mode_shapes_constant_deltas(mode: &str, expected: f32) {
    let mut config = AdversarialLossConfig::new(mode).unwrap();
    config.pixel_loss_mode = PixelLoss::Mae;

    let loss = scalar_loss(&config, &constant_triple(0.0, 0.01, 0.03));
    assert_relative_eq!(loss, expected, epsilon = 1e-6);
}

#[test]
fn test_swapped_exchanges_positive_and_negative() {
    let mut config = AdversarialLossConfig::new("invert_unbounded").unwrap();
    config.pixel_loss_mode = PixelLoss::Mae;
    config.adversarial_swapped = true;

    let loss = scalar_loss(&config, &constant_triple(0.0, 0.01, 0.03));
    assert_relative_eq!(loss, -0.02, epsilon = 1e-6);
}

#[test]
fn test_masking_ignores_identical_inputs() {
    let device = Device::Cpu;
    // anchor and positive share the first half of every row
    let a_x = Tensor::new(&[[0f32, 0., 1., 1.], [0., 0., 1., 1.]], &device).unwrap();
    let p_x = Tensor::new(&[[0f32, 0., 0., 0.], [0., 0., 0., 0.]], &device).unwrap();
    let n_x = Tensor::new(&[[1f32, 1., 0., 0.], [1., 1., 0., 0.]], &device).unwrap();
    let xs = (a_x.clone(), p_x.clone(), n_x.clone());

    let mut config = AdversarialLossConfig::new("invert_unbounded").unwrap();
    config.pixel_loss_mode = PixelLoss::Mae;
    config.adversarial_masking = true;
    config.return_stats = true;

    let mut rng = StdRng::seed_from_u64(0);
    let output = adversarial_loss(&xs, Some(&xs), &config, &mut rng).unwrap();
    let stats = output.stats.unwrap();
    // only differing elements contribute, averaged over the full row
    assert_relative_eq!(stats.p_delta_mean, 0.5, epsilon = 1e-6);
    assert_relative_eq!(stats.n_delta_mean, 1.0, epsilon = 1e-6);
    assert_relative_eq!(output.loss.to_scalar::<f32>().unwrap(), 0.5, epsilon = 1e-6);

    assert!(matches!(
        adversarial_loss(&xs, None, &config, &mut rng),
        Err(LossError::MissingInputs)
    ));
}

#[test]
fn test_config_deserializes_mode_names() {
    let config: AdversarialLossConfig =
        serde_json::from_str(r#"{"adversarial_mode": "triplet_margin_0.1", "adversarial_top_k": 2}"#).unwrap();
    assert_eq!(config.adversarial_mode, AdversarialMode::TripletMargin(0.1));
    assert_eq!(config.adversarial_top_k, Some(2));

    let err = serde_json::from_str::<AdversarialLossConfig>(r#"{"adversarial_mode": "triplet_margin"}"#);
    assert!(err.is_err());
}

#[test]
fn test_sort_then_loss_is_never_inverted() {
    let device = Device::Cpu;
    let a = Tensor::new(&[[0f32, 0.], [0., 0.]], &device).unwrap();
    let p = Tensor::new(&[[3f32, 3.], [1., 1.]], &device).unwrap();
    let n = Tensor::new(&[[1f32, 1.], [2., 2.]], &device).unwrap();

    let sorted = sort_samples(&(a, p, n), SortMode::SortInorder, PixelLoss::Mae).unwrap();
    let mut config = AdversarialLossConfig::new("triplet_unbounded").unwrap();
    config.pixel_loss_mode = PixelLoss::Mae;

    // after sorting positives are never further than negatives
    let loss = scalar_loss(&config, &sorted);
    assert!(loss <= 0.0);
    assert_relative_eq!(loss, -1.5, epsilon = 1e-6);
}
