//! Adversarial triple samplers
//!
//! Each sampler returns `(anchor, positive, negative)` where the positive is
//! meant to be no further from the anchor than the negative, but the way that
//! ordering is achieved differs:
//!
//! - [`SwappedRandomSampler`] swaps factor values between two random candidates
//! - [`CloseFarSampler`] draws from a close and a far [`PairSampler`]
//! - [`SameKSampler`] changes exactly `k` shared factors in both

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pair::{PairConfig, PairSampler};
use super::{bound, derive_seed, l1_dist, num_differing, seeded_rng, FactorSampler, SampleTuple, SamplingError};
use crate::data::{FactorVec, SharedData};

/// Attempts allowed per generated vector before same-k sampling gives up
pub const SAME_K_MAX_TRIES: usize = 100;

// ========================================================================= //
// Swap metrics                                                              //
// ========================================================================= //

/// Distance used to decide which candidate becomes the positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapMetric {
    /// Number of differing factors
    K,
    /// Sum of absolute factor differences
    #[default]
    Manhattan,
    /// Manhattan distance with each factor scaled to `[0, 1]`
    ManhattanNorm,
    /// Euclidean distance over factor values
    Euclidean,
    /// Euclidean distance with each factor scaled to `[0, 1]`
    EuclideanNorm,
}

impl SwapMetric {
    /// Every metric with its name
    pub const ALL: [(&'static str, SwapMetric); 5] = [
        ("k", Self::K),
        ("manhattan", Self::Manhattan),
        ("manhattan_norm", Self::ManhattanNorm),
        ("euclidean", Self::Euclidean),
        ("euclidean_norm", Self::EuclideanNorm),
    ];

    /// The metric's contribution for one factor.
    ///
    /// Every metric is monotone in these terms, so making each term of the
    /// positive no larger than the negative's orders the totals too.
    pub fn term(self, a: usize, b: usize, size: usize) -> f64 {
        let diff = a.abs_diff(b) as f64;
        let scale = if size > 1 { (size - 1) as f64 } else { 1.0 };
        match self {
            Self::K => (a != b) as u8 as f64,
            Self::Manhattan => diff,
            Self::ManhattanNorm => diff / scale,
            Self::Euclidean => diff * diff,
            Self::EuclideanNorm => (diff / scale) * (diff / scale),
        }
    }
}

impl FromStr for SwapMetric {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, metric)| *metric)
            .ok_or_else(|| {
                SamplingError::InvalidConfig(format!(
                    "invalid swap metric: {s:?}, must be one of: {:?}",
                    Self::ALL.map(|(name, _)| name)
                ))
            })
    }
}

impl fmt::Display for SwapMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Self::ALL
            .iter()
            .find(|(_, metric)| metric == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown");
        f.write_str(name)
    }
}

/// Distance between two factor vectors under `metric`
pub fn factor_dist(a: &[usize], b: &[usize], factor_sizes: &[usize], metric: SwapMetric) -> f64 {
    let total: f64 = a
        .iter()
        .zip(b)
        .zip(factor_sizes)
        .map(|((&x, &y), &size)| metric.term(x, y, size))
        .sum();
    match metric {
        SwapMetric::Euclidean | SwapMetric::EuclideanNorm => total.sqrt(),
        _ => total,
    }
}

/// Swap factor values so that `positive` is never further from `anchor`
/// than `negative` in any single factor term.
fn swap_factors(anchor: &[usize], positive: &mut [usize], negative: &mut [usize], factor_sizes: &[usize], metric: SwapMetric) {
    for i in 0..anchor.len() {
        let size = factor_sizes[i];
        if metric.term(anchor[i], positive[i], size) > metric.term(anchor[i], negative[i], size) {
            std::mem::swap(&mut positive[i], &mut negative[i]);
        }
    }
}

// ========================================================================= //
// Swapped random                                                            //
// ========================================================================= //

/// Configuration for [`SwappedRandomSampler`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwappedRandomConfig {
    /// Metric deciding which factor values belong to the positive
    pub swap_metric: SwapMetric,
    /// Seed for the sampler's random stream
    pub seed: Option<u64>,
}

/// Two uniformly random candidates with factor values swapped into order
pub struct SwappedRandomSampler {
    config: SwappedRandomConfig,
    data: Option<SharedData>,
    rng: StdRng,
}

impl SwappedRandomSampler {
    /// Create an unbound sampler
    pub fn new(config: SwappedRandomConfig) -> Self {
        Self {
            rng: seeded_rng(config.seed),
            config,
            data: None,
        }
    }
}

impl FactorSampler for SwappedRandomSampler {
    fn num_samples(&self) -> usize {
        3
    }

    fn data(&self) -> Option<&SharedData> {
        self.data.as_ref()
    }

    fn bind(&mut self, data: SharedData) -> Result<(), SamplingError> {
        self.data = Some(data);
        Ok(())
    }

    fn sample_idx(&mut self, idx: usize) -> Result<SampleTuple, SamplingError> {
        let data = bound(&self.data)?.clone();
        let len = data.len();
        let anchor = data.idx_to_pos(idx)?;
        let mut positive = data.idx_to_pos(self.rng.random_range(0..len))?;
        let mut negative = data.idx_to_pos(self.rng.random_range(0..len))?;
        swap_factors(&anchor, &mut positive, &mut negative, data.factor_sizes(), self.config.swap_metric);
        Ok(vec![idx, data.pos_to_idx(&positive)?, data.pos_to_idx(&negative)?])
    }

    fn uninit_copy(&self) -> Box<dyn FactorSampler> {
        Box::new(Self::new(self.config.clone()))
    }

    fn name(&self) -> &'static str {
        "SwappedRandomSampler"
    }
}

// ========================================================================= //
// Close / far                                                               //
// ========================================================================= //

/// Configuration for [`CloseFarSampler`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloseFarConfig {
    /// Number of factors changed for the positive
    pub p_k_range: (isize, isize),
    /// Distance moved by each positive factor
    pub p_radius_range: (isize, isize),
    /// Number of factors changed for the negative
    pub n_k_range: (isize, isize),
    /// Distance moved by each negative factor
    pub n_radius_range: (isize, isize),
    /// Seed from which both pair streams are derived
    pub seed: Option<u64>,
}

impl Default for CloseFarConfig {
    fn default() -> Self {
        Self {
            p_k_range: (1, 1),
            p_radius_range: (1, 1),
            n_k_range: (1, -1),
            n_radius_range: (1, -1),
            seed: None,
        }
    }
}

/// Positive from a close pair sampler, negative from a far one
pub struct CloseFarSampler {
    config: CloseFarConfig,
    close: PairSampler,
    far: PairSampler,
}

impl CloseFarSampler {
    /// Create an unbound sampler
    pub fn new(config: CloseFarConfig) -> Self {
        let close = PairSampler::new(PairConfig {
            p_k_range: config.p_k_range,
            p_radius_range: config.p_radius_range,
            seed: derive_seed(config.seed, 0),
        });
        let far = PairSampler::new(PairConfig {
            p_k_range: config.n_k_range,
            p_radius_range: config.n_radius_range,
            seed: derive_seed(config.seed, 1),
        });
        Self { config, close, far }
    }
}

impl FactorSampler for CloseFarSampler {
    fn num_samples(&self) -> usize {
        3
    }

    fn data(&self) -> Option<&SharedData> {
        self.close.data()
    }

    fn bind(&mut self, data: SharedData) -> Result<(), SamplingError> {
        // bind the far sampler first so a bad range leaves both unbound
        self.far.init(data.clone())?;
        if let Err(e) = self.close.init(data) {
            self.far = PairSampler::new(self.far.config().clone());
            return Err(e);
        }
        Ok(())
    }

    fn sample_idx(&mut self, idx: usize) -> Result<SampleTuple, SamplingError> {
        let close = self.close.sample(idx)?;
        let far = self.far.sample(idx)?;
        if close[0] != far[0] {
            return Err(SamplingError::AnchorMismatch {
                close: close[0],
                far: far[0],
            });
        }
        Ok(vec![close[0], close[1], far[1]])
    }

    fn uninit_copy(&self) -> Box<dyn FactorSampler> {
        Box::new(Self::new(self.config.clone()))
    }

    fn name(&self) -> &'static str {
        "CloseFarSampler"
    }
}

// ========================================================================= //
// Same k                                                                    //
// ========================================================================= //

/// How many factors a same-k triple changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "KChoiceRepr", into = "KChoiceRepr")]
pub enum KChoice {
    /// A fresh `k` in `[1, num_factors]` for every sample
    #[default]
    Random,
    /// Always exactly this many factors
    Fixed(usize),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum KChoiceRepr {
    Fixed(usize),
    Named(String),
}

impl TryFrom<KChoiceRepr> for KChoice {
    type Error = String;

    fn try_from(repr: KChoiceRepr) -> Result<Self, Self::Error> {
        match repr {
            KChoiceRepr::Fixed(0) => Err("k must be at least 1".to_string()),
            KChoiceRepr::Fixed(k) => Ok(Self::Fixed(k)),
            KChoiceRepr::Named(name) if name == "random" => Ok(Self::Random),
            KChoiceRepr::Named(name) => Err(format!("invalid k: {name:?}, must be a positive integer or \"random\"")),
        }
    }
}

impl From<KChoice> for KChoiceRepr {
    fn from(k: KChoice) -> Self {
        match k {
            KChoice::Random => Self::Named("random".to_string()),
            KChoice::Fixed(k) => Self::Fixed(k),
        }
    }
}

/// Configuration for [`SameKSampler`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SameKConfig {
    /// Number of factors changed in both the positive and negative
    pub k: KChoice,
    /// Draw positive values from the anchor's immediate neighbours
    pub sample_p_close: bool,
    /// Seed for the sampler's random stream
    pub seed: Option<u64>,
}

/// Positive and negative that both differ from the anchor in the same `k`
/// factors, ordered so the positive has the smaller L1 distance.
pub struct SameKSampler {
    config: SameKConfig,
    data: Option<SharedData>,
    rng: StdRng,
}

impl SameKSampler {
    /// Create an unbound sampler
    pub fn new(config: SameKConfig) -> Self {
        Self {
            rng: seeded_rng(config.seed),
            config,
            data: None,
        }
    }

    /// Resample the factors outside `shared` until every one of them differs
    /// from `base`.
    ///
    /// Each attempt only regenerates the factors that still match `base`.
    pub fn sample_shared(&mut self, base: &[usize], shared: &[bool], sample_close: bool) -> Result<FactorVec, SamplingError> {
        let data = bound(&self.data)?.clone();
        let sizes = data.factor_sizes();
        let mut sampled = base.to_vec();
        let mut generate: Vec<bool> = shared.iter().map(|s| !s).collect();
        let k = generate.iter().filter(|g| **g).count();

        for _ in 0..SAME_K_MAX_TRIES {
            for i in 0..sampled.len() {
                if !generate[i] {
                    continue;
                }
                sampled[i] = if sample_close {
                    let step = self.rng.random_range(-1i64..=1) as isize;
                    (base[i] as isize + step).clamp(0, sizes[i] as isize - 1) as usize
                } else {
                    self.rng.random_range(0..sizes[i])
                };
                generate[i] = sampled[i] == base[i];
            }
            if !generate.iter().any(|g| *g) {
                return Ok(sampled);
            }
        }
        Err(SamplingError::ConstraintExhausted {
            k,
            tries: SAME_K_MAX_TRIES,
        })
    }
}

impl FactorSampler for SameKSampler {
    fn num_samples(&self) -> usize {
        3
    }

    fn data(&self) -> Option<&SharedData> {
        self.data.as_ref()
    }

    fn bind(&mut self, data: SharedData) -> Result<(), SamplingError> {
        if let KChoice::Fixed(k) = self.config.k {
            if k == 0 || k > data.num_factors() {
                return Err(SamplingError::InvalidConfig(format!(
                    "k={k} must be in [1, {}]",
                    data.num_factors()
                )));
            }
        }
        self.data = Some(data);
        Ok(())
    }

    fn sample_idx(&mut self, idx: usize) -> Result<SampleTuple, SamplingError> {
        let data = bound(&self.data)?.clone();
        let num_factors = data.num_factors();
        let anchor = data.idx_to_pos(idx)?;

        let k = match self.config.k {
            KChoice::Fixed(k) => k,
            KChoice::Random => self.rng.random_range(1..=num_factors),
        };
        let mut shared = vec![false; num_factors];
        for i in index::sample(&mut self.rng, num_factors, num_factors - k) {
            shared[i] = true;
        }

        let mut positive = self.sample_shared(&anchor, &shared, self.config.sample_p_close)?;
        let mut negative = self.sample_shared(&anchor, &shared, false)?;
        if l1_dist(&anchor, &positive) > l1_dist(&anchor, &negative) {
            std::mem::swap(&mut positive, &mut negative);
        }

        let (p_k, n_k) = (num_differing(&anchor, &positive), num_differing(&anchor, &negative));
        if p_k != k || n_k != k {
            return Err(SamplingError::Postcondition(format!(
                "expected {k} differing factors, got {p_k} for the positive and {n_k} for the negative"
            )));
        }
        debug!("same-k triple for {} with k={}", idx, k);
        Ok(vec![idx, data.pos_to_idx(&positive)?, data.pos_to_idx(&negative)?])
    }

    fn uninit_copy(&self) -> Box<dyn FactorSampler> {
        Box::new(Self::new(self.config.clone()))
    }

    fn name(&self) -> &'static str {
        "SameKSampler"
    }
}
