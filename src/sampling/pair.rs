//! Pairs constrained by the number of changed factors and their distance

use rand::rngs::StdRng;
use rand::seq::{index, IndexedRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{bound, seeded_rng, FactorSampler, SampleTuple, SamplingError};
use crate::data::SharedData;

/// Resolve an inclusive range whose negative bounds count back from `max`.
///
/// `-1` means `max`, `-2` means `max - 1`, and so on.
pub fn normalise_range(range: (isize, isize), max: usize) -> Result<(usize, usize), SamplingError> {
    let resolve = |v: isize| -> Result<usize, SamplingError> {
        let resolved = if v < 0 { max as isize + 1 + v } else { v };
        if resolved < 0 || resolved as usize > max {
            return Err(SamplingError::InvalidConfig(format!(
                "range bound {v} is outside [0, {max}] in {range:?}"
            )));
        }
        Ok(resolved as usize)
    };
    let (lo, hi) = (resolve(range.0)?, resolve(range.1)?);
    if lo > hi {
        return Err(SamplingError::InvalidConfig(format!(
            "range {range:?} resolves to an empty interval [{lo}, {hi}]"
        )));
    }
    Ok((lo, hi))
}

/// Configuration for [`PairSampler`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PairConfig {
    /// Inclusive range for the number of factors to change
    pub p_k_range: (isize, isize),
    /// Inclusive range for how far each changed factor moves
    pub p_radius_range: (isize, isize),
    /// Seed for the sampler's random stream
    pub seed: Option<u64>,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            p_k_range: (0, -1),
            p_radius_range: (0, -1),
            seed: None,
        }
    }
}

/// Samples a positive that differs from the anchor in `k` factors, each moved
/// by a distance inside the radius range.
///
/// Changed factors always move by at least one step; a factor with no value
/// inside the radius stays put.
pub struct PairSampler {
    config: PairConfig,
    data: Option<SharedData>,
    k_range: (usize, usize),
    rng: StdRng,
}

impl PairSampler {
    /// Create an unbound pair sampler
    pub fn new(config: PairConfig) -> Self {
        Self {
            rng: seeded_rng(config.seed),
            config,
            data: None,
            k_range: (0, 0),
        }
    }

    /// The sampler configuration
    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    fn sample_value(&mut self, value: usize, size: usize) -> usize {
        // ranges that do not fit a small factor leave it unchanged
        let Ok((r_lo, r_hi)) = normalise_range(self.config.p_radius_range, size.saturating_sub(1)) else {
            return value;
        };
        let r_lo = r_lo.max(1);
        let candidates: Vec<usize> = (0..size)
            .filter(|&v| {
                let d = v.abs_diff(value);
                r_lo <= d && d <= r_hi
            })
            .collect();
        candidates.choose(&mut self.rng).copied().unwrap_or(value)
    }
}

impl FactorSampler for PairSampler {
    fn num_samples(&self) -> usize {
        2
    }

    fn data(&self) -> Option<&SharedData> {
        self.data.as_ref()
    }

    fn bind(&mut self, data: SharedData) -> Result<(), SamplingError> {
        self.k_range = normalise_range(self.config.p_k_range, data.num_factors())?;
        // radius ranges are resolved per factor, but must be valid for the largest
        let max_size = data.factor_sizes().iter().copied().max().unwrap_or(1);
        normalise_range(self.config.p_radius_range, max_size.saturating_sub(1))?;
        debug!(
            "PairSampler bound to {} factors with k in {:?}",
            data.num_factors(),
            self.k_range
        );
        self.data = Some(data);
        Ok(())
    }

    fn sample_idx(&mut self, idx: usize) -> Result<SampleTuple, SamplingError> {
        let data = bound(&self.data)?.clone();
        let anchor = data.idx_to_pos(idx)?;
        let (k_lo, k_hi) = self.k_range;
        let k = self.rng.random_range(k_lo..=k_hi);

        let mut positive = anchor.clone();
        for factor in index::sample(&mut self.rng, data.num_factors(), k) {
            let size = data.factor_sizes()[factor];
            positive[factor] = self.sample_value(anchor[factor], size);
        }
        Ok(vec![idx, data.pos_to_idx(&positive)?])
    }

    fn uninit_copy(&self) -> Box<dyn FactorSampler> {
        Box::new(Self::new(self.config.clone()))
    }

    fn name(&self) -> &'static str {
        "PairSampler"
    }
}
