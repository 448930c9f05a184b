//! Uniformly random tuples

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{bound, seeded_rng, FactorSampler, SampleTuple, SamplingError};
use crate::data::SharedData;

/// Configuration for [`RandomSampler`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomConfig {
    /// Tuple length including the anchor
    pub num_samples: usize,
    /// Seed for the sampler's random stream
    pub seed: Option<u64>,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            num_samples: 1,
            seed: None,
        }
    }
}

/// The anchor followed by uniformly random indices
pub struct RandomSampler {
    config: RandomConfig,
    data: Option<SharedData>,
    rng: StdRng,
}

impl RandomSampler {
    /// Create a sampler; `num_samples` must be at least 1
    pub fn new(config: RandomConfig) -> Result<Self, SamplingError> {
        if config.num_samples == 0 {
            return Err(SamplingError::InvalidConfig("num_samples must be at least 1".to_string()));
        }
        Ok(Self {
            rng: seeded_rng(config.seed),
            config,
            data: None,
        })
    }
}

impl FactorSampler for RandomSampler {
    fn num_samples(&self) -> usize {
        self.config.num_samples
    }

    fn data(&self) -> Option<&SharedData> {
        self.data.as_ref()
    }

    fn bind(&mut self, data: SharedData) -> Result<(), SamplingError> {
        self.data = Some(data);
        Ok(())
    }

    fn sample_idx(&mut self, idx: usize) -> Result<SampleTuple, SamplingError> {
        let len = bound(&self.data)?.len();
        let mut tuple = Vec::with_capacity(self.config.num_samples);
        tuple.push(idx);
        tuple.extend((1..self.config.num_samples).map(|_| self.rng.random_range(0..len)));
        Ok(tuple)
    }

    fn uninit_copy(&self) -> Box<dyn FactorSampler> {
        Box::new(Self {
            config: self.config.clone(),
            data: None,
            rng: seeded_rng(self.config.seed),
        })
    }

    fn name(&self) -> &'static str {
        "RandomSampler"
    }
}
