//! Sampling index tuples from ground-truth factor spaces
//!
//! A sampler is bound once to a factor space and then turns an anchor index
//! into a tuple of `num_samples` indices, the anchor first (anchor, positive,
//! negative for triples).
//!
//! # Key Components
//!
//! - **FactorSampler**: the sampling contract shared by every sampler
//! - **RandomSampler / PairSampler**: plain random and distance-constrained pairs
//! - **Adversarial samplers**: swapped-random, close/far and same-k triples
//! - **Factory**: adversarial mode names → configured samplers via the registry
//!
//! # Usage
//!
//! ```rust,ignore
//! use factorlab::data::StateSpace;
//! use factorlab::sampling::make_adversarial_sampler;
//!
//! let data = Arc::new(StateSpace::new([4, 4, 4])?);
//! let mut sampler = make_adversarial_sampler("same_k", Some(0))?;
//! sampler.init(data)?;
//! let (anchor, positive, negative) = sampler.sample_triple(12)?;
//! ```

pub mod adversarial;
pub mod factory;
pub mod pair;
pub mod random;
pub mod seed;

use thiserror::Error;

use crate::data::{DataError, SharedData};

pub use adversarial::{
    factor_dist, CloseFarConfig, CloseFarSampler, KChoice, SameKConfig, SameKSampler, SwapMetric,
    SwappedRandomConfig, SwappedRandomSampler, SAME_K_MAX_TRIES,
};
pub use factory::{adversarial_modes, make_adversarial_sampler, sampler_report, PairDistance, ReportRow, SamplerReport};
pub use pair::{PairConfig, PairSampler};
pub use random::{RandomConfig, RandomSampler};
pub use seed::{derive_seed, seeded_rng, with_temp_seed};

/// Indices returned by one call to [`FactorSampler::sample`], anchor first
pub type SampleTuple = Vec<usize>;

/// Error types for samplers
#[derive(Error, Debug)]
pub enum SamplingError {
    /// Sampling before `init`
    #[error("sampler has not been initialized with a factor space")]
    NotInitialized,

    /// Second `init`
    #[error("sampler has already been initialized")]
    AlreadyInitialized,

    /// Configuration does not fit the factor space
    #[error("invalid sampler configuration: {0}")]
    InvalidConfig(String),

    /// Same-k generation ran out of tries
    #[error("could not generate factors differing in exactly {k} positions after {tries} tries")]
    ConstraintExhausted { k: usize, tries: usize },

    /// Composite samplers returned different anchors
    #[error("close and far samplers disagree on the anchor: {close} != {far}")]
    AnchorMismatch { close: usize, far: usize },

    /// Tuple length differs from `num_samples`
    #[error("sampler returned {got} indices but should return {expected}")]
    WrongArity { expected: usize, got: usize },

    /// Sample violates the sampler's ordering or factor count
    #[error("sample violates its constraints: {0}")]
    Postcondition(String),

    /// Factor space error
    #[error(transparent)]
    Data(#[from] DataError),
}

/// The sampling contract.
///
/// Implementors provide [`bind`](FactorSampler::bind) and
/// [`sample_idx`](FactorSampler::sample_idx); callers use
/// [`init`](FactorSampler::init) and [`sample`](FactorSampler::sample), which
/// enforce single initialization, index bounds and the tuple length.
pub trait FactorSampler: Send {
    /// Number of indices per sample (2 for pairs, 3 for triples)
    fn num_samples(&self) -> usize;

    /// The bound factor space, if initialized
    fn data(&self) -> Option<&SharedData>;

    /// Attach the factor space and validate the configuration against it
    fn bind(&mut self, data: SharedData) -> Result<(), SamplingError>;

    /// Produce a tuple for an in-range anchor index
    fn sample_idx(&mut self, idx: usize) -> Result<SampleTuple, SamplingError>;

    /// Same configuration, no bound factor space
    fn uninit_copy(&self) -> Box<dyn FactorSampler>;

    /// Name used in diagnostics
    fn name(&self) -> &'static str;

    /// Whether a factor space is bound
    fn is_init(&self) -> bool {
        self.data().is_some()
    }

    /// Bind the sampler to `data`; a sampler can only be initialized once
    fn init(&mut self, data: SharedData) -> Result<(), SamplingError> {
        if self.is_init() {
            return Err(SamplingError::AlreadyInitialized);
        }
        self.bind(data)
    }

    /// Sample a tuple anchored at `idx`
    fn sample(&mut self, idx: usize) -> Result<SampleTuple, SamplingError> {
        let len = self.data().ok_or(SamplingError::NotInitialized)?.len();
        if idx >= len {
            return Err(DataError::IndexOutOfRange { index: idx, len }.into());
        }
        let tuple = self.sample_idx(idx)?;
        if tuple.len() != self.num_samples() {
            return Err(SamplingError::WrongArity {
                expected: self.num_samples(),
                got: tuple.len(),
            });
        }
        Ok(tuple)
    }

    /// Sample an (anchor, positive, negative) triple
    fn sample_triple(&mut self, idx: usize) -> Result<(usize, usize, usize), SamplingError> {
        match self.sample(idx)?.as_slice() {
            &[a, p, n] => Ok((a, p, n)),
            other => Err(SamplingError::WrongArity {
                expected: 3,
                got: other.len(),
            }),
        }
    }
}

/// The bound factor space or [`SamplingError::NotInitialized`]
pub(crate) fn bound(data: &Option<SharedData>) -> Result<&SharedData, SamplingError> {
    data.as_ref().ok_or(SamplingError::NotInitialized)
}

/// Number of positions where two factor vectors differ
pub fn num_differing(a: &[usize], b: &[usize]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

/// Sum of absolute factor differences
pub fn l1_dist(a: &[usize], b: &[usize]) -> usize {
    a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).sum()
}
