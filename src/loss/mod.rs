//! Adversarial loss shaping over encoded triples
//!
//! Distances between anchor/positive and anchor/negative representations are
//! turned into a per-example objective by a named shaping mode, optionally
//! restricted to the hardest examples.
//!
//! # Key Components
//!
//! - **pairwise_loss**: per-example pixelwise distance, optionally masked
//! - **AdversarialMode**: `self`, `invert`, `triplet` families with parsed margins
//! - **adversarial_loss**: mode + masking + top-k → scalar loss and statistics
//! - **sort_samples**: reorder positives and negatives by distance
//!
//! # Usage
//!
//! ```rust,ignore
//! use factorlab::loss::{adversarial_loss, AdversarialLossConfig};
//!
//! let config = AdversarialLossConfig::new("invert_margin_0.01")?;
//! let output = adversarial_loss(&(a, p, n), None, &config, &mut rng)?;
//! let loss = output.loss.to_scalar::<f32>()?;
//! ```

pub mod adversarial;
pub mod pairwise;

use thiserror::Error;

pub use adversarial::{
    adversarial_loss, sort_samples, AdversarialLossConfig, AdversarialLossOutput, AdversarialLossStats,
    AdversarialMode, SortMode, TensorTriple,
};
pub use pairwise::{pairwise_loss, PixelLoss};

/// Error types for loss shaping
#[derive(Error, Debug)]
pub enum LossError {
    /// Margin mode named without its margin
    #[error("`{mode}` is not valid, specify the margin in the name, eg. `{mode}_0.01`")]
    MissingMargin { mode: String },

    /// Margin suffix is not a finite number
    #[error("invalid margin in `{mode}`: {value:?} is not a finite number")]
    InvalidMargin { mode: String, value: String },

    /// Unrecognised mode name
    #[error("invalid {kind}: {name:?}, must be one of: {valid:?}")]
    UnknownMode {
        kind: &'static str,
        name: String,
        valid: Vec<&'static str>,
    },

    /// Operands do not share a shape
    #[error("shape mismatch between {lhs:?} and {rhs:?}")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Masking without raw inputs
    #[error("adversarial masking requires the raw input triple")]
    MissingInputs,

    /// Top-k outside the batch
    #[error("top k of {k} is invalid for a batch of {batch}")]
    InvalidTopK { k: usize, batch: usize },

    /// Tensor operation error
    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
}
