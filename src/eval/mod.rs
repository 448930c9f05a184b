//! Fitness of observation subsets from precomputed distance pairs
//!
//! Every observation `i` carries a row of distances to `pairs_per_obs` other
//! observations. Given a boolean keep-mask over observations, a factor's
//! fitness is the mean, over kept observations with kept neighbours, of the
//! spread (`range` or population `std`) of those neighbour distances.

pub mod dist_pairs;

use thiserror::Error;

pub use dist_pairs::{
    eval_dist_pairs_fast, eval_dist_pairs_reference, eval_masked_dist_pairs, EvalBackend, FitnessMode,
};

/// Error types for distance-pair evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Unrecognised mode or backend name
    #[error("invalid {kind}: {name:?}, must be one of: {valid:?}")]
    UnknownMode {
        kind: &'static str,
        name: String,
        valid: Vec<&'static str>,
    },

    /// Mask, distances and indices disagree in shape
    #[error("mask has {mask} entries but the distance rows have shape {dists:?} and the index rows {idxs:?}")]
    ShapeMismatch {
        mask: usize,
        dists: Vec<usize>,
        idxs: Vec<usize>,
    },

    /// Neighbour index outside the observations
    #[error("pair index {index} in row {row} is out of range for {len} observations")]
    PairIndexOutOfRange { row: usize, index: usize, len: usize },
}
