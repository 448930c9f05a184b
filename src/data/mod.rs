//! Ground-truth factor spaces
//!
//! Synthetic disentanglement datasets are indexed by the full Cartesian
//! product of their factors. This module defines the contract samplers rely
//! on ([`GroundTruthData`]) and a concrete row-major implementation
//! ([`StateSpace`]) for datasets that only need the index bijection.

pub mod state_space;
pub mod traversal;

use std::sync::Arc;

pub use state_space::StateSpace;
pub use traversal::{cycle_factor_traversal, get_idx_traversal, interval_factor_traversal, TraversalMode};

/// One value per factor, each in `[0, factor_sizes[i])`
pub type FactorVec = Vec<usize>;

/// Shared handle to a factor space
pub type SharedData = Arc<dyn GroundTruthData>;

/// A dataset with a total bijection between flat indices and factor vectors
pub trait GroundTruthData: Send + Sync {
    /// Number of values each factor can take
    fn factor_sizes(&self) -> &[usize];

    /// Human readable factor names
    fn factor_names(&self) -> Vec<String> {
        (0..self.num_factors()).map(|i| format!("factor_{i}")).collect()
    }

    /// Number of factors
    fn num_factors(&self) -> usize {
        self.factor_sizes().len()
    }

    /// Number of observations, the product of the factor sizes
    fn len(&self) -> usize {
        self.factor_sizes().iter().product()
    }

    /// Check if the factor space is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert a flat index to its factor vector
    fn idx_to_pos(&self, idx: usize) -> Result<FactorVec, DataError>;

    /// Convert a factor vector to its flat index
    fn pos_to_idx(&self, pos: &[usize]) -> Result<usize, DataError>;

    /// Convert several indices at once
    fn idx_to_pos_batch(&self, idxs: &[usize]) -> Result<Vec<FactorVec>, DataError> {
        idxs.iter().map(|&idx| self.idx_to_pos(idx)).collect()
    }

    /// Convert several factor vectors at once
    fn pos_to_idx_batch(&self, positions: &[FactorVec]) -> Result<Vec<usize>, DataError> {
        positions.iter().map(|pos| self.pos_to_idx(pos)).collect()
    }
}

/// Error types for factor spaces
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Flat index beyond the space
    #[error("Invalid index: {index} >= {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Factor value beyond its size
    #[error("Factor {factor} has value {value} but size {size}")]
    FactorOutOfRange { factor: usize, value: usize, size: usize },

    /// Factor vector of the wrong length
    #[error("Expected {expected} factors, got {got}")]
    WrongNumFactors { expected: usize, got: usize },

    /// Empty, zero or overflowing factor sizes
    #[error("Invalid factor sizes: {reason}")]
    InvalidFactorSizes { reason: String },

    /// Bad traversal mode or size
    #[error("Invalid traversal: {reason}")]
    InvalidTraversal { reason: String },
}
