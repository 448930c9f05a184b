//! Factor traversals used to animate a single factor

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DataError;

/// How to visit the values of a factor over a fixed number of frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    /// Evenly spaced values from the first to the last
    #[default]
    Interval,
    /// Even frames forwards then odd frames backwards, ending near the start
    Cycle,
}

impl TraversalMode {
    const ALL: [(&'static str, TraversalMode); 2] = [("cycle", Self::Cycle), ("interval", Self::Interval)];
}

impl FromStr for TraversalMode {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, mode)| *mode)
            .ok_or_else(|| DataError::InvalidTraversal {
                reason: format!(
                    "invalid factor traversal mode: {s:?}, must be one of: {:?}",
                    Self::ALL.map(|(name, _)| name)
                ),
            })
    }
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval => f.write_str("interval"),
            Self::Cycle => f.write_str("cycle"),
        }
    }
}

/// Evenly spaced indices over `[0, factor_size)`, offset by `start_index`.
///
/// Positions are rounded half to even, so `(5, 7)` gives `[0,1,1,2,3,3,4]`
/// and `(4, 7)` gives `[0,0,1,2,2,2,3]`.
pub fn interval_factor_traversal(factor_size: usize, num_frames: usize, start_index: usize) -> Result<Vec<usize>, DataError> {
    if factor_size == 0 {
        return Err(DataError::InvalidTraversal {
            reason: "factor_size must be at least 1".to_string(),
        });
    }
    let last = (factor_size - 1) as f64;
    let step = if num_frames > 1 { last / (num_frames - 1) as f64 } else { 0.0 };
    Ok((0..num_frames)
        .map(|i| {
            // pin the final frame to the endpoint like an inclusive linspace
            let value = if num_frames > 1 && i + 1 == num_frames { last } else { i as f64 * step };
            (start_index + value.round_ties_even() as usize) % factor_size
        })
        .collect())
}

/// Interval traversal reordered into a single out-and-back cycle
pub fn cycle_factor_traversal(factor_size: usize, num_frames: usize) -> Result<Vec<usize>, DataError> {
    let grid = interval_factor_traversal(factor_size, num_frames, 0)?;
    let forward = grid.iter().step_by(2).copied();
    let backward = grid.iter().skip(1).step_by(2).rev().copied();
    Ok(forward.chain(backward).collect())
}

/// Traversal of a factor with `factor_size` values over `num_frames` frames
pub fn get_idx_traversal(factor_size: usize, num_frames: usize, mode: TraversalMode) -> Result<Vec<usize>, DataError> {
    match mode {
        TraversalMode::Interval => interval_factor_traversal(factor_size, num_frames, 0),
        TraversalMode::Cycle => cycle_factor_traversal(factor_size, num_frames),
    }
}
