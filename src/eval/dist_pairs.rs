//! Masked distance-pair fitness, with a reference and a fast backend

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EvalError;

/// Spread measured over each observation's kept neighbour distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessMode {
    /// `max - min`
    Range,
    /// Population standard deviation
    #[default]
    Std,
}

/// Implementation used by [`eval_masked_dist_pairs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalBackend {
    /// Gathers each row into an ndarray and aggregates in two passes
    Reference,
    /// Single streaming pass per row without allocation
    #[default]
    Fast,
}

macro_rules! named_enum {
    ($ty:ty, $kind:literal, [$(($name:literal, $variant:expr)),+ $(,)?]) => {
        impl $ty {
            /// Every variant with its name
            pub const ALL: &'static [(&'static str, $ty)] = &[$(($name, $variant)),+];
        }

        impl FromStr for $ty {
            type Err = EvalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .find(|(name, _)| *name == s)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| EvalError::UnknownMode {
                        kind: $kind,
                        name: s.to_string(),
                        valid: Self::ALL.iter().map(|(name, _)| *name).collect(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = Self::ALL.iter().find(|(_, v)| v == self).map(|(name, _)| *name).unwrap_or("unknown");
                f.write_str(name)
            }
        }
    };
}

named_enum!(FitnessMode, "fitness_mode", [("range", FitnessMode::Range), ("std", FitnessMode::Std)]);
named_enum!(EvalBackend, "backend", [("fast", EvalBackend::Fast), ("reference", EvalBackend::Reference)]);

fn check_shapes(mask: ArrayView1<bool>, dists: ArrayView2<f64>, idxs: ArrayView2<usize>) -> Result<(), EvalError> {
    if dists.dim() != idxs.dim() || dists.nrows() != mask.len() {
        return Err(EvalError::ShapeMismatch {
            mask: mask.len(),
            dists: dists.shape().to_vec(),
            idxs: idxs.shape().to_vec(),
        });
    }
    for (row, idx_row) in idxs.axis_iter(Axis(0)).enumerate() {
        if let Some(&index) = idx_row.iter().find(|&&j| j >= mask.len()) {
            return Err(EvalError::PairIndexOutOfRange {
                row,
                index,
                len: mask.len(),
            });
        }
    }
    Ok(())
}

/// Two-pass evaluation over gathered ndarray rows.
///
/// Rows that are masked out or have no kept neighbours are skipped. A row
/// with a single kept neighbour contributes `0` when `increment_single` is
/// set. Returns `NaN` when no row contributes.
pub fn eval_dist_pairs_reference(
    mask: ArrayView1<bool>,
    pair_obs_dists: ArrayView2<f64>,
    pair_obs_idxs: ArrayView2<usize>,
    fitness_mode: FitnessMode,
    increment_single: bool,
) -> Result<f64, EvalError> {
    check_shapes(mask, pair_obs_dists, pair_obs_idxs)?;
    let mut values = Vec::new();
    for (i, (dists, idxs)) in pair_obs_dists.outer_iter().zip(pair_obs_idxs.outer_iter()).enumerate() {
        if !mask[i] {
            continue;
        }
        let kept: Array1<f64> = dists
            .iter()
            .zip(idxs.iter())
            .filter(|&(_, &j)| mask[j])
            .map(|(&d, _)| d)
            .collect();
        match kept.len() {
            0 => continue,
            1 if !increment_single => continue,
            1 => values.push(0.0),
            _ => values.push(match fitness_mode {
                FitnessMode::Std => kept.std(0.0),
                FitnessMode::Range => {
                    let max = kept.fold(f64::NEG_INFINITY, |m, &d| m.max(d));
                    let min = kept.fold(f64::INFINITY, |m, &d| m.min(d));
                    max - min
                }
            }),
        }
    }
    Ok(Array1::from(values).mean().unwrap_or(f64::NAN))
}

/// Single-pass evaluation with the same semantics as
/// [`eval_dist_pairs_reference`], using Welford's update for `std`.
pub fn eval_dist_pairs_fast(
    mask: ArrayView1<bool>,
    pair_obs_dists: ArrayView2<f64>,
    pair_obs_idxs: ArrayView2<usize>,
    fitness_mode: FitnessMode,
    increment_single: bool,
) -> Result<f64, EvalError> {
    check_shapes(mask, pair_obs_dists, pair_obs_idxs)?;
    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..mask.len() {
        if !mask[i] {
            continue;
        }
        let mut n = 0usize;
        let (mut mean, mut m2) = (0.0, 0.0);
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for (&d, &j) in pair_obs_dists.row(i).iter().zip(pair_obs_idxs.row(i).iter()) {
            if !mask[j] {
                continue;
            }
            n += 1;
            let delta = d - mean;
            mean += delta / n as f64;
            m2 += delta * (d - mean);
            lo = lo.min(d);
            hi = hi.max(d);
        }
        if n > 1 {
            total += match fitness_mode {
                FitnessMode::Std => (m2 / n as f64).max(0.0).sqrt(),
                FitnessMode::Range => hi - lo,
            };
            count += 1;
        } else if n == 1 && increment_single {
            count += 1;
        }
    }
    Ok(if count == 0 { f64::NAN } else { total / count as f64 })
}

/// Fitness of the observations kept by `mask`, and the fraction kept.
///
/// `NaN` results (nothing contributed, or an empty mask) are reported as
/// negative infinity so that selection code never compares against `NaN`.
pub fn eval_masked_dist_pairs(
    mask: ArrayView1<bool>,
    pair_obs_dists: ArrayView2<f64>,
    pair_obs_idxs: ArrayView2<usize>,
    fitness_mode: FitnessMode,
    increment_single: bool,
    backend: EvalBackend,
) -> Result<(f64, f64), EvalError> {
    let eval = match backend {
        EvalBackend::Reference => eval_dist_pairs_reference,
        EvalBackend::Fast => eval_dist_pairs_fast,
    };
    let factor_score = eval(mask, pair_obs_dists, pair_obs_idxs, fitness_mode, increment_single)?;
    let kept_ratio = mask.iter().filter(|&&m| m).count() as f64 / mask.len() as f64;
    debug!(
        "{} {} fitness: score={:.6} kept={:.3}",
        backend, fitness_mode, factor_score, kept_ratio
    );
    let or_neg_inf = |v: f64| if v.is_nan() { f64::NEG_INFINITY } else { v };
    Ok((or_neg_inf(factor_score), or_neg_inf(kept_ratio)))
}
