//! Per-example pixelwise distances

use std::fmt;
use std::str::FromStr;

use candle_core::{DType, Tensor};
use serde::{Deserialize, Serialize};

use super::LossError;

/// Elementwise distance between two observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLoss {
    /// Squared difference
    #[default]
    Mse,
    /// Absolute difference
    Mae,
}

impl PixelLoss {
    const ALL: [(&'static str, PixelLoss); 2] = [("mae", Self::Mae), ("mse", Self::Mse)];
}

impl FromStr for PixelLoss {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, mode)| *mode)
            .ok_or_else(|| LossError::UnknownMode {
                kind: "pixel loss mode",
                name: s.to_string(),
                valid: Self::ALL.map(|(name, _)| name).to_vec(),
            })
    }
}

impl fmt::Display for PixelLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mse => f.write_str("mse"),
            Self::Mae => f.write_str("mae"),
        }
    }
}

/// Distance between `pred` and `targ` for every example in the batch.
///
/// Inputs share a shape whose first dimension is the batch. The elementwise
/// loss is computed in `F32`, multiplied by `mask` when given (any dtype,
/// nonzero keeps an element), and averaged over every non-batch element.
/// Masked elements still count in the denominator.
pub fn pairwise_loss(pred: &Tensor, targ: &Tensor, mode: PixelLoss, mask: Option<&Tensor>) -> Result<Tensor, LossError> {
    if pred.dims() != targ.dims() {
        return Err(LossError::ShapeMismatch {
            lhs: pred.dims().to_vec(),
            rhs: targ.dims().to_vec(),
        });
    }
    let diff = (pred.to_dtype(DType::F32)? - targ.to_dtype(DType::F32)?)?;
    let mut loss = match mode {
        PixelLoss::Mse => diff.sqr()?,
        PixelLoss::Mae => diff.abs()?,
    };
    if let Some(mask) = mask {
        if mask.dims() != pred.dims() {
            return Err(LossError::ShapeMismatch {
                lhs: pred.dims().to_vec(),
                rhs: mask.dims().to_vec(),
            });
        }
        loss = (loss * mask.to_dtype(DType::F32)?)?;
    }
    if loss.rank() == 1 {
        return Ok(loss);
    }
    Ok(loss.flatten_from(1)?.mean(1)?)
}
