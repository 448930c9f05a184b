//! Margin and triplet shaping of distance deltas

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use candle_core::{Tensor, D};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::pairwise::{pairwise_loss, PixelLoss};
use super::LossError;

/// Anchor, positive and negative tensors, batch first
pub type TensorTriple = (Tensor, Tensor, Tensor);

/// How `delta = d(a,n) - d(a,p)` becomes a per-example loss
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AdversarialMode {
    /// `|delta|`
    SelfDelta,
    /// `|delta|` over a random repairing of every positive and negative distance
    SelfRandom,
    /// `max(delta, 0)`
    #[default]
    Invert,
    /// `max(delta + margin, 0)`
    InvertMargin(f64),
    /// `delta`
    InvertUnbounded,
    /// `max(-delta, 0)`
    Triplet,
    /// `max(margin - delta, 0)`
    TripletMargin(f64),
    /// `-delta`
    TripletUnbounded,
}

impl AdversarialMode {
    const PLAIN: [(&'static str, AdversarialMode); 6] = [
        ("self", Self::SelfDelta),
        ("self_random", Self::SelfRandom),
        ("invert", Self::Invert),
        ("invert_unbounded", Self::InvertUnbounded),
        ("triplet", Self::Triplet),
        ("triplet_unbounded", Self::TripletUnbounded),
    ];

    const MARGIN: [&'static str; 2] = ["invert_margin", "triplet_margin"];

    /// The margin parsed from the mode name, if any
    pub fn margin(&self) -> Option<f64> {
        match self {
            Self::InvertMargin(m) | Self::TripletMargin(m) => Some(*m),
            _ => None,
        }
    }

    fn shape(&self, deltas: &Tensor) -> candle_core::Result<Tensor> {
        match *self {
            Self::SelfDelta | Self::SelfRandom => deltas.abs(),
            Self::Invert => deltas.relu(),
            Self::InvertMargin(margin) => deltas.affine(1.0, margin)?.relu(),
            Self::InvertUnbounded => Ok(deltas.clone()),
            Self::Triplet => deltas.neg()?.relu(),
            Self::TripletMargin(margin) => deltas.affine(-1.0, margin)?.relu(),
            Self::TripletUnbounded => deltas.neg(),
        }
    }
}

impl FromStr for AdversarialMode {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for margin_mode in Self::MARGIN {
            if s == margin_mode {
                return Err(LossError::MissingMargin {
                    mode: margin_mode.to_string(),
                });
            }
            if let Some(value) = s.strip_prefix(margin_mode).and_then(|rest| rest.strip_prefix('_')) {
                let margin = value
                    .parse::<f64>()
                    .ok()
                    .filter(|m| m.is_finite())
                    .ok_or_else(|| LossError::InvalidMargin {
                        mode: s.to_string(),
                        value: value.to_string(),
                    })?;
                return Ok(if margin_mode == "invert_margin" {
                    Self::InvertMargin(margin)
                } else {
                    Self::TripletMargin(margin)
                });
            }
        }
        Self::PLAIN
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, mode)| *mode)
            .ok_or_else(|| {
                let mut valid: Vec<&'static str> = Self::PLAIN.iter().map(|(name, _)| *name).collect();
                valid.extend(["invert_margin_<margin>", "triplet_margin_<margin>"]);
                LossError::UnknownMode {
                    kind: "adversarial mode",
                    name: s.to_string(),
                    valid,
                }
            })
    }
}

impl TryFrom<String> for AdversarialMode {
    type Error = LossError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AdversarialMode> for String {
    fn from(mode: AdversarialMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for AdversarialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvertMargin(m) => write!(f, "invert_margin_{m}"),
            Self::TripletMargin(m) => write!(f, "triplet_margin_{m}"),
            plain => {
                let name = Self::PLAIN
                    .iter()
                    .find(|(_, mode)| mode == plain)
                    .map(|(name, _)| *name)
                    .unwrap_or("unknown");
                f.write_str(name)
            }
        }
    }
}

/// Settings for [`adversarial_loss`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdversarialLossConfig {
    /// Shaping applied to the distance deltas
    pub adversarial_mode: AdversarialMode,
    /// Triples arrive as (anchor, negative, positive)
    pub adversarial_swapped: bool,
    /// Only compare elements where the raw inputs differ
    pub adversarial_masking: bool,
    /// Average only the `k` largest per-example losses
    pub adversarial_top_k: Option<usize>,
    /// Distance used for the deltas
    pub pixel_loss_mode: PixelLoss,
    /// Compute [`AdversarialLossStats`]
    pub return_stats: bool,
}

impl Default for AdversarialLossConfig {
    fn default() -> Self {
        Self {
            adversarial_mode: AdversarialMode::default(),
            adversarial_swapped: false,
            adversarial_masking: false,
            adversarial_top_k: None,
            pixel_loss_mode: PixelLoss::Mse,
            return_stats: false,
        }
    }
}

impl AdversarialLossConfig {
    /// Default settings with the mode parsed from `mode`
    pub fn new(mode: &str) -> Result<Self, LossError> {
        Ok(Self {
            adversarial_mode: mode.parse()?,
            ..Default::default()
        })
    }
}

/// Means and unbiased standard deviations of the deltas
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdversarialLossStats {
    /// Mean anchor/positive distance
    pub p_delta_mean: f64,
    /// Spread of the anchor/positive distances
    pub p_delta_std: f64,
    /// Mean anchor/negative distance
    pub n_delta_mean: f64,
    /// Spread of the anchor/negative distances
    pub n_delta_std: f64,
    /// Over the shaped losses kept after top-k
    pub deltas_mean: f64,
    /// Spread of the shaped losses kept after top-k
    pub deltas_std: f64,
}

impl AdversarialLossStats {
    fn from_tensors(p_deltas: &Tensor, n_deltas: &Tensor, loss_deltas: &Tensor) -> candle_core::Result<Self> {
        let (p_delta_mean, p_delta_std) = mean_std(&p_deltas.to_vec1::<f32>()?);
        let (n_delta_mean, n_delta_std) = mean_std(&n_deltas.to_vec1::<f32>()?);
        let (deltas_mean, deltas_std) = mean_std(&loss_deltas.to_vec1::<f32>()?);
        Ok(Self {
            p_delta_mean,
            p_delta_std,
            n_delta_mean,
            n_delta_std,
            deltas_mean,
            deltas_std,
        })
    }

    /// Flat `stat/<name>:<agg>` map for experiment loggers
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        [
            ("stat/p_delta:mean", self.p_delta_mean),
            ("stat/p_delta:std", self.p_delta_std),
            ("stat/n_delta:mean", self.n_delta_mean),
            ("stat/n_delta:std", self.n_delta_std),
            ("stat/deltas:mean", self.deltas_mean),
            ("stat/deltas:std", self.deltas_std),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

fn mean_std(values: &[f32]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

/// Result of [`adversarial_loss`]
#[derive(Debug, Clone)]
pub struct AdversarialLossOutput {
    /// Scalar `F32` loss
    pub loss: Tensor,
    /// Present when `return_stats` is set
    pub stats: Option<AdversarialLossStats>,
}

fn ordered(triple: &TensorTriple, swapped: bool) -> (&Tensor, &Tensor, &Tensor) {
    let (a, p, n) = triple;
    if swapped {
        (a, n, p)
    } else {
        (a, p, n)
    }
}

/// Shape the distance deltas of encoded triples `ys` into a scalar loss.
///
/// `xs` holds the raw inputs and is only read when masking is enabled.
/// `rng` is only drawn from by the `self_random` mode.
#[instrument(level = "debug", skip_all, fields(mode = %config.adversarial_mode))]
pub fn adversarial_loss<R: Rng + ?Sized>(
    ys: &TensorTriple,
    xs: Option<&TensorTriple>,
    config: &AdversarialLossConfig,
    rng: &mut R,
) -> Result<AdversarialLossOutput, LossError> {
    let (a_y, p_y, n_y) = ordered(ys, config.adversarial_swapped);

    let (ap_mask, an_mask) = if config.adversarial_masking {
        let (a_x, p_x, n_x) = ordered(xs.ok_or(LossError::MissingInputs)?, config.adversarial_swapped);
        (Some(a_x.ne(p_x)?), Some(a_x.ne(n_x)?))
    } else {
        (None, None)
    };

    let p_deltas = pairwise_loss(a_y, p_y, config.pixel_loss_mode, ap_mask.as_ref())?;
    let n_deltas = pairwise_loss(a_y, n_y, config.pixel_loss_mode, an_mask.as_ref())?;
    let batch = p_deltas.dim(0)?;

    let deltas = match config.adversarial_mode {
        AdversarialMode::SelfRandom => {
            let all = Tensor::cat(&[&p_deltas, &n_deltas], 0)?;
            let mut order: Vec<u32> = (0..2 * batch as u32).collect();
            order.shuffle(rng);
            let lhs = Tensor::new(&order[batch..], all.device())?;
            let rhs = Tensor::new(&order[..batch], all.device())?;
            (all.index_select(&lhs, 0)? - all.index_select(&rhs, 0)?)?
        }
        _ => (&n_deltas - &p_deltas)?,
    };
    let mut loss_deltas = config.adversarial_mode.shape(&deltas)?;

    if let Some(k) = config.adversarial_top_k {
        if k == 0 || k > batch {
            return Err(LossError::InvalidTopK { k, batch });
        }
        let (sorted, _) = loss_deltas.sort_last_dim(false)?;
        loss_deltas = sorted.narrow(D::Minus1, 0, k)?;
    }

    let loss = loss_deltas.mean_all()?;
    let stats = if config.return_stats {
        Some(AdversarialLossStats::from_tensors(&p_deltas, &n_deltas, &loss_deltas)?)
    } else {
        None
    };
    Ok(AdversarialLossOutput { loss, stats })
}

/// Reordering applied to positives and negatives before the loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Keep the given order
    #[default]
    None,
    /// Exchange every positive with its negative
    Swap,
    /// Put the closer observation first
    SortInorder,
    /// Put the further observation first
    SortReverse,
}

impl SortMode {
    const ALL: [(&'static str, SortMode); 4] = [
        ("none", Self::None),
        ("swap", Self::Swap),
        ("sort_inorder", Self::SortInorder),
        ("sort_reverse", Self::SortReverse),
    ];
}

impl FromStr for SortMode {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, mode)| *mode)
            .ok_or_else(|| LossError::UnknownMode {
                kind: "sort mode",
                name: s.to_string(),
                valid: Self::ALL.map(|(name, _)| name).to_vec(),
            })
    }
}

/// Reorder positives and negatives by their pixel distance to the anchor
pub fn sort_samples(x: &TensorTriple, sort_mode: SortMode, pixel_loss_mode: PixelLoss) -> Result<TensorTriple, LossError> {
    let (a_x, p_x, n_x) = x;
    let swap_mask = match sort_mode {
        SortMode::None => return Ok(x.clone()),
        SortMode::Swap => return Ok((a_x.clone(), n_x.clone(), p_x.clone())),
        SortMode::SortInorder | SortMode::SortReverse => {
            let p_deltas = pairwise_loss(a_x, p_x, pixel_loss_mode, None)?;
            let n_deltas = pairwise_loss(a_x, n_x, pixel_loss_mode, None)?;
            if sort_mode == SortMode::SortInorder {
                p_deltas.gt(&n_deltas)?
            } else {
                p_deltas.lt(&n_deltas)?
            }
        }
    };
    // one flag per example, broadcast over the remaining dimensions
    let mut shape = vec![1; p_x.rank()];
    shape[0] = p_x.dim(0)?;
    let swap_mask = swap_mask.reshape(shape)?.broadcast_as(p_x.dims())?;
    Ok((
        a_x.clone(),
        swap_mask.where_cond(n_x, p_x)?,
        swap_mask.where_cond(p_x, n_x)?,
    ))
}
