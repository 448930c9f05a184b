//! Adversarial sampler modes and sampler diagnostics

use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};

use super::{l1_dist, num_differing, FactorSampler};
use crate::data::{FactorVec, SharedData};
use crate::error::Result;
use crate::kwargs;
use crate::registry::SAMPLERS;

/// Build the sampler registered for an adversarial `mode`.
///
/// Unknown modes fail with a registry error listing every valid mode.
#[instrument(level = "debug")]
pub fn make_adversarial_sampler(mode: &str, seed: Option<u64>) -> Result<Box<dyn FactorSampler>> {
    let constructor = SAMPLERS.lock().get(mode)?;
    let sampler = constructor.call(&kwargs! { "seed" => seed })?;
    debug!("Built {} for mode {:?}", sampler.name(), mode);
    Ok(sampler)
}

/// Every adversarial mode name in registration order
pub fn adversarial_modes() -> Vec<String> {
    SAMPLERS.lock().keys().map(String::from).collect()
}

/// Differing-factor count and L1 distance between two factor vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairDistance {
    /// Number of differing factors
    pub k: usize,
    /// Sum of absolute factor differences
    pub dist: usize,
}

impl PairDistance {
    fn between(a: &[usize], b: &[usize]) -> Self {
        Self {
            k: num_differing(a, b),
            dist: l1_dist(a, b),
        }
    }
}

/// One sampled triple in factor space
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    /// Anchor factors
    pub anchor: FactorVec,
    /// Positive factors
    pub positive: FactorVec,
    /// Negative factors
    pub negative: FactorVec,
    /// Anchor to positive
    pub ap: PairDistance,
    /// Anchor to negative
    pub an: PairDistance,
    /// Positive to negative
    pub pn: PairDistance,
}

/// Distances of the triples drawn for the first anchors of a factor space
#[derive(Debug, Clone, Serialize)]
pub struct SamplerReport {
    /// Name of the sampler that drew the triples
    pub sampler: String,
    /// One row per anchor
    pub rows: Vec<ReportRow>,
    /// Triples whose positive and negative share every factor
    pub count_pn_k0: usize,
    /// Triples whose positive and negative are at L1 distance zero
    pub count_pn_d0: usize,
}

/// Sample triples for the first `steps` anchors and summarise their distances.
///
/// The sampler is initialized against `data` if it is not already bound.
pub fn sampler_report(sampler: &mut dyn FactorSampler, data: SharedData, steps: usize) -> Result<SamplerReport> {
    if !sampler.is_init() {
        sampler.init(data.clone())?;
    }
    let mut rows = Vec::new();
    for idx in 0..steps.min(data.len()) {
        let (a, p, n) = sampler.sample_triple(idx)?;
        let (anchor, positive, negative) = (data.idx_to_pos(a)?, data.idx_to_pos(p)?, data.idx_to_pos(n)?);
        rows.push(ReportRow {
            ap: PairDistance::between(&anchor, &positive),
            an: PairDistance::between(&anchor, &negative),
            pn: PairDistance::between(&positive, &negative),
            anchor,
            positive,
            negative,
        });
    }
    Ok(SamplerReport {
        sampler: sampler.name().to_string(),
        count_pn_k0: rows.iter().filter(|r| r.pn.k == 0).count(),
        count_pn_d0: rows.iter().filter(|r| r.pn.dist == 0).count(),
        rows,
    })
}

impl fmt::Display for SamplerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(
                f,
                "{}: [ap:{:2}:{:2}] [an:{:2}:{:2}] [pn:{:2}:{:2}] {:?} {:?} {:?}",
                self.sampler,
                row.ap.k,
                row.ap.dist,
                row.an.k,
                row.an.dist,
                row.pn.k,
                row.pn.dist,
                row.anchor,
                row.positive,
                row.negative,
            )?;
        }
        write!(f, "count pn:(k=0) = {} pn:(d=0) = {}", self.count_pn_k0, self.count_pn_d0)
    }
}
