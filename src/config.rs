//! Configuration structures for factorlab

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::eval::{EvalBackend, FitnessMode};
use crate::loss::{AdversarialLossConfig, SortMode};
use crate::registry::SAMPLERS;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampler selection and the factor space it runs on
    pub sampler: SamplerConfig,
    /// Adversarial loss shaping
    pub loss: LossConfig,
    /// Distance-pair evaluation
    pub eval: EvalConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON or YAML file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            other => {
                return Err(Error::config(format!(
                    "unsupported configuration format {:?} for {}, expected json, yaml or yml",
                    other.unwrap_or(""),
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !SAMPLERS.lock().contains(&self.sampler.mode) {
            return Err(Error::config(format!(
                "unknown sampler mode {:?}, see `factorlab modes`",
                self.sampler.mode
            )));
        }
        if self.sampler.factor_sizes.is_empty() {
            return Err(Error::config("factor_sizes must name at least one factor"));
        }
        if self.sampler.factor_sizes.contains(&0) {
            return Err(Error::config("every factor size must be > 0"));
        }
        if self.loss.adversarial.adversarial_top_k == Some(0) {
            return Err(Error::config("adversarial_top_k must be > 0 when set"));
        }
        Ok(())
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Sampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Adversarial sampler mode, a key of the sampler registry
    pub mode: String,
    /// Seed for reproducible sampling
    pub seed: Option<u64>,
    /// Size of each factor of the state space
    pub factor_sizes: Vec<usize>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mode: "close_far".to_string(),
            seed: None,
            factor_sizes: vec![8, 8],
        }
    }
}

/// Loss configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LossConfig {
    /// Delta shaping settings
    pub adversarial: AdversarialLossConfig,
    /// Reordering of positives and negatives before the loss
    pub sort_mode: SortMode,
}

/// Evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Spread measure per observation
    pub fitness_mode: FitnessMode,
    /// Evaluation implementation
    pub backend: EvalBackend,
    /// Count observations with a single kept neighbour as zero spread
    pub increment_single: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            fitness_mode: FitnessMode::Std,
            backend: EvalBackend::Fast,
            increment_single: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 0 = info, 1 = debug, 2+ = trace
    pub verbosity: u8,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}
