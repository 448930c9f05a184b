//! Error types for the factorlab crate

use thiserror::Error;

pub use crate::data::DataError;
pub use crate::eval::EvalError;
pub use crate::loss::LossError;
pub use crate::registry::RegistryError;
pub use crate::sampling::SamplingError;

/// Main error type for factorlab operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registry lookup or registration error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Factor space error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Sampler error
    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    /// Loss shaping error
    #[error("Loss error: {0}")]
    Loss(#[from] LossError),

    /// Distance-pair evaluation error
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Tensor operation error
    #[error("Tensor operation error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for factorlab operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
