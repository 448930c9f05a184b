//! factorlab - adversarial sampling and loss shaping over ground-truth factor spaces
//!
//! This crate provides the pieces used to build hard training triples for
//! disentangled representation learning: lazily populated component
//! registries, samplers over synthetic factor spaces, margin-based loss
//! shaping and masked distance-pair evaluation.

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod logging;
pub mod loss;
pub mod registry;
pub mod sampling;

// Re-exports
pub use config::Config;
pub use data::{GroundTruthData, SharedData, StateSpace};
pub use error::{Error, Result};
pub use eval::eval_masked_dist_pairs;
pub use loss::{adversarial_loss, AdversarialLossConfig, AdversarialMode};
pub use registry::{LazyValue, Registry, Slot};
pub use sampling::{make_adversarial_sampler, FactorSampler};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
