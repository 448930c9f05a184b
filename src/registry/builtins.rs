//! Built-in sampler registry
//!
//! Sampler constructors are published once in an [`ImportTable`] under
//! `factorlab.sampling.*`; each adversarial mode is then a registry alias
//! that lazily imports one of them with its mode-specific keyword arguments.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::{Constructor, ImportTable, Registry, RegistryError};
use crate::kwargs;
use crate::sampling::{
    CloseFarConfig, CloseFarSampler, FactorSampler, RandomConfig, RandomSampler, SameKConfig, SameKSampler,
    SwappedRandomConfig, SwappedRandomSampler,
};

/// Constructor producing a boxed sampler from keyword arguments
pub type SamplerConstructor = Constructor<Box<dyn FactorSampler>>;

const RANDOM: &str = "factorlab.sampling.RandomSampler";
const SWAPPED_RANDOM: &str = "factorlab.sampling.adversarial.SwappedRandom";
const CLOSE_FAR: &str = "factorlab.sampling.adversarial.CloseFar";
const SAME_K: &str = "factorlab.sampling.adversarial.SameK";

/// Process-wide adversarial sampler registry, built on first use
pub static SAMPLERS: Lazy<Mutex<Registry<SamplerConstructor>>> = Lazy::new(|| {
    let registry = sampler_registry().unwrap_or_else(|e| panic!("built-in sampler registry is invalid: {e}"));
    Mutex::new(registry)
});

/// Namespace of the sampler constructors that registry entries import
pub fn sampler_imports() -> Result<Arc<ImportTable<SamplerConstructor>>, RegistryError> {
    let mut table = ImportTable::new();
    table
        .provide(
            RANDOM,
            Constructor::from_config("RandomSampler", |config: RandomConfig| {
                Ok(Box::new(RandomSampler::new(config)?) as Box<dyn FactorSampler>)
            }),
        )?
        .provide(
            SWAPPED_RANDOM,
            Constructor::from_config("SwappedRandom", |config: SwappedRandomConfig| {
                Ok(Box::new(SwappedRandomSampler::new(config)) as Box<dyn FactorSampler>)
            }),
        )?
        .provide(
            CLOSE_FAR,
            Constructor::from_config("CloseFar", |config: CloseFarConfig| {
                Ok(Box::new(CloseFarSampler::new(config)) as Box<dyn FactorSampler>)
            }),
        )?
        .provide(
            SAME_K,
            Constructor::from_config("SameK", |config: SameKConfig| {
                Ok(Box::new(SameKSampler::new(config)) as Box<dyn FactorSampler>)
            }),
        )?;
    Ok(Arc::new(table))
}

/// Registry of every adversarial sampler mode
pub fn sampler_registry() -> Result<Registry<SamplerConstructor>, RegistryError> {
    let mut registry = Registry::new("SAMPLERS")?.with_imports(sampler_imports()?);

    for metric in ["k", "manhattan", "manhattan_norm", "euclidean", "euclidean_norm"] {
        let alias = format!("random_swap_{metric}");
        registry.register_import_partial(SWAPPED_RANDOM, &[alias.as_str()], false, kwargs! { "swap_metric" => metric })?;
    }
    registry
        .register_import_partial(
            CLOSE_FAR,
            &["close_far", "close_p_random_n"],
            false,
            kwargs! {
                "p_k_range" => [1, 1],
                "p_radius_range" => [1, 1],
                "n_k_range" => [1, -1],
                "n_radius_range" => [1, -1],
            },
        )?
        .register_import_partial(SAME_K, &["same_k"], false, kwargs! { "k" => "random", "sample_p_close" => false })?
        .register_import_partial(SAME_K, &["same_k_close"], false, kwargs! { "k" => "random", "sample_p_close" => true })?
        .register_import_partial(SAME_K, &["same_k1_close"], false, kwargs! { "k" => 1, "sample_p_close" => true })?
        .register_import_partial(RANDOM, &["random"], false, kwargs! { "num_samples" => 3 })?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_are_registered_lazily() {
        let registry = sampler_registry().unwrap();
        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(keys[0], "random_swap_k");
        assert!(keys.contains(&"close_p_random_n"));
        assert!(keys.contains(&"same_k1_close"));
        assert!(keys.iter().all(|k| registry.is_realized(k) == Some(false)));
    }

    #[test]
    fn test_aliases_share_one_constructor() {
        let mut registry = sampler_registry().unwrap();
        let constructor = registry.get("close_far").unwrap();
        assert_eq!(registry.is_realized("close_far"), Some(true));
        assert_eq!(registry.is_realized("close_p_random_n"), Some(true));
        assert_eq!(constructor.defaults()["n_k_range"], serde_json::json!([1, -1]));
    }

    #[test]
    fn test_every_mode_builds_a_triple_sampler() {
        let mut registry = sampler_registry().unwrap();
        let keys: Vec<String> = registry.keys().map(String::from).collect();
        for key in keys {
            let sampler = registry.get(&key).unwrap().call_default().unwrap();
            assert_eq!(sampler.num_samples(), 3, "{key}");
        }
    }
}
