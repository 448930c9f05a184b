//! Lazily populated name → component registries
//!
//! Configuration refers to samplers (and anything else pluggable) by name; a
//! [`Registry`] maps those names to implementations without building them
//! until they are first looked up.
//!
//! # Key Components
//!
//! - **LazyValue / Slot**: deferred values realized at most once
//! - **ImportTable / LazyImport**: dotted-path namespaces resolved on demand
//! - **Constructor**: keyword-argument constructors with partial application
//! - **Registry**: validated keys, eager/lazy values, one-time replacement on lookup
//!
//! # Usage
//!
//! ```rust,ignore
//! use factorlab::registry::Registry;
//!
//! let mut registry = Registry::new("METRICS")?;
//! registry.register_value(Slot::lazy(|| Ok(expensive())), &["dci", "dci_metric"])?;
//! assert!(registry.contains("dci"));
//! let metric = registry.get("dci")?; // realized here, once
//! ```

pub mod builtins;
pub mod constructor;
pub mod import;
pub mod lazy;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

pub use builtins::{sampler_imports, sampler_registry, SamplerConstructor, SAMPLERS};
pub use constructor::{Constructor, Kwargs, Named, PartialApply};
pub use import::{ImportPath, ImportTable, LazyImport};
pub use lazy::{Generator, LazyValue, Slot};

/// Error types for registries and lazy values
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry name is not an identifier
    #[error("the given name for the registry is not a valid identifier: {name:?}")]
    InvalidName { name: String },

    /// No aliases given
    #[error("aliases must be specified, got an empty sequence")]
    EmptyAliases,

    /// Alias is not an identifier
    #[error("alias is not a valid identifier: {alias:?}")]
    InvalidAlias { alias: String },

    /// Alias already registered
    #[error("registry {registry:?} already contains key: {key:?}")]
    DuplicateKey { registry: String, key: String },

    /// Automatic alias taken and no alternatives given
    #[error("automatic alias: {name:?} already exists but no alternative aliases were specified")]
    AutoAliasTaken { name: String },

    /// Lookup of an unknown key
    #[error("registry {registry:?} does not contain the key: {key:?}, valid keys include: {valid:?}")]
    KeyNotFound {
        registry: String,
        key: String,
        valid: Vec<String>,
    },

    /// Key rejected by the key check
    #[error("invalid key {key:?} for registry {registry:?}: {reason}")]
    InvalidKey {
        registry: String,
        key: String,
        reason: String,
    },

    /// Value rejected by the value check
    #[error("invalid value for registry {registry:?}: {reason}")]
    InvalidValue { registry: String, reason: String },

    /// Generator yielded an unrealized lazy value
    #[error("lazy values should never return other unrealized lazy values")]
    ChainedLazy,

    /// Generator failed
    #[error("lazy value generator failed: {0:#}")]
    Generator(#[source] anyhow::Error),

    /// Realizing a registry entry failed
    #[error("failed to realize key {key:?} in registry {registry:?}: {source}")]
    Realization {
        registry: String,
        key: String,
        #[source]
        source: Box<RegistryError>,
    },

    /// Malformed dotted import path
    #[error("import path must be a dotted path of identifiers like `module.Name`, got: {path:?}")]
    InvalidImportPath { path: String },

    /// Import of an unknown module
    #[error("no module named {module:?}")]
    ModuleNotFound { module: String },

    /// Import of an unknown name in a known module
    #[error("module {module:?} has no attribute {name:?}")]
    AttributeNotFound { module: String, name: String },

    /// Import registered without an import table
    #[error("registry {registry:?} has no import table to resolve {path:?} against")]
    NoImportTable { registry: String, path: String },
}

/// Whether `s` is a bare identifier: a letter or `_`, then letters, digits or `_`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Predicate run against keys at registration; `Err` carries the reason
pub type KeyCheck = Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Predicate run against values; `Err` carries the reason
pub type ValueCheck<T> = Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// A lazy registry of named values.
///
/// Keys are unique for the registry's lifetime. Lazy values are realized on
/// first lookup, validated, and then replace their entry, so later lookups
/// neither realize nor validate again. Iteration follows insertion order.
pub struct Registry<T> {
    name: String,
    entries: IndexMap<String, Slot<T>>,
    key_check: Option<KeyCheck>,
    value_check: Option<ValueCheck<T>>,
    imports: Option<Arc<ImportTable<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Registry<T> {
    /// Create an empty registry; `name` must be an identifier
    pub fn new(name: impl Into<String>) -> Result<Self, RegistryError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(RegistryError::InvalidName { name });
        }
        Ok(Self {
            name,
            entries: IndexMap::new(),
            key_check: None,
            value_check: None,
            imports: None,
        })
    }

    /// Extra validation for keys, run at registration
    pub fn with_key_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        self.key_check = Some(Box::new(check));
        self
    }

    /// Validation for values, run eagerly or at first lookup for lazy values
    pub fn with_value_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.value_check = Some(Box::new(check));
        self
    }

    /// Namespace used by [`Registry::register_import`]
    pub fn with_imports(mut self, imports: Arc<ImportTable<T>>) -> Self {
        self.imports = Some(imports);
        self
    }

    /// The registry's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prepend `name` to `aliases` when automatic aliasing applies
    fn resolve_aliases(&self, name: &str, aliases: &[&str], auto_alias: bool) -> Result<Vec<String>, RegistryError> {
        let mut keys: Vec<String> = aliases.iter().map(|a| a.to_string()).collect();
        if auto_alias {
            if !self.contains(name) {
                keys.insert(0, name.to_string());
            } else if aliases.is_empty() {
                return Err(RegistryError::AutoAliasTaken {
                    name: name.to_string(),
                });
            }
        }
        Ok(keys)
    }

    /// Register a named value under its own name and/or `aliases`.
    ///
    /// With `auto_alias`, the value's name is used as an extra alias unless
    /// it is already taken, in which case explicit aliases are required.
    pub fn register(&mut self, value: T, aliases: &[&str], auto_alias: bool) -> Result<&mut Self, RegistryError>
    where
        T: Named,
    {
        let keys = self.resolve_aliases(value.name(), aliases, auto_alias)?;
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.register_value(Slot::Value(value), &keys)
    }

    /// Register a lazy import of `path`, aliased by its final segment.
    ///
    /// The path is only resolved when one of the keys is first looked up.
    pub fn register_import(&mut self, path: &str, aliases: &[&str], auto_alias: bool) -> Result<&mut Self, RegistryError> {
        let (imports, path) = self.import_target(path)?;
        let keys = self.resolve_aliases(path.name(), aliases, auto_alias)?;
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.register_value(Slot::Lazy(Arc::new(LazyImport::new(imports, path))), &keys)
    }

    /// Register a lazy import of `path` with fixed keyword arguments
    pub fn register_import_partial(
        &mut self,
        path: &str,
        aliases: &[&str],
        auto_alias: bool,
        partial: Kwargs,
    ) -> Result<&mut Self, RegistryError>
    where
        T: PartialApply,
    {
        let (imports, path) = self.import_target(path)?;
        let keys = self.resolve_aliases(path.name(), aliases, auto_alias)?;
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let lazy = LazyImport::with_partial(imports, path, partial);
        self.register_value(Slot::Lazy(Arc::new(lazy)), &keys)
    }

    fn import_target(&self, path: &str) -> Result<(Arc<ImportTable<T>>, ImportPath), RegistryError> {
        let parsed = ImportPath::parse(path)?;
        let imports = self.imports.clone().ok_or_else(|| RegistryError::NoImportTable {
            registry: self.name.clone(),
            path: path.to_string(),
        })?;
        Ok((imports, parsed))
    }

    /// Low-level registration of a slot under every alias.
    ///
    /// Eager values are validated immediately; lazy values are validated
    /// when realized so that missing optional components cannot fail here.
    pub fn register_value(&mut self, value: Slot<T>, aliases: &[&str]) -> Result<&mut Self, RegistryError> {
        if aliases.is_empty() {
            return Err(RegistryError::EmptyAliases);
        }
        for alias in aliases {
            if !is_identifier(alias) {
                return Err(RegistryError::InvalidAlias {
                    alias: alias.to_string(),
                });
            }
            if self.entries.contains_key(*alias) {
                return Err(RegistryError::DuplicateKey {
                    registry: self.name.clone(),
                    key: alias.to_string(),
                });
            }
            self.check_key(alias)?;
        }
        if let Slot::Value(value) = &value {
            self.check_value(value)?;
        }
        for alias in aliases {
            self.entries.insert(alias.to_string(), value.clone());
        }
        debug!(
            "Registered {:?} in {} ({})",
            aliases,
            self.name,
            if value.is_lazy() { "lazy" } else { "eager" }
        );
        Ok(self)
    }

    /// Register `value` under `aliases`, failing on any existing key
    pub fn insert(&mut self, aliases: &[&str], value: Slot<T>) -> Result<&mut Self, RegistryError> {
        self.register_value(value, aliases)
    }

    /// Register only the aliases that are not present yet.
    ///
    /// Existing aliases are skipped silently, so the same bulk registration
    /// can run from several places without ordering hazards.
    pub fn setdefault(&mut self, aliases: &[&str], value: Slot<T>) -> Result<&mut Self, RegistryError> {
        if aliases.is_empty() {
            return Err(RegistryError::EmptyAliases);
        }
        let missing: Vec<&str> = aliases.iter().copied().filter(|a| !self.contains(a)).collect();
        if missing.is_empty() {
            debug!(
                "skipped registering aliases for: {} as the keys already exist: {:?}",
                self.name, aliases
            );
            return Ok(self);
        }
        self.register_value(value, &missing)
    }

    /// View of this registry where insertion means "set if absent"
    pub fn set_default(&mut self) -> RegistrySetDefault<'_, T> {
        RegistrySetDefault { registry: self }
    }

    /// Look up `key`, realizing and validating a lazy value on first access
    pub fn get(&mut self, key: &str) -> Result<T, RegistryError> {
        let lazy = match self.entries.get(key) {
            None => {
                let mut valid: Vec<String> = self.entries.keys().cloned().collect();
                valid.sort();
                return Err(RegistryError::KeyNotFound {
                    registry: self.name.clone(),
                    key: key.to_string(),
                    valid,
                });
            }
            Some(Slot::Value(value)) => return Ok(value.clone()),
            Some(Slot::Lazy(lazy)) => Arc::clone(lazy),
        };
        let value = lazy.generate().map_err(|source| RegistryError::Realization {
            registry: self.name.clone(),
            key: key.to_string(),
            source: Box::new(source),
        })?;
        self.check_value(&value)?;
        // replacing keeps the key's position in iteration order
        self.entries.insert(key.to_string(), Slot::Value(value.clone()));
        debug!("Realized {:?} in {}", key, self.name);
        Ok(value)
    }

    /// Whether `key` is registered
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// `Some(true)` once `key` holds a concrete value, `None` if absent
    pub fn is_realized(&self, key: &str) -> Option<bool> {
        self.entries.get(key).map(|slot| match slot {
            Slot::Value(_) => true,
            Slot::Lazy(lazy) => lazy.is_realized(),
        })
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_key(&self, key: &str) -> Result<(), RegistryError> {
        match &self.key_check {
            Some(check) => check(key).map_err(|reason| RegistryError::InvalidKey {
                registry: self.name.clone(),
                key: key.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    fn check_value(&self, value: &T) -> Result<(), RegistryError> {
        match &self.value_check {
            Some(check) => check(value).map_err(|reason| RegistryError::InvalidValue {
                registry: self.name.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = &'a str;
    type IntoIter = std::iter::Map<indexmap::map::Keys<'a, String, Slot<T>>, fn(&'a String) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.keys().map(String::as_str as fn(&'a String) -> &'a str)
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Registry({:?}, ...)", self.name)
    }
}

/// "Set if absent" view returned by [`Registry::set_default`]
pub struct RegistrySetDefault<'a, T> {
    registry: &'a mut Registry<T>,
}

impl<T: Clone + Send + Sync + 'static> RegistrySetDefault<'_, T> {
    /// Register `value` under whichever of `aliases` are still free
    pub fn insert(&mut self, aliases: &[&str], value: Slot<T>) -> Result<(), RegistryError> {
        self.registry.setdefault(aliases, value).map(|_| ())
    }
}
