//! Dotted-path namespaces and lazy imports
//!
//! An [`ImportTable`] plays the part of a module system: components are
//! published under `module.path.Name` and resolved by path when a registry
//! entry is first looked up. Paths that were never published (an optional
//! component that is not compiled in, for example) only fail at that point.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::constructor::{Kwargs, PartialApply};
use super::lazy::{LazyValue, Slot};
use super::{is_identifier, RegistryError};

/// A validated `module.path.Name` import path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportPath {
    module: String,
    name: String,
}

impl ImportPath {
    /// Parse and validate a dotted path with at least two identifier segments
    pub fn parse(path: &str) -> Result<Self, RegistryError> {
        let invalid = || RegistryError::InvalidImportPath {
            path: path.to_string(),
        };
        let segments: Vec<&str> = path.split('.').collect();
        if segments.len() < 2 || !segments.iter().all(|s| is_identifier(s)) {
            return Err(invalid());
        }
        let (name, module) = segments.split_last().ok_or_else(invalid)?;
        Ok(Self {
            module: module.join("."),
            name: (*name).to_string(),
        })
    }

    /// Module part of the path
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Final segment, used as the automatic registry alias
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// A namespace of importable values grouped by module
pub struct ImportTable<T> {
    modules: IndexMap<String, IndexMap<String, Slot<T>>>,
}

impl<T> Default for ImportTable<T> {
    fn default() -> Self {
        Self {
            modules: IndexMap::new(),
        }
    }
}

impl<T: Clone> ImportTable<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an eager value under `path`
    pub fn provide(&mut self, path: &str, value: T) -> Result<&mut Self, RegistryError> {
        self.provide_slot(path, Slot::Value(value))
    }

    /// Publish a slot (possibly lazy) under `path`
    pub fn provide_slot(&mut self, path: &str, slot: Slot<T>) -> Result<&mut Self, RegistryError> {
        let path = ImportPath::parse(path)?;
        let module = self.modules.entry(path.module).or_default();
        if module.contains_key(&path.name) {
            return Err(RegistryError::DuplicateKey {
                registry: "imports".to_string(),
                key: path.name,
            });
        }
        module.insert(path.name, slot);
        Ok(self)
    }

    /// Resolve a path to its published slot
    pub fn resolve(&self, path: &ImportPath) -> Result<Slot<T>, RegistryError> {
        let module = self
            .modules
            .get(path.module())
            .ok_or_else(|| RegistryError::ModuleNotFound {
                module: path.module().to_string(),
            })?;
        module
            .get(path.name())
            .cloned()
            .ok_or_else(|| RegistryError::AttributeNotFound {
                module: path.module().to_string(),
                name: path.name().to_string(),
            })
    }

    /// All published paths in publication order
    pub fn paths(&self) -> impl Iterator<Item = String> + '_ {
        self.modules
            .iter()
            .flat_map(|(module, names)| names.keys().map(move |name| format!("{module}.{name}")))
    }
}

/// Lazy values that resolve an import path on first use.
///
/// Partial keyword arguments are applied to the resolved value, so a single
/// published constructor can back several registry entries with different
/// fixed settings.
pub struct LazyImport;

impl LazyImport {
    /// A lazy value resolving `path` against `table`
    pub fn new<T>(table: Arc<ImportTable<T>>, path: ImportPath) -> LazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        LazyValue::from_slot_fn(move || {
            debug!("Importing {}", path);
            Ok(table.resolve(&path)?)
        })
    }

    /// A lazy value resolving `path` and partially applying `kwargs`
    pub fn with_partial<T>(table: Arc<ImportTable<T>>, path: ImportPath, kwargs: Kwargs) -> LazyValue<T>
    where
        T: Clone + PartialApply + Send + Sync + 'static,
    {
        LazyValue::from_slot_fn(move || {
            debug!("Importing {} with {} partial kwargs", path, kwargs.len());
            let value = match table.resolve(&path)? {
                Slot::Value(value) => value,
                Slot::Lazy(inner) => inner.get().ok_or(RegistryError::ChainedLazy)?,
            };
            Ok(Slot::Value(value.partial(&kwargs)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_path() {
        let path = ImportPath::parse("factorlab.sampling.SameK").unwrap();
        assert_eq!(path.module(), "factorlab.sampling");
        assert_eq!(path.name(), "SameK");
        assert_eq!(path.to_string(), "factorlab.sampling.SameK");

        for bad in ["SameK", "", "factorlab..SameK", "factorlab.1abc", "a.b-c"] {
            assert!(ImportPath::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_resolve_reports_missing_module_and_attribute() {
        let mut table = ImportTable::new();
        table.provide("pkg.module.Thing", 5u32).unwrap();

        let found = table.resolve(&ImportPath::parse("pkg.module.Thing").unwrap()).unwrap();
        assert!(matches!(found, Slot::Value(5)));

        let missing_module = table.resolve(&ImportPath::parse("pkg.other.Thing").unwrap());
        assert!(matches!(missing_module, Err(RegistryError::ModuleNotFound { .. })));

        let missing_attr = table.resolve(&ImportPath::parse("pkg.module.Other").unwrap());
        assert!(matches!(missing_attr, Err(RegistryError::AttributeNotFound { .. })));
    }

    #[test]
    fn test_lazy_import_defers_resolution() {
        let mut table = ImportTable::new();
        table.provide("pkg.Present", 1u8).unwrap();
        let table = Arc::new(table);

        let present = LazyImport::new(Arc::clone(&table), ImportPath::parse("pkg.Present").unwrap());
        let absent = LazyImport::new(table, ImportPath::parse("pkg.Absent").unwrap());

        assert_eq!(present.generate().unwrap(), 1);
        assert!(absent.generate().is_err());
        assert!(!absent.is_realized());
    }
}
