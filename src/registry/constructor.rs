//! Named constructors taking keyword arguments
//!
//! Components are built from a JSON keyword map so the same constructor can be
//! driven from configuration files and partially applied at registration.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Keyword arguments passed to a [`Constructor`]
pub type Kwargs = serde_json::Map<String, Value>;

/// Values that can be partially applied with fixed keyword arguments
pub trait PartialApply {
    /// Return a copy with `kwargs` fixed as defaults
    fn partial(&self, kwargs: &Kwargs) -> Self;
}

/// Values that carry their own name, used for automatic registry aliases
pub trait Named {
    /// The value's own name
    fn name(&self) -> &str;
}

type BuildFn<O> = dyn Fn(&Kwargs) -> anyhow::Result<O> + Send + Sync;

/// A cheaply cloneable named constructor
pub struct Constructor<O> {
    name: String,
    build: Arc<BuildFn<O>>,
    defaults: Kwargs,
}

impl<O> Constructor<O> {
    /// Wrap a build function
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&Kwargs) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            build: Arc::new(build),
            defaults: Kwargs::new(),
        }
    }

    /// Wrap a constructor that deserializes its keyword arguments into `C`
    pub fn from_config<C, F>(name: impl Into<String>, build: F) -> Self
    where
        C: DeserializeOwned,
        F: Fn(C) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self::new(name, move |kwargs| {
            let config: C = serde_json::from_value(Value::Object(kwargs.clone()))
                .map_err(|e| anyhow::anyhow!("invalid arguments for {label}: {e}"))?;
            build(config)
        })
    }

    /// Keyword arguments fixed by partial application
    pub fn defaults(&self) -> &Kwargs {
        &self.defaults
    }

    /// Build with the fixed defaults overridden by `overrides`
    pub fn call(&self, overrides: &Kwargs) -> anyhow::Result<O> {
        let mut kwargs = self.defaults.clone();
        kwargs.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        (self.build)(&kwargs)
    }

    /// Build with only the fixed defaults
    pub fn call_default(&self) -> anyhow::Result<O> {
        self.call(&Kwargs::new())
    }
}

impl<O> Clone for Constructor<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            build: Arc::clone(&self.build),
            defaults: self.defaults.clone(),
        }
    }
}

impl<O> PartialApply for Constructor<O> {
    fn partial(&self, kwargs: &Kwargs) -> Self {
        let mut partial = self.clone();
        partial
            .defaults
            .extend(kwargs.iter().map(|(k, v)| (k.clone(), v.clone())));
        partial
    }
}

impl<O> Named for Constructor<O> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<O> fmt::Debug for Constructor<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Build a [`Kwargs`] map from `key => value` pairs
#[macro_export]
macro_rules! kwargs {
    () => { $crate::registry::Kwargs::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::registry::Kwargs::new();
        $( map.insert(($key).to_string(), $crate::__private::serde_json::json!($value)); )+
        map
    }};
}
