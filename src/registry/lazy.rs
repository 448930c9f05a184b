//! Deferred, memoized values
//!
//! A [`LazyValue`] holds a generator until it is first read. Realization
//! happens at most once: the generator is invoked, its result cached and the
//! generator dropped so that anything it captured is released.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::RegistryError;

/// Generator producing the contents of a lazy value.
///
/// The generator may yield another [`Slot`], but only an eager value or an
/// already realized lazy value is accepted; lazy chaining is unsupported.
pub type Generator<T> = Box<dyn FnMut() -> anyhow::Result<Slot<T>> + Send>;

/// Either an eager value or a shared deferred one
pub enum Slot<T> {
    /// Concrete value
    Value(T),
    /// Deferred value, shared between every alias it was registered under
    Lazy(Arc<LazyValue<T>>),
}

impl<T> Slot<T> {
    /// Wrap a generator in a lazy slot
    pub fn lazy<F>(generate: F) -> Self
    where
        F: FnMut() -> anyhow::Result<T> + Send + 'static,
    {
        Self::Lazy(Arc::new(LazyValue::new(generate)))
    }

    /// Whether this slot still needs realizing
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }
}

impl<T> Clone for Slot<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Lazy(lazy) => Self::Lazy(Arc::clone(lazy)),
        }
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Slot::Value(..)"),
            Self::Lazy(lazy) => write!(f, "Slot::Lazy({lazy:?})"),
        }
    }
}

enum LazyState<T> {
    Unrealized(Generator<T>),
    Realized(T),
}

/// A value computed by a generator the first time it is requested.
///
/// Realization runs under a mutex, so concurrent readers block until the
/// first caller finishes and the generator is never invoked twice. The
/// generator must not read the same lazy value again: the mutex is not
/// reentrant.
///
/// A failing generator leaves the value unrealized so a later call can retry.
pub struct LazyValue<T> {
    state: Mutex<LazyState<T>>,
}

impl<T> LazyValue<T> {
    /// Create a lazy value from a generator of plain values
    pub fn new<F>(mut generate: F) -> Self
    where
        F: FnMut() -> anyhow::Result<T> + Send + 'static,
    {
        Self::from_slot_fn(move || generate().map(Slot::Value))
    }

    /// Create a lazy value from a generator that yields slots
    pub fn from_slot_fn<F>(generate: F) -> Self
    where
        F: FnMut() -> anyhow::Result<Slot<T>> + Send + 'static,
    {
        Self {
            state: Mutex::new(LazyState::Unrealized(Box::new(generate))),
        }
    }

    /// Create an already realized value
    pub fn realized(value: T) -> Self {
        Self {
            state: Mutex::new(LazyState::Realized(value)),
        }
    }

    /// Whether the generator has already run successfully
    pub fn is_realized(&self) -> bool {
        matches!(*self.state.lock(), LazyState::Realized(_))
    }
}

impl<T: Clone> LazyValue<T> {
    /// Realize the value if needed and return a copy of the cached result.
    ///
    /// The state lock is held while the generator runs, so concurrent callers
    /// wait for a single realization. A generator must not look up its own
    /// value; that deadlocks.
    pub fn generate(&self) -> Result<T, RegistryError> {
        let mut state = self.state.lock();
        let value = match &mut *state {
            LazyState::Realized(value) => return Ok(value.clone()),
            LazyState::Unrealized(generate) => {
                match generate().map_err(RegistryError::Generator)? {
                    Slot::Value(value) => value,
                    Slot::Lazy(inner) => inner.get().ok_or(RegistryError::ChainedLazy)?,
                }
            }
        };
        // dropping the generator here releases anything it captured
        *state = LazyState::Realized(value.clone());
        Ok(value)
    }

    /// The cached value, if realized
    pub fn get(&self) -> Option<T> {
        match &*self.state.lock() {
            LazyState::Realized(value) => Some(value.clone()),
            LazyState::Unrealized(_) => None,
        }
    }
}

impl<T> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.try_lock() {
            Some(state) => match *state {
                LazyState::Realized(_) => "realized",
                LazyState::Unrealized(_) => "unrealized",
            },
            None => "realizing",
        };
        write!(f, "LazyValue(<{state}>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_generator_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = LazyValue::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(vec![1, 2, 3]))
        });

        assert!(!lazy.is_realized());
        let first = lazy.generate().unwrap();
        for _ in 0..5 {
            let again = lazy.generate().unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert!(lazy.is_realized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_does_not_poison() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let lazy = LazyValue::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("optional dependency missing")
            }
            Ok(7u32)
        });

        assert!(matches!(lazy.generate(), Err(RegistryError::Generator(_))));
        assert!(!lazy.is_realized());
        assert_eq!(lazy.generate().unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unrealized_chain_is_rejected() {
        let inner: Arc<LazyValue<u32>> = Arc::new(LazyValue::new(|| Ok(1)));
        let chained = Arc::clone(&inner);
        let outer = LazyValue::from_slot_fn(move || Ok(Slot::Lazy(Arc::clone(&chained))));

        assert!(matches!(outer.generate(), Err(RegistryError::ChainedLazy)));
        assert!(!outer.is_realized());

        // a realized inner value is just a value
        inner.generate().unwrap();
        assert_eq!(outer.generate().unwrap(), 1);
    }

    #[test]
    fn test_debug_reports_state() {
        let lazy = LazyValue::realized(3u8);
        assert_eq!(format!("{lazy:?}"), "LazyValue(<realized>)");
    }
}
