//! Integration tests for registries, lazy values and lazy imports

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use factorlab::kwargs;
use factorlab::registry::{Constructor, ImportTable, Kwargs, LazyValue, Registry, RegistryError, Slot};

type Builder = Constructor<String>;

fn greeter() -> Builder {
    Constructor::new("Greeter", |kwargs: &Kwargs| {
        let name = kwargs.get("name").and_then(|v| v.as_str()).unwrap_or("world");
        Ok(format!("hello {name}"))
    })
}

#[test]
fn test_duplicate_alias_is_rejected() {
    let mut registry = Registry::new("GREETERS").unwrap();
    registry.register(greeter(), &["hello"], true).unwrap();

    let err = registry.register_value(Slot::Value(greeter()), &["hello"]).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateKey { ref key, .. } if key == "hello"));

    // the automatic alias is taken and no alternatives were given
    let err = registry.register(greeter(), &[], true).unwrap_err();
    assert!(matches!(err, RegistryError::AutoAliasTaken { .. }));

    // alternatives make the second registration legal
    registry.register(greeter(), &["hi"], true).unwrap();
    assert_eq!(registry.keys().collect::<Vec<_>>(), ["Greeter", "hello", "hi"]);
}

#[test]
fn test_empty_and_invalid_aliases_are_rejected() {
    let mut registry: Registry<Builder> = Registry::new("GREETERS").unwrap();
    assert!(matches!(
        registry.register_value(Slot::Value(greeter()), &[]),
        Err(RegistryError::EmptyAliases)
    ));
    for bad in ["", "two words", "dotted.name", "1st"] {
        assert!(matches!(
            registry.register_value(Slot::Value(greeter()), &[bad]),
            Err(RegistryError::InvalidAlias { .. })
        ));
    }
    assert!(registry.is_empty());
}

#[test]
fn test_lazy_value_generates_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let lazy = LazyValue::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(vec![1, 2, 3]))
    });

    let first = lazy.generate().unwrap();
    for _ in 0..5 {
        assert!(Arc::ptr_eq(&first, &lazy.generate().unwrap()));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_missing_import_fails_and_stays_unrealized() {
    let table: Arc<ImportTable<Builder>> = Arc::new(ImportTable::new());
    let mut registry = Registry::new("GREETERS").unwrap().with_imports(table);
    registry
        .register_import("greetings.missing.Greeter", &["greeter"], false)
        .unwrap();

    for _ in 0..2 {
        let err = registry.get("greeter").unwrap_err();
        match err {
            RegistryError::Realization { key, source, .. } => {
                assert_eq!(key, "greeter");
                assert!(matches!(*source, RegistryError::Generator(_)), "{source}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(registry.is_realized("greeter"), Some(false));
    }
}

#[test]
fn test_failed_realization_can_be_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let mut registry = Registry::new("FLAKY").unwrap();
    registry
        .register_value(
            Slot::lazy(move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("optional dependency unavailable");
                }
                Ok(7u8)
            }),
            &["flaky"],
        )
        .unwrap();

    assert!(registry.get("flaky").is_err());
    assert_eq!(registry.get("flaky").unwrap(), 7);
    assert_eq!(registry.get("flaky").unwrap(), 7);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_partial_import_fixes_keyword_arguments() {
    let mut table = ImportTable::new();
    table.provide("greetings.Greeter", greeter()).unwrap();
    let mut registry = Registry::new("GREETERS").unwrap().with_imports(Arc::new(table));
    registry
        .register_import("greetings.Greeter", &[], true)
        .unwrap()
        .register_import_partial("greetings.Greeter", &["greet_rust"], false, kwargs! { "name" => "rust" })
        .unwrap();

    assert_eq!(registry.get("Greeter").unwrap().call_default().unwrap(), "hello world");
    let partial = registry.get("greet_rust").unwrap();
    assert_eq!(partial.call_default().unwrap(), "hello rust");
    assert_eq!(partial.call(&kwargs! { "name" => "crab" }).unwrap(), "hello crab");
}

#[test]
fn test_missing_key_lists_sorted_keys() {
    let mut registry = Registry::new("NUMBERS").unwrap();
    registry.insert(&["zeta", "alpha"], Slot::Value(1u8)).unwrap();
    registry.insert(&["mid"], Slot::Value(2u8)).unwrap();

    let err = registry.get("omega").unwrap_err();
    match &err {
        RegistryError::KeyNotFound { valid, .. } => assert_eq!(valid, &["alpha", "mid", "zeta"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("omega"));
}

#[test]
fn test_setdefault_skips_existing_aliases() {
    let mut registry = Registry::new("NUMBERS").unwrap();
    registry.insert(&["one"], Slot::Value(1u8)).unwrap();
    registry.set_default().insert(&["one", "uno"], Slot::Value(9u8)).unwrap();

    assert_eq!(registry.get("one").unwrap(), 1);
    assert_eq!(registry.get("uno").unwrap(), 9);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_lazy_values_are_validated_on_lookup() {
    let mut registry = Registry::new("EVENS")
        .unwrap()
        .with_value_check(|v: &u32| if v % 2 == 0 { Ok(()) } else { Err(format!("{v} is odd")) });

    assert!(matches!(
        registry.insert(&["three"], Slot::Value(3)),
        Err(RegistryError::InvalidValue { .. })
    ));
    // deferred until realization
    registry.insert(&["five"], Slot::lazy(|| Ok(5))).unwrap();
    assert!(matches!(registry.get("five"), Err(RegistryError::InvalidValue { .. })));
}
