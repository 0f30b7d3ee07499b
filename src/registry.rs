//! Name-keyed registries for pluggable components.
//!
//! A registry is built once with [`RegistryBuilder`], frozen with
//! [`RegistryBuilder::build`], and from then on only answers lookups.

use crate::data::DataLoader;
use crate::error::{DoraError, Result};
use crate::models::OutlierDetection;
use std::collections::BTreeMap;

/// Registry of detection algorithms keyed by name.
pub type AlgorithmRegistry = Registry<dyn OutlierDetection>;

/// Registry of data loaders keyed by name.
pub type DataLoaderRegistry = Registry<dyn DataLoader>;

/// Mutable stage of a registry: accepts registrations only.
pub struct RegistryBuilder<T: ?Sized> {
    kind: &'static str,
    entries: BTreeMap<String, Box<T>>,
}

impl<T: ?Sized> RegistryBuilder<T> {
    /// `kind` names the component type in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Bind `name` to `implementation`. Fails if the name is taken.
    pub fn register(&mut self, name: impl Into<String>, implementation: Box<T>) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(DoraError::DuplicateName {
                kind: self.kind,
                name,
            });
        }
        self.entries.insert(name, implementation);
        Ok(())
    }

    /// Freeze the registry.
    pub fn build(self) -> Registry<T> {
        Registry {
            kind: self.kind,
            entries: self.entries,
        }
    }
}

/// Frozen registry: lookups only.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: BTreeMap<String, Box<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn resolve(&self, name: &str) -> Result<&T> {
        self.entries
            .get(name)
            .map(|entry| entry.as_ref())
            .ok_or_else(|| DoraError::not_found(self.kind, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {
        fn greet(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Greeter for Fixed {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    fn builder() -> RegistryBuilder<dyn Greeter> {
        RegistryBuilder::new("greeter")
    }

    #[test]
    fn test_register_and_resolve_distinct_names() {
        let mut builder = builder();
        builder.register("a", Box::new(Fixed("alpha"))).unwrap();
        builder.register("b", Box::new(Fixed("beta"))).unwrap();
        let registry = builder.build();

        assert_eq!(registry.resolve("a").unwrap().greet(), "alpha");
        assert_eq!(registry.resolve("b").unwrap().greet(), "beta");
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder = builder();
        builder.register("a", Box::new(Fixed("first"))).unwrap();
        let err = builder.register("a", Box::new(Fixed("second"))).unwrap_err();
        assert!(matches!(
            err,
            DoraError::DuplicateName { kind: "greeter", ref name } if name == "a"
        ));

        // The original binding survives the rejected registration.
        let registry = builder.build();
        assert_eq!(registry.resolve("a").unwrap().greet(), "first");
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let registry = builder().build();
        let err = registry.resolve("nonexistent").err().unwrap();
        assert!(matches!(
            err,
            DoraError::NotFound { kind: "greeter", ref name } if name == "nonexistent"
        ));
        assert!(!registry.contains("nonexistent"));
        assert!(registry.is_empty());
    }
}
