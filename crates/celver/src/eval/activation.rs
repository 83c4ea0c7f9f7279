//! Variable bindings for evaluation.

use std::collections::HashMap;

use super::Value;

/// Resolves variable names to values during evaluation.
///
/// Activations are supplied fresh for each evaluation; names that no
/// expression refers to are simply never looked up.
pub trait Activation: Send + Sync {
    /// Returns `None` if the variable is not bound.
    fn resolve(&self, name: &str) -> Option<Value>;

    fn has(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

/// Owned bindings backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapActivation {
    bindings: HashMap<String, Value>,
}

impl MapActivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapActivation {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// A frame of local bindings over a parent activation.
///
/// Comprehensions push one of these so the iteration and accumulator
/// variables shadow outer names.
pub struct HierarchicalActivation<'a> {
    parent: &'a dyn Activation,
    local: HashMap<String, Value>,
}

impl<'a> HierarchicalActivation<'a> {
    pub fn new(parent: &'a dyn Activation) -> Self {
        Self {
            parent,
            local: HashMap::new(),
        }
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.local.insert(name.into(), value.into());
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.local
            .get(name)
            .cloned()
            .or_else(|| self.parent.resolve(name))
    }

    fn has(&self, name: &str) -> bool {
        self.local.contains_key(name) || self.parent.has(name)
    }
}

/// An activation with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl EmptyActivation {
    pub fn new() -> Self {
        Self
    }
}

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }

    fn has(&self, _name: &str) -> bool {
        false
    }
}

impl<T: Activation + ?Sized> Activation for &T {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }
}

impl<T: Activation + ?Sized> Activation for std::sync::Arc<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }
}
