//! Native function bindings, keyed by overload id.
//!
//! The checker records the overload ids a call may resolve to; at runtime the
//! evaluator hands those ids to [`FunctionRegistry::dispatch`], which picks
//! the first binding whose declared parameters accept the argument values.

use std::collections::HashMap;

use tracing::trace;

use super::{EvalError, Value};
use crate::types::{CelType, FunctionDecl, FunctionImpl, OverloadDecl};

/// A native implementation bound to one overload id.
#[derive(Clone)]
pub struct FunctionBinding {
    pub id: String,
    pub name: String,
    pub is_member: bool,
    /// Declared parameter types, receiver first.
    pub params: Vec<CelType>,
    pub implementation: FunctionImpl,
}

impl FunctionBinding {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Arity matches and every value fits its declared parameter type.
    pub fn accepts(&self, args: &[Value]) -> bool {
        args.len() == self.params.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| arg.is_instance_of(param))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.implementation)(args)
    }
}

impl std::fmt::Debug for FunctionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionBinding")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_member", &self.is_member)
            .field("params", &self.params)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    bindings: HashMap<String, FunctionBinding>,
    /// Function name to overload ids, in registration order.
    by_name: HashMap<String, Vec<String>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one overload. Returns false (and registers nothing) when the
    /// overload carries no implementation.
    pub fn register_overload(&mut self, name: &str, overload: &OverloadDecl) -> bool {
        let Some(implementation) = overload.implementation.clone() else {
            return false;
        };
        let binding = FunctionBinding {
            id: overload.id.clone(),
            name: name.to_string(),
            is_member: overload.is_member,
            params: overload.params.clone(),
            implementation,
        };
        let ids = self.by_name.entry(name.to_string()).or_default();
        if !ids.contains(&binding.id) {
            ids.push(binding.id.clone());
        }
        self.bindings.insert(binding.id.clone(), binding);
        true
    }

    /// Register every overload of `decl` that has an implementation.
    pub fn register_function(&mut self, decl: &FunctionDecl) {
        for overload in &decl.overloads {
            self.register_overload(&decl.name, overload);
        }
    }

    pub fn get(&self, overload_id: &str) -> Option<&FunctionBinding> {
        self.bindings.get(overload_id)
    }

    pub fn contains(&self, overload_id: &str) -> bool {
        self.bindings.contains_key(overload_id)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Bindings for `name` with the given arity and call style.
    pub fn find_overloads(&self, name: &str, arity: usize, is_member: bool) -> Vec<&FunctionBinding> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.bindings.get(id))
            .filter(|b| b.arity() == arity && b.is_member == is_member)
            .collect()
    }

    /// Invoke the binding for a call whose arguments are already evaluated.
    ///
    /// `overload_ids` are the checker's candidates; `None` means the
    /// expression was not checked, and bindings are looked up by name.
    pub fn dispatch(
        &self,
        name: &str,
        overload_ids: Option<&[String]>,
        is_member: bool,
        args: &[Value],
    ) -> Value {
        let candidates: Vec<&FunctionBinding> = match overload_ids {
            Some(ids) if !ids.is_empty() => {
                let bound: Vec<_> = ids.iter().filter_map(|id| self.get(id)).collect();
                if bound.is_empty() {
                    return Value::error(EvalError::internal(format!(
                        "no implementation registered for overload '{}'",
                        ids.join("', '")
                    )));
                }
                bound
            }
            _ => self.find_overloads(name, args.len(), is_member),
        };

        if candidates.is_empty() {
            return if self.has_function(name) {
                Value::error(EvalError::no_matching_overload(name))
            } else {
                Value::error(EvalError::unknown_function(name))
            };
        }

        match candidates.into_iter().find(|b| b.accepts(args)) {
            Some(binding) => {
                trace!(function = name, overload = %binding.id, "dispatch");
                binding.call(args)
            }
            None => Value::error(EvalError::no_matching_overload(name)),
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalErrorKind;

    fn double_int(args: &[Value]) -> Value {
        match args.first() {
            Some(Value::Int(i)) => Value::Int(i * 2),
            _ => Value::error(EvalError::invalid_argument("expected int")),
        }
    }

    fn registry() -> FunctionRegistry {
        let decl = FunctionDecl::new("twice")
            .with_overload(
                OverloadDecl::function("twice_int", vec![CelType::Int], CelType::Int)
                    .with_impl(double_int),
            )
            .with_overload(
                OverloadDecl::function("twice_string", vec![CelType::String], CelType::String)
                    .with_impl(|args: &[Value]| match args.first() {
                        Some(Value::String(s)) => Value::string(format!("{}{}", s, s)),
                        _ => Value::Null,
                    }),
            )
            .with_overload(OverloadDecl::method(
                "int_twice",
                vec![CelType::Int],
                CelType::Int,
            ));
        let mut registry = FunctionRegistry::new();
        registry.register_function(&decl);
        registry
    }

    #[test]
    fn test_register_skips_declaration_only() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("twice_int"));
        assert!(!registry.contains("int_twice"));
        assert_eq!(registry.find_overloads("twice", 1, false).len(), 2);
        assert!(registry.find_overloads("twice", 1, true).is_empty());
    }

    #[test]
    fn test_dispatch_by_runtime_type() {
        let registry = registry();
        assert_eq!(
            registry.dispatch("twice", None, false, &[Value::Int(21)]),
            Value::Int(42)
        );
        assert_eq!(
            registry.dispatch("twice", None, false, &[Value::string("ab")]),
            Value::string("abab")
        );
    }

    #[test]
    fn test_dispatch_with_checked_ids() {
        let registry = registry();
        let ids = vec!["twice_string".to_string()];
        let result = registry.dispatch("twice", Some(&ids), false, &[Value::Int(1)]);
        assert_eq!(
            result.as_error().map(|e| e.kind),
            Some(EvalErrorKind::NoMatchingOverload)
        );

        let ids = vec!["int_twice".to_string()];
        let result = registry.dispatch("twice", Some(&ids), true, &[Value::Int(1)]);
        assert_eq!(result.as_error().map(|e| e.kind), Some(EvalErrorKind::Internal));
    }

    #[test]
    fn test_dispatch_unknown() {
        let registry = registry();
        let result = registry.dispatch("thrice", None, false, &[Value::Int(1)]);
        assert_eq!(
            result.as_error().map(|e| e.kind),
            Some(EvalErrorKind::UnknownFunction)
        );
        let result = registry.dispatch("twice", None, false, &[Value::Null]);
        assert_eq!(
            result.as_error().map(|e| e.kind),
            Some(EvalErrorKind::NoMatchingOverload)
        );
    }
}
