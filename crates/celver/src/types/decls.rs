//! Declarations for variables, functions, and overloads.
//!
//! These are shared by the checker (signatures) and the evaluator
//! (native implementations keyed by overload id).

use std::fmt;
use std::sync::Arc;

use super::CelType;
use crate::eval::Value;

/// A native function implementation.
///
/// Receives already-evaluated arguments, receiver first for
/// receiver-style overloads, and returns a value or an error value.
pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Declaration of a named, typed variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: String,
    pub cel_type: CelType,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, cel_type: CelType) -> Self {
        Self {
            name: name.into(),
            cel_type,
        }
    }
}

/// One signature of a function.
#[derive(Clone)]
pub struct OverloadDecl {
    /// Unique identifier within an environment (e.g. `"size_string"`).
    pub id: String,
    /// Parameter types, receiver first for receiver-style overloads.
    pub params: Vec<CelType>,
    pub result: CelType,
    /// Whether the overload is called as `receiver.name(args)`.
    pub is_member: bool,
    /// Native implementation; declaration-only overloads leave this empty.
    pub implementation: Option<FunctionImpl>,
}

impl fmt::Debug for OverloadDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverloadDecl")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("result", &self.result)
            .field("is_member", &self.is_member)
            .field("has_impl", &self.implementation.is_some())
            .finish()
    }
}

impl OverloadDecl {
    /// Create a free-function overload: `name(args)`.
    pub fn function(id: impl Into<String>, params: Vec<CelType>, result: CelType) -> Self {
        Self {
            id: id.into(),
            params,
            result,
            is_member: false,
            implementation: None,
        }
    }

    /// Create a receiver-style overload: `receiver.name(args)`.
    ///
    /// The first entry of `params` is the receiver type.
    pub fn method(id: impl Into<String>, params: Vec<CelType>, result: CelType) -> Self {
        Self {
            is_member: true,
            ..Self::function(id, params, result)
        }
    }

    /// Attach a native implementation.
    pub fn with_impl<F>(self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.with_shared_impl(Arc::new(f))
    }

    /// Attach an implementation that may be shared with other overloads.
    pub fn with_shared_impl(mut self, implementation: FunctionImpl) -> Self {
        self.implementation = Some(implementation);
        self
    }

    /// Total number of values passed to the implementation (receiver included).
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn receiver_type(&self) -> Option<&CelType> {
        if self.is_member {
            self.params.first()
        } else {
            None
        }
    }

    /// Argument types excluding the receiver.
    pub fn arg_types(&self) -> &[CelType] {
        match self.receiver_type() {
            Some(_) => &self.params[1..],
            None => &self.params,
        }
    }

    /// Two overloads collide when they share call style and parameter types.
    pub fn same_signature(&self, other: &OverloadDecl) -> bool {
        self.is_member == other.is_member && self.params == other.params
    }

    /// Human-readable signature, e.g. `dyn.semver_compare(dyn) -> int`.
    pub fn signature(&self, name: &str) -> String {
        let join = |types: &[CelType]| {
            types
                .iter()
                .map(CelType::display_name)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self.receiver_type() {
            Some(receiver) => format!(
                "{}.{}({}) -> {}",
                receiver,
                name,
                join(self.arg_types()),
                self.result
            ),
            None => format!("{}({}) -> {}", name, join(&self.params), self.result),
        }
    }
}

/// A named function with one or more overloads.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<OverloadDecl>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    pub fn with_overload(mut self, overload: OverloadDecl) -> Self {
        self.overloads.push(overload);
        self
    }

    pub fn with_overloads(mut self, overloads: impl IntoIterator<Item = OverloadDecl>) -> Self {
        self.overloads.extend(overloads);
        self
    }

    pub fn has_member_overloads(&self) -> bool {
        self.overloads.iter().any(|o| o.is_member)
    }

    pub fn has_standalone_overloads(&self) -> bool {
        self.overloads.iter().any(|o| !o.is_member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_decl_function() {
        let overload = OverloadDecl::function(
            "add_int64_int64",
            vec![CelType::Int, CelType::Int],
            CelType::Int,
        );
        assert!(!overload.is_member);
        assert!(overload.receiver_type().is_none());
        assert_eq!(overload.arg_types(), &[CelType::Int, CelType::Int]);
        assert_eq!(overload.signature("_+_"), "_+_(int, int) -> int");
    }

    #[test]
    fn test_overload_decl_method() {
        let overload = OverloadDecl::method(
            "string_contains_string",
            vec![CelType::String, CelType::String],
            CelType::Bool,
        );
        assert!(overload.is_member);
        assert_eq!(overload.receiver_type(), Some(&CelType::String));
        assert_eq!(overload.arg_types(), &[CelType::String]);
        assert_eq!(overload.arity(), 2);
        assert_eq!(
            overload.signature("contains"),
            "string.contains(string) -> bool"
        );
    }

    #[test]
    fn test_same_signature_respects_call_style() {
        let free = OverloadDecl::function("f_dyn_dyn", vec![CelType::Dyn, CelType::Dyn], CelType::Int);
        let member = OverloadDecl::method("dyn_f_dyn", vec![CelType::Dyn, CelType::Dyn], CelType::Int);
        let free_again =
            OverloadDecl::function("f_dyn_dyn_2", vec![CelType::Dyn, CelType::Dyn], CelType::Bool);
        assert!(!free.same_signature(&member));
        assert!(free.same_signature(&free_again));
    }

    #[test]
    fn test_shared_impl() {
        let shared: FunctionImpl = Arc::new(|args: &[Value]| Value::Int(args.len() as i64));
        let func = FunctionDecl::new("count")
            .with_overload(
                OverloadDecl::function("count_dyn", vec![CelType::Dyn], CelType::Int)
                    .with_shared_impl(shared.clone()),
            )
            .with_overload(
                OverloadDecl::method("dyn_count", vec![CelType::Dyn], CelType::Int)
                    .with_shared_impl(shared),
            );
        assert!(func.has_member_overloads());
        assert!(func.has_standalone_overloads());
        let results: Vec<Value> = func
            .overloads
            .iter()
            .filter_map(|o| o.implementation.as_ref())
            .map(|f| f(&[Value::Null]))
            .collect();
        assert_eq!(results, vec![Value::Int(1), Value::Int(1)]);
    }
}
