//! Standard library declarations.
//!
//! Operators are declared for checking only; the evaluator implements them
//! natively. Named functions (`size`, `contains`, conversions, ...) carry
//! their implementations and are dispatched by overload id.

use std::sync::LazyLock;

use crate::eval::{EvalError, Value};
use crate::types::{CelType, FunctionDecl, OverloadDecl};

/// Operator and built-in function declarations.
pub static STANDARD_LIBRARY: LazyLock<Vec<FunctionDecl>> = LazyLock::new(build_standard_library);

fn t() -> CelType {
    CelType::type_param("T")
}

fn k() -> CelType {
    CelType::type_param("K")
}

fn v() -> CelType {
    CelType::type_param("V")
}

fn numeric_relation(name: &str, prefix: &str) -> FunctionDecl {
    use CelType::{Bool, Bytes, Double, Int, String};
    let typed = |suffix: &str, lhs: CelType, rhs: CelType| {
        OverloadDecl::function(format!("{}_{}", prefix, suffix), vec![lhs, rhs], Bool)
    };
    FunctionDecl::new(name).with_overloads([
        typed("bool", Bool, Bool),
        typed("int64", Int, Int),
        typed("double", Double, Double),
        typed("string", String, String),
        typed("bytes", Bytes, Bytes),
        typed("int64_double", Int, Double),
        typed("double_int64", Double, Int),
    ])
}

fn build_standard_library() -> Vec<FunctionDecl> {
    use CelType::{Bool, Bytes, Double, Dyn, Int, String};

    let mut funcs = Vec::new();

    // ==================== Operators ====================

    funcs.push(FunctionDecl::new("_+_").with_overloads([
        OverloadDecl::function("add_int64", vec![Int, Int], Int),
        OverloadDecl::function("add_double", vec![Double, Double], Double),
        OverloadDecl::function("add_string", vec![String, String], String),
        OverloadDecl::function("add_bytes", vec![Bytes, Bytes], Bytes),
        OverloadDecl::function(
            "add_list",
            vec![CelType::list(t()), CelType::list(t())],
            CelType::list(t()),
        ),
    ]));

    for (name, prefix) in [("_-_", "subtract"), ("_*_", "multiply"), ("_/_", "divide")] {
        funcs.push(FunctionDecl::new(name).with_overloads([
            OverloadDecl::function(format!("{}_int64", prefix), vec![Int, Int], Int),
            OverloadDecl::function(format!("{}_double", prefix), vec![Double, Double], Double),
        ]));
    }

    funcs.push(
        FunctionDecl::new("_%_")
            .with_overload(OverloadDecl::function("modulo_int64", vec![Int, Int], Int)),
    );

    funcs.push(FunctionDecl::new("-_").with_overloads([
        OverloadDecl::function("negate_int64", vec![Int], Int),
        OverloadDecl::function("negate_double", vec![Double], Double),
    ]));

    funcs.push(
        FunctionDecl::new("!_")
            .with_overload(OverloadDecl::function("logical_not", vec![Bool], Bool)),
    );
    funcs.push(
        FunctionDecl::new("_&&_")
            .with_overload(OverloadDecl::function("logical_and", vec![Bool, Bool], Bool)),
    );
    funcs.push(
        FunctionDecl::new("_||_")
            .with_overload(OverloadDecl::function("logical_or", vec![Bool, Bool], Bool)),
    );

    funcs.push(
        FunctionDecl::new("_==_")
            .with_overload(OverloadDecl::function("equals", vec![t(), t()], Bool)),
    );
    funcs.push(
        FunctionDecl::new("_!=_")
            .with_overload(OverloadDecl::function("not_equals", vec![t(), t()], Bool)),
    );

    funcs.push(numeric_relation("_<_", "less"));
    funcs.push(numeric_relation("_<=_", "less_equals"));
    funcs.push(numeric_relation("_>_", "greater"));
    funcs.push(numeric_relation("_>=_", "greater_equals"));

    funcs.push(FunctionDecl::new("@in").with_overloads([
        OverloadDecl::function("in_list", vec![t(), CelType::list(t())], Bool),
        OverloadDecl::function("in_map", vec![k(), CelType::map(k(), v())], Bool),
    ]));

    funcs.push(FunctionDecl::new("_[_]").with_overloads([
        OverloadDecl::function("index_list", vec![CelType::list(t()), Int], t()),
        OverloadDecl::function("index_map", vec![CelType::map(k(), v()), k()], v()),
    ]));

    funcs.push(
        FunctionDecl::new("_?_:_")
            .with_overload(OverloadDecl::function("conditional", vec![Bool, t(), t()], t())),
    );

    // ==================== Functions ====================

    funcs.push(FunctionDecl::new("size").with_overloads([
        OverloadDecl::function("size_string", vec![String], Int).with_impl(builtins::size),
        OverloadDecl::function("size_bytes", vec![Bytes], Int).with_impl(builtins::size),
        OverloadDecl::function("size_list", vec![CelType::list(t())], Int)
            .with_impl(builtins::size),
        OverloadDecl::function("size_map", vec![CelType::map(k(), v())], Int)
            .with_impl(builtins::size),
        OverloadDecl::method("string_size", vec![String], Int).with_impl(builtins::size),
        OverloadDecl::method("bytes_size", vec![Bytes], Int).with_impl(builtins::size),
        OverloadDecl::method("list_size", vec![CelType::list(t())], Int)
            .with_impl(builtins::size),
        OverloadDecl::method("map_size", vec![CelType::map(k(), v())], Int)
            .with_impl(builtins::size),
    ]));

    funcs.push(FunctionDecl::new("contains").with_overload(
        OverloadDecl::method("contains_string", vec![String, String], Bool)
            .with_impl(|args: &[Value]| builtins::string_test(args, |s, sub| s.contains(sub))),
    ));
    funcs.push(FunctionDecl::new("startsWith").with_overload(
        OverloadDecl::method("starts_with_string", vec![String, String], Bool)
            .with_impl(|args: &[Value]| builtins::string_test(args, |s, sub| s.starts_with(sub))),
    ));
    funcs.push(FunctionDecl::new("endsWith").with_overload(
        OverloadDecl::method("ends_with_string", vec![String, String], Bool)
            .with_impl(|args: &[Value]| builtins::string_test(args, |s, sub| s.ends_with(sub))),
    ));

    // ==================== Conversions ====================

    funcs.push(FunctionDecl::new("int").with_overloads([
        OverloadDecl::function("int64_to_int64", vec![Int], Int).with_impl(builtins::to_int),
        OverloadDecl::function("double_to_int64", vec![Double], Int).with_impl(builtins::to_int),
        OverloadDecl::function("string_to_int64", vec![String], Int).with_impl(builtins::to_int),
    ]));

    funcs.push(FunctionDecl::new("double").with_overloads([
        OverloadDecl::function("double_to_double", vec![Double], Double)
            .with_impl(builtins::to_double),
        OverloadDecl::function("int64_to_double", vec![Int], Double)
            .with_impl(builtins::to_double),
        OverloadDecl::function("string_to_double", vec![String], Double)
            .with_impl(builtins::to_double),
    ]));

    funcs.push(FunctionDecl::new("string").with_overloads([
        OverloadDecl::function("string_to_string", vec![String], String)
            .with_impl(builtins::to_string),
        OverloadDecl::function("bool_to_string", vec![Bool], String)
            .with_impl(builtins::to_string),
        OverloadDecl::function("int64_to_string", vec![Int], String)
            .with_impl(builtins::to_string),
        OverloadDecl::function("double_to_string", vec![Double], String)
            .with_impl(builtins::to_string),
        OverloadDecl::function("bytes_to_string", vec![Bytes], String)
            .with_impl(builtins::to_string),
    ]));

    funcs.push(FunctionDecl::new("dyn").with_overload(
        OverloadDecl::function("to_dyn", vec![Dyn], Dyn)
            .with_impl(|args: &[Value]| args.first().cloned().unwrap_or(Value::Null)),
    ));

    funcs
}

mod builtins {
    use super::*;

    fn arity_error(args: &[Value]) -> Value {
        Value::error(EvalError::internal(format!(
            "unexpected argument count {}",
            args.len()
        )))
    }

    pub(super) fn size(args: &[Value]) -> Value {
        let len = match args {
            [Value::String(s)] => s.chars().count(),
            [Value::Bytes(b)] => b.len(),
            [Value::List(l)] => l.len(),
            [Value::Map(m)] => m.len(),
            [other] => {
                return Value::error(EvalError::type_mismatch(
                    "string, bytes, list or map",
                    other.type_name(),
                ))
            }
            _ => return arity_error(args),
        };
        i64::try_from(len)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::error(EvalError::overflow("size")))
    }

    pub(super) fn string_test(args: &[Value], test: impl Fn(&str, &str) -> bool) -> Value {
        match args {
            [Value::String(s), Value::String(sub)] => Value::Bool(test(s, sub)),
            [a, b] => Value::error(EvalError::type_mismatch(
                "string, string",
                &format!("{}, {}", a.type_name(), b.type_name()),
            )),
            _ => arity_error(args),
        }
    }

    pub(super) fn to_int(args: &[Value]) -> Value {
        match args {
            [Value::Int(i)] => Value::Int(*i),
            [Value::Double(d)] => {
                // i64::MAX as f64 rounds up to 2^63, which is out of range.
                if d.is_finite() && *d >= i64::MIN as f64 && *d < i64::MAX as f64 {
                    Value::Int(d.trunc() as i64)
                } else {
                    Value::error(EvalError::overflow("int conversion"))
                }
            }
            [Value::String(s)] => s.parse::<i64>().map(Value::Int).unwrap_or_else(|_| {
                Value::error(EvalError::invalid_argument(format!(
                    "cannot convert '{}' to int",
                    s
                )))
            }),
            [other] => Value::error(EvalError::type_mismatch("int, double or string", other.type_name())),
            _ => arity_error(args),
        }
    }

    pub(super) fn to_double(args: &[Value]) -> Value {
        match args {
            [Value::Double(d)] => Value::Double(*d),
            [Value::Int(i)] => Value::Double(*i as f64),
            [Value::String(s)] => s.parse::<f64>().map(Value::Double).unwrap_or_else(|_| {
                Value::error(EvalError::invalid_argument(format!(
                    "cannot convert '{}' to double",
                    s
                )))
            }),
            [other] => Value::error(EvalError::type_mismatch("int, double or string", other.type_name())),
            _ => arity_error(args),
        }
    }

    pub(super) fn to_string(args: &[Value]) -> Value {
        match args {
            [Value::String(s)] => Value::String(s.clone()),
            [Value::Bool(b)] => Value::string(b.to_string()),
            [Value::Int(i)] => Value::string(i.to_string()),
            [Value::Double(d)] => Value::string(d.to_string()),
            [Value::Bytes(b)] => match std::str::from_utf8(b) {
                Ok(s) => Value::string(s),
                Err(_) => Value::error(EvalError::invalid_argument("bytes are not valid UTF-8")),
            },
            [other] => Value::error(EvalError::type_mismatch(
                "string, bool, int, double or bytes",
                other.type_name(),
            )),
            _ => arity_error(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(name: &str) -> &'static FunctionDecl {
        STANDARD_LIBRARY
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("missing {}", name))
    }

    #[test]
    fn test_overload_ids_unique() {
        let mut ids: Vec<&str> = STANDARD_LIBRARY
            .iter()
            .flat_map(|f| f.overloads.iter().map(|o| o.id.as_str()))
            .collect();
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn test_operators_have_no_impl() {
        for name in ["_+_", "_==_", "_<=_", "@in", "_&&_", "_?_:_"] {
            assert!(find(name).overloads.iter().all(|o| o.implementation.is_none()));
        }
    }

    #[test]
    fn test_functions_have_impls() {
        for name in ["size", "contains", "startsWith", "endsWith", "int", "double", "string", "dyn"] {
            assert!(find(name).overloads.iter().all(|o| o.implementation.is_some()));
        }
    }

    #[test]
    fn test_builtin_behavior() {
        assert_eq!(builtins::size(&[Value::string("héllo")]), Value::Int(5));
        assert_eq!(
            builtins::string_test(&[Value::string("olm.gvk"), Value::string("olm")], |s, p| {
                s.starts_with(p)
            }),
            Value::Bool(true)
        );
        assert_eq!(builtins::to_int(&[Value::Double(4.9)]), Value::Int(4));
        assert!(builtins::to_int(&[Value::Double(f64::NAN)]).is_error());
        assert!(builtins::to_int(&[Value::string("4.8")]).is_error());
        assert_eq!(builtins::to_double(&[Value::string("4.8")]), Value::Double(4.8));
        assert_eq!(builtins::to_string(&[Value::Double(4.8)]), Value::string("4.8"));
    }
}
