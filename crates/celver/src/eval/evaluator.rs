//! Tree-walking evaluator.
//!
//! Operators are evaluated natively; named functions go through the
//! [`FunctionRegistry`]. Errors are ordinary values: every node returns the
//! first error it sees, except `&&`, `||` and comprehension conditions,
//! which may absorb one.

use std::cmp::Ordering;
use std::sync::Arc;

use super::{Activation, EvalError, FunctionRegistry, HierarchicalActivation, MapKey, Value, ValueMap};
use crate::checker::CheckResult;
use crate::parser::{BinaryOp, Expr, SpannedExpr, UnaryOp};

pub struct Evaluator<'a> {
    activation: &'a dyn Activation,
    functions: &'a FunctionRegistry,
    /// Overload ids recorded by the checker; `None` for unchecked trees.
    check_result: Option<&'a CheckResult>,
}

impl<'a> Evaluator<'a> {
    pub fn new(activation: &'a dyn Activation, functions: &'a FunctionRegistry) -> Self {
        Self {
            activation,
            functions,
            check_result: None,
        }
    }

    pub fn with_check_result(mut self, check_result: &'a CheckResult) -> Self {
        self.check_result = Some(check_result);
        self
    }

    pub fn eval(&self, expr: &SpannedExpr) -> Value {
        self.eval_expr(expr)
    }

    /// Evaluator over the same functions with a different variable scope.
    fn nested<'b>(&'b self, activation: &'b dyn Activation) -> Evaluator<'b> {
        Evaluator {
            activation,
            functions: self.functions,
            check_result: self.check_result,
        }
    }

    fn eval_expr(&self, expr: &SpannedExpr) -> Value {
        match &expr.node {
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Int(i) => Value::Int(*i),
            Expr::Float(f) => Value::Double(*f),
            Expr::String(s) => Value::string(s.as_str()),
            Expr::Bytes(b) => Value::bytes(b.as_slice()),

            Expr::Ident(name) => self.eval_ident(name),

            Expr::List(elements) => self.eval_list(elements),
            Expr::Map(entries) => self.eval_map(entries),

            Expr::Unary { op, expr } => self.eval_unary(*op, expr),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.eval_ternary(cond, then_expr, else_expr),

            Expr::Member { expr, field } => self.eval_member(expr, field),
            Expr::Index { expr, index } => self.eval_index(expr, index),
            Expr::Call {
                expr: callee,
                args,
            } => self.eval_call(expr.id, callee, args),

            Expr::Comprehension {
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            } => self.eval_comprehension(
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            ),

            Expr::HasField { expr, field } => self.eval_has_field(expr, field),
        }
    }

    fn eval_ident(&self, name: &str) -> Value {
        self.activation
            .resolve(name)
            .unwrap_or_else(|| Value::error(EvalError::unbound_variable(name)))
    }

    fn eval_list(&self, elements: &[SpannedExpr]) -> Value {
        let mut values = Vec::with_capacity(elements.len());
        for elem in elements {
            let value = self.eval_expr(elem);
            if value.is_error() {
                return value;
            }
            values.push(value);
        }
        Value::list(values)
    }

    fn eval_map(&self, entries: &[(SpannedExpr, SpannedExpr)]) -> Value {
        let mut map = ValueMap::new();
        for (key_expr, value_expr) in entries {
            let key = self.eval_expr(key_expr);
            if key.is_error() {
                return key;
            }
            let value = self.eval_expr(value_expr);
            if value.is_error() {
                return value;
            }
            match MapKey::from_value(&key) {
                Some(map_key) => map.insert(map_key, value),
                None => {
                    return Value::error(EvalError::type_mismatch(
                        "bool, int or string map key",
                        key.type_name(),
                    ))
                }
            }
        }
        Value::Map(Arc::new(map))
    }

    fn eval_unary(&self, op: UnaryOp, expr: &SpannedExpr) -> Value {
        let value = self.eval_expr(expr);
        if value.is_error() {
            return value;
        }

        match (op, &value) {
            (UnaryOp::Neg, Value::Int(i)) => i
                .checked_neg()
                .map(Value::Int)
                .unwrap_or_else(|| Value::error(EvalError::overflow("negation"))),
            (UnaryOp::Neg, Value::Double(d)) => Value::Double(-d),
            (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
            _ => Value::error(EvalError::no_matching_overload(op.function_name())),
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &SpannedExpr, right: &SpannedExpr) -> Value {
        match op {
            BinaryOp::And => return self.eval_logical(left, right, false),
            BinaryOp::Or => return self.eval_logical(left, right, true),
            _ => {}
        }

        let left_val = self.eval_expr(left);
        if left_val.is_error() {
            return left_val;
        }
        let right_val = self.eval_expr(right);
        if right_val.is_error() {
            return right_val;
        }

        match op {
            BinaryOp::Add => eval_add(&left_val, &right_val),
            BinaryOp::Sub => eval_arithmetic(op, &left_val, &right_val, i64::checked_sub, |a, b| a - b),
            BinaryOp::Mul => eval_arithmetic(op, &left_val, &right_val, i64::checked_mul, |a, b| a * b),
            BinaryOp::Div => eval_div(&left_val, &right_val),
            BinaryOp::Mod => eval_mod(&left_val, &right_val),
            BinaryOp::Eq => match eval_equality(op, &left_val, &right_val) {
                Ok(equal) => Value::Bool(equal),
                Err(err) => err,
            },
            BinaryOp::Ne => match eval_equality(op, &left_val, &right_val) {
                Ok(equal) => Value::Bool(!equal),
                Err(err) => err,
            },
            BinaryOp::Lt => eval_relation(op, &left_val, &right_val, Ordering::is_lt),
            BinaryOp::Le => eval_relation(op, &left_val, &right_val, Ordering::is_le),
            BinaryOp::Gt => eval_relation(op, &left_val, &right_val, Ordering::is_gt),
            BinaryOp::Ge => eval_relation(op, &left_val, &right_val, Ordering::is_ge),
            BinaryOp::In => eval_in(&left_val, &right_val),
            BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit above"),
        }
    }

    /// `&&` when `absorbing` is false, `||` when it is true.
    ///
    /// The absorbing value on either side wins over an error on the other;
    /// otherwise the left error is reported first.
    fn eval_logical(&self, left: &SpannedExpr, right: &SpannedExpr, absorbing: bool) -> Value {
        let op = if absorbing { BinaryOp::Or } else { BinaryOp::And };

        let left_val = self.eval_expr(left);
        match &left_val {
            Value::Bool(b) if *b == absorbing => return left_val,
            Value::Bool(_) | Value::Error(_) => {}
            _ => return Value::error(EvalError::no_matching_overload(op.function_name())),
        }

        let right_val = self.eval_expr(right);
        match &right_val {
            Value::Bool(b) if *b == absorbing => right_val,
            _ if left_val.is_error() => left_val,
            Value::Bool(_) | Value::Error(_) => right_val,
            _ => Value::error(EvalError::no_matching_overload(op.function_name())),
        }
    }

    fn eval_ternary(&self, cond: &SpannedExpr, then_expr: &SpannedExpr, else_expr: &SpannedExpr) -> Value {
        let cond_val = self.eval_expr(cond);
        match cond_val {
            Value::Bool(true) => self.eval_expr(then_expr),
            Value::Bool(false) => self.eval_expr(else_expr),
            Value::Error(_) => cond_val,
            _ => Value::error(EvalError::type_mismatch("bool", cond_val.type_name())),
        }
    }

    fn eval_member(&self, expr: &SpannedExpr, field: &str) -> Value {
        let value = self.eval_expr(expr);
        if value.is_error() {
            return value;
        }

        match &value {
            Value::Map(map) => map
                .get_str(field)
                .cloned()
                .unwrap_or_else(|| Value::error(EvalError::no_such_field(field))),
            _ => Value::error(EvalError::no_such_field(field)),
        }
    }

    fn eval_index(&self, expr: &SpannedExpr, index: &SpannedExpr) -> Value {
        let value = self.eval_expr(expr);
        if value.is_error() {
            return value;
        }
        let index_val = self.eval_expr(index);
        if index_val.is_error() {
            return index_val;
        }

        match (&value, &index_val) {
            (Value::List(list), Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|idx| list.get(idx))
                .cloned()
                .unwrap_or_else(|| Value::error(EvalError::index_out_of_bounds(*i, list.len()))),
            (Value::List(_), other) => Value::error(EvalError::type_mismatch("int", other.type_name())),
            (Value::Map(map), key) => match MapKey::from_value(key) {
                Some(map_key) => map
                    .get(&map_key)
                    .cloned()
                    .unwrap_or_else(|| Value::error(EvalError::key_not_found(&key.to_string()))),
                None => Value::error(EvalError::type_mismatch(
                    "bool, int or string map key",
                    key.type_name(),
                )),
            },
            _ => Value::error(EvalError::no_matching_overload("_[_]")),
        }
    }

    fn eval_call(&self, call_id: i64, callee: &SpannedExpr, args: &[SpannedExpr]) -> Value {
        let (name, receiver) = match &callee.node {
            Expr::Ident(name) => (name.as_str(), None),
            Expr::Member { expr, field } => (field.as_str(), Some(expr.as_ref())),
            _ => {
                return Value::error(EvalError::internal("call target is not a function name"));
            }
        };

        let mut values = Vec::with_capacity(args.len() + usize::from(receiver.is_some()));
        for expr in receiver.into_iter().chain(args) {
            let value = self.eval_expr(expr);
            if value.is_error() {
                return value;
            }
            values.push(value);
        }

        let overload_ids = self
            .check_result
            .and_then(|result| result.get_reference(call_id))
            .map(|reference| reference.overload_ids.as_slice());

        self.functions
            .dispatch(name, overload_ids, receiver.is_some(), &values)
    }

    #[allow(clippy::too_many_arguments)]
    fn eval_comprehension(
        &self,
        iter_var: &str,
        iter_range: &SpannedExpr,
        accu_var: &str,
        accu_init: &SpannedExpr,
        loop_condition: &SpannedExpr,
        loop_step: &SpannedExpr,
        result: &SpannedExpr,
    ) -> Value {
        let range = self.eval_expr(iter_range);
        let items: Vec<Value> = match &range {
            Value::List(list) => list.to_vec(),
            Value::Map(map) => map.keys().map(MapKey::to_value).collect(),
            Value::Error(_) => return range,
            other => {
                return Value::error(EvalError::type_mismatch("list or map", other.type_name()));
            }
        };

        let mut accu = self.eval_expr(accu_init);
        if accu.is_error() {
            return accu;
        }

        for item in items {
            let scope = HierarchicalActivation::new(self.activation)
                .with_binding(accu_var, accu.clone())
                .with_binding(iter_var, item);
            let inner = self.nested(&scope);

            // Only a definite `false` stops the loop; an error condition
            // lets the step decide, so `exists` can still find a match.
            if let Value::Bool(false) = inner.eval_expr(loop_condition) {
                break;
            }
            accu = inner.eval_expr(loop_step);
        }

        let scope = HierarchicalActivation::new(self.activation).with_binding(accu_var, accu);
        self.nested(&scope).eval_expr(result)
    }

    fn eval_has_field(&self, expr: &SpannedExpr, field: &str) -> Value {
        let value = self.eval_expr(expr);
        match &value {
            Value::Map(map) => Value::Bool(map.get_str(field).is_some()),
            Value::Error(_) => value,
            other => Value::error(EvalError::type_mismatch("map", other.type_name())),
        }
    }
}

fn eval_add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::String(a), Value::String(b)) => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Value::string(joined)
        }
        (Value::Bytes(a), Value::Bytes(b)) => Value::bytes([&a[..], &b[..]].concat()),
        (Value::List(a), Value::List(b)) => {
            Value::list(a.iter().chain(b.iter()).cloned().collect::<Vec<_>>())
        }
        _ => eval_arithmetic(BinaryOp::Add, left, right, i64::checked_add, |a, b| a + b),
    }
}

fn eval_arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    double_op: fn(f64, f64) -> f64,
) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::error(EvalError::overflow(op.function_name()))),
        (Value::Double(a), Value::Double(b)) => Value::Double(double_op(*a, *b)),
        _ => Value::error(EvalError::no_matching_overload(op.function_name())),
    }
}

fn eval_div(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Value::error(EvalError::division_by_zero()),
        _ => eval_arithmetic(BinaryOp::Div, left, right, i64::checked_div, |a, b| a / b),
    }
}

fn eval_mod(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Value::error(EvalError::modulo_by_zero()),
        (Value::Int(a), Value::Int(b)) => a
            .checked_rem(*b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::error(EvalError::overflow("_%_"))),
        _ => Value::error(EvalError::no_matching_overload("_%_")),
    }
}

/// `Ok(equal)` for comparable operands, `Err(error value)` otherwise.
///
/// Equality is defined within a type, between ints and doubles, and against
/// null; any other pairing has no overload.
fn eval_equality(op: BinaryOp, left: &Value, right: &Value) -> Result<bool, Value> {
    let comparable = left.is_null()
        || right.is_null()
        || std::mem::discriminant(left) == std::mem::discriminant(right)
        || matches!(
            (left, right),
            (Value::Int(_), Value::Double(_)) | (Value::Double(_), Value::Int(_))
        );
    if comparable {
        Ok(left == right)
    } else {
        Err(Value::error(EvalError::no_matching_overload(op.function_name())))
    }
}

fn eval_relation(op: BinaryOp, left: &Value, right: &Value, test: fn(Ordering) -> bool) -> Value {
    match left.compare(right) {
        Some(ordering) => Value::Bool(test(ordering)),
        // NaN compares false with everything.
        None if matches!(left, Value::Int(_) | Value::Double(_))
            && matches!(right, Value::Int(_) | Value::Double(_)) =>
        {
            Value::Bool(false)
        }
        None => Value::error(EvalError::no_matching_overload(op.function_name())),
    }
}

fn eval_in(needle: &Value, haystack: &Value) -> Value {
    match haystack {
        Value::List(list) => Value::Bool(list.iter().any(|elem| elem == needle)),
        Value::Map(map) => match MapKey::from_value(needle) {
            Some(key) => Value::Bool(map.contains_key(&key)),
            None => Value::Bool(false),
        },
        _ => Value::error(EvalError::no_matching_overload("@in")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{check, STANDARD_LIBRARY};
    use crate::eval::{EmptyActivation, EvalErrorKind, MapActivation};
    use crate::parser::parse;
    use crate::types::{CelType, FunctionDecl, OverloadDecl, VariableDecl};
    use std::collections::HashMap;

    fn standard_registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        for decl in STANDARD_LIBRARY.iter() {
            registry.register_function(decl);
        }
        registry
    }

    fn eval_expr(source: &str) -> Value {
        eval_expr_with_vars(source, MapActivation::new())
    }

    fn eval_expr_with_vars(source: &str, activation: MapActivation) -> Value {
        let ast = parse(source).into_result().expect("parse errors");
        let registry = standard_registry();
        Evaluator::new(&activation, &registry).eval(&ast)
    }

    fn error_kind(value: Value) -> EvalErrorKind {
        match value {
            Value::Error(err) => err.kind,
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval_expr("null"), Value::Null);
        assert_eq!(eval_expr("true"), Value::Bool(true));
        assert_eq!(eval_expr("42"), Value::Int(42));
        assert_eq!(eval_expr("2.5"), Value::Double(2.5));
        assert_eq!(eval_expr("'hello'"), "hello".into());
        assert_eq!(eval_expr("[1, 2]"), Value::list(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(
            eval_expr("{'a': 1}"),
            Value::map([("a", Value::Int(1))])
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_expr("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval_expr("10 / 3"), Value::Int(3));
        assert_eq!(eval_expr("10 % 3"), Value::Int(1));
        assert_eq!(eval_expr("1.5 + 1.0"), Value::Double(2.5));
        assert_eq!(eval_expr("'ab' + 'cd'"), "abcd".into());
        assert_eq!(
            eval_expr("[1] + [2]"),
            Value::list(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(error_kind(eval_expr("1 + 'a'")), EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_division_and_overflow() {
        assert_eq!(error_kind(eval_expr("1 / 0")), EvalErrorKind::DivisionByZero);
        assert_eq!(error_kind(eval_expr("1 % 0")), EvalErrorKind::ModuloByZero);
        assert_eq!(
            error_kind(eval_expr("9223372036854775807 + 1")),
            EvalErrorKind::Overflow
        );
        assert_eq!(
            error_kind(eval_expr("-9223372036854775807 - 2")),
            EvalErrorKind::Overflow
        );
    }

    #[test]
    fn test_comparison() {
        assert_eq!(eval_expr("1 < 2"), Value::Bool(true));
        assert_eq!(eval_expr("1 == 1.0"), Value::Bool(true));
        assert_eq!(eval_expr("2 >= 2.5"), Value::Bool(false));
        assert_eq!(eval_expr("'a' < 'b'"), Value::Bool(true));
        assert_eq!(eval_expr("null == null"), Value::Bool(true));
        assert_eq!(eval_expr("[1, 2] != [1, 2]"), Value::Bool(false));
        assert_eq!(error_kind(eval_expr("1 == 'a'")), EvalErrorKind::NoMatchingOverload);
        assert_eq!(error_kind(eval_expr("true < 'a'")), EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_logical_absorbs_errors() {
        assert_eq!(eval_expr("false && 1 / 0 == 1"), Value::Bool(false));
        assert_eq!(eval_expr("1 / 0 == 1 && false"), Value::Bool(false));
        assert_eq!(eval_expr("true || 1 / 0 == 1"), Value::Bool(true));
        assert_eq!(eval_expr("1 / 0 == 1 || true"), Value::Bool(true));
        assert_eq!(
            error_kind(eval_expr("1 / 0 == 1 && true")),
            EvalErrorKind::DivisionByZero
        );
        assert_eq!(
            error_kind(eval_expr("1 / 0 == 1 || 1 % 0 == 1")),
            EvalErrorKind::DivisionByZero
        );
        assert_eq!(error_kind(eval_expr("1 && true")), EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_ternary() {
        assert_eq!(eval_expr("true ? 1 : 2"), Value::Int(1));
        assert_eq!(eval_expr("false ? 1 / 0 : 2"), Value::Int(2));
        assert_eq!(error_kind(eval_expr("1 ? 1 : 2")), EvalErrorKind::TypeMismatch);
    }

    #[test]
    fn test_member_and_index() {
        let vars = MapActivation::new().with(
            "m",
            Value::map([("name", Value::from("olm")), ("n", Value::Int(2))]),
        );
        assert_eq!(eval_expr_with_vars("m.name", vars.clone()), "olm".into());
        assert_eq!(eval_expr_with_vars("m['n']", vars.clone()), Value::Int(2));
        assert_eq!(
            error_kind(eval_expr_with_vars("m.missing", vars.clone())),
            EvalErrorKind::NoSuchField
        );
        assert_eq!(
            error_kind(eval_expr_with_vars("m['missing']", vars)),
            EvalErrorKind::KeyNotFound
        );
        assert_eq!(eval_expr("[1, 2, 3][1]"), Value::Int(2));
        assert_eq!(error_kind(eval_expr("[1][1]")), EvalErrorKind::IndexOutOfBounds);
        assert_eq!(error_kind(eval_expr("[1][-1]")), EvalErrorKind::IndexOutOfBounds);
        assert_eq!(error_kind(eval_expr("(1).name")), EvalErrorKind::NoSuchField);
    }

    #[test]
    fn test_map_key_kinds() {
        assert_eq!(eval_expr("{1: 'a', true: 'b'}[1.0]"), "a".into());
        assert_eq!(eval_expr("{1: 'a', true: 'b'}[true]"), "b".into());
        assert_eq!(error_kind(eval_expr("{null: 1}")), EvalErrorKind::TypeMismatch);
        assert_eq!(error_kind(eval_expr("{[1]: 1}")), EvalErrorKind::TypeMismatch);
        assert_eq!(error_kind(eval_expr("{'a': 1}[[1]]")), EvalErrorKind::TypeMismatch);
    }

    #[test]
    fn test_in() {
        assert_eq!(eval_expr("2 in [1, 2]"), Value::Bool(true));
        assert_eq!(eval_expr("'a' in {'a': 1}"), Value::Bool(true));
        assert_eq!(eval_expr("'b' in {'a': 1}"), Value::Bool(false));
    }

    #[test]
    fn test_unbound_variable() {
        assert_eq!(error_kind(eval_expr("x + 1")), EvalErrorKind::UnboundVariable);
        let vars = MapActivation::new().with("x", 41);
        assert_eq!(eval_expr_with_vars("x + 1", vars), Value::Int(42));
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(eval_expr("size('abc')"), Value::Int(3));
        assert_eq!(eval_expr("[1, 2].size()"), Value::Int(2));
        assert_eq!(eval_expr("'hello'.startsWith('he')"), Value::Bool(true));
        assert_eq!(error_kind(eval_expr("nope(1)")), EvalErrorKind::UnknownFunction);
        assert_eq!(error_kind(eval_expr("size(1)")), EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_call_arguments_short_circuit() {
        let registry = {
            let mut registry = standard_registry();
            registry.register_function(&FunctionDecl::new("boom").with_overload(
                OverloadDecl::function("boom_int", vec![CelType::Int], CelType::Int)
                    .with_impl(|_: &[Value]| panic!("implementation must not run")),
            ));
            registry
        };
        let ast = parse("boom(1 / 0)").into_result().unwrap();
        let value = Evaluator::new(&EmptyActivation, &registry).eval(&ast);
        assert_eq!(error_kind(value), EvalErrorKind::DivisionByZero);
    }

    #[test]
    fn test_dispatch_uses_checked_overloads() {
        let decl = FunctionDecl::new("pick")
            .with_overload(
                OverloadDecl::function("pick_int", vec![CelType::Int], CelType::String)
                    .with_impl(|_: &[Value]| Value::from("int")),
            )
            .with_overload(
                OverloadDecl::function("pick_string", vec![CelType::String], CelType::String)
                    .with_impl(|_: &[Value]| Value::from("string")),
            );
        let mut registry = FunctionRegistry::new();
        registry.register_function(&decl);

        let functions = HashMap::from([("pick".to_string(), decl)]);
        let variables = HashMap::new();
        let ast = parse("pick('x')").into_result().unwrap();
        let checked = check(&ast, &variables, &functions);
        assert!(checked.is_ok(), "{:?}", checked.errors);

        let value = Evaluator::new(&EmptyActivation, &registry)
            .with_check_result(&checked)
            .eval(&ast);
        assert_eq!(value, "string".into());
    }

    #[test]
    fn test_macros() {
        assert_eq!(eval_expr("[1, 2, 3].all(x, x > 0)"), Value::Bool(true));
        assert_eq!(eval_expr("[1, 2, 3].exists(x, x == 2)"), Value::Bool(true));
        assert_eq!(eval_expr("[1, 2, 3].exists_one(x, x > 1)"), Value::Bool(false));
        assert_eq!(
            eval_expr("[1, 2, 3].map(x, x * 2)"),
            Value::list(vec![Value::Int(2), Value::Int(4), Value::Int(6)])
        );
        assert_eq!(
            eval_expr("[1, 2, 3].filter(x, x != 2)"),
            Value::list(vec![Value::Int(1), Value::Int(3)])
        );
        assert_eq!(eval_expr("{'a': 1, 'b': 2}.all(k, k != 'c')"), Value::Bool(true));
        assert_eq!(eval_expr("[].all(x, x > 0)"), Value::Bool(true));
        assert_eq!(eval_expr("[].exists(x, x > 0)"), Value::Bool(false));
    }

    #[test]
    fn test_exists_absorbs_element_errors() {
        assert_eq!(eval_expr("[0, 1].exists(x, 1 / x == 1)"), Value::Bool(true));
        assert_eq!(eval_expr("[0, 2].all(x, 1 / x == 1)"), Value::Bool(false));
        assert_eq!(
            error_kind(eval_expr("[0].exists(x, 1 / x == 1)")),
            EvalErrorKind::DivisionByZero
        );
    }

    #[test]
    fn test_has_field() {
        let vars = MapActivation::new().with("m", Value::map([("a", Value::Int(1))]));
        assert_eq!(eval_expr_with_vars("has(m.a)", vars.clone()), Value::Bool(true));
        assert_eq!(eval_expr_with_vars("has(m.b)", vars), Value::Bool(false));
        let vars = MapActivation::new().with("s", "text");
        assert_eq!(
            error_kind(eval_expr_with_vars("has(s.a)", vars)),
            EvalErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_comprehension_scoping() {
        let vars = MapActivation::new().with("x", 100);
        assert_eq!(
            eval_expr_with_vars("[1, 2].map(x, x + 1)[0] + x", vars),
            Value::Int(102)
        );
    }

    #[test]
    fn test_checked_variable_types() {
        let variables = HashMap::from([(
            "v".to_string(),
            VariableDecl::new("v", CelType::Int),
        )]);
        let functions: HashMap<String, FunctionDecl> = STANDARD_LIBRARY
            .iter()
            .map(|d| (d.name.clone(), d.clone()))
            .collect();
        let ast = parse("v * 2").into_result().unwrap();
        let checked = check(&ast, &variables, &functions);
        assert!(checked.is_ok());

        let registry = standard_registry();
        let vars = MapActivation::new().with("v", 21);
        let value = Evaluator::new(&vars, &registry)
            .with_check_result(&checked)
            .eval(&ast);
        assert_eq!(value, Value::Int(42));
    }
}
