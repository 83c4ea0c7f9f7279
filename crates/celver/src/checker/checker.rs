//! Core type checker implementation.
//!
//! The checker walks a parsed expression once, recording a type for every
//! node and, for calls, the overload ids the call may dispatch to. It takes
//! plain maps of declarations rather than an environment so it can be used
//! on its own.

use std::collections::{BTreeSet, HashMap};

use super::errors::CheckError;
use super::overload::{resolve_overload, Resolution};
use super::scope::{Binding, ScopeStack};
use crate::parser::{BinaryOp, Expr, SpannedExpr, UnaryOp};
use crate::types::{CelType, FunctionDecl, VariableDecl};

/// What an identifier or call node resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceInfo {
    pub name: String,
    /// Candidate overloads for calls; empty for identifiers.
    pub overload_ids: Vec<String>,
}

impl ReferenceInfo {
    pub fn ident(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overload_ids: Vec::new(),
        }
    }

    pub fn function(name: impl Into<String>, overload_ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            overload_ids,
        }
    }

    pub fn is_function(&self) -> bool {
        !self.overload_ids.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    /// Expression id to inferred type.
    pub type_map: HashMap<i64, CelType>,
    /// Expression id to resolved reference. Identifiers appear here only
    /// when they name a declared variable.
    pub reference_map: HashMap<i64, ReferenceInfo>,
    pub errors: Vec<CheckError>,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get_type(&self, expr_id: i64) -> Option<&CelType> {
        self.type_map.get(&expr_id)
    }

    pub fn get_reference(&self, expr_id: i64) -> Option<&ReferenceInfo> {
        self.reference_map.get(&expr_id)
    }

    /// Declared variables the expression reads.
    pub fn free_variables(&self) -> BTreeSet<&str> {
        self.reference_map
            .values()
            .filter(|r| !r.is_function())
            .map(|r| r.name.as_str())
            .collect()
    }
}

pub struct Checker<'a> {
    scopes: ScopeStack<'a>,
    functions: &'a HashMap<String, FunctionDecl>,
    type_map: HashMap<i64, CelType>,
    reference_map: HashMap<i64, ReferenceInfo>,
    errors: Vec<CheckError>,
}

impl<'a> Checker<'a> {
    pub fn new(
        variables: &'a HashMap<String, VariableDecl>,
        functions: &'a HashMap<String, FunctionDecl>,
    ) -> Self {
        Self {
            scopes: ScopeStack::new(variables),
            functions,
            type_map: HashMap::new(),
            reference_map: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn check(mut self, expr: &SpannedExpr) -> CheckResult {
        self.check_expr(expr);

        CheckResult {
            type_map: self.type_map,
            reference_map: self.reference_map,
            errors: self.errors,
        }
    }

    fn report_error(&mut self, error: CheckError) {
        self.errors.push(error);
    }

    fn check_expr(&mut self, expr: &SpannedExpr) -> CelType {
        let result = match &expr.node {
            Expr::Null => CelType::Null,
            Expr::Bool(_) => CelType::Bool,
            Expr::Int(_) => CelType::Int,
            Expr::Float(_) => CelType::Double,
            Expr::String(_) => CelType::String,
            Expr::Bytes(_) => CelType::Bytes,

            Expr::Ident(name) => self.check_ident(name, expr),

            Expr::List(elements) => {
                let types: Vec<_> = elements.iter().map(|e| self.check_expr(e)).collect();
                CelType::list(join_types(&types))
            }
            Expr::Map(entries) => {
                let mut key_types = Vec::with_capacity(entries.len());
                let mut value_types = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    key_types.push(self.check_expr(key));
                    value_types.push(self.check_expr(value));
                }
                CelType::map(join_types(&key_types), join_types(&value_types))
            }

            Expr::Unary { op, expr: inner } => self.check_unary(*op, inner, expr),
            Expr::Binary { op, left, right } => self.check_binary(*op, left, right, expr),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.check_ternary(cond, then_expr, else_expr, expr),

            Expr::Member { expr: obj, field } => self.check_member(obj, field, expr),
            Expr::Index { expr: obj, index } => {
                let obj_type = self.check_expr(obj);
                let index_type = self.check_expr(index);
                self.resolve_function_call("_[_]", None, &[obj_type, index_type], expr)
            }
            Expr::Call { expr: callee, args } => self.check_call(callee, args, expr),

            Expr::Comprehension {
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            } => self.check_comprehension(
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            ),

            Expr::HasField { expr: obj, .. } => {
                self.check_expr(obj);
                CelType::Bool
            }
        };

        self.type_map.insert(expr.id, result.clone());
        result
    }

    fn check_ident(&mut self, name: &str, expr: &SpannedExpr) -> CelType {
        match self.scopes.resolve(name) {
            Some(Binding::Declared(decl)) => {
                let cel_type = decl.cel_type.clone();
                self.reference_map.insert(expr.id, ReferenceInfo::ident(name));
                cel_type
            }
            Some(Binding::Local(decl)) => decl.cel_type.clone(),
            None => {
                self.report_error(CheckError::undeclared_reference(
                    name,
                    expr.span.clone(),
                    expr.id,
                ));
                CelType::Error
            }
        }
    }

    fn check_unary(&mut self, op: UnaryOp, inner: &SpannedExpr, expr: &SpannedExpr) -> CelType {
        let inner_type = self.check_expr(inner);
        self.resolve_function_call(op.function_name(), None, &[inner_type], expr)
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: &SpannedExpr,
        right: &SpannedExpr,
        expr: &SpannedExpr,
    ) -> CelType {
        let left_type = self.check_expr(left);
        let right_type = self.check_expr(right);
        self.resolve_function_call(op.function_name(), None, &[left_type, right_type], expr)
    }

    fn check_ternary(
        &mut self,
        cond: &SpannedExpr,
        then_expr: &SpannedExpr,
        else_expr: &SpannedExpr,
        expr: &SpannedExpr,
    ) -> CelType {
        let cond_type = self.check_expr(cond);
        let then_type = self.check_expr(then_expr);
        let else_type = self.check_expr(else_expr);

        if !matches!(cond_type, CelType::Bool | CelType::Dyn | CelType::Error) {
            self.report_error(CheckError::type_mismatch(
                CelType::Bool,
                cond_type,
                cond.span.clone(),
                cond.id,
            ));
        }

        self.resolve_function_call("_?_:_", None, &[CelType::Bool, then_type, else_type], expr)
    }

    /// Field selection is only meaningful on maps and dynamic values.
    fn check_member(&mut self, obj: &SpannedExpr, field: &str, expr: &SpannedExpr) -> CelType {
        let obj_type = self.check_expr(obj);
        match &obj_type {
            CelType::Dyn | CelType::Error | CelType::TypeParam(_) => CelType::Dyn,
            CelType::Map(_, value) => (**value).clone(),
            other => {
                self.report_error(CheckError::undefined_field(
                    &other.display_name(),
                    field,
                    expr.span.clone(),
                    expr.id,
                ));
                CelType::Error
            }
        }
    }

    fn check_call(&mut self, callee: &SpannedExpr, args: &[SpannedExpr], expr: &SpannedExpr) -> CelType {
        match &callee.node {
            Expr::Member {
                expr: receiver,
                field: func_name,
            } => {
                let receiver_type = self.check_expr(receiver);
                let arg_types: Vec<_> = args.iter().map(|a| self.check_expr(a)).collect();
                self.resolve_function_call(func_name, Some(receiver_type), &arg_types, expr)
            }
            Expr::Ident(func_name) => {
                let arg_types: Vec<_> = args.iter().map(|a| self.check_expr(a)).collect();
                self.resolve_function_call(func_name, None, &arg_types, expr)
            }
            _ => {
                self.check_expr(callee);
                for arg in args {
                    self.check_expr(arg);
                }
                self.report_error(CheckError::new(
                    super::CheckErrorKind::Other("call target is not a function name".to_string()),
                    callee.span.clone(),
                    callee.id,
                ));
                CelType::Error
            }
        }
    }

    fn resolve_function_call(
        &mut self,
        name: &str,
        receiver: Option<CelType>,
        args: &[CelType],
        expr: &SpannedExpr,
    ) -> CelType {
        let Some(func) = self.functions.get(name) else {
            self.report_error(CheckError::undeclared_reference(
                name,
                expr.span.clone(),
                expr.id,
            ));
            return CelType::Error;
        };

        match resolve_overload(func, receiver.as_ref(), args) {
            Resolution::Resolved(result) => {
                self.reference_map
                    .insert(expr.id, ReferenceInfo::function(name, result.overload_ids));
                result.result_type
            }
            Resolution::WrongArity(expected) => {
                self.report_error(CheckError::wrong_argument_count(
                    name,
                    expected,
                    args.len(),
                    expr.span.clone(),
                    expr.id,
                ));
                CelType::Error
            }
            Resolution::NoMatch => {
                let all_args: Vec<_> = receiver.into_iter().chain(args.iter().cloned()).collect();
                self.report_error(CheckError::no_matching_overload(
                    name,
                    all_args,
                    expr.span.clone(),
                    expr.id,
                ));
                CelType::Error
            }
            Resolution::Ambiguous(overload_ids) => {
                self.report_error(CheckError::ambiguous_overload(
                    name,
                    overload_ids,
                    expr.span.clone(),
                    expr.id,
                ));
                CelType::Error
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_comprehension(
        &mut self,
        iter_var: &str,
        iter_range: &SpannedExpr,
        accu_var: &str,
        accu_init: &SpannedExpr,
        loop_condition: &SpannedExpr,
        loop_step: &SpannedExpr,
        result: &SpannedExpr,
    ) -> CelType {
        let range_type = self.check_expr(iter_range);
        let iter_type = match &range_type {
            CelType::List(elem) => (**elem).clone(),
            CelType::Map(key, _) => (**key).clone(),
            CelType::Dyn | CelType::Error | CelType::TypeParam(_) => CelType::Dyn,
            other => {
                self.report_error(CheckError::type_mismatch(
                    CelType::list(CelType::Dyn),
                    other.clone(),
                    iter_range.span.clone(),
                    iter_range.id,
                ));
                CelType::Error
            }
        };

        let accu_type = self.check_expr(accu_init);

        self.scopes.enter_scope();
        self.scopes.add_variable(iter_var, iter_type);
        self.scopes.add_variable(accu_var, accu_type.clone());

        let cond_type = self.check_expr(loop_condition);
        if !matches!(cond_type, CelType::Bool | CelType::Dyn | CelType::Error) {
            self.report_error(CheckError::type_mismatch(
                CelType::Bool,
                cond_type,
                loop_condition.span.clone(),
                loop_condition.id,
            ));
        }

        // An empty-literal accumulator (from map/filter) takes the more
        // specific type the step produces.
        let step_type = self.check_expr(loop_step);
        if accu_type.is_dynamic() && !step_type.is_dynamic() {
            self.scopes.add_variable(accu_var, step_type);
        }

        let result_type = self.check_expr(result);
        self.scopes.exit_scope();
        result_type
    }
}

/// Common type of aggregate elements: the shared type if all agree, else `Dyn`.
/// Empty aggregates are `Dyn`.
fn join_types(types: &[CelType]) -> CelType {
    match types.split_first() {
        Some((first, rest)) if rest.iter().all(|t| t == first) => first.clone(),
        _ => CelType::Dyn,
    }
}

/// Check an expression against variable and function declarations.
pub fn check(
    expr: &SpannedExpr,
    variables: &HashMap<String, VariableDecl>,
    functions: &HashMap<String, FunctionDecl>,
) -> CheckResult {
    Checker::new(variables, functions).check(expr)
}
