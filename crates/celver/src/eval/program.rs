//! Compiled program ready for evaluation.
//!
//! A `Program` pairs a checked [`Ast`] with the function registry of the
//! environment that produced it. It is immutable and cheap to clone, so one
//! program can serve many evaluations, including concurrent ones.

use std::sync::Arc;

use tracing::debug;

use super::{Activation, EmptyActivation, EvalError, Evaluator, FunctionRegistry, Value};
use crate::Ast;

#[derive(Clone)]
pub struct Program {
    ast: Arc<Ast>,
    functions: Arc<FunctionRegistry>,
    /// Declared variables the expression reads, sorted.
    free_variables: Arc<[String]>,
}

impl Program {
    pub fn new(ast: Arc<Ast>, functions: Arc<FunctionRegistry>) -> Self {
        let free_variables: Vec<String> = ast
            .type_info()
            .map(|info| info.free_variables().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        let free_variables: Arc<[String]> = Arc::from(free_variables);
        debug!(
            source = ast.source(),
            checked = ast.is_checked(),
            free_variables = ?free_variables,
            "program created"
        );
        Self {
            ast,
            functions,
            free_variables,
        }
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Declared variables the expression reads. Empty for unchecked programs.
    pub fn free_variables(&self) -> &[String] {
        &self.free_variables
    }

    /// Evaluate against `activation`, returning errors as [`Value::Error`].
    ///
    /// Missing bindings only surface if evaluation actually reaches them,
    /// e.g. `false && x` is `false` even when `x` is unbound.
    pub fn eval(&self, activation: &dyn Activation) -> Value {
        let mut evaluator = Evaluator::new(activation, &self.functions);
        if let Some(type_info) = self.ast.type_info() {
            evaluator = evaluator.with_check_result(type_info);
        }
        evaluator.eval(self.ast.expr())
    }

    /// Evaluate with no variable bindings.
    pub fn eval_empty(&self) -> Value {
        self.eval(&EmptyActivation)
    }

    /// Evaluate against `activation`, failing fast on unbound variables.
    ///
    /// Every free variable must be bound before evaluation starts; the first
    /// missing one (in name order) is reported as
    /// [`EvalErrorKind::UnboundVariable`](super::EvalErrorKind::UnboundVariable).
    /// A top-level error value becomes `Err`.
    pub fn evaluate(&self, activation: &dyn Activation) -> Result<Value, EvalError> {
        if let Some(missing) = self.free_variables.iter().find(|name| !activation.has(name)) {
            return Err(EvalError::unbound_variable(missing));
        }

        match self.eval(activation) {
            Value::Error(err) => Err(Arc::unwrap_or_clone(err)),
            value => Ok(value),
        }
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("ast", &self.ast)
            .field("functions", &format!("{} functions", self.functions.len()))
            .field("free_variables", &self.free_variables)
            .finish()
    }
}
