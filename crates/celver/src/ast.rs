//! Parsed, and usually checked, expressions.
//!
//! An [`Ast`] is the artifact [`Env::compile`](crate::Env::compile) hands
//! back: the expression tree, the text it came from and the checker's
//! annotations. It owns all of that, so it stays valid independently of the
//! environment that produced it.

use std::sync::Arc;

use crate::checker::CheckResult;
use crate::parser::SpannedExpr;
use crate::types::CelType;

#[derive(Debug, Clone)]
pub struct Ast {
    expr: SpannedExpr,
    source: Arc<str>,
    /// `None` for parse-only trees.
    type_info: Option<CheckResult>,
}

impl Ast {
    /// An AST that has been parsed but not checked.
    pub fn new_unchecked(expr: SpannedExpr, source: impl Into<Arc<str>>) -> Self {
        Self {
            expr,
            source: source.into(),
            type_info: None,
        }
    }

    pub fn new_checked(expr: SpannedExpr, source: impl Into<Arc<str>>, check_result: CheckResult) -> Self {
        Self {
            expr,
            source: source.into(),
            type_info: Some(check_result),
        }
    }

    pub fn is_checked(&self) -> bool {
        self.type_info.is_some()
    }

    pub fn expr(&self) -> &SpannedExpr {
        &self.expr
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn type_info(&self) -> Option<&CheckResult> {
        self.type_info.as_ref()
    }

    /// Static type of the whole expression, if checked.
    pub fn result_type(&self) -> Option<&CelType> {
        self.type_info
            .as_ref()
            .and_then(|info| info.get_type(self.expr.id))
    }

    /// Declared variables the expression reads, sorted by name.
    pub fn free_variables(&self) -> Vec<&str> {
        self.type_info
            .as_ref()
            .map(|info| info.free_variables().into_iter().collect())
            .unwrap_or_default()
    }
}
