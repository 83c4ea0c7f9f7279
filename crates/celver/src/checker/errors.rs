//! Check errors.

use std::fmt;

use crate::parser::Span;
use crate::types::CelType;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckError {
    pub kind: CheckErrorKind,
    pub span: Span,
    /// Id of the offending node.
    pub expr_id: i64,
}

impl CheckError {
    pub fn new(kind: CheckErrorKind, span: Span, expr_id: i64) -> Self {
        Self {
            kind,
            span,
            expr_id,
        }
    }

    pub fn undeclared_reference(name: &str, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::UndeclaredReference {
                name: name.to_string(),
            },
            span,
            expr_id,
        )
    }

    pub fn no_matching_overload(
        function: &str,
        arg_types: Vec<CelType>,
        span: Span,
        expr_id: i64,
    ) -> Self {
        Self::new(
            CheckErrorKind::NoMatchingOverload {
                function: function.to_string(),
                arg_types,
            },
            span,
            expr_id,
        )
    }

    pub fn ambiguous_overload(
        function: &str,
        overload_ids: Vec<String>,
        span: Span,
        expr_id: i64,
    ) -> Self {
        Self::new(
            CheckErrorKind::AmbiguousOverload {
                function: function.to_string(),
                overload_ids,
            },
            span,
            expr_id,
        )
    }

    pub fn wrong_argument_count(
        function: &str,
        expected: Vec<usize>,
        actual: usize,
        span: Span,
        expr_id: i64,
    ) -> Self {
        Self::new(
            CheckErrorKind::WrongArgumentCount {
                function: function.to_string(),
                expected,
                actual,
            },
            span,
            expr_id,
        )
    }

    pub fn type_mismatch(expected: CelType, actual: CelType, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::TypeMismatch { expected, actual },
            span,
            expr_id,
        )
    }

    pub fn undefined_field(type_name: &str, field: &str, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::UndefinedField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            },
            span,
            expr_id,
        )
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.kind, self.span.start, self.span.end)
    }
}

impl std::error::Error for CheckError {}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckErrorKind {
    /// Reference to an undeclared variable or function.
    UndeclaredReference { name: String },

    /// No overload accepts the argument types.
    NoMatchingOverload {
        function: String,
        arg_types: Vec<CelType>,
    },

    /// Several statically typed overloads accept the same arguments.
    AmbiguousOverload {
        function: String,
        overload_ids: Vec<String>,
    },

    /// No overload of the function (in this call style) takes this many arguments.
    WrongArgumentCount {
        function: String,
        expected: Vec<usize>,
        actual: usize,
    },

    TypeMismatch { expected: CelType, actual: CelType },

    UndefinedField { type_name: String, field: String },

    Other(String),
}

impl fmt::Display for CheckErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckErrorKind::UndeclaredReference { name } => {
                write!(f, "undeclared reference to '{}'", name)
            }
            CheckErrorKind::NoMatchingOverload {
                function,
                arg_types,
            } => {
                let types: Vec<_> = arg_types.iter().map(|t| t.display_name()).collect();
                write!(
                    f,
                    "no matching overload for '{}' with argument types ({})",
                    function,
                    types.join(", ")
                )
            }
            CheckErrorKind::AmbiguousOverload {
                function,
                overload_ids,
            } => write!(
                f,
                "ambiguous call to '{}': overloads {} all match",
                function,
                overload_ids.join(", ")
            ),
            CheckErrorKind::WrongArgumentCount {
                function,
                expected,
                actual,
            } => {
                let counts: Vec<_> = expected.iter().map(|n| n.to_string()).collect();
                write!(
                    f,
                    "'{}' expects {} argument(s) but {} were given",
                    function,
                    counts.join(" or "),
                    actual
                )
            }
            CheckErrorKind::TypeMismatch { expected, actual } => write!(
                f,
                "expected type '{}' but found '{}'",
                expected.display_name(),
                actual.display_name()
            ),
            CheckErrorKind::UndefinedField { type_name, field } => {
                write!(f, "undefined field '{}' on type '{}'", field, type_name)
            }
            CheckErrorKind::Other(msg) => write!(f, "{}", msg),
        }
    }
}
