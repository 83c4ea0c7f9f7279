//! Evaluation error types.

use std::fmt;

/// An error produced while evaluating an expression.
///
/// Errors travel through evaluation as [`Value::Error`](super::Value::Error)
/// so they can be absorbed by `&&`, `||` and comprehension conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub message: String,
    pub kind: EvalErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    /// A declared variable has no binding in the activation.
    UnboundVariable,
    /// A comparator operand is not a valid version string.
    VersionParse,
    /// A comparator operand has a shape that cannot become a version string.
    Coercion,
    NoMatchingOverload,
    UnknownFunction,
    TypeMismatch,
    DivisionByZero,
    ModuloByZero,
    Overflow,
    IndexOutOfBounds,
    KeyNotFound,
    NoSuchField,
    InvalidArgument,
    /// Unexpected state, e.g. a declaration-only overload reached at runtime.
    Internal,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn unbound_variable(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnboundVariable,
            format!("no value bound for variable '{}'", name),
        )
    }

    pub fn version_parse(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::VersionParse, message)
    }

    pub fn coercion(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Coercion, message)
    }

    pub fn no_matching_overload(func: &str) -> Self {
        Self::new(
            EvalErrorKind::NoMatchingOverload,
            format!("no matching overload for function: {}", func),
        )
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownFunction,
            format!("unknown function: {}", name),
        )
    }

    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(
            EvalErrorKind::TypeMismatch,
            format!("expected {}, got {}", expected, actual),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(EvalErrorKind::ModuloByZero, "modulo by zero")
    }

    pub fn overflow(operation: &str) -> Self {
        Self::new(
            EvalErrorKind::Overflow,
            format!("integer overflow in {}", operation),
        )
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfBounds,
            format!("index {} out of bounds for length {}", index, len),
        )
    }

    pub fn key_not_found(key: &str) -> Self {
        Self::new(
            EvalErrorKind::KeyNotFound,
            format!("key not found: {}", key),
        )
    }

    pub fn no_such_field(field: &str) -> Self {
        Self::new(
            EvalErrorKind::NoSuchField,
            format!("no such field: {}", field),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

impl From<&str> for EvalError {
    fn from(s: &str) -> Self {
        Self::internal(s)
    }
}

impl From<String> for EvalError {
    fn from(s: String) -> Self {
        Self::internal(s)
    }
}
