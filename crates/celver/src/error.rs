//! Crate-level error.

use thiserror::Error;

use crate::env::{CompileError, DeclarationError};
use crate::eval::EvalError;

/// Any failure a host can hit between declaring functions and getting a result.
///
/// Setup failures (`Declaration`, `Compile`) mean the program cannot be used
/// at all; `Evaluation` is a per-run outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
}

impl Error {
    /// True for failures raised before any evaluation ran.
    pub fn is_setup(&self) -> bool {
        !matches!(self, Error::Evaluation(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalErrorKind;

    #[test]
    fn test_conversions() {
        let err: Error = DeclarationError::EnvironmentFrozen.into();
        assert!(err.is_setup());
        assert_eq!(
            err.to_string(),
            "environment is frozen; no further declarations are accepted"
        );

        let err: Error = EvalError::unbound_variable("ocpversion").into();
        assert!(!err.is_setup());
        assert!(matches!(&err, Error::Evaluation(e) if e.kind == EvalErrorKind::UnboundVariable));
        assert_eq!(
            err.to_string(),
            "evaluation failed: no value bound for variable 'ocpversion'"
        );
    }
}
