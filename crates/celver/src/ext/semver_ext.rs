//! Semantic-version comparison.
//!
//! Declares `semver_compare`, callable as `semver_compare(a, b)` or
//! `a.semver_compare(b)`. Both forms share one implementation and return
//! `-1`, `0` or `1`.
//!
//! Operands are dynamic. Strings are parsed as they are; ints and doubles
//! are formatted in their shortest decimal form first, so `4.8` is read as
//! `"4.8"` and then as `4.8.0`. Parsing is tolerant (see
//! [`Version::parse_tolerant`]). Anything else, or text that still does not
//! parse, yields an error value naming the operand that failed.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::eval::{EvalError, Value};
use crate::types::{CelType, FunctionDecl, FunctionImpl, OverloadDecl};
use crate::version::Version;

pub const SEMVER_COMPARE: &str = "semver_compare";

/// Declaration for `semver_compare` with its free and receiver overloads.
///
/// Register it with
/// [`EnvBuilder::declare_function`](crate::EnvBuilder::declare_function).
pub fn semver_extension() -> FunctionDecl {
    let compare: FunctionImpl = Arc::new(semver_compare_impl);

    FunctionDecl::new(SEMVER_COMPARE).with_overloads([
        OverloadDecl::function(
            "semver_compare_any_any",
            vec![CelType::Dyn, CelType::Dyn],
            CelType::Int,
        )
        .with_shared_impl(Arc::clone(&compare)),
        OverloadDecl::method(
            "any_semver_compare_any",
            vec![CelType::Dyn, CelType::Dyn],
            CelType::Int,
        )
        .with_shared_impl(compare),
    ])
}

fn semver_compare_impl(args: &[Value]) -> Value {
    match args {
        [first, second] => semver_compare(first, second),
        _ => Value::error(EvalError::invalid_argument(format!(
            "{} expects 2 arguments, got {}",
            SEMVER_COMPARE,
            args.len()
        ))),
    }
}

/// Compare two values as versions: `Int(-1 | 0 | 1)` or an error value.
pub fn semver_compare(first: &Value, second: &Value) -> Value {
    match compare_versions(first, second) {
        Ok(ordering) => Value::Int(ordering as i64),
        Err(err) => Value::error(err),
    }
}

/// Precedence of `first` relative to `second`. The first operand is
/// validated before the second.
pub fn compare_versions(first: &Value, second: &Value) -> Result<Ordering, EvalError> {
    let first = to_version(first, Operand::First)?;
    let second = to_version(second, Operand::Second)?;
    Ok(first.cmp_precedence(&second))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    First,
    Second,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::First => f.write_str("first operand"),
            Operand::Second => f.write_str("second operand"),
        }
    }
}

fn to_version(value: &Value, operand: Operand) -> Result<Version, EvalError> {
    let raw = version_text(value).map_err(|reason| {
        debug!(%operand, value_type = value.type_name(), %reason, "semver operand rejected");
        EvalError::coercion(format!("{}: {}", operand, reason))
    })?;

    Version::parse_tolerant(&raw).map_err(|cause| {
        debug!(%operand, raw = %raw, %cause, "semver operand rejected");
        EvalError::version_parse(format!(
            "{}: unable to parse '{}' to semver format",
            operand, raw
        ))
    })
}

/// The text a value is parsed from.
fn version_text(value: &Value) -> Result<Cow<'_, str>, String> {
    match value {
        Value::String(s) => Ok(Cow::Borrowed(&**s)),
        Value::Int(i) => Ok(Cow::Owned(i.to_string())),
        Value::Double(d) if d.is_finite() => Ok(Cow::Owned(d.to_string())),
        Value::Double(d) => Err(format!("cannot convert non-finite double {} to a version string", d)),
        other => Err(format!(
            "cannot convert {} {} to a version string",
            other.type_name(),
            other
        )),
    }
}
