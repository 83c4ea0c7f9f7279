//! Static checking.
//!
//! Produces a [`CheckResult`] with a type for every node and, for calls, the
//! overload ids the evaluator may dispatch to.

mod checker;
mod errors;
mod overload;
mod scope;
mod standard_library;

pub use checker::{check, CheckResult, Checker, ReferenceInfo};
pub use errors::{CheckError, CheckErrorKind};
pub use overload::{resolve_overload, OverloadResult, Resolution};
pub use standard_library::STANDARD_LIBRARY;
