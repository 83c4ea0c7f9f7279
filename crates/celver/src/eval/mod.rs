//! Runtime evaluation.
//!
//! - [`Value`] is a runtime value; errors are values too ([`Value::Error`]).
//! - [`Activation`] supplies variable bindings.
//! - [`FunctionRegistry`] holds native implementations keyed by overload id.
//! - [`Evaluator`] walks an expression tree.
//! - [`Program`] pairs a checked expression with its registry.
//!
//! # Example
//!
//! ```
//! use celver::{CelType, EnvBuilder};
//! use celver::eval::{MapActivation, Value};
//!
//! let mut builder = EnvBuilder::with_standard_library();
//! builder.declare_variable("x", CelType::Int).unwrap();
//! let env = builder.freeze();
//!
//! let ast = env.compile("x + 1").unwrap();
//! let program = env.program(&ast);
//!
//! let activation = MapActivation::new().with("x", 41);
//! assert_eq!(program.eval(&activation), Value::Int(42));
//! ```

mod activation;
mod error;
mod evaluator;
mod functions;
mod program;
mod value;

pub use activation::{Activation, EmptyActivation, HierarchicalActivation, MapActivation};
pub use error::{EvalError, EvalErrorKind};
pub use evaluator::Evaluator;
pub use functions::{FunctionBinding, FunctionRegistry};
pub use crate::types::FunctionImpl;
pub use program::Program;
pub use value::{MapKey, Value, ValueMap};
