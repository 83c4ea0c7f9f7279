//! celver: an embeddable CEL-style expression engine with a semantic-version
//! comparator.
//!
//! # Quick Start
//!
//! ```
//! use celver::{semver_extension, CelType, EnvBuilder, MapActivation, Value};
//!
//! // Declare what expressions may reference, then freeze.
//! let mut builder = EnvBuilder::with_standard_library();
//! builder.declare_variable("ocpversion", CelType::String)?;
//! builder.declare_function(semver_extension())?;
//! let env = builder.freeze();
//!
//! // Parse and check once, evaluate many times.
//! let ast = env.compile("ocpversion.semver_compare('4.8.0') != 1")?;
//! let program = env.program(&ast);
//!
//! let newer = MapActivation::new().with("ocpversion", "4.9.0");
//! assert_eq!(program.evaluate(&newer)?, Value::Bool(false));
//!
//! let older = MapActivation::new().with("ocpversion", "4.7.0");
//! assert_eq!(program.evaluate(&older)?, Value::Bool(true));
//! # Ok::<(), celver::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`EnvBuilder`] is the declaration registry. It validates each
//!   declaration and [`freeze`](EnvBuilder::freeze)s into an [`Env`].
//! - [`Env`] parses and checks expression text into an [`Ast`] and builds
//!   [`Program`]s. It is immutable, `Send` and `Sync`.
//! - [`Program`] evaluates against an [`Activation`]. Evaluation errors are
//!   values ([`Value::Error`]) that flow through the expression.
//!
//! # Modules
//!
//! - `types`: static types and declarations
//! - `parser`: lexer, parser and macro expansion
//! - `checker`: type checking, overload resolution, standard library
//! - `eval`: values, activations, function registry, evaluator
//! - `version`: semantic version parsing and precedence
//! - `ext`: extension libraries (`semver_compare`)

mod ast;
mod env;
mod error;

pub mod checker;
pub mod eval;
pub mod ext;
pub mod parser;
pub mod types;
pub mod version;

pub use ast::Ast;
pub use env::{CompileError, DeclarationError, Env, EnvBuilder};
pub use error::{Error, Result};

pub use checker::{check, CheckError, CheckErrorKind, CheckResult, ReferenceInfo, STANDARD_LIBRARY};

pub use eval::{
    Activation, EmptyActivation, EvalError, EvalErrorKind, Evaluator, FunctionRegistry,
    HierarchicalActivation, MapActivation, MapKey, Program, Value, ValueMap,
};

pub use ext::{semver_compare, semver_extension};

pub use parser::{
    parse, parse_with_options, ParseError, ParseOptions, ParseResult, Span, Spanned, SpannedExpr,
};

pub use types::{CelType, FunctionDecl, FunctionImpl, OverloadDecl, VariableDecl};

pub use version::{PrereleaseIdentifier, Version, VersionError};
