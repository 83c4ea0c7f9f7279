//! Declaration registry and the frozen environment built from it.
//!
//! Hosts declare variables and functions on an [`EnvBuilder`], then call
//! [`EnvBuilder::freeze`] to get an [`Env`]. The `Env` is immutable and
//! shared behind an `Arc`: it parses, checks and compiles expressions into
//! [`Program`]s, and may be used from any number of threads.
//!
//! # Example
//!
//! ```
//! use celver::{semver_extension, CelType, EnvBuilder, MapActivation, Value};
//!
//! let mut builder = EnvBuilder::with_standard_library();
//! builder.declare_variable("ocpversion", CelType::String)?;
//! builder.declare_function(semver_extension())?;
//! let env = builder.freeze();
//!
//! let ast = env.compile("semver_compare(ocpversion, '4.8.0') == 1")?;
//! let program = env.program(&ast);
//! let activation = MapActivation::new().with("ocpversion", "4.9.0");
//! assert_eq!(program.evaluate(&activation)?, Value::Bool(true));
//! # Ok::<(), celver::Error>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::checker::{check, CheckError, CheckResult, STANDARD_LIBRARY};
use crate::eval::{FunctionRegistry, Program};
use crate::parser::{parse_with_options, ParseError, ParseOptions, ParseResult, SpannedExpr};
use crate::types::{CelType, FunctionDecl, OverloadDecl, VariableDecl};
use crate::Ast;

/// A declaration the registry refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("overload id '{overload_id}' is already declared (function '{function}')")]
    DuplicateOverload { function: String, overload_id: String },

    /// Two overloads of one function with the same call style and parameter types.
    #[error("overload '{overload_id}' has the same signature as '{existing}': {signature}")]
    ConflictingArity {
        function: String,
        overload_id: String,
        existing: String,
        signature: String,
    },

    #[error("variable '{0}' is already declared")]
    DuplicateVariable(String),

    #[error("environment is frozen; no further declarations are accepted")]
    EnvironmentFrozen,
}

/// Failure to turn expression text into a checked [`Ast`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("parse failed: {}", join_errors(.0))]
    Parse(Vec<ParseError>),

    #[error("check failed: {}", join_errors(.0))]
    Check(Vec<CheckError>),
}

impl CompileError {
    /// Number of diagnostics carried.
    pub fn len(&self) -> usize {
        match self {
            CompileError::Parse(errors) => errors.len(),
            CompileError::Check(errors) => errors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn join_errors<E: fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Mutable declaration registry.
///
/// Every declaration is validated as it is made, so a builder never holds
/// an inconsistent set. Once frozen it refuses further declarations.
#[derive(Debug, Clone, Default)]
pub struct EnvBuilder {
    variables: HashMap<String, VariableDecl>,
    functions: HashMap<String, FunctionDecl>,
    overload_ids: HashSet<String>,
    parse_options: ParseOptions,
    frozen: Option<Env>,
}

impl EnvBuilder {
    /// An empty registry. Without the standard library even operators such
    /// as `==` are undeclared.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with operator and standard function declarations.
    pub fn with_standard_library() -> Self {
        let mut builder = Self::new();
        for decl in STANDARD_LIBRARY.iter() {
            builder
                .overload_ids
                .extend(decl.overloads.iter().map(|o| o.id.clone()));
            builder.functions.insert(decl.name.clone(), decl.clone());
        }
        builder
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn declare_variable(
        &mut self,
        name: impl Into<String>,
        cel_type: CelType,
    ) -> Result<&mut Self, DeclarationError> {
        self.ensure_open()?;
        let name = name.into();
        if self.variables.contains_key(&name) {
            return Err(DeclarationError::DuplicateVariable(name));
        }

        debug!(variable = %name, cel_type = %cel_type, "declared variable");
        self.variables
            .insert(name.clone(), VariableDecl::new(name, cel_type));
        Ok(self)
    }

    /// Declare a function, or add overloads to one already declared.
    ///
    /// The declaration is all-or-nothing: if any overload is rejected, none
    /// of them are added.
    pub fn declare_function(&mut self, decl: FunctionDecl) -> Result<&mut Self, DeclarationError> {
        self.ensure_open()?;

        let existing = self
            .functions
            .get(&decl.name)
            .map(|f| f.overloads.as_slice())
            .unwrap_or_default();
        let mut seen_ids = HashSet::new();
        for (index, overload) in decl.overloads.iter().enumerate() {
            if self.overload_ids.contains(&overload.id) || !seen_ids.insert(overload.id.as_str()) {
                return Err(DeclarationError::DuplicateOverload {
                    function: decl.name.clone(),
                    overload_id: overload.id.clone(),
                });
            }
            let earlier = existing.iter().chain(&decl.overloads[..index]);
            if let Some(clash) = find_conflict(earlier, overload) {
                return Err(DeclarationError::ConflictingArity {
                    function: decl.name.clone(),
                    overload_id: overload.id.clone(),
                    existing: clash.id.clone(),
                    signature: overload.signature(&decl.name),
                });
            }
        }

        debug!(
            function = %decl.name,
            overloads = ?decl.overloads.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
            "declared function"
        );
        self.overload_ids
            .extend(decl.overloads.iter().map(|o| o.id.clone()));
        match self.functions.get_mut(&decl.name) {
            Some(function) => function.overloads.extend(decl.overloads),
            None => {
                self.functions.insert(decl.name.clone(), decl);
            }
        }
        Ok(self)
    }

    /// Build the immutable environment.
    ///
    /// The first call snapshots the declarations; later calls return the same
    /// environment.
    pub fn freeze(&mut self) -> Env {
        if let Some(env) = &self.frozen {
            return env.clone();
        }

        let mut registry = FunctionRegistry::new();
        for decl in self.functions.values() {
            registry.register_function(decl);
        }
        debug!(
            variables = self.variables.len(),
            functions = self.functions.len(),
            bindings = registry.len(),
            "environment frozen"
        );

        let env = Env {
            inner: Arc::new(EnvInner {
                variables: self.variables.clone(),
                functions: self.functions.clone(),
                registry: Arc::new(registry),
                parse_options: self.parse_options,
            }),
        };
        self.frozen = Some(env.clone());
        env
    }

    fn ensure_open(&self) -> Result<(), DeclarationError> {
        match self.frozen {
            Some(_) => Err(DeclarationError::EnvironmentFrozen),
            None => Ok(()),
        }
    }
}

fn find_conflict<'a>(
    mut earlier: impl Iterator<Item = &'a OverloadDecl>,
    overload: &OverloadDecl,
) -> Option<&'a OverloadDecl> {
    earlier.find(|other| other.same_signature(overload))
}

#[derive(Debug)]
struct EnvInner {
    variables: HashMap<String, VariableDecl>,
    functions: HashMap<String, FunctionDecl>,
    registry: Arc<FunctionRegistry>,
    parse_options: ParseOptions,
}

/// A frozen set of declarations and their native implementations.
///
/// Cloning is cheap and clones share the same declarations.
#[derive(Debug, Clone)]
pub struct Env {
    inner: Arc<EnvInner>,
}

impl Env {
    pub fn variables(&self) -> &HashMap<String, VariableDecl> {
        &self.inner.variables
    }

    pub fn functions(&self) -> &HashMap<String, FunctionDecl> {
        &self.inner.functions
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDecl> {
        self.inner.variables.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.inner.functions.get(name)
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.inner.registry
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.inner.parse_options
    }

    /// Parse with this environment's options. No declarations are consulted.
    pub fn parse(&self, source: &str) -> ParseResult {
        parse_with_options(source, &self.inner.parse_options)
    }

    pub fn check(&self, expr: &SpannedExpr) -> CheckResult {
        check(expr, &self.inner.variables, &self.inner.functions)
    }

    /// Parse and check `source`.
    pub fn compile(&self, source: &str) -> Result<Ast, CompileError> {
        let expr = self.parse(source).into_result().map_err(|errors| {
            debug!(source, errors = errors.len(), "parse failed");
            CompileError::Parse(errors)
        })?;

        let result = self.check(&expr);
        if !result.is_ok() {
            debug!(source, errors = result.errors.len(), "check failed");
            return Err(CompileError::Check(result.errors));
        }

        debug!(source, "compiled expression");
        Ok(Ast::new_checked(expr, source, result))
    }

    /// Parse `source` without checking it.
    ///
    /// Programs built from unchecked trees dispatch functions by name, arity
    /// and call style instead of by resolved overload.
    pub fn parse_only(&self, source: &str) -> Result<Ast, CompileError> {
        let expr = self.parse(source).into_result().map_err(CompileError::Parse)?;
        Ok(Ast::new_unchecked(expr, source))
    }

    pub fn program(&self, ast: &Ast) -> Program {
        Program::new(Arc::new(ast.clone()), Arc::clone(&self.inner.registry))
    }
}
