//! Shared helpers for celver integration tests.

use celver::{parse, semver_extension, CelType, Env, EnvBuilder, ParseError, SpannedExpr};
use tracing_subscriber::EnvFilter;

/// Route library events to the test writer. Safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Parse input and assert it succeeds, returning the AST.
#[allow(dead_code)]
pub fn assert_parses(input: &str) -> SpannedExpr {
    let result = parse(input);
    if !result.errors.is_empty() {
        panic!(
            "failed to parse '{}': {:?}",
            input,
            result
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
        );
    }
    result.ast.expect("expected AST")
}

/// Parse input and assert it fails, returning the errors.
#[allow(dead_code)]
pub fn assert_parse_error(input: &str) -> Vec<ParseError> {
    let result = parse(input);
    if result.errors.is_empty() {
        panic!("expected parse error for '{}', but got: {:?}", input, result.ast);
    }
    result.errors
}

/// The environment the operator-bundle host uses: `ocpversion`,
/// `properties` and `semver_compare` on top of the standard library.
#[allow(dead_code)]
pub fn semver_env() -> Env {
    init_tracing();
    let mut builder = EnvBuilder::with_standard_library();
    builder
        .declare_variable("ocpversion", CelType::String)
        .and_then(|b| b.declare_variable("properties", CelType::map(CelType::Dyn, CelType::Dyn)))
        .and_then(|b| b.declare_function(semver_extension()))
        .expect("declarations are valid");
    builder.freeze()
}
