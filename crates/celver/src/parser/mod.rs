//! Source text to syntax tree.
//!
//! Lexing is done with logos; parsing is a hand-written recursive descent
//! parser that expands the standard macros (`has`, `all`, `exists`,
//! `exists_one`, `map`, `filter`) into comprehension nodes as it goes.

pub mod ast;
pub mod lexer;
pub mod macros;
mod parser;

use std::fmt;

pub use ast::{BinaryOp, Expr, Span, Spanned, SpannedExpr, UnaryOp};
pub use lexer::{lex, LexError, Token};
pub use macros::{Macro, MacroRegistry, MacroStyle, ACCU_VAR};

/// A syntax error with the byte range it was found at.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self::new(err.message, err.span)
    }
}

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Nesting limit for parenthesized and compound sub-expressions.
    pub max_recursion_depth: usize,
    /// Expand `has`, `all`, `exists`, `exists_one`, `map` and `filter`.
    pub enable_macros: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: 250,
            enable_macros: true,
        }
    }
}

/// Outcome of parsing: an AST when successful, plus any errors found.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub ast: Option<SpannedExpr>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.ast.is_some() && self.errors.is_empty()
    }

    /// The AST, or every error found.
    pub fn into_result(self) -> Result<SpannedExpr, Vec<ParseError>> {
        match self.ast {
            Some(ast) if self.errors.is_empty() => Ok(ast),
            _ => Err(self.errors),
        }
    }
}

/// Parse with default options.
pub fn parse(input: &str) -> ParseResult {
    parse_with_options(input, &ParseOptions::default())
}

pub fn parse_with_options(input: &str, options: &ParseOptions) -> ParseResult {
    let outcome = lex(input)
        .map_err(ParseError::from)
        .and_then(|tokens| parser::parse_tokens(&tokens, options));

    match outcome {
        Ok(ast) => ParseResult {
            ast: Some(ast),
            errors: Vec::new(),
        },
        Err(err) => ParseResult {
            ast: None,
            errors: vec![err],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reports_lex_errors() {
        let result = parse("1 # 2");
        assert!(!result.is_ok());
        assert_eq!(result.errors[0].message, "unexpected character '#'");
        assert_eq!(result.errors[0].span, 2..3);
    }

    #[test]
    fn parse_empty_input() {
        let errors = parse("   ").into_result().unwrap_err();
        assert_eq!(errors[0].message, "empty input");
    }

    #[test]
    fn parse_reserved_word() {
        let errors = parse("package + 1").into_result().unwrap_err();
        assert!(errors[0].message.contains("'package' is a reserved word"));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::new("unexpected token ')'", 4..5);
        assert_eq!(err.to_string(), "unexpected token ')' at 4..5");
    }
}
