//! Hand-written recursive descent parser with inline macro expansion.

use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, Span, Spanned, SpannedExpr, UnaryOp};
use super::lexer::{SpannedToken, Token};
use super::macros::{MacroContext, MacroRegistry};
use super::{ParseError, ParseOptions};

pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Next node id; ids start at 1.
    next_id: i64,
    macros: Option<MacroRegistry>,
    depth: usize,
    max_depth: usize,
    /// Height of every subtree built so far, by node id. Operator and
    /// postfix chains are folded in loops, so recursion depth alone does
    /// not bound the tree.
    heights: HashMap<i64, usize>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [SpannedToken], options: &ParseOptions) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id: 1,
            macros: options.enable_macros.then(MacroRegistry::standard),
            depth: 0,
            max_depth: options.max_recursion_depth,
            heights: HashMap::new(),
        }
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn node(&mut self, node: Expr, span: Span) -> SpannedExpr {
        let expr = Spanned::new(self.next_id(), node, span);
        self.record_height(&expr);
        expr
    }

    fn record_height(&mut self, expr: &SpannedExpr) {
        let height = 1 + self.children_height(&expr.node);
        self.heights.insert(expr.id, height);
    }

    fn height(&self, expr: &SpannedExpr) -> usize {
        match self.heights.get(&expr.id) {
            Some(height) => *height,
            // Only macro-generated nodes are missing, a few levels above recorded ones.
            None => 1 + self.children_height(&expr.node),
        }
    }

    fn children_height(&self, node: &Expr) -> usize {
        node.children()
            .into_iter()
            .map(|child| self.height(child))
            .max()
            .unwrap_or(0)
    }

    fn too_deep(&self, span: Span) -> ParseError {
        ParseError::new(
            format!(
                "expression nesting exceeds maximum depth of {}",
                self.max_depth
            ),
            span,
        )
    }

    fn check_height(&self, expr: &SpannedExpr) -> Result<(), ParseError> {
        if self.height(expr) > self.max_depth {
            return Err(self.too_deep(expr.span.clone()));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            let span = self.peek_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(&format!("'{}'", token)))
        }
    }

    fn unexpected(&self, wanted: &str) -> ParseError {
        let found = match self.peek() {
            Some(token) => format!("'{}'", token),
            None => "end of input".to_string(),
        };
        ParseError::new(format!("expected {}, found {}", wanted, found), self.peek_span())
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Entry point; also the recursion point for nested sub-expressions.
    pub fn parse_expr(&mut self) -> Result<SpannedExpr, ParseError> {
        self.depth += 1;
        let result = if self.depth > self.max_depth {
            Err(self.too_deep(self.peek_span()))
        } else {
            self.parse_ternary()
                .and_then(|expr| self.check_height(&expr).map(|()| expr))
        };
        self.depth -= 1;
        result
    }

    fn parse_ternary(&mut self) -> Result<SpannedExpr, ParseError> {
        let cond = self.parse_or()?;
        if !self.match_token(&Token::Question) {
            return Ok(cond);
        }

        let then_expr = self.parse_or()?;
        self.expect(&Token::Colon)?;
        let else_expr = self.parse_expr()?;
        let span = cond.span.start..else_expr.span.end;
        Ok(self.node(
            Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// Left-associative binary level: `next (op next)*`.
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<SpannedExpr, ParseError>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<SpannedExpr, ParseError> {
        let mut left = next(self)?;

        while let Some(op) = self.peek().and_then(operator) {
            self.advance();
            let right = next(self)?;
            let span = left.span.start..right.span.end;
            left = self.node(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
            self.check_height(&left)?;
        }

        Ok(left)
    }

    fn parse_or(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(Self::parse_and, |t| {
            matches!(t, Token::Or).then_some(BinaryOp::Or)
        })
    }

    fn parse_and(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(Self::parse_relation, |t| {
            matches!(t, Token::And).then_some(BinaryOp::And)
        })
    }

    fn parse_relation(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(Self::parse_addition, |t| match t {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::In => Some(BinaryOp::In),
            _ => None,
        })
    }

    fn parse_addition(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(Self::parse_mult, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_mult(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(Self::parse_unary, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    /// Prefix operators are collected iteratively so long `!!!!x` chains don't recurse.
    fn parse_unary(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut prefixes = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Minus) => UnaryOp::Neg,
                Some(Token::Not) => UnaryOp::Not,
                _ => break,
            };
            prefixes.push((op, self.peek_span().start));
            self.advance();
        }

        // `-9223372036854775808` only fits when the sign is folded into the literal.
        let mut expr = match (prefixes.last(), self.peek()) {
            (Some((UnaryOp::Neg, start)), Some(Token::Int(_)) | Some(Token::Float(_))) => {
                let start = *start;
                prefixes.pop();
                self.parse_negative_literal(start)?
            }
            _ => self.parse_postfix()?,
        };

        while let Some((op, start)) = prefixes.pop() {
            let span = start..expr.span.end;
            expr = self.node(
                Expr::Unary {
                    op,
                    expr: Box::new(expr),
                },
                span,
            );
            self.check_height(&expr)?;
        }
        Ok(expr)
    }

    fn parse_negative_literal(&mut self, start: usize) -> Result<SpannedExpr, ParseError> {
        if let Some(Token::Int(n)) = self.peek() {
            let postfix_follows = matches!(
                self.tokens.get(self.pos + 1),
                Some((Token::LParen | Token::LBracket | Token::Dot, _))
            );
            if *n == i64::MIN.unsigned_abs() && !postfix_follows {
                let end = self.peek_span().end;
                self.advance();
                return Ok(self.node(Expr::Int(i64::MIN), start..end));
            }
        }

        let literal = self.parse_postfix()?;
        let span = start..literal.span.end;
        let folded = match &literal.node {
            Expr::Int(n) => Some(Expr::Int(-n)),
            Expr::Float(f) => Some(Expr::Float(-f)),
            _ => None,
        };
        Ok(match folded {
            Some(node) => Spanned::new(literal.id, node, span),
            None => self.node(
                Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(literal),
                },
                span,
            ),
        })
    }

    fn parse_postfix(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            if self.check(&Token::LParen) {
                expr = self.parse_call(expr)?;
            } else if self.check(&Token::LBracket) {
                expr = self.parse_index(expr)?;
            } else if self.check(&Token::Dot) {
                expr = self.parse_member(expr)?;
            } else {
                break;
            }
            self.check_height(&expr)?;
        }

        Ok(expr)
    }

    /// Comma-separated items up to `close`; trailing comma allowed.
    fn parse_sequence<T>(
        &mut self,
        close: &Token,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<(Vec<T>, Span), ParseError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(item(self)?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(close)?;
        Ok((items, end))
    }

    fn parse_call(&mut self, callee: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = callee.span.start;
        self.expect(&Token::LParen)?;
        let (args, end) = self.parse_sequence(&Token::RParen, Self::parse_expr)?;
        let span = start..end.end;

        if let Some(expanded) = self.try_expand_macro(&callee, &args, &span) {
            let expanded = expanded?;
            self.record_height(&expanded);
            return Ok(expanded);
        }

        Ok(self.node(
            Expr::Call {
                expr: Box::new(callee),
                args,
            },
            span,
        ))
    }

    /// Returns `None` when the call is not a macro invocation.
    fn try_expand_macro(
        &mut self,
        callee: &SpannedExpr,
        args: &[SpannedExpr],
        span: &Span,
    ) -> Option<Result<SpannedExpr, ParseError>> {
        let (name, receiver) = match &callee.node {
            Expr::Ident(name) => (name.as_str(), None),
            Expr::Member { expr, field } => (field.as_str(), Some((**expr).clone())),
            _ => return None,
        };
        let macro_def = self
            .macros
            .as_ref()?
            .lookup(name, args.len(), receiver.is_some())?;
        let expander = macro_def.expander;

        let mut ctx = MacroContext::new(&mut self.next_id);
        let expanded = expander(&mut ctx, span.clone(), receiver, args.to_vec());
        Some(expanded.map_err(|message| ParseError::new(message, span.clone())))
    }

    fn parse_index(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::LBracket)?;
        let index = self.parse_expr()?;
        let end = self.expect(&Token::RBracket)?;

        Ok(self.node(
            Expr::Index {
                expr: Box::new(base),
                index: Box::new(index),
            },
            start..end.end,
        ))
    }

    fn parse_member(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::Dot)?;

        let (field, end) = match self.peek() {
            Some(Token::Ident(name)) => (name.clone(), self.peek_span().end),
            _ => return Err(self.unexpected("field name after '.'")),
        };
        self.advance();

        Ok(self.node(
            Expr::Member {
                expr: Box::new(base),
                field,
            },
            start..end,
        ))
    }

    fn parse_atom(&mut self) -> Result<SpannedExpr, ParseError> {
        let span = self.peek_span();
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => return Err(ParseError::new("unexpected end of input", self.eof_span())),
        };

        let node = match token {
            Token::Int(n) => match i64::try_from(n) {
                Ok(n) => Expr::Int(n),
                Err(_) => {
                    return Err(ParseError::new(
                        format!("integer literal {} is out of range", n),
                        span,
                    ))
                }
            },
            Token::Float(n) => Expr::Float(n),
            Token::String(s) => Expr::String(s),
            Token::Bytes(b) => Expr::Bytes(b),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::Ident(name) => Expr::Ident(name),
            Token::Reserved(word) => {
                return Err(ParseError::new(
                    format!("'{}' is a reserved word and cannot be used as an identifier", word),
                    span,
                ))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(expr);
            }
            Token::LBracket => return self.parse_list(),
            Token::LBrace => return self.parse_map(),
            other => {
                return Err(ParseError::new(format!("unexpected token '{}'", other), span))
            }
        };

        self.advance();
        Ok(self.node(node, span))
    }

    fn parse_list(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.expect(&Token::LBracket)?.start;
        let (items, end) = self.parse_sequence(&Token::RBracket, Self::parse_expr)?;
        Ok(self.node(Expr::List(items), start..end.end))
    }

    fn parse_map(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.expect(&Token::LBrace)?.start;
        let (entries, end) = self.parse_sequence(&Token::RBrace, |p| {
            let key = p.parse_expr()?;
            p.expect(&Token::Colon)?;
            let value = p.parse_expr()?;
            Ok((key, value))
        })?;
        Ok(self.node(Expr::Map(entries), start..end.end))
    }
}

/// Parse a token stream into a single expression.
pub fn parse_tokens(
    tokens: &[SpannedToken],
    options: &ParseOptions,
) -> Result<SpannedExpr, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new("empty input", 0..0));
    }

    let mut parser = Parser::new(tokens, options);
    let ast = parser.parse_expr()?;
    if parser.at_end() {
        Ok(ast)
    } else {
        Err(ParseError::new(
            "unexpected tokens after expression",
            parser.peek_span(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::lex;

    fn parse_expr(input: &str) -> SpannedExpr {
        let tokens = lex(input).unwrap();
        parse_tokens(&tokens, &ParseOptions::default()).expect("expected AST")
    }

    fn parse_expr_node(input: &str) -> Expr {
        parse_expr(input).node
    }

    #[test]
    fn parse_literals() {
        assert_eq!(parse_expr_node("123"), Expr::Int(123));
        assert_eq!(parse_expr_node("-7"), Expr::Int(-7));
        assert_eq!(parse_expr_node("4.8"), Expr::Float(4.8));
        assert_eq!(parse_expr_node("'x'"), Expr::String("x".to_string()));
        assert_eq!(parse_expr_node("null"), Expr::Null);
        assert_eq!(parse_expr_node("-9223372036854775807"), Expr::Int(-i64::MAX));
    }

    #[test]
    fn parse_int_range() {
        assert_eq!(parse_expr_node("-9223372036854775808"), Expr::Int(i64::MIN));
        assert_eq!(parse_expr_node("-0x8000000000000000"), Expr::Int(i64::MIN));

        let tokens = lex("9223372036854775808").unwrap();
        let err = parse_tokens(&tokens, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.message, "integer literal 9223372036854775808 is out of range");
        assert_eq!(err.span, 0..19);

        // The sign applies to the whole selection, so the magnitude must fit on its own.
        let tokens = lex("-9223372036854775808.size()").unwrap();
        assert!(parse_tokens(&tokens, &ParseOptions::default()).is_err());
    }

    #[test]
    fn parse_precedence() {
        match parse_expr_node("a || b && c == 1 + 2 * 3") {
            Expr::Binary { op: BinaryOp::Or, right, .. } => match right.node {
                Expr::Binary { op: BinaryOp::And, right, .. } => match right.node {
                    Expr::Binary { op: BinaryOp::Eq, right, .. } => {
                        assert!(matches!(right.node, Expr::Binary { op: BinaryOp::Add, .. }))
                    }
                    other => panic!("expected ==, got {:?}", other),
                },
                other => panic!("expected &&, got {:?}", other),
            },
            other => panic!("expected ||, got {:?}", other),
        }
    }

    #[test]
    fn parse_left_associativity() {
        match parse_expr_node("1 - 2 - 3") {
            Expr::Binary { op: BinaryOp::Sub, left, right } => {
                assert_eq!(right.node, Expr::Int(3));
                assert!(matches!(left.node, Expr::Binary { op: BinaryOp::Sub, .. }));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn parse_free_and_receiver_calls() {
        match parse_expr_node("semver_compare(a, '4.8.0')") {
            Expr::Call { expr, args } => {
                assert_eq!(expr.node, Expr::Ident("semver_compare".to_string()));
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {:?}", other),
        }

        match parse_expr_node("a.semver_compare('4.8.0')") {
            Expr::Call { expr, args } => {
                assert!(matches!(
                    &expr.node,
                    Expr::Member { field, .. } if field == "semver_compare"
                ));
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn parse_collections() {
        match parse_expr_node("[1, 2, 3,]") {
            Expr::List(items) => assert_eq!(items.len(), 3),
            other => panic!("expected list, got {:?}", other),
        }
        match parse_expr_node("{'type': 'olm.gvk', 'value': {}}") {
            Expr::Map(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].0.node, Expr::String("type".to_string()));
                assert_eq!(entries[1].1.node, Expr::Map(vec![]));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn parse_unary_chain() {
        match parse_expr_node("!!x") {
            Expr::Unary { op: UnaryOp::Not, expr } => {
                assert!(matches!(expr.node, Expr::Unary { op: UnaryOp::Not, .. }))
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn parse_exists_macro() {
        let expr = parse_expr("props.exists(p, p.type == 'a')");
        match expr.node {
            Expr::Comprehension { iter_var, iter_range, .. } => {
                assert_eq!(iter_var, "p");
                assert_eq!(iter_range.node, Expr::Ident("props".to_string()));
            }
            other => panic!("expected comprehension, got {:?}", other),
        }
    }

    #[test]
    fn node_ids_are_unique() {
        fn collect(expr: &SpannedExpr, ids: &mut Vec<i64>) {
            ids.push(expr.id);
            match &expr.node {
                Expr::Binary { left, right, .. } => {
                    collect(left, ids);
                    collect(right, ids);
                }
                Expr::Call { expr, args } => {
                    collect(expr, ids);
                    args.iter().for_each(|a| collect(a, ids));
                }
                Expr::Member { expr, .. } => collect(expr, ids),
                _ => {}
            }
        }
        let mut ids = Vec::new();
        collect(&parse_expr("f(a.b, 1) + g(2)"), &mut ids);
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert!(ids.iter().all(|id| *id >= 1));
    }

    #[test]
    fn parse_errors() {
        let tokens = lex("1 +").unwrap();
        let err = parse_tokens(&tokens, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.message, "unexpected end of input");

        let tokens = lex("1 2").unwrap();
        let err = parse_tokens(&tokens, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.message, "unexpected tokens after expression");
        assert_eq!(err.span, 2..3);

        let tokens = lex("a.exists(1, true)").unwrap();
        assert!(parse_tokens(&tokens, &ParseOptions::default()).is_err());
    }

    #[test]
    fn parse_depth_limit() {
        let source = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        let tokens = lex(&source).unwrap();
        let options = ParseOptions {
            max_recursion_depth: 10,
            ..ParseOptions::default()
        };
        let err = parse_tokens(&tokens, &options).unwrap_err();
        assert!(err.message.contains("maximum depth of 10"));
        assert!(parse_tokens(&tokens, &ParseOptions::default()).is_ok());
    }

    #[test]
    fn parse_depth_limit_counts_folded_chains() {
        let options = ParseOptions {
            max_recursion_depth: 10,
            ..ParseOptions::default()
        };
        // Chains of n terms are n levels deep.
        for (source, ok) in [
            (format!("x{}", " + 1".repeat(9)), true),
            (format!("x{}", " + 1".repeat(10)), false),
            (format!("x{}", ".f".repeat(10)), false),
            (format!("{}x", "!".repeat(10)), false),
            (format!("a * b{}", " - c".repeat(9)), false),
        ] {
            let tokens = lex(&source).unwrap();
            let result = parse_tokens(&tokens, &options);
            assert_eq!(result.is_ok(), ok, "{}", source);
            if let Err(err) = result {
                assert!(err.message.contains("maximum depth of 10"), "{}", err);
            }
        }
    }

    #[test]
    fn macros_can_be_disabled() {
        let tokens = lex("l.exists(x, x)").unwrap();
        let options = ParseOptions {
            enable_macros: false,
            ..ParseOptions::default()
        };
        let expr = parse_tokens(&tokens, &options).unwrap();
        assert!(matches!(expr.node, Expr::Call { .. }));
    }
}
