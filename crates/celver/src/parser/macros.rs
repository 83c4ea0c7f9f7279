//! Parse-time macros.
//!
//! Macros rewrite specific call shapes into other AST nodes while parsing:
//! `has(m.f)` becomes a presence test and the collection macros
//! (`all`, `exists`, `exists_one`, `map`, `filter`) become comprehensions.
//! Lookup is keyed by `name:arg_count:is_receiver`.

use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, Span, Spanned, SpannedExpr, UnaryOp};

/// Accumulator variable bound inside every expanded comprehension.
pub const ACCU_VAR: &str = "__result__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroStyle {
    /// `name(args)`
    Global,
    /// `receiver.name(args)`
    Receiver,
}

/// Allocates node ids for synthetic expressions.
pub struct MacroContext<'a> {
    next_id: &'a mut i64,
}

impl<'a> MacroContext<'a> {
    pub fn new(next_id: &'a mut i64) -> Self {
        Self { next_id }
    }

    pub fn next_id(&mut self) -> i64 {
        let id = *self.next_id;
        *self.next_id += 1;
        id
    }

    fn node(&mut self, node: Expr, span: &Span) -> SpannedExpr {
        Spanned::new(self.next_id(), node, span.clone())
    }

    fn accu(&mut self, span: &Span) -> SpannedExpr {
        self.node(Expr::Ident(ACCU_VAR.to_string()), span)
    }
}

/// Expansion function: `(ctx, call span, receiver, args) -> expanded expression or message`.
pub type MacroExpander =
    fn(&mut MacroContext, Span, Option<SpannedExpr>, Vec<SpannedExpr>) -> Result<SpannedExpr, String>;

#[derive(Clone)]
pub struct Macro {
    pub name: &'static str,
    pub style: MacroStyle,
    pub arg_count: usize,
    pub expander: MacroExpander,
}

impl Macro {
    pub const fn new(
        name: &'static str,
        style: MacroStyle,
        arg_count: usize,
        expander: MacroExpander,
    ) -> Self {
        Self {
            name,
            style,
            arg_count,
            expander,
        }
    }

    pub fn key(&self) -> String {
        make_key(self.name, self.arg_count, self.style == MacroStyle::Receiver)
    }
}

impl std::fmt::Debug for Macro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Macro")
            .field("name", &self.name)
            .field("style", &self.style)
            .field("arg_count", &self.arg_count)
            .finish_non_exhaustive()
    }
}

fn make_key(name: &str, arg_count: usize, is_receiver: bool) -> String {
    format!("{}:{}:{}", name, arg_count, is_receiver)
}

#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    macros: HashMap<String, Macro>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding [`STANDARD_MACROS`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for macro_def in STANDARD_MACROS {
            registry.register(macro_def.clone());
        }
        registry
    }

    pub fn register(&mut self, macro_def: Macro) {
        self.macros.insert(macro_def.key(), macro_def);
    }

    pub fn lookup(&self, name: &str, arg_count: usize, is_receiver: bool) -> Option<&Macro> {
        self.macros.get(&make_key(name, arg_count, is_receiver))
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

pub static STANDARD_MACROS: &[Macro] = &[
    Macro::new("has", MacroStyle::Global, 1, expand_has),
    Macro::new("all", MacroStyle::Receiver, 2, expand_all),
    Macro::new("exists", MacroStyle::Receiver, 2, expand_exists),
    Macro::new("exists_one", MacroStyle::Receiver, 2, expand_exists_one),
    Macro::new("map", MacroStyle::Receiver, 2, expand_map),
    Macro::new("map", MacroStyle::Receiver, 3, expand_filter_map),
    Macro::new("filter", MacroStyle::Receiver, 2, expand_filter),
];

/// The pieces of a comprehension that differ between macros.
struct Fold {
    accu_init: SpannedExpr,
    loop_condition: SpannedExpr,
    loop_step: SpannedExpr,
    result: SpannedExpr,
}

/// Split receiver-style `(x, body...)` arguments into the iteration variable and the rest.
fn iteration_parts(
    name: &str,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> Result<(SpannedExpr, String, Vec<SpannedExpr>), String> {
    let receiver = receiver.ok_or_else(|| format!("{}() requires a receiver", name))?;
    let mut args = args.into_iter();
    let iter_var = match args.next().map(|arg| arg.node) {
        Some(Expr::Ident(var)) => var,
        _ => return Err(format!("{}() argument must be a simple name", name)),
    };
    if iter_var == ACCU_VAR {
        return Err(format!("{}() iteration variable overwrites accumulator", name));
    }
    Ok((receiver, iter_var, args.collect()))
}

fn comprehension(
    ctx: &mut MacroContext,
    span: Span,
    iter_var: String,
    iter_range: SpannedExpr,
    fold: Fold,
) -> SpannedExpr {
    ctx.node(
        Expr::Comprehension {
            iter_var,
            iter_range: Box::new(iter_range),
            accu_var: ACCU_VAR.to_string(),
            accu_init: Box::new(fold.accu_init),
            loop_condition: Box::new(fold.loop_condition),
            loop_step: Box::new(fold.loop_step),
            result: Box::new(fold.result),
        },
        &span,
    )
}

fn binary(ctx: &mut MacroContext, op: BinaryOp, left: SpannedExpr, right: SpannedExpr, span: &Span) -> SpannedExpr {
    ctx.node(
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn expand_has(
    ctx: &mut MacroContext,
    span: Span,
    _receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> Result<SpannedExpr, String> {
    match args.into_iter().next().map(|arg| arg.node) {
        Some(Expr::Member { expr, field }) => Ok(ctx.node(Expr::HasField { expr, field }, &span)),
        _ => Err("has() argument must be a field selection".to_string()),
    }
}

/// `r.all(x, p)`: stops at the first false predicate.
fn expand_all(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> Result<SpannedExpr, String> {
    let (range, iter_var, mut rest) = iteration_parts("all", receiver, args)?;
    let predicate = rest.remove(0);
    let accu_init = ctx.node(Expr::Bool(true), &span);
    let loop_condition = ctx.accu(&span);
    let accu = ctx.accu(&span);
    let loop_step = binary(ctx, BinaryOp::And, predicate, accu, &span);
    let result = ctx.accu(&span);
    let fold = Fold {
        accu_init,
        loop_condition,
        loop_step,
        result,
    };
    Ok(comprehension(ctx, span, iter_var, range, fold))
}

/// `r.exists(x, p)`: stops at the first true predicate.
fn expand_exists(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> Result<SpannedExpr, String> {
    let (range, iter_var, mut rest) = iteration_parts("exists", receiver, args)?;
    let predicate = rest.remove(0);
    let accu_init = ctx.node(Expr::Bool(false), &span);
    let accu = ctx.accu(&span);
    let loop_condition = ctx.node(
        Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(accu),
        },
        &span,
    );
    let accu = ctx.accu(&span);
    let loop_step = binary(ctx, BinaryOp::Or, predicate, accu, &span);
    let result = ctx.accu(&span);
    let fold = Fold {
        accu_init,
        loop_condition,
        loop_step,
        result,
    };
    Ok(comprehension(ctx, span, iter_var, range, fold))
}

/// `r.exists_one(x, p)`: counts matches, true when exactly one.
fn expand_exists_one(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> Result<SpannedExpr, String> {
    let (range, iter_var, mut rest) = iteration_parts("exists_one", receiver, args)?;
    let predicate = rest.remove(0);
    let accu_init = ctx.node(Expr::Int(0), &span);
    let loop_condition = ctx.node(Expr::Bool(true), &span);

    let accu = ctx.accu(&span);
    let one = ctx.node(Expr::Int(1), &span);
    let incremented = binary(ctx, BinaryOp::Add, accu, one, &span);
    let unchanged = ctx.accu(&span);
    let loop_step = ctx.node(
        Expr::Ternary {
            cond: Box::new(predicate),
            then_expr: Box::new(incremented),
            else_expr: Box::new(unchanged),
        },
        &span,
    );

    let accu = ctx.accu(&span);
    let one = ctx.node(Expr::Int(1), &span);
    let result = binary(ctx, BinaryOp::Eq, accu, one, &span);
    let fold = Fold {
        accu_init,
        loop_condition,
        loop_step,
        result,
    };
    Ok(comprehension(ctx, span, iter_var, range, fold))
}

/// Shared body of `map` and `filter`: append `element` when `filter` holds.
fn collect_into_list(
    ctx: &mut MacroContext,
    span: Span,
    range: SpannedExpr,
    iter_var: String,
    filter: Option<SpannedExpr>,
    element: SpannedExpr,
) -> SpannedExpr {
    let accu_init = ctx.node(Expr::List(Vec::new()), &span);
    let loop_condition = ctx.node(Expr::Bool(true), &span);

    let accu = ctx.accu(&span);
    let single = ctx.node(Expr::List(vec![element]), &span);
    let appended = binary(ctx, BinaryOp::Add, accu, single, &span);
    let loop_step = match filter {
        Some(cond) => {
            let unchanged = ctx.accu(&span);
            ctx.node(
                Expr::Ternary {
                    cond: Box::new(cond),
                    then_expr: Box::new(appended),
                    else_expr: Box::new(unchanged),
                },
                &span,
            )
        }
        None => appended,
    };
    let result = ctx.accu(&span);
    let fold = Fold {
        accu_init,
        loop_condition,
        loop_step,
        result,
    };
    comprehension(ctx, span, iter_var, range, fold)
}

/// `r.map(x, t)`
fn expand_map(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> Result<SpannedExpr, String> {
    let (range, iter_var, mut rest) = iteration_parts("map", receiver, args)?;
    let transform = rest.remove(0);
    Ok(collect_into_list(ctx, span, range, iter_var, None, transform))
}

/// `r.map(x, p, t)`
fn expand_filter_map(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> Result<SpannedExpr, String> {
    let (range, iter_var, mut rest) = iteration_parts("map", receiver, args)?;
    let transform = rest.remove(1);
    let predicate = rest.remove(0);
    Ok(collect_into_list(ctx, span, range, iter_var, Some(predicate), transform))
}

/// `r.filter(x, p)`
fn expand_filter(
    ctx: &mut MacroContext,
    span: Span,
    receiver: Option<SpannedExpr>,
    args: Vec<SpannedExpr>,
) -> Result<SpannedExpr, String> {
    let (range, iter_var, mut rest) = iteration_parts("filter", receiver, args)?;
    let predicate = rest.remove(0);
    let element = ctx.node(Expr::Ident(iter_var.clone()), &span);
    Ok(collect_into_list(ctx, span, range, iter_var, Some(predicate), element))
}
