//! Expression syntax tree.

/// Byte offsets into the source string.
pub type Span = std::ops::Range<usize>;

/// A node with its source location and a unique id (assigned from 1 upward).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub id: i64,
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(id: i64, node: T, span: Span) -> Self {
        Self { id, node, span }
    }
}

pub type SpannedExpr = Spanned<Expr>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),

    Ident(String),

    List(Vec<SpannedExpr>),
    Map(Vec<(SpannedExpr, SpannedExpr)>),

    Unary {
        op: UnaryOp,
        expr: Box<SpannedExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<SpannedExpr>,
        right: Box<SpannedExpr>,
    },
    Ternary {
        cond: Box<SpannedExpr>,
        then_expr: Box<SpannedExpr>,
        else_expr: Box<SpannedExpr>,
    },

    Member {
        expr: Box<SpannedExpr>,
        field: String,
    },
    Index {
        expr: Box<SpannedExpr>,
        index: Box<SpannedExpr>,
    },
    /// `f(args)` when `expr` is an identifier, `r.f(args)` when it is a member selection.
    Call {
        expr: Box<SpannedExpr>,
        args: Vec<SpannedExpr>,
    },

    /// Fold produced by macro expansion.
    ///
    /// ```text
    /// let accu_var = accu_init
    /// for iter_var in iter_range {
    ///     if loop_condition is false { break }
    ///     accu_var = loop_step
    /// }
    /// return result
    /// ```
    Comprehension {
        iter_var: String,
        iter_range: Box<SpannedExpr>,
        accu_var: String,
        accu_init: Box<SpannedExpr>,
        loop_condition: Box<SpannedExpr>,
        loop_step: Box<SpannedExpr>,
        result: Box<SpannedExpr>,
    },

    /// Presence test produced by `has(m.f)`.
    HasField {
        expr: Box<SpannedExpr>,
        field: String,
    },
}

impl Expr {
    /// Direct sub-expressions in source order.
    pub fn children(&self) -> Vec<&SpannedExpr> {
        match self {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::Bytes(_)
            | Expr::Ident(_) => Vec::new(),
            Expr::List(items) => items.iter().collect(),
            Expr::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            Expr::Unary { expr, .. } | Expr::Member { expr, .. } | Expr::HasField { expr, .. } => {
                vec![&**expr]
            }
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => vec![&**cond, &**then_expr, &**else_expr],
            Expr::Index { expr, index } => vec![&**expr, &**index],
            Expr::Call { expr, args } => std::iter::once(&**expr).chain(args).collect(),
            Expr::Comprehension {
                iter_range,
                accu_init,
                loop_condition,
                loop_step,
                result,
                ..
            } => vec![
                &**iter_range,
                &**accu_init,
                &**loop_condition,
                &**loop_step,
                &**result,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    In,

    And,
    Or,
}

impl BinaryOp {
    /// Name of the operator function used for checking and diagnostics.
    pub fn function_name(self) -> &'static str {
        match self {
            BinaryOp::Add => "_+_",
            BinaryOp::Sub => "_-_",
            BinaryOp::Mul => "_*_",
            BinaryOp::Div => "_/_",
            BinaryOp::Mod => "_%_",
            BinaryOp::Eq => "_==_",
            BinaryOp::Ne => "_!=_",
            BinaryOp::Lt => "_<_",
            BinaryOp::Le => "_<=_",
            BinaryOp::Gt => "_>_",
            BinaryOp::Ge => "_>=_",
            BinaryOp::In => "@in",
            BinaryOp::And => "_&&_",
            BinaryOp::Or => "_||_",
        }
    }
}

impl UnaryOp {
    pub fn function_name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-_",
            UnaryOp::Not => "!_",
        }
    }
}
