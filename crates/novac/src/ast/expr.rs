//! Expression AST (§4.3). Access and call nodes carry the typed kind tags
//! the data model requires so the analyzer never needs to re-derive "what
//! shape of expression is this" from surrounding syntax.

use super::{Path, Spanned, data_type::DataType, pattern::Pattern};
use crate::{intern::StringId, token::Literal};

/// Arity-polymorphic operator set used by the Pratt engine's precedence
/// table (§4.3) and by operator-overload resolution (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Ref,
    Deref,
    Trace,
}

/// Which typed kind an access expression is, per the §3 invariant that
/// "every access expression ... carries a typed kind tag".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AccessKind {
    /// `a.b`
    Field,
    /// `A.@Obj` — an object-literal chain segment.
    ObjectChain,
    /// `a[i]`
    Index,
    /// `Global.x`
    Global,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Access {
    pub head: Box<Spanned<Expr>>,
    pub kind: AccessKind,
    /// `Field`/`ObjectChain`/`Global` carry a name; `Index` carries an expression.
    pub member: AccessMember,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum AccessMember {
    Name(StringId),
    Index(Box<Spanned<Expr>>),
}

/// A call argument. `name := expr` is a default-named argument distinguished
/// from positional args by a 1-token lookahead during parsing (§4.3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Arg {
    pub name: Option<StringId>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LambdaParam {
    pub name: StringId,
    pub ty: Option<Spanned<DataType>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<LambdaParam>,
    pub return_ty: Option<Spanned<DataType>>,
    pub body: Box<Spanned<Expr>>,
}

/// Lambda, record, variant, function, and sys/builtin calls are distinct
/// variants under this common node (§4.3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum CallKind {
    /// `f(args)` or, with an explicit instantiation, `f::[T1, T2, ...](args)`
    /// (§4.4 "Generic instantiation").
    Function { callee: Box<Spanned<Expr>>, generics: Vec<Spanned<DataType>>, args: Vec<Arg> },
    Lambda(LambdaExpr),
    /// `T{field := v, ...}`
    Record { ty: Path, fields: Vec<(StringId, Spanned<Expr>)> },
    /// `T:expr` (with a value) or `T:$` (value-less).
    Variant { ty: Path, variant: StringId, value: Option<Box<Spanned<Expr>>> },
    Sys { name: StringId, args: Vec<Spanned<Expr>> },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MatchArm {
    pub pattern: Spanned<Pattern>,
    pub guard: Option<Spanned<Expr>>,
    pub body: Spanned<Expr>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Literal),
    Path(Path),
    Access(Access),
    Call(Box<CallKind>),
    Unary { op: UnaryOp, operand: Box<Spanned<Expr>> },
    Binary { lhs: Box<Spanned<Expr>>, op: BinOp, rhs: Box<Spanned<Expr>> },
    Cmp { lhs: Box<Spanned<Expr>>, op: CmpOp, rhs: Box<Spanned<Expr>> },
    If {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Option<Box<Spanned<Expr>>>,
    },
    Match {
        scrutinee: Box<Spanned<Expr>>,
        arms: Vec<MatchArm>,
    },
    Tuple(Vec<Spanned<Expr>>),
    Array(Vec<Spanned<Expr>>),
    List(Vec<Spanned<Expr>>),
    /// A `begin ... end`/`{ ... }` block used as an expression; its
    /// statements are lowered to MIR straight-line code ending in the value
    /// of its last expression statement.
    Block(Vec<super::Spanned<super::stmt::Stmt>>),
    Await(Box<Spanned<Expr>>),
    Cast { expr: Box<Spanned<Expr>>, ty: Box<Spanned<DataType>> },
    /// Error-recovery sentinel: a sub-parse failed and was already diagnosed.
    Malformed,
}

impl Expr {
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed)
    }
}
