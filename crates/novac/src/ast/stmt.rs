//! Statement AST (§4.1 lists the keywords the preparser recognizes for
//! function bodies; §4.3 parses each into one of these variants).

use super::{Identifier, Spanned, expr::Expr, pattern::Pattern};
use crate::intern::StringId;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ElifClause {
    pub cond: Spanned<Expr>,
    pub capture: Option<Identifier>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MatchArmStmt {
    pub pattern: Spanned<Pattern>,
    pub guard: Option<Spanned<Expr>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Stmt {
    Expr(Spanned<Expr>),
    /// `variable`/`val` declaration, with or without an explicit type/initializer.
    Variable {
        mutable: bool,
        name: Identifier,
        ty: Option<Spanned<super::data_type::DataType>>,
        init: Option<Spanned<Expr>>,
    },
    Assign { target: Spanned<Expr>, value: Spanned<Expr> },
    If {
        cond: Spanned<Expr>,
        capture: Option<Identifier>,
        then_block: Vec<Spanned<Stmt>>,
        elifs: Vec<ElifClause>,
        else_block: Option<Vec<Spanned<Stmt>>>,
    },
    Match { scrutinee: Spanned<Expr>, arms: Vec<MatchArmStmt> },
    For { binding: Spanned<Pattern>, iter: Spanned<Expr>, body: Vec<Spanned<Stmt>>, label: Option<StringId> },
    While { cond: Spanned<Expr>, body: Vec<Spanned<Stmt>>, label: Option<StringId> },
    Loop { body: Vec<Spanned<Stmt>>, label: Option<StringId> },
    DoWhile { body: Vec<Spanned<Stmt>>, cond: Spanned<Expr> },
    Defer(Vec<Spanned<Stmt>>),
    Drop(Spanned<Expr>),
    TryCatch {
        body: Vec<Spanned<Stmt>>,
        catch_name: Option<Identifier>,
        catch_body: Vec<Spanned<Stmt>>,
    },
    Unsafe(Vec<Spanned<Stmt>>),
    Asm(String),
    Block(Vec<Spanned<Stmt>>),
    Raise(Spanned<Expr>),
    Return(Option<Spanned<Expr>>),
    Next(Option<StringId>),
    Break(Option<StringId>),
    /// A bare `;` in statement position: parses successfully to no expression.
    Empty,
    /// Error-recovery sentinel produced after a diagnostic was already emitted.
    Malformed,
}
