//! The coarse skeleton produced by the preparser (§3 "Preparsed decl", §4.1).
//!
//! Every structural sub-part is kept as a raw [`TokenSpan`] — a cloned slice
//! of the original stream — rather than parsed. The parser later instantiates
//! a parse block over each span; nothing here builds an AST node.

use crate::{ast::Visibility, intern::StringId, location::Location, token::Token};

/// An unparsed, owned run of tokens bounding one structural sub-part.
pub type TokenSpan = Vec<Token>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DeclKind {
    Constant,
    Error,
    Fun,
    Module,
    Object,
    Type,
    Use,
    Include,
    MacroExpand,
}

/// The kind of object-style body a preparsed `Object` decl holds, recorded so
/// the parser calls the matching sub-parser over each member span (§4.2 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ObjectBodyKind {
    Record,
    RecordObject,
    Enum,
    EnumObject,
    Class,
    Trait,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PreparsedDecl {
    pub kind: DeclKind,
    pub name: Option<StringId>,
    pub location: Location,
    pub visibility: Visibility,
    /// Generic params, function params, the type/const right-hand side, or
    /// the use/include path tokens — whatever the header of this shape needs.
    pub header: TokenSpan,
    pub body: PreparsedBody,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum PreparsedBody {
    /// const/error/use/include/type: nothing beyond the header to parse.
    None,
    Fun(Vec<FunBodyItem>),
    Object { kind: ObjectBodyKind, members: Vec<TokenSpan> },
    Module(Vec<PreparsedDecl>),
    MacroExpand { macro_name: StringId, args: Vec<TokenSpan> },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ElifSkeleton {
    pub cond: TokenSpan,
    pub capture: TokenSpan,
    pub body: Vec<FunBodyItem>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MatchArmSkeleton {
    pub pattern: TokenSpan,
    pub guard: TokenSpan,
    pub body: Vec<FunBodyItem>,
}

/// A fun-body item: one statement-shaped construct recognized by keyword
/// (§4.1), still holding unparsed token spans for every sub-part.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum FunBodyItem {
    Expr(TokenSpan),
    Variable { mutable: bool, name: TokenSpan, ty: TokenSpan, init: TokenSpan },
    Assign { target: TokenSpan, value: TokenSpan },
    If {
        cond: TokenSpan,
        capture: TokenSpan,
        then_block: Vec<FunBodyItem>,
        elifs: Vec<ElifSkeleton>,
        else_block: Option<Vec<FunBodyItem>>,
    },
    Match { scrutinee: TokenSpan, arms: Vec<MatchArmSkeleton> },
    For { binding: TokenSpan, iter: TokenSpan, body: Vec<FunBodyItem>, label: TokenSpan },
    While { cond: TokenSpan, body: Vec<FunBodyItem>, label: TokenSpan },
    Loop { body: Vec<FunBodyItem>, label: TokenSpan },
    DoWhile { body: Vec<FunBodyItem>, cond: TokenSpan },
    Defer(Vec<FunBodyItem>),
    Drop(TokenSpan),
    TryCatch { body: Vec<FunBodyItem>, catch_name: TokenSpan, catch_body: Vec<FunBodyItem> },
    Unsafe(Vec<FunBodyItem>),
    Asm(TokenSpan),
    Block(Vec<FunBodyItem>),
    Raise(TokenSpan),
    Return(TokenSpan),
    Next(TokenSpan),
    Break(TokenSpan),
    Await(TokenSpan),
    /// A bare `;`: preparses successfully to no expression (§8).
    Empty,
    MacroExpand { macro_name: StringId, args: Vec<TokenSpan>, location: Location },
    /// Error-recovery sentinel.
    Malformed,
}
