//! The token model: an immutable, tagged token stream produced by the external
//! scanner and consumed by the preparser, macro engine, and parser.
//!
//! Tokens never borrow from the source buffer. Identifiers and literal text
//! are interned (`StringId`); macro-expansion placeholders hold a reference
//! counted token slice so an expansion site's tokens can be shared between
//! the macro table entry and every use site without re-cloning the buffer.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::{intern::StringId, location::Location};

/// Numeric base an integer literal was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IntBase {
    Binary,
    Octal,
    Decimal,
    Hex,
}

/// The fixed-width type a suffixed numeric literal names (`10u8`, `3.14f32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display, strum::EnumString)]
pub enum NumericSuffix {
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
}

/// The AST kind an expand placeholder defers its tokens into.
///
/// Set by the macro engine when substituting an `Expr`/`Patt`/`Path`/`Dt`
/// macro parameter; the parser dispatches on this tag when it reaches the
/// placeholder rather than attempting to parse it eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExpandKind {
    Expr,
    Patt,
    Path,
    Dt,
}

/// Literal payloads. Integers are kept as `BigInt` until the parser narrows
/// them to a concrete width, so overflow can be diagnosed precisely rather
/// than silently wrapping at scan time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Literal {
    Byte(u8),
    Bytes(Vec<u8>),
    Char(char),
    CStr(Vec<u8>),
    Str(StringId),
    Int { value: BigInt, base: IntBase, suffix: Option<NumericSuffix> },
    Float { value: f64, suffix: Option<NumericSuffix> },
}

/// Identifier sub-kinds the scanner distinguishes up front so the preparser
/// doesn't need to re-inspect identifier text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IdentKind {
    /// A plain identifier: `foo`, `Foo`.
    Normal,
    /// A string-quoted identifier allowing arbitrary characters: `` `a weird name` ``.
    StringQuoted,
    /// A macro parameter reference: `$name`.
    Dollar,
    /// A macro invocation head: `name!`.
    MacroName,
    /// An identifier spelled from operator characters usable as an overload name: `+`, `==`.
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Module,
    Use,
    Include,
    Fun,
    Type,
    Object,
    Class,
    Trait,
    Enum,
    Record,
    Error,
    Macro,
    If,
    Elif,
    Else,
    Match,
    For,
    While,
    Loop,
    Do,
    Defer,
    Drop,
    Try,
    Catch,
    Unsafe,
    Asm,
    Block,
    Raise,
    Return,
    Next,
    Break,
    Await,
    Async,
    Variable,
    Val,
    Mut,
    Ref,
    Trace,
    Self_,
    Begin,
    End,
    Pub,
    As,
}

/// Punctuation and operator glyphs. Grouped rather than spelled out per
/// glyph where the parser only ever cares about the glyph, not a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
pub enum Punct {
    #[strum(serialize = "(")]
    LParen,
    #[strum(serialize = ")")]
    RParen,
    #[strum(serialize = "{")]
    LBrace,
    #[strum(serialize = "}")]
    RBrace,
    #[strum(serialize = "[")]
    LBracket,
    #[strum(serialize = "]")]
    RBracket,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ";")]
    Semi,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = "::")]
    ColonColon,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = "..")]
    DotDot,
    #[strum(serialize = "@")]
    At,
    #[strum(serialize = "->")]
    Arrow,
    #[strum(serialize = "<-")]
    LeftArrow,
    #[strum(serialize = "=>")]
    FatArrow,
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = ":=")]
    ColonEq,
    #[strum(serialize = "?")]
    Question,
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "&")]
    Amp,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "%")]
    Percent,
    #[strum(serialize = "==")]
    EqEq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "&&")]
    AndAnd,
    #[strum(serialize = "||")]
    OrOr,
    #[strum(serialize = "|")]
    Pipe,
    #[strum(serialize = "^")]
    Caret,
    #[strum(serialize = "$")]
    Dollar,
}

/// The tagged variant at the heart of the token model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident { kind: IdentKind, name: StringId },
    Literal(Literal),
    Punct(Punct),
    /// A deferred parse: the macro engine's substitution for an `Expr`,
    /// `Patt`, `Path`, or `Dt` macro argument. Holds the borrowed token
    /// sequence the parser should recurse into once it reaches this slot.
    Expand { kind: ExpandKind, tokens: Rc<[Token]> },
    Eof,
}

/// An immutable, located token. Tokens are produced once by the scanner and
/// never mutated; the preparser takes ownership of the stream, and every
/// later phase only borrows slices of it (except for macro bodies, which are
/// cloned token-by-token during substitution).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, location: Location) -> Self {
        Self { kind, location }
    }

    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// The macro-parameter name this token refers to, if it is a `$name` reference.
    #[must_use]
    pub fn dollar_name(&self) -> Option<StringId> {
        match &self.kind {
            TokenKind::Ident { kind: IdentKind::Dollar, name } => Some(*name),
            _ => None,
        }
    }
}
