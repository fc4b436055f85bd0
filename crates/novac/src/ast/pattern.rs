//! Pattern AST (§4.3). Patterns mirror expressions (literal, tuple, array,
//! list, record-call, variant-call) plus the pattern-only forms: wildcard,
//! range, list-head/tail, as-binding, error, and auto-complete.

use super::{Identifier, Path, Spanned};
use crate::{intern::StringId, token::Literal};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Pattern {
    Wildcard,
    Literal(Literal),
    /// A bare name that binds the scrutinee (or a sub-part of it).
    Binding(Identifier),
    Tuple(Vec<Spanned<Pattern>>),
    Array(Vec<Spanned<Pattern>>),
    List(Vec<Spanned<Pattern>>),
    Record { ty: Path, fields: Vec<(StringId, Spanned<Pattern>)> },
    Variant { ty: Path, variant: StringId, value: Option<Box<Spanned<Pattern>>> },
    /// `a..b`
    Range { lo: Box<Spanned<Pattern>>, hi: Box<Spanned<Pattern>> },
    /// `h -> t`: matches a non-empty list, binding head and tail.
    ListHead { head: Box<Spanned<Pattern>>, tail: Box<Spanned<Pattern>> },
    /// `l <- t`: matches a non-empty list, binding init and last.
    ListTail { init: Box<Spanned<Pattern>>, last: Box<Spanned<Pattern>> },
    /// `pattern as name`
    As { pattern: Box<Spanned<Pattern>>, name: Identifier },
    /// `..` — matches and discards the remainder of a tuple/record/list pattern.
    AutoComplete,
    /// Error-recovery sentinel.
    Malformed,
}
