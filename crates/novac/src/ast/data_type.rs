//! Parsed data-type syntax (§4.3 "Data types"). These are user-written type
//! expressions; the analyzer resolves them into `analyze::types::CheckedType`.

use super::{Path, Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Primitive {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Isize,
    Usize,
    F32,
    F64,
    Bool,
    Char,
    Byte,
    Bytes,
    CStr,
    Str,
    Unit,
    Never,
    Any,
    Object,
    SelfType,
}

/// Distinguishes the four array-like pointer kinds the parser recognizes
/// from their bracket contents: `[N]T`, `[_]T`, `[*]T`, `[?]T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ArrayKind {
    Sized(u64),
    Dynamic,
    MultiPtr,
    Unknown,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    Primitive(Primitive),
    Array { kind: ArrayKind, elem: Box<Spanned<DataType>> },
    Tuple(Vec<Spanned<DataType>>),
    List(Box<Spanned<DataType>>),
    Lambda { params: Vec<Spanned<DataType>>, ret: Box<Spanned<DataType>> },
    Ptr(Box<Spanned<DataType>>),
    Ref(Box<Spanned<DataType>>),
    Trace(Box<Spanned<DataType>>),
    Mut(Box<Spanned<DataType>>),
    Optional(Box<Spanned<DataType>>),
    /// `<err, ...>!T` or `!T` when `errs` is empty.
    Result { errs: Vec<Spanned<DataType>>, ok: Box<Spanned<DataType>> },
    /// A named custom type with optional generic arguments: `Pair[Int32, Str]`.
    Custom { path: Path, generics: Vec<Spanned<DataType>> },
    /// A reference to an enclosing declaration's generic parameter.
    Generic(Path),
    /// Error-recovery sentinel produced when a data type fails to parse.
    Malformed,
}
