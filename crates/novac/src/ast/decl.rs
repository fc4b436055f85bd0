//! Declaration AST (§4.3/§4.4, design note "polymorphism over declaration
//! kinds"). Every declaration shares a small header instead of using
//! inheritance; kind-specific payloads live in their own struct.

use super::{Path, Spanned, Visibility, data_type::DataType, expr::Expr, stmt::Stmt};
use crate::intern::StringId;

/// `{location, visibility, name, global_name}`, shared by every declaration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeclHeader {
    pub location: crate::location::Location,
    pub visibility: Visibility,
    pub name: StringId,
    /// Flattened, mangled identifier unique within the package (§GLOSSARY).
    /// Filled in by the analyzer; `None` until then.
    pub global_name: Option<StringId>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Param {
    pub name: super::Identifier,
    pub ty: Spanned<DataType>,
    pub default: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum FunBody {
    /// `= expr;` shorthand body.
    Expr(Spanned<Expr>),
    Block(Vec<Spanned<Stmt>>),
    /// No body: a trait method signature or an external prototype.
    None,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunDecl {
    pub header: DeclHeader,
    pub generics: Vec<StringId>,
    pub params: Vec<Param>,
    pub return_ty: Spanned<DataType>,
    pub body: FunBody,
    pub is_async: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FieldDecl {
    pub name: StringId,
    pub ty: Spanned<DataType>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VariantDecl {
    pub name: StringId,
    pub value: Option<Spanned<DataType>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RecordBody {
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RecordObjectBody {
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunDecl>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EnumBody {
    pub variants: Vec<VariantDecl>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EnumObjectBody {
    pub variants: Vec<VariantDecl>,
    pub methods: Vec<FunDecl>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClassBody {
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunDecl>,
    pub implements: Vec<Path>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TraitBody {
    pub methods: Vec<FunDecl>,
}

/// The kind-specific body of an "object-style" declaration: record, record
/// object, enum, enum object, class, or trait. These all share
/// `ObjectDecl`'s header and generics; only the body shape differs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ObjectKind {
    Record(RecordBody),
    RecordObject(RecordObjectBody),
    Enum(EnumBody),
    EnumObject(EnumObjectBody),
    Class(ClassBody),
    Trait(TraitBody),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ObjectDecl {
    pub header: DeclHeader,
    pub generics: Vec<StringId>,
    pub kind: ObjectKind,
}

/// `type Name[generics] = data_type;` — a generic type alias (§8 E4).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TypeDecl {
    pub header: DeclHeader,
    pub generics: Vec<StringId>,
    pub target: Spanned<DataType>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConstDecl {
    pub header: DeclHeader,
    pub ty: Option<Spanned<DataType>>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModuleDecl {
    pub header: DeclHeader,
    pub body: Vec<Decl>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UseDecl {
    pub header: DeclHeader,
    pub path: Path,
    pub alias: Option<StringId>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IncludeDecl {
    pub header: DeclHeader,
    pub path: Path,
}

/// A user-defined error type: `error AssertFailed;` or `error Foo(Str);`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorDecl {
    pub header: DeclHeader,
    pub payload: Option<Spanned<DataType>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Decl {
    Fun(FunDecl),
    Module(ModuleDecl),
    Object(ObjectDecl),
    Type(TypeDecl),
    Const(ConstDecl),
    Use(UseDecl),
    Include(IncludeDecl),
    ErrorDef(ErrorDecl),
    /// Error-recovery sentinel: a top-level shape failed to recognize or parse.
    Malformed,
}

impl Decl {
    #[must_use]
    pub const fn header(&self) -> Option<&DeclHeader> {
        match self {
            Self::Fun(d) => Some(&d.header),
            Self::Module(d) => Some(&d.header),
            Self::Object(d) => Some(&d.header),
            Self::Type(d) => Some(&d.header),
            Self::Const(d) => Some(&d.header),
            Self::Use(d) => Some(&d.header),
            Self::Include(d) => Some(&d.header),
            Self::ErrorDef(d) => Some(&d.header),
            Self::Malformed => None,
        }
    }
}
