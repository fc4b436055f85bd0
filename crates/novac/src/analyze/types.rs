//! Checked data types (§3 "Checked data type"): the sum type the analyzer
//! resolves every AST data type and expression into. Unlike the parser's
//! `ast::data_type::DataType` (what the user wrote), `CheckedType` is what
//! it resolved to — generic parameters are either substituted away or kept
//! as an explicit [`CheckedType::Generic`], named customs carry the scope
//! they were found in, and a dedicated [`CheckedType::CompilerGeneric`]
//! variant stands in for an unresolved unification variable.
//!
//! "Equality and substitution are defined structurally, ignoring location"
//! (§3): there is no `Location` field anywhere in this type, so `derive`d
//! `PartialEq`/`Hash` already give exactly that.

use ahash::AHashMap;

use crate::{
    ast::data_type::{ArrayKind, Primitive},
    intern::StringId,
    scope::ScopeId,
};

use super::generics::CompilerGenericId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CheckedType {
    Primitive(Primitive),
    Array { kind: ArrayKind, elem: Box<CheckedType> },
    Tuple(Vec<CheckedType>),
    List(Box<CheckedType>),
    Lambda { params: Vec<CheckedType>, ret: Box<CheckedType> },
    Ptr(Box<CheckedType>),
    Ref(Box<CheckedType>),
    Trace(Box<CheckedType>),
    Mut(Box<CheckedType>),
    Optional(Box<CheckedType>),
    Result { ok: Box<CheckedType>, errs: Vec<CheckedType> },
    /// A named custom type: scope it was declared in, its name, its generic
    /// arguments (empty if non-generic or not yet instantiated), and
    /// whether resolving it required passing through itself (a record
    /// field mentioning its own enclosing record, per design note "cyclic
    /// AST references... encoded as scope id + name lookups").
    Custom { scope: ScopeId, name: StringId, generics: Vec<CheckedType>, recursive: bool },
    /// An unsubstituted reference to an enclosing declaration's generic
    /// parameter, by name.
    Generic(StringId),
    /// A unification variable introduced by the analyzer to resolve
    /// overloading (GLOSSARY "Compiler generic").
    CompilerGeneric(CompilerGenericId),
    /// The union of an unresolved operator overload's possible return
    /// types, tagged by the condition (e.g. a feature/cfg name) that picks
    /// each one. `choices[i]` is selected when `conds[i]` holds.
    ConditionalChoice { choices: Vec<CheckedType>, conds: Vec<StringId> },
    /// Produced when a sub-expression failed to check; tainting with this
    /// instead of aborting lets analysis continue over the rest of the
    /// enclosing node (§9 open question: "keep analyzing, but taint the
    /// enclosing node with an unknown type").
    Unknown,
}

impl CheckedType {
    #[must_use]
    pub const fn unit() -> Self {
        Self::Primitive(Primitive::Unit)
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Primitive(
                Primitive::I8
                    | Primitive::I16
                    | Primitive::I32
                    | Primitive::I64
                    | Primitive::U8
                    | Primitive::U16
                    | Primitive::U32
                    | Primitive::U64
                    | Primitive::Isize
                    | Primitive::Usize
                    | Primitive::F32
                    | Primitive::F64
            )
        )
    }

    /// Replaces every `Generic(name)` leaf found in `mapping` with its bound
    /// type. Unmapped generics (a decl's own unrelated type params) are left
    /// as-is. Used by [`crate::signature::SignatureTable::instantiate`].
    #[must_use]
    pub fn substitute(&self, mapping: &AHashMap<StringId, CheckedType>) -> Self {
        match self {
            Self::Generic(name) => mapping.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Primitive(_) | Self::CompilerGeneric(_) | Self::Unknown => self.clone(),
            Self::Array { kind, elem } => Self::Array { kind: *kind, elem: Box::new(elem.substitute(mapping)) },
            Self::Tuple(elems) => Self::Tuple(elems.iter().map(|t| t.substitute(mapping)).collect()),
            Self::List(elem) => Self::List(Box::new(elem.substitute(mapping))),
            Self::Lambda { params, ret } => Self::Lambda {
                params: params.iter().map(|t| t.substitute(mapping)).collect(),
                ret: Box::new(ret.substitute(mapping)),
            },
            Self::Ptr(t) => Self::Ptr(Box::new(t.substitute(mapping))),
            Self::Ref(t) => Self::Ref(Box::new(t.substitute(mapping))),
            Self::Trace(t) => Self::Trace(Box::new(t.substitute(mapping))),
            Self::Mut(t) => Self::Mut(Box::new(t.substitute(mapping))),
            Self::Optional(t) => Self::Optional(Box::new(t.substitute(mapping))),
            Self::Result { ok, errs } => Self::Result {
                ok: Box::new(ok.substitute(mapping)),
                errs: errs.iter().map(|t| t.substitute(mapping)).collect(),
            },
            Self::Custom { scope, name, generics, recursive } => Self::Custom {
                scope: *scope,
                name: *name,
                generics: generics.iter().map(|t| t.substitute(mapping)).collect(),
                recursive: *recursive,
            },
            Self::ConditionalChoice { choices, conds } => Self::ConditionalChoice {
                choices: choices.iter().map(|t| t.substitute(mapping)).collect(),
                conds: conds.clone(),
            },
        }
    }
}
