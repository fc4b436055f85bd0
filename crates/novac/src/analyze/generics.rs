//! Compiler-generic arena and type unification (§4.4 "Type checking",
//! "Generic instantiation"; §9 design note "Unification variables... live
//! in an arena owned by the analyzer; each carries a unique id and is
//! resolved once").

use ahash::AHashMap;

use crate::{
    ast::data_type::Primitive,
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    location::Location,
};

use super::types::CheckedType;

/// Unique id for one compiler-generic (unification variable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CompilerGenericId(u32);

/// Owns every compiler-generic introduced during one analysis pass and
/// their bindings. "Binding is single-assignment per analysis frame" (§4.4):
/// [`Self::bind`] refuses to rebind an id that already resolved to a
/// different type.
#[derive(Debug, Default)]
pub struct CompilerGenericArena {
    bindings: AHashMap<CompilerGenericId, CheckedType>,
    next: u32,
}

impl CompilerGenericArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Introduces a fresh, unbound compiler-generic.
    pub fn fresh(&mut self) -> CompilerGenericId {
        let id = CompilerGenericId(self.next);
        self.next += 1;
        id
    }

    #[must_use]
    pub fn resolve(&self, id: CompilerGenericId) -> Option<&CheckedType> {
        self.bindings.get(&id)
    }

    /// Binds `id` to `ty`. Returns `false` (and leaves the prior binding in
    /// place) if `id` was already bound to a structurally different type —
    /// the caller raises `DiagnosticKind::TypeMismatch`.
    fn bind(&mut self, id: CompilerGenericId, ty: CheckedType) -> bool {
        match self.bindings.get(&id) {
            Some(existing) => *existing == ty,
            None => {
                self.bindings.insert(id, ty);
                true
            }
        }
    }

    /// Replaces every bound `CompilerGeneric` leaf in `ty` with its
    /// resolution, leaving unbound ones untouched. Called before MIR
    /// lowering, which requires every compiler-generic to be resolved
    /// (§3 invariant).
    #[must_use]
    pub fn finalize(&self, ty: &CheckedType) -> CheckedType {
        match ty {
            CheckedType::CompilerGeneric(id) => {
                self.resolve(*id).map(|resolved| self.finalize(resolved)).unwrap_or_else(|| ty.clone())
            }
            CheckedType::Array { kind, elem } => {
                CheckedType::Array { kind: *kind, elem: Box::new(self.finalize(elem)) }
            }
            CheckedType::Tuple(elems) => CheckedType::Tuple(elems.iter().map(|t| self.finalize(t)).collect()),
            CheckedType::List(elem) => CheckedType::List(Box::new(self.finalize(elem))),
            CheckedType::Lambda { params, ret } => CheckedType::Lambda {
                params: params.iter().map(|t| self.finalize(t)).collect(),
                ret: Box::new(self.finalize(ret)),
            },
            CheckedType::Ptr(t) => CheckedType::Ptr(Box::new(self.finalize(t))),
            CheckedType::Ref(t) => CheckedType::Ref(Box::new(self.finalize(t))),
            CheckedType::Trace(t) => CheckedType::Trace(Box::new(self.finalize(t))),
            CheckedType::Mut(t) => CheckedType::Mut(Box::new(self.finalize(t))),
            CheckedType::Optional(t) => CheckedType::Optional(Box::new(self.finalize(t))),
            CheckedType::Result { ok, errs } => {
                CheckedType::Result { ok: Box::new(self.finalize(ok)), errs: errs.iter().map(|t| self.finalize(t)).collect() }
            }
            CheckedType::Custom { scope, name, generics, recursive } => CheckedType::Custom {
                scope: *scope,
                name: *name,
                generics: generics.iter().map(|t| self.finalize(t)).collect(),
                recursive: *recursive,
            },
            CheckedType::ConditionalChoice { choices, conds } => CheckedType::ConditionalChoice {
                choices: choices.iter().map(|t| self.finalize(t)).collect(),
                conds: conds.clone(),
            },
            CheckedType::Primitive(_) | CheckedType::Generic(_) | CheckedType::Unknown => ty.clone(),
        }
    }
}

/// Attempts to unify `a` and `b`, binding any compiler-generics encountered
/// along the way in `arena`. Implements §3/§4.4's unification rules:
/// primitives unify only with themselves, customs unify if name and generic
/// args unify component-wise, compiler generics bind on first sight and
/// must match thereafter, and `Unknown` unifies with anything (it already
/// carries a diagnosed failure, so it must not cascade into new ones).
#[must_use]
pub fn unify(a: &CheckedType, b: &CheckedType, arena: &mut CompilerGenericArena) -> bool {
    match (a, b) {
        (CheckedType::Unknown, _) | (_, CheckedType::Unknown) => true,
        (CheckedType::CompilerGeneric(id), other) | (other, CheckedType::CompilerGeneric(id)) => {
            if let Some(bound) = arena.resolve(*id).cloned() {
                unify(&bound, other, arena)
            } else {
                arena.bind(*id, other.clone())
            }
        }
        (CheckedType::Primitive(p1), CheckedType::Primitive(p2)) => p1 == p2,
        (CheckedType::Generic(n1), CheckedType::Generic(n2)) => n1 == n2,
        (CheckedType::Array { kind: k1, elem: e1 }, CheckedType::Array { kind: k2, elem: e2 }) => {
            k1 == k2 && unify(e1, e2, arena)
        }
        (CheckedType::Tuple(t1), CheckedType::Tuple(t2)) => {
            t1.len() == t2.len() && t1.iter().zip(t2).all(|(x, y)| unify(x, y, arena))
        }
        (CheckedType::List(e1), CheckedType::List(e2))
        | (CheckedType::Ptr(e1), CheckedType::Ptr(e2))
        | (CheckedType::Ref(e1), CheckedType::Ref(e2))
        | (CheckedType::Trace(e1), CheckedType::Trace(e2))
        | (CheckedType::Mut(e1), CheckedType::Mut(e2))
        | (CheckedType::Optional(e1), CheckedType::Optional(e2)) => unify(e1, e2, arena),
        (CheckedType::Lambda { params: p1, ret: r1 }, CheckedType::Lambda { params: p2, ret: r2 }) => {
            p1.len() == p2.len() && p1.iter().zip(p2).all(|(x, y)| unify(x, y, arena)) && unify(r1, r2, arena)
        }
        (CheckedType::Result { ok: o1, errs: e1 }, CheckedType::Result { ok: o2, errs: e2 }) => {
            unify(o1, o2, arena) && e1.len() == e2.len() && e1.iter().zip(e2).all(|(x, y)| unify(x, y, arena))
        }
        (
            CheckedType::Custom { scope: s1, name: n1, generics: g1, .. },
            CheckedType::Custom { scope: s2, name: n2, generics: g2, .. },
        ) => s1 == s2 && n1 == n2 && g1.len() == g2.len() && g1.iter().zip(g2).all(|(x, y)| unify(x, y, arena)),
        (CheckedType::ConditionalChoice { choices, .. }, other) | (other, CheckedType::ConditionalChoice { choices, .. }) => {
            choices.iter().any(|choice| unify(choice, other, arena))
        }
        _ => false,
    }
}

/// Raises `DiagnosticKind::TypeMismatch` when `unify` fails, returning the
/// narrower of the two types (`expected` on failure, so error recovery
/// keeps checking against the declared shape rather than re-tainting it).
pub fn expect_unify(
    expected: &CheckedType,
    actual: &CheckedType,
    location: Location,
    arena: &mut CompilerGenericArena,
    diags: &mut Diagnostics,
) -> CheckedType {
    if expected.is_unknown() || actual.is_unknown() || unify(expected, actual, arena) {
        return expected.clone();
    }
    diags.push(Diagnostic::new(
        DiagnosticKind::TypeMismatch,
        location,
        format!("expected `{expected:?}`, found `{actual:?}`"),
    ));
    expected.clone()
}

#[must_use]
pub fn primitive(p: Primitive) -> CheckedType {
    CheckedType::Primitive(p)
}

#[cfg(test)]
mod tests {
    use super::{CompilerGenericArena, unify};
    use crate::{analyze::types::CheckedType, ast::data_type::Primitive};

    #[test]
    fn compiler_generic_binds_once_then_matches() {
        let mut arena = CompilerGenericArena::new();
        let id = arena.fresh();
        let var = CheckedType::CompilerGeneric(id);
        let i32_ty = CheckedType::Primitive(Primitive::I32);
        assert!(unify(&var, &i32_ty, &mut arena));
        assert!(unify(&var, &i32_ty, &mut arena));
        assert!(!unify(&var, &CheckedType::Primitive(Primitive::Str), &mut arena));
    }

    #[test]
    fn primitives_unify_only_with_themselves() {
        let mut arena = CompilerGenericArena::new();
        assert!(unify(
            &CheckedType::Primitive(Primitive::I32),
            &CheckedType::Primitive(Primitive::I32),
            &mut arena
        ));
        assert!(!unify(
            &CheckedType::Primitive(Primitive::I32),
            &CheckedType::Primitive(Primitive::I64),
            &mut arena
        ));
    }
}
