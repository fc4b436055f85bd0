//! Operator overload registration and resolution (§4.4 "Operator
//! overloading"), grounded on the original `LilyCheckedOperatorRegister`:
//! a flat `Vec` of registered operators, searched by name/arity and
//! resolved against argument types, with a conditional-compiler-choice
//! fallback when more than one candidate survives but they agree on a
//! return type.

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    intern::StringId,
    location::Location,
};

use super::{
    generics::{CompilerGenericArena, unify},
    types::CheckedType,
};

/// One registered operator overload: a binary op has two `params`, a unary
/// op has one.
#[derive(Debug, Clone)]
pub struct OperatorSignature {
    pub name: StringId,
    pub location: Location,
    pub params: Vec<CheckedType>,
    pub ret: CheckedType,
}

/// The package-wide table every user-declared operator overload registers
/// into (§4.4: "Operators declared in user code are registered in a
/// package-wide operator register").
#[derive(Debug, Default)]
pub struct OperatorRegister {
    operators: Vec<OperatorSignature>,
}

impl OperatorRegister {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_operator(&mut self, signature: OperatorSignature) {
        self.operators.push(signature);
    }

    /// Collects every operator with a matching name and arity (step 1 of
    /// overload resolution).
    fn collect(&self, name: StringId, arity: usize) -> Vec<&OperatorSignature> {
        self.operators.iter().filter(|op| op.name == name && op.params.len() == arity).collect()
    }

    /// Resolves `(op, lhs, rhs)` per §4.4's five-step algorithm:
    /// collect candidates, discard ones whose params don't unify, error if
    /// none remain, bind if exactly one remains, and if several remain
    /// either emit a `ConditionalChoice` (all agree on return type) or an
    /// ambiguity error.
    pub fn resolve_binary(
        &self,
        name: StringId,
        location: Location,
        lhs: &CheckedType,
        rhs: &CheckedType,
        arena: &mut CompilerGenericArena,
        diags: &mut Diagnostics,
    ) -> CheckedType {
        let candidates = self.collect(name, 2);
        let surviving: Vec<&OperatorSignature> = candidates
            .into_iter()
            .filter(|op| {
                let mut probe = CompilerGenericArena::new();
                unify(&op.params[0], lhs, &mut probe) && unify(&op.params[1], rhs, &mut probe)
            })
            .collect();
        self.finish_resolution(name, location, surviving, arena, diags)
    }

    /// Resolves `(op, operand)` for unary operators, mirroring
    /// [`Self::resolve_binary`] with a single-parameter arity.
    pub fn resolve_unary(
        &self,
        name: StringId,
        location: Location,
        operand: &CheckedType,
        arena: &mut CompilerGenericArena,
        diags: &mut Diagnostics,
    ) -> CheckedType {
        let candidates = self.collect(name, 1);
        let surviving: Vec<&OperatorSignature> = candidates
            .into_iter()
            .filter(|op| {
                let mut probe = CompilerGenericArena::new();
                unify(&op.params[0], operand, &mut probe)
            })
            .collect();
        self.finish_resolution(name, location, surviving, arena, diags)
    }

    fn finish_resolution(
        &self,
        name: StringId,
        location: Location,
        surviving: Vec<&OperatorSignature>,
        arena: &mut CompilerGenericArena,
        diags: &mut Diagnostics,
    ) -> CheckedType {
        match surviving.as_slice() {
            [] => {
                diags.push(Diagnostic::new(DiagnosticKind::OperatorNotResolvable, location, "no matching operator overload"));
                CheckedType::Unknown
            }
            [one] => one.ret.clone(),
            many => {
                let first_ret = &many[0].ret;
                if many.iter().all(|op| unify(&op.ret, first_ret, arena)) {
                    CheckedType::ConditionalChoice {
                        choices: many.iter().map(|op| op.ret.clone()).collect(),
                        conds: many.iter().map(|_| name).collect(),
                    }
                } else {
                    diags.push(Diagnostic::new(DiagnosticKind::OperatorAmbiguous, location, "ambiguous operator overload"));
                    CheckedType::Unknown
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OperatorRegister, OperatorSignature};
    use crate::{
        analyze::generics::CompilerGenericArena,
        analyze::types::CheckedType,
        ast::data_type::Primitive,
        diagnostics::Diagnostics,
        intern::InternerBuilder,
        location::{Location, Pos},
    };

    fn loc(interner: &mut InternerBuilder) -> Location {
        let file = interner.intern("main.nv");
        Location::point(file, Pos::new(0, 0, 0))
    }

    #[test]
    fn single_candidate_resolves_directly() {
        let mut interner = InternerBuilder::new();
        let l = loc(&mut interner);
        let plus = interner.intern("+");
        let mut register = OperatorRegister::new();
        register.add_operator(OperatorSignature {
            name: plus,
            location: l,
            params: vec![CheckedType::Primitive(Primitive::I32), CheckedType::Primitive(Primitive::I32)],
            ret: CheckedType::Primitive(Primitive::I32),
        });

        let mut arena = CompilerGenericArena::new();
        let mut diags = Diagnostics::new(Vec::new());
        let result = register.resolve_binary(
            plus,
            l,
            &CheckedType::Primitive(Primitive::I32),
            &CheckedType::Primitive(Primitive::I32),
            &mut arena,
            &mut diags,
        );
        assert_eq!(result, CheckedType::Primitive(Primitive::I32));
        assert!(!diags.has_errors());
    }

    #[test]
    fn no_candidates_is_unresolvable() {
        let mut interner = InternerBuilder::new();
        let l = loc(&mut interner);
        let plus = interner.intern("+");
        let register = OperatorRegister::new();
        let mut arena = CompilerGenericArena::new();
        let mut diags = Diagnostics::new(Vec::new());
        let result = register.resolve_binary(
            plus,
            l,
            &CheckedType::Primitive(Primitive::I32),
            &CheckedType::Primitive(Primitive::I32),
            &mut arena,
            &mut diags,
        );
        assert!(result.is_unknown());
        assert_eq!(diags.error_count(), 1);
    }
}
