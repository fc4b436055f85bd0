//! Pattern checking and exhaustiveness (§4.4 "Pattern checking").
//!
//! Each pattern is checked against the scrutinee's `CheckedType`; bound
//! names are inserted into the match-case scope the caller already pushed.
//! Exhaustiveness is *approximated* by structural coverage, per spec: all
//! declared variants for an enum scrutinee, or a wildcard/binding presence
//! for any other (open) type. Unreachable arms (anything after a
//! wildcard/binding already covered everything) are warned on.

use ahash::AHashSet;

use crate::{
    ast::{Spanned, pattern::Pattern},
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    intern::StringId,
    location::Location,
    scope::{ScopeId, ScopeTree, SymbolKind},
};

use super::{
    generics::CompilerGenericArena,
    types::CheckedType,
};

/// Checks `pattern` against `scrutinee`, inserting any bound names as
/// `SymbolKind::Variable` in `case_scope`. Returns `true` if this pattern
/// alone covers every value of an open (non-enum) scrutinee type — a
/// wildcard or bare binding.
pub fn check_pattern(
    pattern: &Spanned<Pattern>,
    scrutinee: &CheckedType,
    tree: &mut ScopeTree,
    case_scope: ScopeId,
    arena: &mut CompilerGenericArena,
    diags: &mut Diagnostics,
) -> bool {
    match &pattern.node {
        Pattern::Wildcard => true,
        Pattern::Binding(ident) => {
            tree.insert(diags, case_scope, SymbolKind::Variable, ident.name, ident.location, None);
            true
        }
        Pattern::As { pattern: inner, name } => {
            tree.insert(diags, case_scope, SymbolKind::Variable, name.name, name.location, None);
            check_pattern(inner, scrutinee, tree, case_scope, arena, diags)
        }
        Pattern::Literal(_) => false,
        Pattern::Range { .. } => false,
        Pattern::Tuple(elems) => {
            let elem_types: Vec<CheckedType> = match scrutinee {
                CheckedType::Tuple(types) if types.len() == elems.len() => types.clone(),
                _ => vec![CheckedType::Unknown; elems.len()],
            };
            let mut covers_all = !elems.is_empty();
            for (elem, ty) in elems.iter().zip(&elem_types) {
                covers_all &= check_pattern(elem, ty, tree, case_scope, arena, diags);
            }
            covers_all
        }
        Pattern::Array(elems) | Pattern::List(elems) => {
            let elem_ty = match scrutinee {
                CheckedType::Array { elem, .. } | CheckedType::List(elem) => (**elem).clone(),
                _ => CheckedType::Unknown,
            };
            for elem in elems {
                check_pattern(elem, &elem_ty, tree, case_scope, arena, diags);
            }
            false
        }
        Pattern::ListHead { head, tail } => {
            let elem_ty = match scrutinee {
                CheckedType::List(elem) => (**elem).clone(),
                _ => CheckedType::Unknown,
            };
            check_pattern(head, &elem_ty, tree, case_scope, arena, diags);
            check_pattern(tail, scrutinee, tree, case_scope, arena, diags);
            false
        }
        Pattern::ListTail { init, last } => {
            let elem_ty = match scrutinee {
                CheckedType::List(elem) => (**elem).clone(),
                _ => CheckedType::Unknown,
            };
            check_pattern(init, scrutinee, tree, case_scope, arena, diags);
            check_pattern(last, &elem_ty, tree, case_scope, arena, diags);
            false
        }
        Pattern::Record { fields, .. } => {
            for (_, field_pattern) in fields {
                check_pattern(field_pattern, &CheckedType::Unknown, tree, case_scope, arena, diags);
            }
            false
        }
        Pattern::Variant { value, .. } => {
            if let Some(value_pattern) = value {
                check_pattern(value_pattern, &CheckedType::Unknown, tree, case_scope, arena, diags);
            }
            false
        }
        Pattern::AutoComplete | Pattern::Malformed => false,
    }
}

/// Checks exhaustiveness over a match's arms (§4.4: "approximated by
/// structural coverage over the scrutinee's type: all variants for enums,
/// wildcard presence for open types"). `variants` is the scrutinee enum's
/// full variant list, if it is one.
pub fn check_exhaustiveness(
    arms: &[(Spanned<Pattern>, bool)],
    variants: Option<&[StringId]>,
    match_location: Location,
    diags: &mut Diagnostics,
) {
    let mut covered_variants: AHashSet<StringId> = AHashSet::new();
    let mut catch_all_seen = false;

    for (pattern, covers_all) in arms {
        if catch_all_seen {
            diags.push(Diagnostic::new(DiagnosticKind::UnreachableMatchArm, pattern.location, "unreachable match arm"));
            continue;
        }
        if *covers_all {
            catch_all_seen = true;
            continue;
        }
        if let Pattern::Variant { variant, .. } = &pattern.node {
            covered_variants.insert(*variant);
        }
    }

    if catch_all_seen {
        return;
    }

    match variants {
        Some(all) if all.iter().all(|v| covered_variants.contains(v)) => {}
        Some(_) | None => {
            diags.push(Diagnostic::new(DiagnosticKind::NonExhaustiveMatch, match_location, "match is not exhaustive"));
        }
    }
}
