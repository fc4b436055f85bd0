//! The scope tree built by the analyzer (§4.4 "Scope construction" /
//! "Name resolution") and consulted by every later analyzer pass.
//!
//! This generalizes the teacher's `Prepare` namespace — a single flat
//! `name -> NamespaceId` map walked via `global`/`nonlocal`/enclosing-locals
//! bookkeeping — into a real tree: one node per module, per declaration with
//! a body, per control-flow body, and per block, each owning one container
//! per [`SymbolKind`] the way `Prepare` owned one `AHashMap` per binding
//! flavor (locals, cells, free vars). Where `Prepare` resolved a name by
//! consulting its handful of maps in a fixed order, a [`ScopeTree`] walks
//! parent scopes outward, consulting the kind-specific container at each
//! level.

use ahash::AHashMap;
use strum::EnumIter;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    intern::StringId,
    location::Location,
};

/// Index into [`ScopeTree`]'s scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScopeId(u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable integer id for a symbol, unique within the package. Doubles as the
/// back-reference the analyzer uses to index its own parallel arena of
/// checked declarations (the scope tree itself stores no AST pointers, to
/// keep it free of the AST's lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SymbolId(pub(crate) u32);

/// What kind of container a name is registered in. Names are unique per
/// kind within a scope; a type and a variable may share a name (§3
/// invariant "cross-kind shadowing is allowed").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, strum::Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum SymbolKind {
    CapturedVariable,
    Module,
    Constant,
    Enum,
    Record,
    Alias,
    Error,
    EnumObject,
    RecordObject,
    Class,
    Trait,
    Label,
    Variable,
    Generic,
    Fun,
    Method,
}

/// Why a sub-scope exists; drives which lowering/exhaustiveness rules apply
/// in the analyzer and which debug-info label the MIR builder attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScopeKind {
    Root,
    Module,
    FunBody,
    MethodBody,
    Block,
    IfBranch,
    ElseBranch,
    ForBody,
    WhileBody,
    LoopBody,
    DoWhileBody,
    MatchCase,
    TryBody,
    CatchBody,
    Record,
    Class,
    Trait,
    EnumObject,
    RecordObject,
}

/// `(kind, local id, path of parent ids)`, recorded on every scope per §4.4.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessDescriptor {
    pub kind: ScopeKind,
    pub local_id: ScopeId,
    pub path: Vec<ScopeId>,
}

/// A catch clause attached to an error-raising region (`try`/`catch`
/// bodies), consulted when checking `raise` against an enclosing handler.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CatchClause {
    pub name: Option<StringId>,
    pub location: Location,
}

/// One entry in a symbol-kind container: a stable id plus the location of
/// the binding, plus the scope it opens if this symbol names something
/// that itself has members (a module, object, class, trait) reachable by a
/// further path segment.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub location: Location,
    pub opens_scope: Option<ScopeId>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Scope {
    parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub access: AccessDescriptor,
    pub catch: Option<CatchClause>,
    containers: AHashMap<SymbolKind, AHashMap<StringId, Symbol>>,
}

impl Scope {
    fn container(&self, kind: SymbolKind) -> Option<&AHashMap<StringId, Symbol>> {
        self.containers.get(&kind)
    }
}

/// The result of a name lookup (§4.4 "A response carries either the typed
/// declaration and its access descriptor, or a not-found error").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Response {
    Found { symbol: Symbol, scope: ScopeId, access: AccessDescriptor },
    NotFound { name: StringId },
}

impl Response {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Owns every scope in a package, rooted at one [`ScopeKind::Root`] scope.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    next_symbol: u32,
}

impl ScopeTree {
    /// Builds a tree containing only the root scope.
    #[must_use]
    pub fn new() -> Self {
        let root = Scope {
            parent: None,
            kind: ScopeKind::Root,
            access: AccessDescriptor { kind: ScopeKind::Root, local_id: ScopeId(0), path: Vec::new() },
            catch: None,
            containers: AHashMap::new(),
        };
        Self { scopes: vec![root], next_symbol: 0 }
    }

    #[must_use]
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Creates a new sub-scope of `parent`, per §4.4: "Sub-scopes are
    /// created for each module, declaration with a body, control-flow
    /// construct with a body, and block."
    pub fn push_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let mut path = self.scopes[parent.index()].access.path.clone();
        path.push(parent);
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            kind,
            access: AccessDescriptor { kind, local_id: id, path },
            catch: None,
            containers: AHashMap::new(),
        });
        id
    }

    pub fn set_catch(&mut self, scope: ScopeId, catch: CatchClause) {
        self.scopes[scope.index()].catch = Some(catch);
    }

    /// Looks up the nearest enclosing catch clause, walking outward from
    /// `scope`. Used when checking a `raise` statement's error type.
    #[must_use]
    pub fn enclosing_catch(&self, scope: ScopeId) -> Option<&CatchClause> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if let Some(catch) = &s.catch {
                return Some(catch);
            }
            current = s.parent;
        }
        None
    }

    /// Registers `name` under `kind` in `scope`. Fails with
    /// `DiagnosticKind::DuplicateName` if the kind's container in this
    /// scope already holds that name (§3: "Names in a scope are unique per
    /// symbol-kind").
    pub fn insert(
        &mut self,
        diags: &mut Diagnostics,
        scope: ScopeId,
        kind: SymbolKind,
        name: StringId,
        location: Location,
        opens_scope: Option<ScopeId>,
    ) -> SymbolId {
        let id = SymbolId(self.next_symbol);
        let symbol = Symbol { id, location, opens_scope };
        let container = self.scopes[scope.index()].containers.entry(kind).or_default();
        if let Some(existing) = container.get(&name) {
            diags.push(
                Diagnostic::new(DiagnosticKind::DuplicateName, location, format!("duplicate {kind} declaration"))
                    .with_detail(existing.location, "first declared here"),
            );
            return existing.id;
        }
        container.insert(name, symbol);
        self.next_symbol += 1;
        id
    }

    /// Walks `scope` and its ancestors, returning the first `kind`-tagged
    /// binding of `name`.
    #[must_use]
    pub fn lookup(&self, scope: ScopeId, kind: SymbolKind, name: StringId) -> Response {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if let Some(symbol) = s.container(kind).and_then(|c| c.get(&name)) {
                return Response::Found { symbol: *symbol, scope: id, access: s.access.clone() };
            }
            current = s.parent;
        }
        Response::NotFound { name }
    }

    /// Resolves a dotted path: the head segment is looked up outward from
    /// `scope`; each subsequent segment is looked up only in the scope the
    /// previous segment's symbol opens (§4.4: "subsequent segments [resolve]
    /// in the module/object scope of the resolved head").
    #[must_use]
    pub fn resolve_path(&self, scope: ScopeId, kind: SymbolKind, segments: &[StringId]) -> Response {
        let Some((&head, rest)) = segments.split_first() else {
            return Response::NotFound { name: StringId::default() };
        };
        let head_kind = if rest.is_empty() { kind } else { SymbolKind::Module };
        let mut response = self.lookup_any_kind(scope, head_kind, head);
        let last = rest.len().wrapping_sub(1);
        for (i, &segment) in rest.iter().enumerate() {
            let Response::Found { symbol, .. } = &response else {
                return response;
            };
            let Some(next_scope) = symbol.opens_scope else {
                return Response::NotFound { name: segment };
            };
            let segment_kind = if i == last { kind } else { SymbolKind::Module };
            response = self.lookup_local(next_scope, segment_kind, segment);
        }
        response
    }

    /// Like [`Self::lookup`], but falls back across every [`SymbolKind`]
    /// when `kind` doesn't match — used for a path's head segment, which
    /// may name a module, object, class, or any other scope-opening symbol
    /// before the caller's own `kind` is known to apply.
    fn lookup_any_kind(&self, scope: ScopeId, preferred: SymbolKind, name: StringId) -> Response {
        let direct = self.lookup(scope, preferred, name);
        if direct.is_found() {
            return direct;
        }
        for kind in <SymbolKind as strum::IntoEnumIterator>::iter() {
            if kind == preferred {
                continue;
            }
            let response = self.lookup(scope, kind, name);
            if response.is_found() {
                return response;
            }
        }
        Response::NotFound { name }
    }

    /// Looks up `name` only within `scope` itself (no outward walk), used
    /// for path segments after the head, which resolve in exactly the
    /// scope their predecessor opened.
    fn lookup_local(&self, scope: ScopeId, kind: SymbolKind, name: StringId) -> Response {
        let s = &self.scopes[scope.index()];
        if let Some(symbol) = s.container(kind).and_then(|c| c.get(&name)) {
            return Response::Found { symbol: *symbol, scope, access: s.access.clone() };
        }
        for candidate in <SymbolKind as strum::IntoEnumIterator>::iter() {
            if candidate == kind {
                continue;
            }
            if let Some(symbol) = s.container(candidate).and_then(|c| c.get(&name)) {
                return Response::Found { symbol: *symbol, scope, access: s.access.clone() };
            }
        }
        Response::NotFound { name }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{CatchClause, Response, ScopeKind, ScopeTree, SymbolKind};
    use crate::{
        diagnostics::Diagnostics,
        intern::InternerBuilder,
        location::{Location, Pos},
    };

    fn loc(interner: &mut InternerBuilder) -> Location {
        let file = interner.intern("main.nv");
        Location::point(file, Pos::new(0, 0, 0))
    }

    #[test]
    fn lookup_walks_outward_through_ancestors() {
        let mut interner = InternerBuilder::new();
        let mut diags = Diagnostics::new(Vec::new());
        let mut tree = ScopeTree::new();
        let l = loc(&mut interner);
        let x = interner.intern("x");

        tree.insert(&mut diags, tree.root(), SymbolKind::Variable, x, l, None);
        let block = tree.push_scope(tree.root(), ScopeKind::Block);

        assert!(tree.lookup(block, SymbolKind::Variable, x).is_found());
        assert!(!diags.has_errors());
    }

    #[test]
    fn duplicate_name_in_same_kind_is_an_error() {
        let mut interner = InternerBuilder::new();
        let mut diags = Diagnostics::new(Vec::new());
        let mut tree = ScopeTree::new();
        let l = loc(&mut interner);
        let x = interner.intern("x");

        tree.insert(&mut diags, tree.root(), SymbolKind::Variable, x, l, None);
        tree.insert(&mut diags, tree.root(), SymbolKind::Variable, x, l, None);

        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn cross_kind_shadowing_is_allowed() {
        let mut interner = InternerBuilder::new();
        let mut diags = Diagnostics::new(Vec::new());
        let mut tree = ScopeTree::new();
        let l = loc(&mut interner);
        let x = interner.intern("x");

        tree.insert(&mut diags, tree.root(), SymbolKind::Variable, x, l, None);
        tree.insert(&mut diags, tree.root(), SymbolKind::Record, x, l, None);

        assert!(!diags.has_errors());
    }

    #[test]
    fn path_resolves_through_opened_module_scope() {
        let mut interner = InternerBuilder::new();
        let mut diags = Diagnostics::new(Vec::new());
        let mut tree = ScopeTree::new();
        let l = loc(&mut interner);
        let module_name = interner.intern("math");
        let fun_name = interner.intern("sqrt");

        let module_scope = tree.push_scope(tree.root(), ScopeKind::Module);
        tree.insert(&mut diags, tree.root(), SymbolKind::Module, module_name, l, Some(module_scope));
        tree.insert(&mut diags, module_scope, SymbolKind::Fun, fun_name, l, None);

        let response = tree.resolve_path(tree.root(), SymbolKind::Fun, &[module_name, fun_name]);
        assert!(matches!(response, Response::Found { .. }));
    }

    #[test]
    fn catch_clause_is_visible_from_nested_scopes() {
        let mut interner = InternerBuilder::new();
        let mut tree = ScopeTree::new();
        let l = loc(&mut interner);
        let try_scope = tree.push_scope(tree.root(), ScopeKind::TryBody);
        tree.set_catch(try_scope, CatchClause { name: None, location: l });
        let inner = tree.push_scope(try_scope, ScopeKind::Block);

        assert!(tree.enclosing_catch(inner).is_some());
        assert!(tree.enclosing_catch(tree.root()).is_none());
    }
}
