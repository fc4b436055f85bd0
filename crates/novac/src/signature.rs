//! Signature caching (§3 "Signature", §4.4 "Generic instantiation").
//!
//! A signature is `(global_name, ordered generic params, resolved type)`,
//! registered eagerly when the analyzer first sees a fun/record/typedef/
//! operator-overload declaration. Instantiating it against a concrete
//! generic substitution produces a checked node; repeated instantiations
//! with the same substitution must share that node rather than rebuild it,
//! so the cache is keyed by `(decl, substitution)` the way the teacher's
//! `Signature` binds call arguments to parameter slots once and reuses the
//! binding shape across calls.

use ahash::AHashMap;

use crate::{analyze::types::CheckedType, intern::StringId, scope::SymbolId};

/// A `T1 := dt1, T2 := dt2, …` generic substitution, in declaration order.
/// Two substitutions are equal, and therefore share a cache entry, iff
/// their `CheckedType`s are structurally equal (ignoring location) in the
/// same order — generic params are positional, not named, once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Substitution(Vec<CheckedType>);

impl Substitution {
    #[must_use]
    pub fn new(args: Vec<CheckedType>) -> Self {
        Self(args)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn args(&self) -> &[CheckedType] {
        &self.0
    }
}

/// The flattened, mangled identifier unique within a package (GLOSSARY
/// "Global name"), e.g. `pkg.mod.Type.method`.
pub type GlobalName = StringId;

/// One registered fun/record/typedef/operator-overload signature.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Signature {
    pub global_name: GlobalName,
    pub symbol: SymbolId,
    /// Generic parameter names in declaration order; substitutions supplied
    /// at an instantiation site are zipped against this list positionally.
    pub generic_params: Vec<StringId>,
    /// The declaration's own (possibly generic) resolved type: a fun's
    /// `Lambda`, a record's `Custom`, a typedef's aliased type, an
    /// operator's parameter/return shape.
    pub resolved_type: CheckedType,
}

impl Signature {
    #[must_use]
    pub fn new(
        global_name: GlobalName,
        symbol: SymbolId,
        generic_params: Vec<StringId>,
        resolved_type: CheckedType,
    ) -> Self {
        Self { global_name, symbol, generic_params, resolved_type }
    }

    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }
}

/// A memoized `(decl, substitution) -> instantiated type` entry, so two call
/// sites instantiating the same generic fun with the same argument types
/// share one checked node (§4.4 "signatures are memoized by `(decl,
/// substitution)` so that repeated instantiations share one checked node").
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct InstantiationKey {
    symbol: SymbolId,
    substitution: Substitution,
}

/// Owns every registered signature plus the instantiation cache, for one
/// package. Eagerly populated as the analyzer walks declarations; read
/// (never mutated beyond insertion) by every later call/operator/generic
/// check.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SignatureTable {
    by_symbol: AHashMap<SymbolId, Signature>,
    #[serde(skip)]
    instantiations: AHashMap<InstantiationKey, CheckedType>,
}

impl SignatureTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a signature the first time its declaration is seen.
    /// Re-registering the same symbol replaces the prior entry, which only
    /// happens if the analyzer visits a decl twice — a caller bug, not a
    /// user-facing error, so this does not diagnose.
    pub fn register(&mut self, signature: Signature) {
        self.by_symbol.insert(signature.symbol, signature);
    }

    #[must_use]
    pub fn get(&self, symbol: SymbolId) -> Option<&Signature> {
        self.by_symbol.get(&symbol)
    }

    /// Instantiates `symbol`'s signature against `substitution`, substituting
    /// each generic parameter's [`CheckedType::Generic`] occurrence in the
    /// resolved type for the corresponding argument. Arity mismatches return
    /// `None`; callers raise `DiagnosticKind::GenericArityMismatch`.
    pub fn instantiate(&mut self, symbol: SymbolId, substitution: Substitution) -> Option<CheckedType> {
        let signature = self.by_symbol.get(&symbol)?;
        if signature.generic_params.len() != substitution.args().len() {
            return None;
        }
        let key = InstantiationKey { symbol, substitution: substitution.clone() };
        if let Some(cached) = self.instantiations.get(&key) {
            return Some(cached.clone());
        }
        let mapping: AHashMap<StringId, CheckedType> =
            signature.generic_params.iter().copied().zip(substitution.args().iter().cloned()).collect();
        let instantiated = signature.resolved_type.substitute(&mapping);
        self.instantiations.insert(key, instantiated.clone());
        Some(instantiated)
    }
}

#[cfg(test)]
mod tests {
    use super::{Signature, SignatureTable, Substitution};
    use crate::{analyze::types::CheckedType, ast::data_type::Primitive, intern::InternerBuilder, scope::SymbolId};

    #[test]
    fn repeated_instantiation_shares_cached_node() {
        let mut interner = InternerBuilder::new();
        let t = interner.intern("T");
        let symbol = SymbolId(1);
        let mut table = SignatureTable::new();
        table.register(Signature::new(t, symbol, vec![t], CheckedType::Generic(t)));

        let sub = Substitution::new(vec![CheckedType::Primitive(Primitive::I32)]);
        let first = table.instantiate(symbol, sub.clone()).unwrap();
        let second = table.instantiate(symbol, sub).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn arity_mismatch_returns_none() {
        let mut interner = InternerBuilder::new();
        let t = interner.intern("T");
        let symbol = SymbolId(1);
        let mut table = SignatureTable::new();
        table.register(Signature::new(t, symbol, vec![t], CheckedType::Generic(t)));
        assert!(table.instantiate(symbol, Substitution::empty()).is_none());
    }
}
