//! String interning for identifiers, filenames, and string/char literal text.
//!
//! Interning avoids cloning the same identifier text at every use site and
//! lets `Location` and `Token` stay `Copy`. Interned indices are compared by
//! value everywhere names are compared, which keeps scope lookups and macro
//! hygiene checks as cheap integer comparisons instead of string comparisons.

use ahash::AHashMap;

/// Index into the string interner's storage.
///
/// `u32` rather than `usize` to keep `Token`/`Location` small; four billion
/// unique interned strings is far beyond any real translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct StringId(u32);

impl StringId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// `self` is pre-interned as the very first entry of every fresh
    /// [`InternerBuilder`], so this id is valid across every package without
    /// needing a mutable interner at the point `self` is parsed.
    pub const SELF: StringId = StringId(0);
}

/// Builds and owns the interned string table for one package.
///
/// Preparsing and parsing both intern through the same builder (handed to
/// every file's preparser/parser in turn), so identical identifiers across
/// files in the same package share one `StringId`.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct InternerBuilder {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, StringId>,
}

impl InternerBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut interner = Self::default();
        let self_id = interner.intern("self");
        debug_assert_eq!(self_id, StringId::SELF, "`self` must be the first interned string");
        interner
    }

    /// Interns `s`, returning the existing id if already present.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(s.into());
        self.lookup.insert(s.into(), id);
        id
    }

    /// Looks up the text for an id. Panics on an id from a different interner.
    #[must_use]
    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::InternerBuilder;

    #[test]
    fn repeated_intern_returns_same_id() {
        let mut interner = InternerBuilder::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        let c = interner.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a), "foo");
        assert_eq!(interner.resolve(c), "bar");
    }
}
