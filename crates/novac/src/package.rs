//! The package driver (§2 "Package driver", §5/§7 phase gating): runs the
//! four phases in order over every file handed to it, short-circuiting once
//! a phase leaves `diagnostics.error_count() > 0` (§7: "later phases are not
//! attempted once an earlier phase has produced an error").
//!
//! Grounded on the teacher's `Prepare`/`Runner` split: one state-machine
//! struct per phase (`Preparser`, `MacroTable`+`parse_decls`, `Analyzer`,
//! `MirBuilder`), one driver type that owns the shared state (scope tree,
//! signatures, diagnostics) and calls them in sequence.

use crate::{
    analyze::{Analyzer, CheckedPackage},
    ast::{Decl, Spanned},
    config::CompilerConfig,
    diagnostics::Diagnostics,
    intern::InternerBuilder,
    location::Location,
    mir::{Module, builder::MirBuilder},
    preparse::{Preparser, macros::MacroTable},
    token::Token,
};

/// Everything a package's compile pass produced, through however many
/// phases it got. Later fields are `None` exactly when an earlier phase
/// halted the pipeline with an error (§7).
pub struct CompiledPackage {
    pub diagnostics: Diagnostics,
    pub decls: Vec<Spanned<Decl>>,
    pub checked: Option<CheckedPackage>,
    pub mir: Option<Module>,
}

/// Drives one package's four-phase pipeline over a set of per-file token
/// vectors (§6 "Input": "a token vector per file, produced by the external
/// scanner"). Owns nothing across calls to [`Self::compile`] besides the
/// interner and config it was built with — each call starts a fresh
/// `Diagnostics`/`ScopeTree`/`SignatureTable` the way `Analyzer::new` does.
pub struct Package<'d> {
    interner: &'d mut InternerBuilder,
    config: CompilerConfig,
}

impl<'d> Package<'d> {
    #[must_use]
    pub fn new(interner: &'d mut InternerBuilder, config: CompilerConfig) -> Self {
        Self { interner, config }
    }

    /// Compiles `files` (each already scanned into its own token vector) end
    /// to end: preparse every file, merge their macro tables' public halves
    /// into one root table (§3 "a private table per file plus one root
    /// public table"), parse every file's skeleton against that merged
    /// table, check the combined declaration list, and lower to MIR.
    pub fn compile(self, files: Vec<Vec<Token>>) -> CompiledPackage {
        let mut diags = Diagnostics::new(self.config.warning_disables.clone());

        let mut per_file_decls = Vec::with_capacity(files.len());
        let mut root_macros = MacroTable::new();
        for tokens in files {
            let result = Preparser::new(tokens, &mut diags, self.interner).run();
            root_macros.merge_public_from(&result.macros);
            per_file_decls.push((result.decls, result.macros));
        }

        if diags.has_errors() {
            return CompiledPackage { diagnostics: diags, decls: Vec::new(), checked: None, mir: None };
        }

        let mut decls = Vec::new();
        for (file_decls, mut file_macros) in per_file_decls {
            file_macros.merge_public_from(&root_macros);
            for decl in crate::parser::parse_decls(file_decls, &file_macros, &mut diags, self.interner) {
                let location = decl.header().map_or_else(Location::default, |h| h.location);
                decls.push(Spanned::new(decl, location));
            }
        }

        if diags.has_errors() {
            return CompiledPackage { diagnostics: diags, decls, checked: None, mir: None };
        }

        let checked = Analyzer::new(self.interner).check_package(&decls, &mut diags);

        if diags.has_errors() {
            return CompiledPackage { diagnostics: diags, decls, checked: Some(checked), mir: None };
        }

        let mir = MirBuilder::new(self.interner).lower_package(&checked);
        CompiledPackage { diagnostics: diags, decls, checked: Some(checked), mir: Some(mir) }
    }
}

#[cfg(test)]
mod tests {
    use super::Package;
    use crate::{
        config::CompilerConfig,
        intern::InternerBuilder,
        location::{Location, Pos},
        token::{Keyword, Literal, NumericSuffix, Punct, Token, TokenKind},
    };

    fn tok(kind: TokenKind, file: crate::intern::StringId) -> Token {
        Token::new(kind, Location::point(file, Pos::default()))
    }

    /// `fun answer() -> i32 = 42;` lowered end to end, asserting every
    /// phase ran (§8 E1-style smoke check for the driver itself, not the
    /// language features — those live in `tests/end_to_end.rs`).
    #[test]
    fn compiles_a_trivial_function_through_mir() {
        let mut interner = InternerBuilder::new();
        let file = interner.intern("main.nv");
        let name = interner.intern("answer");
        let i32_name = interner.intern("i32");

        let tokens = vec![
            tok(TokenKind::Keyword(Keyword::Fun), file),
            tok(TokenKind::Ident { kind: crate::token::IdentKind::Normal, name }, file),
            tok(TokenKind::Punct(Punct::LParen), file),
            tok(TokenKind::Punct(Punct::RParen), file),
            tok(TokenKind::Punct(Punct::Arrow), file),
            tok(TokenKind::Ident { kind: crate::token::IdentKind::Normal, name: i32_name }, file),
            tok(TokenKind::Punct(Punct::Eq), file),
            tok(
                TokenKind::Literal(Literal::Int {
                    value: num_bigint::BigInt::from(42),
                    base: crate::token::IntBase::Decimal,
                    suffix: None::<NumericSuffix>,
                }),
                file,
            ),
            tok(TokenKind::Punct(Punct::Semi), file),
            tok(TokenKind::Eof, file),
        ];

        let package = Package::new(&mut interner, CompilerConfig::new());
        let result = package.compile(vec![tokens]);
        assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics.records());
        let mir = result.mir.expect("a clean compile should reach MIR lowering");
        assert_eq!(mir.items.len(), 1);
    }
}
