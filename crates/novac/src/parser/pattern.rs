//! Pattern parsing (§4.3): patterns mirror expressions for their shared
//! shapes (literal, tuple, array, list, record-call, variant-call) plus the
//! pattern-only forms listed in the GLOSSARY.

use super::ParseBlock;
use crate::{
    ast::{Identifier, Path, Spanned, pattern::Pattern},
    diagnostics::DiagnosticKind,
    token::{Keyword, Punct, TokenKind},
};

impl ParseBlock<'_> {
    pub fn parse_pattern(&mut self) -> Spanned<Pattern> {
        let base = self.parse_pattern_atom();
        self.parse_pattern_postfix(base)
    }

    /// `a..b` ranges and `pattern as name` bindings both glue onto an
    /// already-parsed atom, so they're handled as postfix continuations
    /// rather than their own atom alternatives.
    fn parse_pattern_postfix(&mut self, lhs: Spanned<Pattern>) -> Spanned<Pattern> {
        if self.eat_punct(Punct::DotDot) {
            let hi = self.parse_pattern_atom();
            let loc = lhs.location.merge(hi.location);
            return Spanned::new(Pattern::Range { lo: Box::new(lhs), hi: Box::new(hi) }, loc);
        }
        if self.eat_punct(Punct::Arrow) {
            let tail = self.parse_pattern();
            let loc = lhs.location.merge(tail.location);
            return Spanned::new(Pattern::ListHead { head: Box::new(lhs), tail: Box::new(tail) }, loc);
        }
        if self.eat_punct(Punct::LeftArrow) {
            let last = self.parse_pattern();
            let loc = lhs.location.merge(last.location);
            return Spanned::new(Pattern::ListTail { init: Box::new(lhs), last: Box::new(last) }, loc);
        }
        if self.eat_keyword(Keyword::As) {
            let Some((name, nloc)) = self.expect_ident() else { return lhs };
            let loc = lhs.location.merge(nloc);
            return Spanned::new(Pattern::As { pattern: Box::new(lhs), name: Identifier::new(name, nloc) }, loc);
        }
        lhs
    }

    fn parse_pattern_atom(&mut self) -> Spanned<Pattern> {
        let start = self.current_location();
        let Some(tok) = self.peek().cloned() else {
            return Spanned::new(Pattern::Malformed, start);
        };
        match &tok.kind {
            TokenKind::Punct(Punct::DotDot) => {
                self.advance();
                Spanned::new(Pattern::AutoComplete, start)
            }
            TokenKind::Literal(lit) => {
                self.advance();
                Spanned::new(Pattern::Literal(lit.clone()), start)
            }
            TokenKind::Punct(Punct::LParen) => self.parse_tuple_pattern(),
            TokenKind::Punct(Punct::LBracket) => self.parse_array_pattern(),
            TokenKind::Ident { name, .. } if self.resolve(*name) == "_" => {
                self.advance();
                Spanned::new(Pattern::Wildcard, start)
            }
            TokenKind::Ident { name, .. } => {
                let n = *name;
                self.advance();
                if self.is_punct(Punct::LBrace) && self.looks_like_record_pattern() {
                    self.parse_record_pattern(Path::single(n, start), start)
                } else if self.is_punct(Punct::Colon) {
                    self.parse_variant_pattern(Path::single(n, start), start)
                } else {
                    Spanned::new(Pattern::Binding(Identifier::new(n, start)), start)
                }
            }
            _ => {
                self.error_here(DiagnosticKind::ExpectedOnlyOnePattern, "expected a pattern");
                self.advance();
                Spanned::new(Pattern::Malformed, start)
            }
        }
    }

    fn looks_like_record_pattern(&self) -> bool {
        matches!(self.peek_at(1).map(|t| &t.kind), Some(TokenKind::Ident { .. }))
            && matches!(self.peek_at(2).map(|t| &t.kind), Some(TokenKind::Punct(Punct::ColonEq)))
    }

    fn parse_record_pattern(&mut self, ty: Path, start: crate::location::Location) -> Spanned<Pattern> {
        let fields = self.comma_list(Punct::LBrace, Punct::RBrace, |b| {
            let name = b.expect_ident().map(|(n, _)| n).unwrap_or_default();
            b.eat_punct(Punct::ColonEq);
            (name, b.parse_pattern())
        });
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Pattern::Record { ty, fields }, start.merge(end))
    }

    fn parse_variant_pattern(&mut self, ty: Path, start: crate::location::Location) -> Spanned<Pattern> {
        self.advance();
        let Some((variant, _)) = self.expect_ident() else {
            return Spanned::new(Pattern::Malformed, start);
        };
        let value = if self.eat_punct(Punct::Dollar) {
            None
        } else if self.eat_punct(Punct::LParen) {
            let p = self.parse_pattern();
            self.expect_close(Punct::RParen);
            Some(Box::new(p))
        } else {
            None
        };
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Pattern::Variant { ty, variant, value }, start.merge(end))
    }

    fn parse_tuple_pattern(&mut self) -> Spanned<Pattern> {
        let start = self.current_location();
        let elems = self.comma_list(Punct::LParen, Punct::RParen, Self::parse_pattern);
        let end = self.previous_location().unwrap_or(start);
        if elems.len() == 1 {
            elems.into_iter().next().unwrap_or_else(|| Spanned::new(Pattern::Malformed, start))
        } else {
            Spanned::new(Pattern::Tuple(elems), start.merge(end))
        }
    }

    fn parse_array_pattern(&mut self) -> Spanned<Pattern> {
        let start = self.current_location();
        let elems = self.comma_list(Punct::LBracket, Punct::RBracket, Self::parse_pattern);
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Pattern::Array(elems), start.merge(end))
    }
}
