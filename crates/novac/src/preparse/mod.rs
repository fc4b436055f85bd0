//! The preparser (§4.1): a shape-recognition pass over one file's token
//! stream that produces coarse declaration skeletons without parsing any
//! sub-part's internals.
//!
//! Mirrors the teacher's `Prepare` state machine: a single cursor walks the
//! token vector once, recording diagnostics into the shared sink instead of
//! returning early, and resynchronizing at top-level keywords after an error.

pub mod macros;
pub mod skeleton;

use crate::{
    ast::{Path, Visibility},
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    intern::StringId,
    location::Location,
    token::{Keyword, Punct, Token, TokenKind},
};
use macros::{MacroDef, MacroParam, MacroParamKind, MacroTable};
use skeleton::{ElifSkeleton, FunBodyItem, MatchArmSkeleton, ObjectBodyKind, PreparsedBody, PreparsedDecl, TokenSpan};

/// A `use` edge recorded for the package driver's translation-unit graph.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UseEdge {
    pub path: Path,
    pub alias: Option<StringId>,
    pub location: Location,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IncludeEdge {
    pub path: Path,
    pub location: Location,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PreparseResult {
    pub decls: Vec<PreparsedDecl>,
    pub macros: MacroTable,
    pub uses: Vec<UseEdge>,
    pub includes: Vec<IncludeEdge>,
}

pub struct Preparser<'d> {
    tokens: Vec<Token>,
    pos: usize,
    diags: &'d mut Diagnostics,
    interner: &'d crate::intern::InternerBuilder,
}

impl<'d> Preparser<'d> {
    #[must_use]
    pub fn new(tokens: Vec<Token>, diags: &'d mut Diagnostics, interner: &'d crate::intern::InternerBuilder) -> Self {
        Self { tokens, pos: 0, diags, interner }
    }

    /// Runs the full pass and returns the skeleton, macro table, and
    /// use/include edges for this file.
    pub fn run(mut self) -> PreparseResult {
        let mut decls = Vec::new();
        let mut macros = MacroTable::new();
        let mut uses = Vec::new();
        let mut includes = Vec::new();
        while !self.at_eof() {
            if self.take_macro_def(&mut macros) {
                continue;
            }
            match self.top_level_decl(&mut uses, &mut includes) {
                Some(decl) => decls.push(decl),
                None => {
                    if !self.at_eof() {
                        self.error_and_sync();
                    }
                }
            }
        }
        PreparseResult { decls, macros, uses, includes }
    }

    // --- cursor primitives ---

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len() || self.tokens[self.pos].is_eof()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).filter(|t| !t.is_eof())
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).filter(|t| !t.is_eof())
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn is_punct(&self, p: Punct) -> bool {
        matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Punct(x)) if *x == p)
    }

    fn is_keyword(&self, k: Keyword) -> bool {
        matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Keyword(x)) if *x == k)
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, k: Keyword) -> bool {
        if self.is_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_location(&self) -> Location {
        self.peek().map_or_else(
            || self.tokens.last().map_or_else(|| Location::point(StringId::default(), crate::location::Pos::default()), |t| t.location),
            |t| t.location,
        )
    }

    fn expect_ident(&mut self) -> Option<(StringId, Location)> {
        match self.peek() {
            Some(Token { kind: TokenKind::Ident { name, .. }, location }) => {
                let (name, location) = (*name, *location);
                self.advance();
                Some((name, location))
            }
            _ => {
                let loc = self.current_location();
                self.diags.push(Diagnostic::new(DiagnosticKind::ExpectedIdentifier, loc, "expected an identifier"));
                None
            }
        }
    }

    fn take_visibility(&mut self) -> Visibility {
        if self.eat_keyword(Keyword::Pub) { Visibility::Public } else { Visibility::Private }
    }

    fn error_and_sync(&mut self) {
        let loc = self.current_location();
        self.diags.push(Diagnostic::new(DiagnosticKind::UnexpectedToken, loc, "unexpected token at top level"));
        self.sync_to_top_level();
    }

    /// Advances to the next top-level keyword or EOF (§4.1 error recovery).
    fn sync_to_top_level(&mut self) {
        while let Some(tok) = self.peek() {
            if matches!(
                tok.kind,
                TokenKind::Keyword(
                    Keyword::Module
                        | Keyword::Use
                        | Keyword::Include
                        | Keyword::Fun
                        | Keyword::Type
                        | Keyword::Object
                        | Keyword::Class
                        | Keyword::Trait
                        | Keyword::Enum
                        | Keyword::Record
                        | Keyword::Error
                        | Keyword::Macro
                        | Keyword::Pub
                )
            ) {
                return;
            }
            self.advance();
        }
    }

    /// Consumes a balanced `open ... close` group, tracking nested depth of
    /// the same delimiter pair, and returns the tokens strictly between the
    /// outer pair (not including `open`/`close` themselves). Assumes the
    /// current token is `open`.
    fn capture_balanced(&mut self, open: Punct, close: Punct) -> TokenSpan {
        let mut depth = 0usize;
        let mut out = Vec::new();
        if !self.is_punct(open) {
            return out;
        }
        self.advance();
        depth += 1;
        while depth > 0 {
            let Some(tok) = self.peek() else {
                let loc = self.current_location();
                self.diags.push(Diagnostic::new(DiagnosticKind::UnmatchedDelimiter, loc, "unmatched delimiter"));
                break;
            };
            match &tok.kind {
                TokenKind::Punct(p) if *p == open => depth += 1,
                TokenKind::Punct(p) if *p == close => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                _ => {}
            }
            out.push(self.advance().expect("peek succeeded"));
        }
        out
    }

    /// Consumes a `begin ... end` region, tracking nested `begin`/`end`
    /// keyword depth, returning the inner tokens.
    fn capture_begin_end(&mut self) -> TokenSpan {
        let mut depth = 0usize;
        let mut out = Vec::new();
        if !self.eat_keyword(Keyword::Begin) {
            return out;
        }
        depth += 1;
        while depth > 0 {
            let Some(tok) = self.peek() else {
                let loc = self.current_location();
                self.diags.push(Diagnostic::new(DiagnosticKind::UnmatchedDelimiter, loc, "unmatched `begin`"));
                break;
            };
            match &tok.kind {
                TokenKind::Keyword(Keyword::Begin) => depth += 1,
                TokenKind::Keyword(Keyword::End) => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                _ => {}
            }
            out.push(self.advance().expect("peek succeeded"));
        }
        out
    }

    /// A block body delimited either by braces or by `begin ... end` (§4.1).
    fn capture_body(&mut self) -> TokenSpan {
        if self.is_punct(Punct::LBrace) {
            self.capture_balanced(Punct::LBrace, Punct::RBrace)
        } else if self.is_keyword(Keyword::Begin) {
            self.capture_begin_end()
        } else {
            let loc = self.current_location();
            self.diags.push(Diagnostic::new(DiagnosticKind::ExpectedToken, loc, "expected `{` or `begin`"));
            Vec::new()
        }
    }

    /// Splits a balanced delimited group into comma-separated argument
    /// spans at depth zero (§4.1/§4.2: macro-call and call-argument groups).
    fn capture_group_list(&mut self, open: Punct, close: Punct) -> Vec<TokenSpan> {
        let inner = self.capture_balanced(open, close);
        split_top_level(&inner, Punct::Comma)
    }

    /// Captures tokens up to (and consuming) the next top-level `;`,
    /// tracking paren/bracket/brace depth so nested semicolons inside a
    /// lambda or block are not mistaken for the statement terminator.
    fn capture_until_semi(&mut self) -> TokenSpan {
        let mut depth = 0i32;
        let mut out = Vec::new();
        loop {
            let Some(tok) = self.peek() else {
                break;
            };
            match &tok.kind {
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => depth -= 1,
                TokenKind::Punct(Punct::Semi) if depth <= 0 => {
                    self.advance();
                    break;
                }
                _ => {}
            }
            out.push(self.advance().expect("peek succeeded"));
        }
        out
    }

    fn dotted_path(&mut self) -> Option<Path> {
        let (first, loc) = self.expect_ident()?;
        let mut segments = vec![first];
        let mut end = loc;
        while self.is_punct(Punct::Dot) {
            self.advance();
            let (seg, seg_loc) = self.expect_ident()?;
            segments.push(seg);
            end = seg_loc;
        }
        Some(Path { segments, location: loc.merge(end) })
    }

    /// Recognizes `name!` followed by a delimited argument list (§4.1), and
    /// captures its name plus comma-split argument groups.
    fn capture_macro_call(&mut self) -> Option<(StringId, Vec<TokenSpan>, Location)> {
        let (name, start) = self.expect_ident()?;
        let args = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Punct(Punct::LBrace)) => self.capture_group_list(Punct::LBrace, Punct::RBrace),
            Some(TokenKind::Punct(Punct::LParen)) => self.capture_group_list(Punct::LParen, Punct::RParen),
            Some(TokenKind::Punct(Punct::LBracket)) => self.capture_group_list(Punct::LBracket, Punct::RBracket),
            _ => {
                self.diags.push(Diagnostic::new(DiagnosticKind::ExpectedToken, start, "expected a macro argument list"));
                return None;
            }
        };
        Some((name, args, start))
    }

    // --- macro definitions ---

    /// `macro name(params) { body }`. Defines directly into the table;
    /// definitions are not themselves preparsed decls (§3's decl kind set
    /// has no `macro` entry, only `macro-expand`).
    fn take_macro_def(&mut self, macros: &mut MacroTable) -> bool {
        let save = self.pos;
        let visibility = self.take_visibility();
        if !self.is_keyword(Keyword::Macro) {
            self.pos = save;
            return false;
        }
        self.advance();
        let location = self.current_location();
        let Some((name, _)) = self.expect_ident() else {
            self.sync_to_top_level();
            return true;
        };
        let param_tokens = self.capture_group_list(Punct::LParen, Punct::RParen);
        let interner = self.interner;
        let params = param_tokens.iter().filter_map(|group| parse_macro_param(group, self.diags, interner)).collect();
        let body = self.capture_body();
        macros.define(MacroDef { name, location, params, body, visibility });
        true
    }

    // --- top-level declarations ---

    fn top_level_decl(&mut self, uses: &mut Vec<UseEdge>, includes: &mut Vec<IncludeEdge>) -> Option<PreparsedDecl> {
        let save = self.pos;
        let visibility = self.take_visibility();
        let start = self.current_location();
        let is_async = self.is_keyword(Keyword::Async) && matches!(self.peek_at(1).map(|t| &t.kind), Some(TokenKind::Keyword(Keyword::Fun)));
        if is_async {
            self.advance();
        }
        let tok = self.peek()?;
        match &tok.kind {
            TokenKind::Keyword(Keyword::Module) => Some(self.module_decl(visibility, start)),
            TokenKind::Keyword(Keyword::Fun) => Some(self.fun_decl(visibility, start, is_async)),
            TokenKind::Keyword(Keyword::Type) => Some(self.type_decl(visibility, start)),
            TokenKind::Keyword(Keyword::Error) => Some(self.error_decl(visibility, start)),
            TokenKind::Keyword(Keyword::Variable | Keyword::Val) => Some(self.const_decl(visibility, start)),
            TokenKind::Keyword(Keyword::Record) => Some(self.object_decl(visibility, start, Keyword::Record)),
            TokenKind::Keyword(Keyword::Enum) => Some(self.object_decl(visibility, start, Keyword::Enum)),
            TokenKind::Keyword(Keyword::Class) => Some(self.object_decl(visibility, start, Keyword::Class)),
            TokenKind::Keyword(Keyword::Trait) => Some(self.object_decl(visibility, start, Keyword::Trait)),
            TokenKind::Keyword(Keyword::Use) => {
                self.advance();
                let path = self.dotted_path()?;
                let alias = if self.eat_keyword(Keyword::As) { self.expect_ident().map(|(n, _)| n) } else { None };
                self.eat_punct(Punct::Semi);
                uses.push(UseEdge { path: path.clone(), alias, location: start });
                Some(PreparsedDecl {
                    kind: skeleton::DeclKind::Use,
                    name: Some(path.head()),
                    location: start,
                    visibility,
                    header: Vec::new(),
                    body: PreparsedBody::None,
                })
            }
            TokenKind::Keyword(Keyword::Include) => {
                self.advance();
                let path = self.dotted_path()?;
                self.eat_punct(Punct::Semi);
                includes.push(IncludeEdge { path: path.clone(), location: start });
                Some(PreparsedDecl {
                    kind: skeleton::DeclKind::Include,
                    name: Some(path.head()),
                    location: start,
                    visibility,
                    header: Vec::new(),
                    body: PreparsedBody::None,
                })
            }
            TokenKind::Ident { kind: crate::token::IdentKind::MacroName, .. } => {
                let (macro_name, args, location) = self.capture_macro_call()?;
                self.eat_punct(Punct::Semi);
                Some(PreparsedDecl {
                    kind: skeleton::DeclKind::MacroExpand,
                    name: Some(macro_name),
                    location,
                    visibility,
                    header: Vec::new(),
                    body: PreparsedBody::MacroExpand { macro_name, args },
                })
            }
            _ => {
                self.pos = save;
                None
            }
        }
    }

    fn module_decl(&mut self, visibility: Visibility, start: Location) -> PreparsedDecl {
        self.advance();
        let name = self.expect_ident().map(|(n, _)| n);
        let body_tokens = self.capture_body();
        let nested = Preparser::new(body_tokens, &mut *self.diags, self.interner).run();
        PreparsedDecl {
            kind: skeleton::DeclKind::Module,
            name,
            location: start,
            visibility,
            header: Vec::new(),
            body: PreparsedBody::Module(nested.decls),
        }
    }

    fn fun_decl(&mut self, visibility: Visibility, start: Location, is_async: bool) -> PreparsedDecl {
        self.advance();
        let name = self.expect_ident().map(|(n, _)| n);
        let has_generics = self.is_punct(Punct::LBracket);
        let generics = if has_generics { self.capture_balanced(Punct::LBracket, Punct::RBracket) } else { Vec::new() };
        let params = self.capture_balanced(Punct::LParen, Punct::RParen);
        let has_return_ty = self.eat_punct(Punct::Arrow);
        let return_ty = if has_return_ty { self.capture_until_body_start() } else { Vec::new() };
        // `capture_balanced` strips the delimiters it matched, but the header
        // is re-parsed by `parse_fun_decl` through `parse_generic_params` and
        // `comma_list`, which both look for the literal bracket/paren tokens
        // — so rebuild them here with synthetic markers at the same span.
        let mut header = Vec::new();
        if is_async {
            header.push(marker_keyword(Keyword::Async, start));
        }
        if has_generics {
            header.push(marker_token(Punct::LBracket, start));
            header.extend(generics);
            header.push(marker_token(Punct::RBracket, start));
        }
        header.push(marker_token(Punct::LParen, start));
        header.extend(params);
        header.push(marker_token(Punct::RParen, start));
        if has_return_ty {
            header.push(marker_token(Punct::Arrow, start));
            header.extend(return_ty);
        }
        let body = if self.eat_punct(Punct::Eq) {
            let expr = self.capture_until_semi();
            PreparsedBody::Fun(vec![FunBodyItem::Expr(expr)])
        } else if self.is_punct(Punct::LBrace) || self.is_keyword(Keyword::Begin) {
            let body_tokens = self.capture_body();
            PreparsedBody::Fun(Preparser::new(body_tokens, &mut *self.diags, self.interner).fun_items())
        } else {
            self.eat_punct(Punct::Semi);
            PreparsedBody::None
        };
        PreparsedDecl { kind: skeleton::DeclKind::Fun, name, location: start, visibility, header, body }
    }

    /// Scans up to the start of a function body (`=`, `{`, `begin`, or `;`)
    /// without consuming it, used to bound the return-type header span.
    fn capture_until_body_start(&mut self) -> TokenSpan {
        let mut out = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Punct(Punct::Eq | Punct::Semi) | TokenKind::Keyword(Keyword::Begin)) | None => break,
                Some(TokenKind::Punct(Punct::LBrace)) => break,
                _ => out.push(self.advance().expect("peek succeeded")),
            }
        }
        out
    }

    fn type_decl(&mut self, visibility: Visibility, start: Location) -> PreparsedDecl {
        self.advance();
        let name = self.expect_ident().map(|(n, _)| n);
        let has_generics = self.is_punct(Punct::LBracket);
        let generics = if has_generics { self.capture_balanced(Punct::LBracket, Punct::RBracket) } else { Vec::new() };
        self.eat_punct(Punct::Eq);
        // Same rewrap as `fun_decl`/`object_decl`: `parse_generic_params` only
        // fires when it sees a literal `[`.
        let mut header = Vec::new();
        if has_generics {
            header.push(marker_token(Punct::LBracket, start));
            header.extend(generics);
            header.push(marker_token(Punct::RBracket, start));
        }
        header.extend(self.capture_until_semi());
        PreparsedDecl { kind: skeleton::DeclKind::Type, name, location: start, visibility, header, body: PreparsedBody::None }
    }

    fn const_decl(&mut self, visibility: Visibility, start: Location) -> PreparsedDecl {
        self.advance();
        let name = self.expect_ident().map(|(n, _)| n);
        let has_ty = self.eat_punct(Punct::Colon);
        let ty = if has_ty { self.capture_until_eq() } else { Vec::new() };
        self.eat_punct(Punct::Eq);
        // `parse_headerless_decl`'s `Constant` arm looks for literal `:` and
        // `=` tokens, both of which were consumed (not captured) above.
        let mut header = Vec::new();
        if has_ty {
            header.push(marker_token(Punct::Colon, start));
            header.extend(ty);
        }
        header.push(marker_token(Punct::Eq, start));
        header.extend(self.capture_until_semi());
        PreparsedDecl { kind: skeleton::DeclKind::Constant, name, location: start, visibility, header, body: PreparsedBody::None }
    }

    fn capture_until_eq(&mut self) -> TokenSpan {
        let mut out = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Punct(Punct::Eq | Punct::Semi)) | None => break,
                _ => out.push(self.advance().expect("peek succeeded")),
            }
        }
        out
    }

    fn error_decl(&mut self, visibility: Visibility, start: Location) -> PreparsedDecl {
        self.advance();
        let name = self.expect_ident().map(|(n, _)| n);
        let has_payload = self.is_punct(Punct::LParen);
        let payload = if has_payload { self.capture_balanced(Punct::LParen, Punct::RParen) } else { Vec::new() };
        self.eat_punct(Punct::Semi);
        // `parse_headerless_decl`'s `Error` arm looks for a literal `(`.
        let mut header = Vec::new();
        if has_payload {
            header.push(marker_token(Punct::LParen, start));
            header.extend(payload);
            header.push(marker_token(Punct::RParen, start));
        }
        PreparsedDecl { kind: skeleton::DeclKind::Error, name, location: start, visibility, header, body: PreparsedBody::None }
    }

    fn object_decl(&mut self, visibility: Visibility, start: Location, head: Keyword) -> PreparsedDecl {
        self.advance();
        let mut kind = match head {
            Keyword::Record => ObjectBodyKind::Record,
            Keyword::Enum => ObjectBodyKind::Enum,
            Keyword::Class => ObjectBodyKind::Class,
            Keyword::Trait => ObjectBodyKind::Trait,
            _ => unreachable!("object_decl only called for record/enum/class/trait"),
        };
        if matches!(head, Keyword::Record | Keyword::Enum) && self.eat_keyword(Keyword::Object) {
            kind = if matches!(head, Keyword::Record) { ObjectBodyKind::RecordObject } else { ObjectBodyKind::EnumObject };
        }
        let name = self.expect_ident().map(|(n, _)| n);
        let has_generics = self.is_punct(Punct::LBracket);
        let generics = if has_generics { self.capture_balanced(Punct::LBracket, Punct::RBracket) } else { Vec::new() };
        let body_tokens = self.capture_balanced(Punct::LBrace, Punct::RBrace);
        let members = split_top_level(&body_tokens, Punct::Semi).into_iter().filter(|m| !m.is_empty()).collect();
        // See the matching comment in `fun_decl`: re-wrap the stripped
        // brackets so `parse_generic_params` finds them again.
        let mut header = Vec::new();
        if has_generics {
            header.push(marker_token(Punct::LBracket, start));
            header.extend(generics);
            header.push(marker_token(Punct::RBracket, start));
        }
        PreparsedDecl {
            kind: skeleton::DeclKind::Object,
            name,
            location: start,
            visibility,
            header,
            body: PreparsedBody::Object { kind, members },
        }
    }

    // --- fun-body items (§4.1) ---

    /// Drives this preparser (instantiated over a body's own token span) to
    /// produce the statement-shaped items inside it.
    pub(crate) fn fun_items(&mut self) -> Vec<FunBodyItem> {
        let mut items = Vec::new();
        while !self.at_eof() {
            items.push(self.fun_item());
        }
        items
    }

    fn fun_item(&mut self) -> FunBodyItem {
        let Some(tok) = self.peek() else { return FunBodyItem::Malformed };
        match &tok.kind {
            TokenKind::Punct(Punct::Semi) => {
                self.advance();
                FunBodyItem::Empty
            }
            TokenKind::Keyword(Keyword::Variable) | TokenKind::Keyword(Keyword::Val) => self.variable_item(),
            TokenKind::Keyword(Keyword::If) => self.if_item(),
            TokenKind::Keyword(Keyword::Match) => self.match_item(),
            TokenKind::Keyword(Keyword::For) => self.for_item(),
            TokenKind::Keyword(Keyword::While) => self.while_item(),
            TokenKind::Keyword(Keyword::Loop) => self.loop_item(),
            TokenKind::Keyword(Keyword::Do) => self.do_while_item(),
            TokenKind::Keyword(Keyword::Defer) => {
                self.advance();
                FunBodyItem::Defer(self.sub_items(self.capture_body_here()))
            }
            TokenKind::Keyword(Keyword::Drop) => {
                self.advance();
                FunBodyItem::Drop(self.capture_until_semi())
            }
            TokenKind::Keyword(Keyword::Try) => self.try_catch_item(),
            TokenKind::Keyword(Keyword::Unsafe) => {
                self.advance();
                FunBodyItem::Unsafe(self.sub_items(self.capture_body_here()))
            }
            TokenKind::Keyword(Keyword::Asm) => {
                self.advance();
                let tokens = self.capture_body_here();
                FunBodyItem::Asm(render_asm(&tokens))
            }
            TokenKind::Keyword(Keyword::Block) => {
                self.advance();
                FunBodyItem::Block(self.sub_items(self.capture_body_here()))
            }
            TokenKind::Keyword(Keyword::Raise) => {
                self.advance();
                FunBodyItem::Raise(self.capture_until_semi())
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                FunBodyItem::Return(self.capture_until_semi())
            }
            TokenKind::Keyword(Keyword::Next) => {
                self.advance();
                FunBodyItem::Next(self.capture_until_semi())
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                FunBodyItem::Break(self.capture_until_semi())
            }
            TokenKind::Keyword(Keyword::Await) => {
                self.advance();
                FunBodyItem::Await(self.capture_until_semi())
            }
            TokenKind::Ident { kind: crate::token::IdentKind::MacroName, .. } => {
                let Some((macro_name, args, location)) = self.capture_macro_call() else {
                    self.recover_stmt();
                    return FunBodyItem::Malformed;
                };
                self.eat_punct(Punct::Semi);
                FunBodyItem::MacroExpand { macro_name, args, location }
            }
            _ => self.assign_or_expr_item(),
        }
    }

    /// Captures this fun_item's body span (brace- or begin/end-delimited)
    /// without recursing into a fresh `Preparser`; used by callers that
    /// immediately hand the span to [`Self::sub_items`].
    fn capture_body_here(&mut self) -> TokenSpan {
        self.capture_body()
    }

    fn sub_items(&mut self, tokens: TokenSpan) -> Vec<FunBodyItem> {
        Preparser::new(tokens, &mut *self.diags, self.interner).fun_items()
    }

    fn variable_item(&mut self) -> FunBodyItem {
        let mutable = self.is_keyword(Keyword::Variable);
        self.advance();
        let name = match self.expect_ident() {
            Some((n, loc)) => vec![marker_ident(n, loc)],
            None => Vec::new(),
        };
        let ty = if self.eat_punct(Punct::Colon) { self.capture_until_eq() } else { Vec::new() };
        let init = if self.eat_punct(Punct::Eq) { self.capture_until_semi() } else {
            self.eat_punct(Punct::Semi);
            Vec::new()
        };
        FunBodyItem::Variable { mutable, name, ty, init }
    }

    fn if_item(&mut self) -> FunBodyItem {
        self.advance();
        let cond = self.capture_until_body_start();
        let capture = if self.eat_keyword(Keyword::As) { self.expect_ident().map_or(Vec::new(), |(n, l)| vec![marker_ident(n, l)]) } else { Vec::new() };
        let then_block = self.sub_items(self.capture_body_here());
        let mut elifs = Vec::new();
        while self.is_keyword(Keyword::Elif) {
            self.advance();
            let cond = self.capture_until_body_start();
            let capture = if self.eat_keyword(Keyword::As) { self.expect_ident().map_or(Vec::new(), |(n, l)| vec![marker_ident(n, l)]) } else { Vec::new() };
            let body = self.sub_items(self.capture_body_here());
            elifs.push(ElifSkeleton { cond, capture, body });
        }
        let else_block = if self.eat_keyword(Keyword::Else) { Some(self.sub_items(self.capture_body_here())) } else { None };
        FunBodyItem::If { cond, capture, then_block, elifs, else_block }
    }

    fn match_item(&mut self) -> FunBodyItem {
        self.advance();
        let scrutinee = self.capture_until_body_start();
        let body = self.capture_balanced(Punct::LBrace, Punct::RBrace);
        let arm_groups = split_top_level(&body, Punct::Comma);
        let diags = &mut *self.diags;
        let interner = self.interner;
        let mut arms = Vec::with_capacity(arm_groups.len());
        for group in arm_groups.into_iter().filter(|g| !g.is_empty()) {
            let mut arm = Preparser::new(group, &mut *diags, interner);
            let pattern = arm.capture_until_punct_or_if(Punct::FatArrow);
            let guard = if arm.eat_keyword(Keyword::If) { arm.capture_until(&[Punct::FatArrow]) } else { Vec::new() };
            arm.eat_punct(Punct::FatArrow);
            let rest: TokenSpan = arm.tokens[arm.pos..].to_vec();
            let body = if matches!(rest.first().map(|t| &t.kind), Some(TokenKind::Punct(Punct::LBrace))) {
                Preparser::new(rest, &mut *diags, interner).fun_items()
            } else {
                vec![FunBodyItem::Expr(rest)]
            };
            arms.push(MatchArmSkeleton { pattern, guard, body });
        }
        FunBodyItem::Match { scrutinee, arms }
    }

    /// Captures tokens at depth zero until one of `stops` is hit (exclusive).
    fn capture_until(&mut self, stops: &[Punct]) -> TokenSpan {
        let mut depth = 0i32;
        let mut out = Vec::new();
        while let Some(tok) = self.peek() {
            match &tok.kind {
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => depth -= 1,
                TokenKind::Punct(p) if depth <= 0 && stops.contains(p) => break,
                _ => {}
            }
            out.push(self.advance().expect("peek succeeded"));
        }
        out
    }

    /// Like [`Self::capture_until`], but also stops before a depth-zero
    /// `if` keyword (a match arm's guard introducer).
    fn capture_until_punct_or_if(&mut self, stop: Punct) -> TokenSpan {
        let mut depth = 0i32;
        let mut out = Vec::new();
        while let Some(tok) = self.peek() {
            match &tok.kind {
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => depth -= 1,
                TokenKind::Punct(p) if depth <= 0 && *p == stop => break,
                TokenKind::Keyword(Keyword::If) if depth <= 0 => break,
                _ => {}
            }
            out.push(self.advance().expect("peek succeeded"));
        }
        out
    }

    fn for_item(&mut self) -> FunBodyItem {
        self.advance();
        let binding = self.capture_until(&[Punct::Colon]);
        self.eat_punct(Punct::Colon);
        let iter = self.capture_until_body_start();
        let body = self.sub_items(self.capture_body_here());
        FunBodyItem::For { binding, iter, body, label: Vec::new() }
    }

    fn while_item(&mut self) -> FunBodyItem {
        self.advance();
        let cond = self.capture_until_body_start();
        let body = self.sub_items(self.capture_body_here());
        FunBodyItem::While { cond, body, label: Vec::new() }
    }

    fn loop_item(&mut self) -> FunBodyItem {
        self.advance();
        let body = self.sub_items(self.capture_body_here());
        FunBodyItem::Loop { body, label: Vec::new() }
    }

    fn do_while_item(&mut self) -> FunBodyItem {
        self.advance();
        let body = self.sub_items(self.capture_body_here());
        self.eat_keyword(Keyword::While);
        let cond = self.capture_until_semi();
        FunBodyItem::DoWhile { body, cond }
    }

    fn try_catch_item(&mut self) -> FunBodyItem {
        self.advance();
        let body = self.sub_items(self.capture_body_here());
        let mut catch_name = Vec::new();
        if self.eat_keyword(Keyword::Catch) {
            if let Some((n, l)) = self.try_expect_ident() {
                catch_name.push(marker_ident(n, l));
            }
        }
        let catch_body = self.sub_items(self.capture_body_here());
        FunBodyItem::TryCatch { body, catch_name, catch_body }
    }

    /// A non-diagnosing identifier probe, used where the identifier is
    /// genuinely optional (`catch { ... }` vs. `catch e { ... }`).
    fn try_expect_ident(&mut self) -> Option<(StringId, Location)> {
        match self.peek() {
            Some(Token { kind: TokenKind::Ident { name, .. }, location }) => {
                let (name, location) = (*name, *location);
                self.advance();
                Some((name, location))
            }
            _ => None,
        }
    }

    fn assign_or_expr_item(&mut self) -> FunBodyItem {
        let span = self.capture_until_semi();
        if let Some(eq_pos) = find_top_level_eq(&span) {
            FunBodyItem::Assign { target: span[..eq_pos].to_vec(), value: span[eq_pos + 1..].to_vec() }
        } else {
            FunBodyItem::Expr(span)
        }
    }

    /// After a sub-parse fails, skip to the next statement-ish boundary.
    fn recover_stmt(&mut self) {
        while let Some(tok) = self.peek() {
            if matches!(tok.kind, TokenKind::Punct(Punct::Semi)) {
                self.advance();
                return;
            }
            self.advance();
        }
    }
}

fn find_top_level_eq(span: &[Token]) -> Option<usize> {
    let mut depth = 0i32;
    for (i, tok) in span.iter().enumerate() {
        match &tok.kind {
            TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
            TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => depth -= 1,
            TokenKind::Punct(Punct::Eq) if depth == 0 => return Some(i),
            TokenKind::Punct(Punct::EqEq | Punct::ColonEq) if depth == 0 => return None,
            _ => {}
        }
    }
    None
}

/// Splits `tokens` at depth-zero occurrences of `sep`, discarding the
/// separators themselves (§4.1/§4.2: "argument token groups (split by
/// commas at depth zero)").
fn split_top_level(tokens: &[Token], sep: Punct) -> Vec<TokenSpan> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0i32;
    for tok in tokens {
        match &tok.kind {
            TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => {
                depth += 1;
                current.push(tok.clone());
            }
            TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                depth -= 1;
                current.push(tok.clone());
            }
            TokenKind::Punct(p) if *p == sep && depth == 0 => {
                groups.push(std::mem::take(&mut current));
            }
            _ => current.push(tok.clone()),
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Parses one `$name : Kind` param group (§3: `{name, kind}`).
fn parse_macro_param(group: &[Token], diags: &mut Diagnostics, interner: &crate::intern::InternerBuilder) -> Option<MacroParam> {
    use std::str::FromStr;

    let dollar_name = group.first().and_then(Token::dollar_name)?;
    let kind_tok = group.get(2)?;
    let TokenKind::Ident { name, .. } = &kind_tok.kind else {
        diags.push(Diagnostic::new(DiagnosticKind::MacroParamKindMismatch, kind_tok.location, "expected a macro parameter kind"));
        return None;
    };
    match MacroParamKind::from_str(interner.resolve(*name)) {
        Ok(kind) => Some(MacroParam { name: dollar_name, kind }),
        Err(_) => {
            diags.push(Diagnostic::new(
                DiagnosticKind::MacroParamKindMismatch,
                kind_tok.location,
                format!("unknown macro parameter kind `{}`", interner.resolve(*name)),
            ));
            None
        }
    }
}

fn marker_token(p: Punct, location: Location) -> Token {
    Token::new(TokenKind::Punct(p), location)
}

fn marker_keyword(k: Keyword, location: Location) -> Token {
    Token::new(TokenKind::Keyword(k), location)
}

fn marker_ident(name: StringId, location: Location) -> Token {
    Token::new(TokenKind::Ident { kind: crate::token::IdentKind::Normal, name }, location)
}

fn render_asm(tokens: &[Token]) -> String {
    tokens.iter().map(|_| '.').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{intern::InternerBuilder, location::Pos, token::IdentKind};

    fn tok(kind: TokenKind, file: StringId) -> Token {
        Token::new(kind, Location::point(file, Pos::default()))
    }

    fn ident(interner: &mut InternerBuilder, file: StringId, name: &str) -> Token {
        tok(TokenKind::Ident { kind: IdentKind::Normal, name: interner.intern(name) }, file)
    }

    fn punct(p: Punct, file: StringId) -> Token {
        tok(TokenKind::Punct(p), file)
    }

    fn keyword(k: Keyword, file: StringId) -> Token {
        tok(TokenKind::Keyword(k), file)
    }

    /// `fun add(a: i32, b: i32) -> i32 = a + b;` — the header rebuilt by
    /// `fun_decl` must contain literal `(`/`)`/`->` tokens, not the bare
    /// `Semi` markers the pre-fix version used, or `comma_list` and
    /// `eat_punct(Arrow)` downstream would see nothing to consume.
    #[test]
    fn fun_decl_header_rewraps_params_and_return_type() {
        let mut interner = InternerBuilder::new();
        let file = interner.intern("t.nv");
        let tokens = vec![
            keyword(Keyword::Fun, file),
            ident(&mut interner, file, "add"),
            punct(Punct::LParen, file),
            ident(&mut interner, file, "a"),
            punct(Punct::Colon, file),
            ident(&mut interner, file, "i32"),
            punct(Punct::Comma, file),
            ident(&mut interner, file, "b"),
            punct(Punct::Colon, file),
            ident(&mut interner, file, "i32"),
            punct(Punct::RParen, file),
            punct(Punct::Arrow, file),
            ident(&mut interner, file, "i32"),
            punct(Punct::Eq, file),
            ident(&mut interner, file, "a"),
            punct(Punct::Plus, file),
            ident(&mut interner, file, "b"),
            punct(Punct::Semi, file),
        ];
        let mut diags = Diagnostics::new(Vec::new());
        let result = Preparser::new(tokens, &mut diags, &interner).run();
        assert!(!diags.has_errors(), "{:?}", diags.records());
        assert_eq!(result.decls.len(), 1);
        let header = &result.decls[0].header;
        assert!(matches!(header.first().map(|t| &t.kind), Some(TokenKind::Punct(Punct::LParen))));
        assert!(header.iter().any(|t| matches!(t.kind, TokenKind::Punct(Punct::Arrow))));
        assert!(header.iter().any(|t| matches!(t.kind, TokenKind::Punct(Punct::RParen))));
    }

    /// `fun zero() = 0;` — the always-present empty parameter list must still
    /// appear as a literal `()` pair, not vanish entirely.
    #[test]
    fn fun_decl_header_wraps_empty_params() {
        let mut interner = InternerBuilder::new();
        let file = interner.intern("t.nv");
        let tokens = vec![
            keyword(Keyword::Fun, file),
            ident(&mut interner, file, "zero"),
            punct(Punct::LParen, file),
            punct(Punct::RParen, file),
            punct(Punct::Eq, file),
            tok(
                TokenKind::Literal(crate::token::Literal::Int {
                    value: num_bigint::BigInt::from(0),
                    base: crate::token::IntBase::Decimal,
                    suffix: None,
                }),
                file,
            ),
            punct(Punct::Semi, file),
        ];
        let mut diags = Diagnostics::new(Vec::new());
        let result = Preparser::new(tokens, &mut diags, &interner).run();
        assert!(!diags.has_errors(), "{:?}", diags.records());
        let header = &result.decls[0].header;
        assert_eq!(header.len(), 2);
        assert!(matches!(header[0].kind, TokenKind::Punct(Punct::LParen)));
        assert!(matches!(header[1].kind, TokenKind::Punct(Punct::RParen)));
    }

    /// `async fun go() = 1;` — the preparser must recognize the `async`
    /// prefix and surface it as a synthetic marker at the front of the
    /// header, since `parse_fun_decl` looks for a literal `Async` keyword.
    #[test]
    fn async_fun_is_recognized_and_marked() {
        let mut interner = InternerBuilder::new();
        let file = interner.intern("t.nv");
        let tokens = vec![
            keyword(Keyword::Async, file),
            keyword(Keyword::Fun, file),
            ident(&mut interner, file, "go"),
            punct(Punct::LParen, file),
            punct(Punct::RParen, file),
            punct(Punct::Eq, file),
            tok(
                TokenKind::Literal(crate::token::Literal::Int {
                    value: num_bigint::BigInt::from(1),
                    base: crate::token::IntBase::Decimal,
                    suffix: None,
                }),
                file,
            ),
            punct(Punct::Semi, file),
        ];
        let mut diags = Diagnostics::new(Vec::new());
        let result = Preparser::new(tokens, &mut diags, &interner).run();
        assert!(!diags.has_errors(), "{:?}", diags.records());
        assert_eq!(result.decls.len(), 1);
        let header = &result.decls[0].header;
        assert!(matches!(header.first().map(|t| &t.kind), Some(TokenKind::Keyword(Keyword::Async))));
    }

    /// `type Pair[T, U] = (T, U);` — generics must be rewrapped in literal
    /// `[`/`]` tokens for `parse_generic_params` to find them.
    #[test]
    fn type_decl_header_rewraps_generics() {
        let mut interner = InternerBuilder::new();
        let file = interner.intern("t.nv");
        let tokens = vec![
            keyword(Keyword::Type, file),
            ident(&mut interner, file, "Pair"),
            punct(Punct::LBracket, file),
            ident(&mut interner, file, "T"),
            punct(Punct::Comma, file),
            ident(&mut interner, file, "U"),
            punct(Punct::RBracket, file),
            punct(Punct::Eq, file),
            punct(Punct::LParen, file),
            ident(&mut interner, file, "T"),
            punct(Punct::Comma, file),
            ident(&mut interner, file, "U"),
            punct(Punct::RParen, file),
            punct(Punct::Semi, file),
        ];
        let mut diags = Diagnostics::new(Vec::new());
        let result = Preparser::new(tokens, &mut diags, &interner).run();
        assert!(!diags.has_errors(), "{:?}", diags.records());
        let header = &result.decls[0].header;
        assert!(matches!(header.first().map(|t| &t.kind), Some(TokenKind::Punct(Punct::LBracket))));
        assert!(header.iter().any(|t| matches!(t.kind, TokenKind::Punct(Punct::RBracket))));
    }

    /// `error Boom(str);` — the payload parens must survive as literal
    /// tokens for `parse_headerless_decl`'s `Error` arm to see them.
    #[test]
    fn error_decl_header_rewraps_payload() {
        let mut interner = InternerBuilder::new();
        let file = interner.intern("t.nv");
        let tokens = vec![
            keyword(Keyword::Error, file),
            ident(&mut interner, file, "Boom"),
            punct(Punct::LParen, file),
            ident(&mut interner, file, "Str"),
            punct(Punct::RParen, file),
            punct(Punct::Semi, file),
        ];
        let mut diags = Diagnostics::new(Vec::new());
        let result = Preparser::new(tokens, &mut diags, &interner).run();
        assert!(!diags.has_errors(), "{:?}", diags.records());
        let header = &result.decls[0].header;
        assert_eq!(header.len(), 3);
        assert!(matches!(header[0].kind, TokenKind::Punct(Punct::LParen)));
        assert!(matches!(header[2].kind, TokenKind::Punct(Punct::RParen)));
    }

    /// `val x: i32 = 1;` — the colon and equals must survive as literal
    /// tokens for `parse_headerless_decl`'s `Constant` arm to see them.
    #[test]
    fn const_decl_header_rewraps_colon_and_eq() {
        let mut interner = InternerBuilder::new();
        let file = interner.intern("t.nv");
        let tokens = vec![
            keyword(Keyword::Val, file),
            ident(&mut interner, file, "x"),
            punct(Punct::Colon, file),
            ident(&mut interner, file, "i32"),
            punct(Punct::Eq, file),
            tok(
                TokenKind::Literal(crate::token::Literal::Int {
                    value: num_bigint::BigInt::from(1),
                    base: crate::token::IntBase::Decimal,
                    suffix: None,
                }),
                file,
            ),
            punct(Punct::Semi, file),
        ];
        let mut diags = Diagnostics::new(Vec::new());
        let result = Preparser::new(tokens, &mut diags, &interner).run();
        assert!(!diags.has_errors(), "{:?}", diags.records());
        let header = &result.decls[0].header;
        assert!(matches!(header.first().map(|t| &t.kind), Some(TokenKind::Punct(Punct::Colon))));
        assert!(header.iter().any(|t| matches!(t.kind, TokenKind::Punct(Punct::Eq))));
    }
}
