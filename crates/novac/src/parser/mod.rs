//! The recursive-descent parser (§4.3). Each preparsed token span becomes its
//! own [`ParseBlock`]; every sub-parse is required to consume its whole
//! buffer (the `CHECK_X` protocol) or a "expected only one X" diagnostic is
//! raised and the leftover tokens are dropped.

pub mod expr;
pub mod pattern;
pub mod types;

use crate::{
    ast::{
        Identifier, Path, Spanned, Visibility,
        decl::{
            ClassBody, ConstDecl, Decl, DeclHeader, EnumBody, EnumObjectBody, ErrorDecl, FieldDecl, FunBody, FunDecl,
            IncludeDecl, ModuleDecl, ObjectDecl, ObjectKind, Param, RecordBody, RecordObjectBody, TraitBody, TypeDecl,
            UseDecl, VariantDecl,
        },
        stmt::{ElifClause, MatchArmStmt, Stmt},
    },
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    intern::{InternerBuilder, StringId},
    location::Location,
    preparse::{
        macros::{self, MacroTable},
        skeleton::{ElifSkeleton, FunBodyItem, MatchArmSkeleton, ObjectBodyKind, PreparsedBody, PreparsedDecl, TokenSpan},
    },
    token::{Keyword, Punct, Token, TokenKind},
};

/// A cursor over one token span, producing AST nodes. Mirrors the
/// preparser's `Preparser` cursor idiom, reborrowing the same long-lived
/// diagnostics sink and interner through every recursively-constructed block.
pub struct ParseBlock<'d> {
    tokens: TokenSpan,
    pos: usize,
    diags: &'d mut Diagnostics,
    interner: &'d InternerBuilder,
}

impl<'d> ParseBlock<'d> {
    #[must_use]
    pub fn new(tokens: TokenSpan, diags: &'d mut Diagnostics, interner: &'d InternerBuilder) -> Self {
        Self { tokens, pos: 0, diags, interner }
    }

    fn resolve(&self, id: StringId) -> &str {
        self.interner.resolve(id)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len() || self.tokens[self.pos].is_eof()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        if self.at_eof() {
            return None;
        }
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        Some(tok)
    }

    fn current_location(&self) -> Location {
        self.peek().map_or_else(|| self.previous_location().unwrap_or_else(dummy_location), |t| t.location)
    }

    fn previous_location(&self) -> Option<Location> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).map(|t| t.location)
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

    fn expect_ident(&mut self) -> Option<(StringId, Location)> {
        match self.peek() {
            Some(Token { kind: TokenKind::Ident { name, .. }, location }) => {
                let (name, location) = (*name, *location);
                self.advance();
                Some((name, location))
            }
            _ => {
                self.error_here(DiagnosticKind::ExpectedIdentifier, "expected an identifier");
                None
            }
        }
    }

    fn expect_close(&mut self, p: Punct) {
        if !self.eat_punct(p) {
            self.error_here(DiagnosticKind::ExpectedToken, format!("expected `{p}`"));
        }
    }

    fn error_here(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let loc = self.current_location();
        self.diags.push(Diagnostic::new(kind, loc, message));
    }

    /// Parses a comma-separated, bracket-delimited list. Used for generic
    /// argument lists, parameter lists, tuple/array literals, and data-type
    /// argument lists alike.
    fn comma_list<T>(&mut self, open: Punct, close: Punct, mut f: impl FnMut(&mut Self) -> T) -> Vec<T> {
        if !self.eat_punct(open) {
            return Vec::new();
        }
        let mut out = Vec::new();
        while !self.is_punct(close) && !self.at_eof() {
            out.push(f(self));
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_close(close);
        out
    }

    /// The `CHECK_X` protocol (§4.3): a sub-parse must consume its entire
    /// buffer. Leftover tokens are a diagnosed error, not silently dropped.
    fn check_exhausted(&mut self, kind: DiagnosticKind, what: &str) {
        if !self.at_eof() {
            let loc = self.current_location();
            self.diags.push(Diagnostic::new(kind, loc, format!("expected only one {what}")));
        }
    }
}

fn dummy_location() -> Location {
    Location::point(StringId::default(), crate::location::Pos::new(0, 0, 0))
}

// --- entry points: preparsed skeleton -> AST ---

/// Parses every top-level declaration a file's preparser produced, expanding
/// any top-level macro-call shapes along the way (§4.2 step 5/6).
pub fn parse_decls(decls: Vec<PreparsedDecl>, macros: &MacroTable, diags: &mut Diagnostics, interner: &InternerBuilder) -> Vec<Decl> {
    let mut out = Vec::with_capacity(decls.len());
    for decl in decls {
        out.extend(parse_top_level(decl, macros, diags, interner));
    }
    out
}

fn parse_top_level(decl: PreparsedDecl, macros: &MacroTable, diags: &mut Diagnostics, interner: &InternerBuilder) -> Vec<Decl> {
    if let PreparsedBody::MacroExpand { macro_name, args } = &decl.body {
        return match expand_and_reparse(*macro_name, args, decl.location, macros, diags, interner) {
            Some(expanded) => parse_decls(expanded.decls, macros, diags, interner),
            None => vec![Decl::Malformed],
        };
    }
    vec![parse_decl(decl, macros, diags, interner)]
}

fn expand_and_reparse(
    macro_name: StringId,
    args: &[TokenSpan],
    call_site: Location,
    macros: &MacroTable,
    diags: &mut Diagnostics,
    interner: &InternerBuilder,
) -> Option<crate::preparse::PreparseResult> {
    let def = match macros.lookup(macro_name) {
        Ok(def) => def,
        Err(_) => {
            diags.push(Diagnostic::new(DiagnosticKind::MacroNotFound, call_site, "macro not found"));
            return None;
        }
    };
    let expanded = macros::expand(def, args, call_site, diags)?;
    Some(crate::preparse::Preparser::new(expanded, diags, interner).run())
}

/// Re-expands a statement-position macro call and re-runs the fun-body
/// shape recognizer over the result (§4.2 step 5/6).
fn expand_stmt_macro(
    macro_name: StringId,
    args: &[TokenSpan],
    call_site: Location,
    macros: &MacroTable,
    diags: &mut Diagnostics,
    interner: &InternerBuilder,
) -> Option<Vec<FunBodyItem>> {
    let def = match macros.lookup(macro_name) {
        Ok(def) => def,
        Err(_) => {
            diags.push(Diagnostic::new(DiagnosticKind::MacroNotFound, call_site, "macro not found"));
            return None;
        }
    };
    let expanded = macros::expand(def, args, call_site, diags)?;
    Some(crate::preparse::Preparser::new(expanded, diags, interner).fun_items())
}

fn parse_decl(decl: PreparsedDecl, macros: &MacroTable, diags: &mut Diagnostics, interner: &InternerBuilder) -> Decl {
    let Some(name) = decl.name else { return Decl::Malformed };
    let header = DeclHeader { location: decl.location, visibility: decl.visibility, name, global_name: None };
    match decl.body {
        PreparsedBody::None => parse_headerless_decl(decl.kind, header, decl.header, diags, interner),
        PreparsedBody::Fun(items) => parse_fun_decl(header, decl.header, items, macros, diags, interner),
        PreparsedBody::Object { kind, members } => parse_object_decl(header, decl.header, kind, members, diags, interner),
        PreparsedBody::Module(children) => {
            Decl::Module(ModuleDecl { header, body: parse_decls(children, macros, diags, interner) })
        }
        PreparsedBody::MacroExpand { .. } => Decl::Malformed,
    }
}

fn parse_headerless_decl(
    kind: crate::preparse::skeleton::DeclKind,
    header: DeclHeader,
    raw: TokenSpan,
    diags: &mut Diagnostics,
    interner: &InternerBuilder,
) -> Decl {
    use crate::preparse::skeleton::DeclKind;
    let mut block = ParseBlock::new(raw, diags, interner);
    match kind {
        DeclKind::Type => {
            let generics = block.parse_generic_params();
            block.eat_punct(Punct::Eq);
            let target = block.parse_data_type();
            block.check_exhausted(DiagnosticKind::ExpectedOnlyOneDataType, "type alias body");
            Decl::Type(TypeDecl { header, generics, target })
        }
        DeclKind::Constant => {
            let ty = if block.eat_punct(Punct::Colon) { Some(block.parse_data_type()) } else { None };
            block.eat_punct(Punct::Eq);
            let value = block.parse_expr();
            Decl::Const(ConstDecl { header, ty, value })
        }
        DeclKind::Error => {
            let payload = if block.is_punct(Punct::LParen) {
                block.advance();
                let ty = block.parse_data_type();
                block.expect_close(Punct::RParen);
                Some(ty)
            } else {
                None
            };
            Decl::ErrorDef(ErrorDecl { header, payload })
        }
        DeclKind::Use => {
            let path = block.parse_path();
            let alias = if block.eat_keyword(Keyword::As) { block.expect_ident().map(|(n, _)| n) } else { None };
            Decl::Use(UseDecl { header, path, alias })
        }
        DeclKind::Include => {
            let path = block.parse_path();
            Decl::Include(IncludeDecl { header, path })
        }
        DeclKind::Fun | DeclKind::Module | DeclKind::Object | DeclKind::MacroExpand => Decl::Malformed,
    }
}

fn parse_fun_decl(
    header: DeclHeader,
    raw_header: TokenSpan,
    items: Vec<FunBodyItem>,
    macros: &MacroTable,
    diags: &mut Diagnostics,
    interner: &InternerBuilder,
) -> Decl {
    let mut block = ParseBlock::new(raw_header, diags, interner);
    let is_async = block.eat_keyword(Keyword::Async);
    let generics = block.parse_generic_params();
    let params = block.comma_list(Punct::LParen, Punct::RParen, ParseBlock::parse_param);
    let return_ty = if block.eat_punct(Punct::Arrow) {
        block.parse_data_type()
    } else {
        Spanned::new(crate::ast::data_type::DataType::Primitive(crate::ast::data_type::Primitive::Unit), header.location)
    };
    block.check_exhausted(DiagnosticKind::ExpectedToken, "function signature");
    let body = if items.len() == 1 {
        if let FunBodyItem::Expr(tokens) = &items[0] {
            let mut eb = ParseBlock::new(tokens.clone(), diags, interner);
            let e = eb.parse_expr();
            eb.check_exhausted(DiagnosticKind::ExpectedOnlyOneExpression, "expression body");
            FunBody::Expr(e)
        } else {
            FunBody::Block(parse_block(items, macros, diags, interner))
        }
    } else if items.is_empty() {
        FunBody::None
    } else {
        FunBody::Block(parse_block(items, macros, diags, interner))
    };
    Decl::Fun(FunDecl { header, generics, params, return_ty, body, is_async })
}

fn parse_object_decl(
    header: DeclHeader,
    raw_header: TokenSpan,
    kind: ObjectBodyKind,
    members: Vec<TokenSpan>,
    diags: &mut Diagnostics,
    interner: &InternerBuilder,
) -> Decl {
    let mut block = ParseBlock::new(raw_header, diags, interner);
    let generics = block.parse_generic_params();
    let implements = if block.eat_keyword(Keyword::As) { block.comma_list(Punct::LParen, Punct::RParen, ParseBlock::parse_path) } else { Vec::new() };
    block.check_exhausted(DiagnosticKind::ExpectedToken, "object header");

    let object_kind = match kind {
        ObjectBodyKind::Record => ObjectKind::Record(RecordBody { fields: parse_fields(&members, diags, interner) }),
        ObjectBodyKind::RecordObject => ObjectKind::RecordObject(RecordObjectBody {
            fields: parse_fields(&member_field_tokens(&members), diags, interner),
            methods: parse_methods(&member_method_tokens(&members), diags, interner),
        }),
        ObjectBodyKind::Enum => ObjectKind::Enum(EnumBody { variants: parse_variants(&members, diags, interner) }),
        ObjectBodyKind::EnumObject => ObjectKind::EnumObject(EnumObjectBody {
            variants: parse_variants(&member_field_tokens(&members), diags, interner),
            methods: parse_methods(&member_method_tokens(&members), diags, interner),
        }),
        ObjectBodyKind::Class => ObjectKind::Class(ClassBody {
            fields: parse_fields(&member_field_tokens(&members), diags, interner),
            methods: parse_methods(&member_method_tokens(&members), diags, interner),
            implements,
        }),
        ObjectBodyKind::Trait => ObjectKind::Trait(TraitBody { methods: parse_methods(&members, diags, interner) }),
    };
    Decl::Object(ObjectDecl { header, generics, kind: object_kind })
}

/// Members of record/enum/class bodies mix field-or-variant spans with
/// embedded `fun` member spans; split on whether the span starts with `fun`.
fn member_field_tokens(members: &[TokenSpan]) -> Vec<TokenSpan> {
    members.iter().filter(|m| !starts_with_fun(m)).cloned().collect()
}

fn member_method_tokens(members: &[TokenSpan]) -> Vec<TokenSpan> {
    members.iter().filter(|m| starts_with_fun(m)).cloned().collect()
}

fn starts_with_fun(span: &TokenSpan) -> bool {
    span.iter().any(|t| matches!(t.kind, TokenKind::Keyword(Keyword::Fun)))
        && matches!(span.first().map(|t| &t.kind), Some(TokenKind::Keyword(Keyword::Pub) | TokenKind::Keyword(Keyword::Fun)))
}

fn parse_fields(members: &[TokenSpan], diags: &mut Diagnostics, interner: &InternerBuilder) -> Vec<FieldDecl> {
    members
        .iter()
        .filter_map(|span| {
            let mut block = ParseBlock::new(span.clone(), diags, interner);
            let visibility = if block.eat_keyword(Keyword::Pub) { Visibility::Public } else { Visibility::Private };
            let (name, _) = block.expect_ident()?;
            block.eat_punct(Punct::Colon);
            let ty = block.parse_data_type();
            Some(FieldDecl { name, ty, visibility })
        })
        .collect()
}

fn parse_variants(members: &[TokenSpan], diags: &mut Diagnostics, interner: &InternerBuilder) -> Vec<VariantDecl> {
    members
        .iter()
        .filter_map(|span| {
            let mut block = ParseBlock::new(span.clone(), diags, interner);
            let (name, _) = block.expect_ident()?;
            let value = if block.eat_punct(Punct::LParen) {
                let ty = block.parse_data_type();
                block.expect_close(Punct::RParen);
                Some(ty)
            } else {
                None
            };
            Some(VariantDecl { name, value })
        })
        .collect()
}

fn parse_methods(members: &[TokenSpan], diags: &mut Diagnostics, interner: &InternerBuilder) -> Vec<FunDecl> {
    members
        .iter()
        .filter_map(|span| {
            let inner_tokens = span.clone();
            let mut inner_diags = Diagnostics::new(Vec::new());
            let macros = MacroTable::new();
            let result = crate::preparse::Preparser::new(inner_tokens, &mut inner_diags, interner).run();
            for record in inner_diags.records() {
                diags.push(record.clone());
            }
            result.decls.into_iter().find_map(|d| match parse_decl(d, &macros, diags, interner) {
                Decl::Fun(f) => Some(f),
                _ => None,
            })
        })
        .collect()
}

// --- statements ---

pub fn parse_block(items: Vec<FunBodyItem>, macros: &MacroTable, diags: &mut Diagnostics, interner: &InternerBuilder) -> Vec<Spanned<Stmt>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.extend(parse_stmt(item, macros, diags, interner));
    }
    out
}

fn loc_of(span: &TokenSpan) -> Location {
    span.first().map_or_else(dummy_location, |t| t.location)
}

/// Best-effort source location for a fun-body item, taken from the first
/// non-empty token span it carries. Used so statement nodes whose shape has
/// no single "head token" (e.g. `Empty`) still get a real location.
fn item_location(item: &FunBodyItem) -> Location {
    let spans: Vec<&TokenSpan> = match item {
        FunBodyItem::Expr(s) | FunBodyItem::Drop(s) | FunBodyItem::Asm(s) | FunBodyItem::Raise(s) | FunBodyItem::Return(s) => {
            vec![s]
        }
        FunBodyItem::Next(s) | FunBodyItem::Break(s) | FunBodyItem::Await(s) => vec![s],
        FunBodyItem::Variable { name, .. } => vec![name],
        FunBodyItem::Assign { target, .. } => vec![target],
        FunBodyItem::If { cond, .. } => vec![cond],
        FunBodyItem::Match { scrutinee, .. } => vec![scrutinee],
        FunBodyItem::For { binding, .. } => vec![binding],
        FunBodyItem::While { cond, .. } => vec![cond],
        FunBodyItem::DoWhile { cond, .. } => vec![cond],
        FunBodyItem::MacroExpand { location, .. } => return *location,
        FunBodyItem::Loop { .. }
        | FunBodyItem::Defer(_)
        | FunBodyItem::TryCatch { .. }
        | FunBodyItem::Unsafe(_)
        | FunBodyItem::Block(_)
        | FunBodyItem::Empty
        | FunBodyItem::Malformed => vec![],
    };
    spans.into_iter().find_map(|s| s.first()).map_or_else(dummy_location, |t| t.location)
}

fn parse_stmt(item: FunBodyItem, macros: &MacroTable, diags: &mut Diagnostics, interner: &InternerBuilder) -> Vec<Spanned<Stmt>> {
    let loc = item_location(&item);
    let node = match item {
        FunBodyItem::Expr(tokens) => {
            let mut b = ParseBlock::new(tokens, diags, interner);
            let e = b.parse_expr();
            b.check_exhausted(DiagnosticKind::ExpectedOnlyOneExpression, "expression statement");
            return vec![Spanned::new(Stmt::Expr(e), loc)];
        }
        FunBodyItem::Variable { mutable, name, ty, init } => {
            let mut nb = ParseBlock::new(name, diags, interner);
            let Some((n, nloc)) = nb.expect_ident() else { return vec![Spanned::new(Stmt::Malformed, loc)] };
            let ty = if ty.is_empty() { None } else { Some(ParseBlock::new(ty, diags, interner).parse_data_type()) };
            let init = if init.is_empty() { None } else { Some(ParseBlock::new(init, diags, interner).parse_expr()) };
            Stmt::Variable { mutable, name: Identifier::new(n, nloc), ty, init }
        }
        FunBodyItem::Assign { target, value } => {
            let target = ParseBlock::new(target, diags, interner).parse_expr();
            let value = ParseBlock::new(value, diags, interner).parse_expr();
            Stmt::Assign { target, value }
        }
        FunBodyItem::If { cond, capture, then_block, elifs, else_block } => {
            let cond_e = ParseBlock::new(cond, diags, interner).parse_expr();
            let capture = parse_capture(capture, diags, interner);
            let then_block = parse_block(then_block, macros, diags, interner);
            let elifs = elifs.into_iter().map(|e| parse_elif(e, macros, diags, interner)).collect();
            let else_block = else_block.map(|b| parse_block(b, macros, diags, interner));
            Stmt::If { cond: cond_e, capture, then_block, elifs, else_block }
        }
        FunBodyItem::Match { scrutinee, arms } => {
            let scrutinee = ParseBlock::new(scrutinee, diags, interner).parse_expr();
            let arms = arms.into_iter().map(|a| parse_match_arm(a, macros, diags, interner)).collect();
            Stmt::Match { scrutinee, arms }
        }
        FunBodyItem::For { binding, iter, body, label } => {
            let binding = ParseBlock::new(binding, diags, interner).parse_pattern();
            let iter = ParseBlock::new(iter, diags, interner).parse_expr();
            let body = parse_block(body, macros, diags, interner);
            let label = label_of(&label, diags, interner);
            Stmt::For { binding, iter, body, label }
        }
        FunBodyItem::While { cond, body, label } => {
            let cond = ParseBlock::new(cond, diags, interner).parse_expr();
            let body = parse_block(body, macros, diags, interner);
            let label = label_of(&label, diags, interner);
            Stmt::While { cond, body, label }
        }
        FunBodyItem::Loop { body, label } => {
            let body = parse_block(body, macros, diags, interner);
            let label = label_of(&label, diags, interner);
            Stmt::Loop { body, label }
        }
        FunBodyItem::DoWhile { body, cond } => {
            let body = parse_block(body, macros, diags, interner);
            let cond = ParseBlock::new(cond, diags, interner).parse_expr();
            Stmt::DoWhile { body, cond }
        }
        FunBodyItem::Defer(body) => Stmt::Defer(parse_block(body, macros, diags, interner)),
        FunBodyItem::Drop(tokens) => Stmt::Drop(ParseBlock::new(tokens, diags, interner).parse_expr()),
        FunBodyItem::TryCatch { body, catch_name, catch_body } => {
            let body = parse_block(body, macros, diags, interner);
            let catch_name = parse_capture(catch_name, diags, interner);
            let catch_body = parse_block(catch_body, macros, diags, interner);
            Stmt::TryCatch { body, catch_name, catch_body }
        }
        FunBodyItem::Unsafe(body) => Stmt::Unsafe(parse_block(body, macros, diags, interner)),
        FunBodyItem::Asm(tokens) => Stmt::Asm(render_asm_text(&tokens, interner)),
        FunBodyItem::Block(body) => Stmt::Block(parse_block(body, macros, diags, interner)),
        FunBodyItem::Raise(tokens) => Stmt::Raise(ParseBlock::new(tokens, diags, interner).parse_expr()),
        FunBodyItem::Return(tokens) => {
            Stmt::Return(if tokens.is_empty() { None } else { Some(ParseBlock::new(tokens, diags, interner).parse_expr()) })
        }
        FunBodyItem::Next(tokens) => Stmt::Next(label_of(&tokens, diags, interner)),
        FunBodyItem::Break(tokens) => Stmt::Break(label_of(&tokens, diags, interner)),
        FunBodyItem::Await(tokens) => {
            let loc = loc_of(&tokens);
            let e = ParseBlock::new(tokens, diags, interner).parse_expr();
            Stmt::Expr(Spanned::new(crate::ast::expr::Expr::Await(Box::new(e)), loc))
        }
        FunBodyItem::Empty => Stmt::Empty,
        FunBodyItem::MacroExpand { macro_name, args, location } => {
            return match expand_stmt_macro(macro_name, &args, location, macros, diags, interner) {
                Some(items) => parse_block(items, macros, diags, interner),
                None => vec![Spanned::new(Stmt::Malformed, location)],
            };
        }
        FunBodyItem::Malformed => Stmt::Malformed,
    };
    vec![Spanned::new(node, loc)]
}

fn parse_capture(tokens: TokenSpan, diags: &mut Diagnostics, interner: &InternerBuilder) -> Option<Identifier> {
    if tokens.is_empty() {
        return None;
    }
    ParseBlock::new(tokens, diags, interner).expect_ident().map(|(n, l)| Identifier::new(n, l))
}

fn label_of(tokens: &TokenSpan, diags: &mut Diagnostics, interner: &InternerBuilder) -> Option<StringId> {
    if tokens.is_empty() {
        return None;
    }
    ParseBlock::new(tokens.clone(), diags, interner).expect_ident().map(|(n, _)| n)
}

fn parse_elif(elif: ElifSkeleton, macros: &MacroTable, diags: &mut Diagnostics, interner: &InternerBuilder) -> ElifClause {
    let cond = ParseBlock::new(elif.cond, diags, interner).parse_expr();
    let capture = parse_capture(elif.capture, diags, interner);
    let body = parse_block(elif.body, macros, diags, interner);
    ElifClause { cond, capture, body }
}

fn parse_match_arm(arm: MatchArmSkeleton, macros: &MacroTable, diags: &mut Diagnostics, interner: &InternerBuilder) -> MatchArmStmt {
    let pattern = ParseBlock::new(arm.pattern, diags, interner).parse_pattern();
    let guard = if arm.guard.is_empty() { None } else { Some(ParseBlock::new(arm.guard, diags, interner).parse_expr()) };
    let body = parse_block(arm.body, macros, diags, interner);
    MatchArmStmt { pattern, guard, body }
}

fn render_asm_text(tokens: &TokenSpan, interner: &InternerBuilder) -> String {
    tokens
        .iter()
        .map(|t| match &t.kind {
            TokenKind::Ident { name, .. } => interner.resolve(*name).to_owned(),
            TokenKind::Literal(crate::token::Literal::Str(s)) => interner.resolve(*s).to_owned(),
            TokenKind::Punct(p) => p.to_string(),
            _ => String::new(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// --- shared sub-grammar: generics, params, paths ---

impl ParseBlock<'_> {
    fn parse_generic_params(&mut self) -> Vec<StringId> {
        if !self.is_punct(Punct::LBracket) {
            return Vec::new();
        }
        self.comma_list(Punct::LBracket, Punct::RBracket, |b| b.expect_ident().map_or(StringId::default(), |(n, _)| n))
    }

    fn parse_param(&mut self) -> Param {
        let Some((name, loc)) = self.expect_ident() else {
            return Param {
                name: Identifier::new(StringId::default(), dummy_location()),
                ty: Spanned::new(crate::ast::data_type::DataType::Malformed, dummy_location()),
                default: None,
            };
        };
        self.eat_punct(Punct::Colon);
        let ty = self.parse_data_type();
        let default = if self.eat_punct(Punct::ColonEq) { Some(self.parse_expr()) } else { None };
        Param { name: Identifier::new(name, loc), ty, default }
    }

    fn parse_path(&mut self) -> Path {
        let start = self.current_location();
        let Some((first, _)) = self.expect_ident() else { return Path::single(StringId::default(), start) };
        let mut segments = vec![first];
        while self.eat_punct(Punct::Dot) {
            if let Some((seg, _)) = self.expect_ident() {
                segments.push(seg);
            }
        }
        let end = self.previous_location().unwrap_or(start);
        Path { segments, location: start.merge(end) }
    }
}
