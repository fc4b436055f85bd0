//! The literal end-to-end scenarios, each built as a hand-written token
//! stream (no scanner lives in this crate) fed straight into `Package::compile`.

use novac::{
    config::CompilerConfig,
    intern::{InternerBuilder, StringId},
    location::{Location, Pos},
    package::Package,
    token::{IntBase, Keyword, Literal, Punct, Token, TokenKind},
};

fn tok(kind: TokenKind, file: StringId) -> Token {
    Token::new(kind, Location::point(file, Pos::default()))
}

fn ident(interner: &mut InternerBuilder, file: StringId, name: &str) -> Token {
    tok(TokenKind::Ident { kind: novac::token::IdentKind::Normal, name: interner.intern(name) }, file)
}

fn int_lit(file: StringId, value: i64) -> Token {
    tok(
        TokenKind::Literal(Literal::Int { value: num_bigint::BigInt::from(value), base: IntBase::Decimal, suffix: None }),
        file,
    )
}

fn str_lit(interner: &mut InternerBuilder, file: StringId, text: &str) -> Token {
    tok(TokenKind::Literal(Literal::Str(interner.intern(text))), file)
}

fn punct(p: Punct, file: StringId) -> Token {
    tok(TokenKind::Punct(p), file)
}

fn keyword(k: Keyword, file: StringId) -> Token {
    tok(TokenKind::Keyword(k), file)
}

fn eof(file: StringId) -> Token {
    tok(TokenKind::Eof, file)
}

/// E1: `fun add(a: i32, b: i32) -> i32 = a + b;` lowers to a single fun whose
/// body adds its two params.
#[test]
fn e1_binary_addition_of_two_params() {
    let mut interner = InternerBuilder::new();
    let file = interner.intern("e1.nv");
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
        eof(file),
    ];

    let result = Package::new(&mut interner, CompilerConfig::new()).compile(vec![tokens]);
    assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics.records());
    let mir = result.mir.expect("clean compile reaches MIR");
    assert_eq!(mir.items.len(), 1);
}

/// E2: `fun pick() -> i32 = if 1 == 1 2 else 3;` — an if-expression used as a
/// fun's whole body, lowered through `lower_if_expr`'s branch/merge blocks.
#[test]
fn e2_if_expression_used_as_fun_body() {
    let mut interner = InternerBuilder::new();
    let file = interner.intern("e2.nv");
    let tokens = vec![
        keyword(Keyword::Fun, file),
        ident(&mut interner, file, "pick"),
        punct(Punct::LParen, file),
        punct(Punct::RParen, file),
        punct(Punct::Arrow, file),
        ident(&mut interner, file, "i32"),
        punct(Punct::Eq, file),
        keyword(Keyword::If, file),
        int_lit(file, 1),
        punct(Punct::EqEq, file),
        int_lit(file, 1),
        int_lit(file, 2),
        keyword(Keyword::Else, file),
        int_lit(file, 3),
        punct(Punct::Semi, file),
        eof(file),
    ];

    let result = Package::new(&mut interner, CompilerConfig::new()).compile(vec![tokens]);
    assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics.records());
    let mir = result.mir.expect("clean compile reaches MIR");
    assert_eq!(mir.items.len(), 1);
}

/// E3 (mechanical half): a macro definition is captured and a call site
/// expands and reparses cleanly. Whether the raised error name resolves is
/// exercised separately by the analyzer's own name-resolution tests; this
/// checks the preparse/macro/parse pipeline alone.
#[test]
fn e3_macro_call_expands_and_parses() {
    let mut interner = InternerBuilder::new();
    let file = interner.intern("e3.nv");
    let dollar_a = tok(TokenKind::Ident { kind: novac::token::IdentKind::Dollar, name: interner.intern("a") }, file);
    let dollar_b = tok(TokenKind::Ident { kind: novac::token::IdentKind::Dollar, name: interner.intern("b") }, file);
    let macro_name = tok(TokenKind::Ident { kind: novac::token::IdentKind::MacroName, name: interner.intern("assert_eq") }, file);

    let mut tokens = vec![
        keyword(Keyword::Macro, file),
        ident(&mut interner, file, "assert_eq"),
        punct(Punct::LParen, file),
        dollar_a.clone(),
        punct(Punct::Colon, file),
        ident(&mut interner, file, "Expr"),
        punct(Punct::Comma, file),
        dollar_b.clone(),
        punct(Punct::Colon, file),
        ident(&mut interner, file, "Expr"),
        punct(Punct::RParen, file),
        punct(Punct::LBrace, file),
        keyword(Keyword::If, file),
        dollar_a,
        punct(Punct::NotEq, file),
        dollar_b,
        punct(Punct::LBrace, file),
        keyword(Keyword::Raise, file),
        ident(&mut interner, file, "AssertFailed"),
        punct(Punct::Semi, file),
        punct(Punct::RBrace, file),
        punct(Punct::RBrace, file),
        keyword(Keyword::Error, file),
        ident(&mut interner, file, "AssertFailed"),
        punct(Punct::Semi, file),
        keyword(Keyword::Fun, file),
        ident(&mut interner, file, "main"),
        punct(Punct::LParen, file),
        punct(Punct::RParen, file),
        punct(Punct::Eq, file),
        macro_name,
        punct(Punct::LParen, file),
        int_lit(file, 1),
        punct(Punct::Comma, file),
        int_lit(file, 1),
        punct(Punct::RParen, file),
        punct(Punct::Semi, file),
    ];
    tokens.push(eof(file));

    let result = Package::new(&mut interner, CompilerConfig::new()).compile(vec![tokens]);
    assert!(
        result.decls.iter().any(|d| d.node.header().is_some_and(|h| interner.resolve(h.name) == "main")),
        "macro-expanded call site should still parse into a `main` fun decl"
    );
}

/// E4: `type Pair[T, U] = (T, U); val p: Pair[i32, Str] = (1, "x");` — a
/// generic type alias, instantiated against a const's annotation, checks the
/// const's value against the alias's substituted target type `(i32, Str)`
/// and lowers the const to one MIR `Item::Const`.
#[test]
fn e4_generic_type_alias_and_annotated_const() {
    let mut interner = InternerBuilder::new();
    let file = interner.intern("e4.nv");
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
        keyword(Keyword::Val, file),
        ident(&mut interner, file, "p"),
        punct(Punct::Colon, file),
        ident(&mut interner, file, "Pair"),
        punct(Punct::LBracket, file),
        ident(&mut interner, file, "i32"),
        punct(Punct::Comma, file),
        ident(&mut interner, file, "Str"),
        punct(Punct::RBracket, file),
        punct(Punct::Eq, file),
        punct(Punct::LParen, file),
        int_lit(file, 1),
        punct(Punct::Comma, file),
        str_lit(&mut interner, file, "x"),
        punct(Punct::RParen, file),
        punct(Punct::Semi, file),
        eof(file),
    ];

    let result = Package::new(&mut interner, CompilerConfig::new()).compile(vec![tokens]);
    assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics.records());

    let pair = result.decls.iter().find_map(|d| match &d.node {
        novac::ast::decl::Decl::Type(t) if interner.resolve(t.header.name) == "Pair" => Some(t),
        _ => None,
    });
    let pair = pair.expect("Pair type alias should parse");
    assert_eq!(pair.generics.len(), 2);

    let checked = result.checked.expect("clean compile should reach the analyzer");
    let p = checked
        .consts
        .iter()
        .find(|c| interner.resolve(c.global_name) == "p")
        .expect("p const should be checked");
    assert_eq!(
        p.ty,
        novac::analyze::types::CheckedType::Tuple(vec![
            novac::analyze::types::CheckedType::Primitive(novac::ast::data_type::Primitive::I32),
            novac::analyze::types::CheckedType::Primitive(novac::ast::data_type::Primitive::Str),
        ]),
        "p's annotation `Pair[i32, Str]` should resolve through the alias to `(i32, Str)`"
    );

    let mir = result.mir.expect("clean compile reaches MIR");
    assert!(
        mir.items.iter().any(|item| matches!(item, novac::mir::Item::Const(c) if interner.resolve(c.name) == "p")),
        "p const should lower to one MIR Item::Const"
    );
}

/// E5: an integer literal past i64 range is rejected at parse time and the
/// pipeline never reaches MIR.
#[test]
fn e5_integer_literal_out_of_range() {
    let mut interner = InternerBuilder::new();
    let file = interner.intern("e5.nv");
    let huge = tok(
        TokenKind::Literal(Literal::Int {
            value: num_bigint::BigInt::parse_bytes(b"9999999999999999999999", 10).expect("valid digits"),
            base: IntBase::Decimal,
            suffix: None,
        }),
        file,
    );
    let tokens = vec![
        keyword(Keyword::Fun, file),
        ident(&mut interner, file, "main"),
        punct(Punct::LParen, file),
        punct(Punct::RParen, file),
        punct(Punct::Arrow, file),
        ident(&mut interner, file, "i32"),
        punct(Punct::Eq, file),
        huge,
        punct(Punct::Semi, file),
        eof(file),
    ];

    let result = Package::new(&mut interner, CompilerConfig::new()).compile(vec![tokens]);
    assert!(result.diagnostics.has_errors());
    assert!(result.mir.is_none(), "a literal-range error should stop the pipeline before MIR lowering");
}

/// E6: a match over an int param with a catch-all arm is exhaustive and
/// compiles cleanly, even though every non-wildcard arm is a bare literal
/// pattern rather than a variant pattern.
#[test]
fn e6_match_with_catch_all_arm_is_exhaustive() {
    let mut interner = InternerBuilder::new();
    let file = interner.intern("e6.nv");
    let tokens = vec![
        keyword(Keyword::Fun, file),
        ident(&mut interner, file, "pick"),
        punct(Punct::LParen, file),
        ident(&mut interner, file, "x"),
        punct(Punct::Colon, file),
        ident(&mut interner, file, "i32"),
        punct(Punct::RParen, file),
        punct(Punct::Arrow, file),
        ident(&mut interner, file, "Str"),
        punct(Punct::Eq, file),
        keyword(Keyword::Match, file),
        ident(&mut interner, file, "x"),
        punct(Punct::LBrace, file),
        int_lit(file, 1),
        punct(Punct::FatArrow, file),
        str_lit(&mut interner, file, "a"),
        punct(Punct::Comma, file),
        int_lit(file, 2),
        punct(Punct::FatArrow, file),
        str_lit(&mut interner, file, "b"),
        punct(Punct::Comma, file),
        ident(&mut interner, file, "_"),
        punct(Punct::FatArrow, file),
        str_lit(&mut interner, file, "c"),
        punct(Punct::RBrace, file),
        punct(Punct::Semi, file),
        eof(file),
    ];

    let result = Package::new(&mut interner, CompilerConfig::new()).compile(vec![tokens]);
    assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics.records());
    let mir = result.mir.expect("exhaustive match should reach MIR");
    assert_eq!(mir.items.len(), 1);
}
