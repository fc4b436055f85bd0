//! Expression parsing: the Pratt precedence engine plus access, call, and
//! literal parsing (§4.3).

use num_bigint::BigInt;

use super::ParseBlock;
use crate::{
    ast::{
        Path, Spanned,
        expr::{Access, AccessKind, AccessMember, Arg, BinOp, CallKind, CmpOp, Expr, LambdaExpr, LambdaParam, MatchArm, UnaryOp},
    },
    diagnostics::DiagnosticKind,
    token::{IntBase, Keyword, Literal, NumericSuffix, Punct, TokenKind},
};

/// Binding power of each binary operator, highest binds tightest. Mirrors
/// the fixed precedence table §4.3 requires the Pratt engine to consult.
fn infix_binding_power(p: Punct) -> Option<(u8, u8, InfixKind)> {
    use InfixKind::{Bin, Cmp};
    Some(match p {
        Punct::OrOr => (1, 2, Bin(BinOp::Or)),
        Punct::AndAnd => (3, 4, Bin(BinOp::And)),
        Punct::EqEq => (5, 6, Cmp(CmpOp::Eq)),
        Punct::NotEq => (5, 6, Cmp(CmpOp::Ne)),
        Punct::Lt => (5, 6, Cmp(CmpOp::Lt)),
        Punct::Le => (5, 6, Cmp(CmpOp::Le)),
        Punct::Gt => (5, 6, Cmp(CmpOp::Gt)),
        Punct::Ge => (5, 6, Cmp(CmpOp::Ge)),
        Punct::Pipe => (7, 8, Bin(BinOp::BitOr)),
        Punct::Caret => (9, 10, Bin(BinOp::BitXor)),
        Punct::Amp => (11, 12, Bin(BinOp::BitAnd)),
        Punct::DotDot => (13, 14, Bin(BinOp::Range)),
        Punct::Plus => (15, 16, Bin(BinOp::Add)),
        Punct::Minus => (15, 16, Bin(BinOp::Sub)),
        Punct::Star => (17, 18, Bin(BinOp::Mul)),
        Punct::Slash => (17, 18, Bin(BinOp::Div)),
        Punct::Percent => (17, 18, Bin(BinOp::Mod)),
        _ => return None,
    })
}

enum InfixKind {
    Bin(BinOp),
    Cmp(CmpOp),
}

impl ParseBlock<'_> {
    pub fn parse_expr(&mut self) -> Spanned<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Spanned<Expr> {
        let mut lhs = self.parse_prefix();
        loop {
            let Some(op_punct) = self.peek_punct() else { break };
            let Some((lbp, rbp, kind)) = infix_binding_power(op_punct) else { break };
            if lbp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr_bp(rbp);
            let loc = lhs.location.merge(rhs.location);
            let node = match kind {
                InfixKind::Bin(op) => Expr::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) },
                InfixKind::Cmp(op) => Expr::Cmp { lhs: Box::new(lhs), op, rhs: Box::new(rhs) },
            };
            lhs = Spanned::new(node, loc);
        }
        lhs
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> Spanned<Expr> {
        let start = self.current_location();
        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Punct(Punct::Minus)) => Some(UnaryOp::Neg),
            Some(TokenKind::Punct(Punct::Bang)) => Some(UnaryOp::Not),
            Some(TokenKind::Punct(Punct::Caret)) => Some(UnaryOp::BitNot),
            Some(TokenKind::Punct(Punct::Amp)) => Some(UnaryOp::Ref),
            Some(TokenKind::Punct(Punct::Star)) => Some(UnaryOp::Deref),
            Some(TokenKind::Keyword(Keyword::Trace)) => Some(UnaryOp::Trace),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_prefix();
            let loc = start.merge(operand.location);
            return Spanned::new(Expr::Unary { op, operand: Box::new(operand) }, loc);
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Spanned<Expr> {
        let mut expr = self.parse_atom();
        loop {
            expr = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Punct(Punct::Dot)) => self.parse_field_access(expr),
                Some(TokenKind::Punct(Punct::LBracket)) => self.parse_index_access(expr),
                Some(TokenKind::Punct(Punct::LParen)) => self.parse_call(expr),
                Some(TokenKind::Punct(Punct::ColonColon)) => self.parse_generic_call(expr),
                Some(TokenKind::Keyword(Keyword::As)) => self.parse_cast(expr),
                Some(TokenKind::Keyword(Keyword::Await)) => {
                    self.advance();
                    let loc = expr.location;
                    Spanned::new(Expr::Await(Box::new(expr)), loc)
                }
                Some(TokenKind::Punct(Punct::At)) => self.parse_object_chain(expr),
                _ => break,
            };
        }
        expr
    }

    fn parse_field_access(&mut self, head: Spanned<Expr>) -> Spanned<Expr> {
        self.advance();
        let Some((name, loc)) = self.expect_ident() else {
            return Spanned::new(Expr::Malformed, head.location);
        };
        let span = head.location.merge(loc);
        Spanned::new(
            Expr::Access(Access { head: Box::new(head), kind: AccessKind::Field, member: AccessMember::Name(name) }),
            span,
        )
    }

    fn parse_object_chain(&mut self, head: Spanned<Expr>) -> Spanned<Expr> {
        self.advance();
        let Some((name, loc)) = self.expect_ident() else {
            return Spanned::new(Expr::Malformed, head.location);
        };
        let span = head.location.merge(loc);
        Spanned::new(
            Expr::Access(Access { head: Box::new(head), kind: AccessKind::ObjectChain, member: AccessMember::Name(name) }),
            span,
        )
    }

    fn parse_index_access(&mut self, head: Spanned<Expr>) -> Spanned<Expr> {
        self.advance();
        let index = self.parse_expr();
        self.expect_close(Punct::RBracket);
        let end = self.previous_location().unwrap_or(index.location);
        let span = head.location.merge(end);
        Spanned::new(
            Expr::Access(Access { head: Box::new(head), kind: AccessKind::Index, member: AccessMember::Index(Box::new(index)) }),
            span,
        )
    }

    fn parse_cast(&mut self, expr: Spanned<Expr>) -> Spanned<Expr> {
        self.advance();
        let ty = self.parse_data_type();
        let loc = expr.location.merge(ty.location);
        Spanned::new(Expr::Cast { expr: Box::new(expr), ty: Box::new(ty) }, loc)
    }

    /// `f(args)`, distinguishing `name := expr` default-named arguments from
    /// positional ones via a 1-token lookahead for `ident :=` (§4.3).
    fn parse_call(&mut self, callee: Spanned<Expr>) -> Spanned<Expr> {
        let args = self.comma_list(Punct::LParen, Punct::RParen, Self::parse_arg);
        let end = self.previous_location().unwrap_or(callee.location);
        let loc = callee.location.merge(end);
        Spanned::new(Expr::Call(Box::new(CallKind::Function { callee: Box::new(callee), generics: Vec::new(), args })), loc)
    }

    /// `f::[T1, T2](args)` — an explicit per-call-site generic instantiation
    /// (§4.4 "Generic instantiation").
    fn parse_generic_call(&mut self, callee: Spanned<Expr>) -> Spanned<Expr> {
        self.advance();
        let generics = self.comma_list(Punct::LBracket, Punct::RBracket, Self::parse_data_type);
        let args = self.comma_list(Punct::LParen, Punct::RParen, Self::parse_arg);
        let end = self.previous_location().unwrap_or(callee.location);
        let loc = callee.location.merge(end);
        Spanned::new(Expr::Call(Box::new(CallKind::Function { callee: Box::new(callee), generics, args })), loc)
    }

    fn parse_arg(&mut self) -> Arg {
        let named = matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Ident { .. }))
            && matches!(self.peek_at(1).map(|t| &t.kind), Some(TokenKind::Punct(Punct::ColonEq)));
        if named {
            let (name, _) = self.expect_ident().expect("checked by lookahead");
            self.advance();
            Arg { name: Some(name), value: self.parse_expr() }
        } else {
            Arg { name: None, value: self.parse_expr() }
        }
    }

    fn parse_atom(&mut self) -> Spanned<Expr> {
        let start = self.current_location();
        let Some(tok) = self.peek().cloned() else {
            return Spanned::new(Expr::Malformed, start);
        };
        match &tok.kind {
            TokenKind::Literal(lit) => {
                self.advance();
                Spanned::new(Expr::Literal(narrow_literal(lit.clone(), self.diags, start)), start)
            }
            TokenKind::Keyword(Keyword::Self_) => {
                self.advance();
                Spanned::new(Expr::Path(Path::single(crate::intern::StringId::SELF, start)), start)
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if_expr(),
            TokenKind::Keyword(Keyword::Match) => self.parse_match_expr(),
            TokenKind::Keyword(Keyword::Begin) => self.parse_begin_block(),
            TokenKind::Keyword(Keyword::Fun) => self.parse_lambda(),
            TokenKind::Punct(Punct::LParen) => self.parse_paren_or_lambda(),
            TokenKind::Punct(Punct::LBracket) => self.parse_array_literal(),
            TokenKind::Ident { name, .. } => {
                let n = *name;
                self.advance();
                if self.is_punct(Punct::LBrace) && self.looks_like_record_call() {
                    self.parse_record_call(Path::single(n, start), start)
                } else if self.is_punct(Punct::Colon) {
                    self.parse_variant_call(Path::single(n, start), start)
                } else {
                    Spanned::new(Expr::Path(Path::single(n, start)), start)
                }
            }
            _ => {
                self.error_here(DiagnosticKind::ExpectedOnlyOneExpression, "expected an expression");
                self.advance();
                Spanned::new(Expr::Malformed, start)
            }
        }
    }

    /// `T{ ... }` record calls only apply where a brace could not instead
    /// start a block; a 1-token lookahead distinguishes `field := value`.
    fn looks_like_record_call(&self) -> bool {
        matches!(self.peek_at(1).map(|t| &t.kind), Some(TokenKind::Ident { .. }))
            && matches!(self.peek_at(2).map(|t| &t.kind), Some(TokenKind::Punct(Punct::ColonEq)))
    }

    fn parse_record_call(&mut self, ty: Path, start: crate::location::Location) -> Spanned<Expr> {
        let fields = self.comma_list(Punct::LBrace, Punct::RBrace, |b| {
            let (name, _) = b.expect_ident().unwrap_or_default_ident();
            b.eat_punct(Punct::ColonEq);
            (name, b.parse_expr())
        });
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Expr::Call(Box::new(CallKind::Record { ty, fields })), start.merge(end))
    }

    /// `T:expr` (with a value) or `T:$` (value-less) variant construction.
    fn parse_variant_call(&mut self, ty: Path, start: crate::location::Location) -> Spanned<Expr> {
        self.advance();
        let Some((variant, _)) = self.expect_ident() else {
            return Spanned::new(Expr::Malformed, start);
        };
        let value = if self.eat_punct(Punct::Dollar) {
            None
        } else if self.eat_punct(Punct::LParen) {
            let v = self.parse_expr();
            self.expect_close(Punct::RParen);
            Some(Box::new(v))
        } else {
            None
        };
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Expr::Call(Box::new(CallKind::Variant { ty, variant, value })), start.merge(end))
    }

    fn parse_if_expr(&mut self) -> Spanned<Expr> {
        let start = self.current_location();
        self.advance();
        let cond = Box::new(self.parse_expr());
        let then_branch = Box::new(self.parse_expr());
        let else_branch = if self.eat_keyword(Keyword::Else) { Some(Box::new(self.parse_expr())) } else { None };
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Expr::If { cond, then_branch, else_branch }, start.merge(end))
    }

    fn parse_match_expr(&mut self) -> Spanned<Expr> {
        let start = self.current_location();
        self.advance();
        let scrutinee = Box::new(self.parse_expr());
        let arms = self.comma_list(Punct::LBrace, Punct::RBrace, |b| {
            let pattern = b.parse_pattern();
            let guard = if b.eat_keyword(Keyword::If) { Some(b.parse_expr()) } else { None };
            b.eat_punct(Punct::FatArrow);
            let body = b.parse_expr();
            MatchArm { pattern, guard, body }
        });
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Expr::Match { scrutinee, arms }, start.merge(end))
    }

    fn parse_begin_block(&mut self) -> Spanned<Expr> {
        let start = self.current_location();
        self.advance();
        let mut stmts = Vec::new();
        while !self.is_keyword(Keyword::End) && !self.at_eof() {
            let e = self.parse_expr();
            let loc = e.location;
            stmts.push(Spanned::new(crate::ast::stmt::Stmt::Expr(e), loc));
            self.eat_punct(Punct::Semi);
        }
        self.eat_keyword(Keyword::End);
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Expr::Block(stmts), start.merge(end))
    }

    /// Lambdas are parsed in two phases, per §4.3: the preparser only
    /// recognizes the `(fun ...)` call shape as an ordinary parenthesized
    /// expression; here, once we know we're looking at `fun`, we commit to
    /// parsing a full lambda (params, optional return type, body).
    fn parse_lambda(&mut self) -> Spanned<Expr> {
        let start = self.current_location();
        self.advance();
        let params = self.comma_list(Punct::LParen, Punct::RParen, |b| {
            let (name, _) = b.expect_ident().unwrap_or_default_ident();
            let ty = if b.eat_punct(Punct::Colon) { Some(b.parse_data_type()) } else { None };
            LambdaParam { name, ty }
        });
        let return_ty = if self.eat_punct(Punct::Arrow) { Some(self.parse_data_type()) } else { None };
        self.eat_punct(Punct::FatArrow);
        let body = Box::new(self.parse_expr());
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Expr::Call(Box::new(CallKind::Lambda(LambdaExpr { params, return_ty, body }))), start.merge(end))
    }

    /// `(fun ...)` is recognized here, after the opening paren, by peeking
    /// for the `fun` keyword before committing to a plain parenthesized or
    /// tuple expression.
    fn parse_paren_or_lambda(&mut self) -> Spanned<Expr> {
        if matches!(self.peek_at(1).map(|t| &t.kind), Some(TokenKind::Keyword(Keyword::Fun))) {
            let start = self.current_location();
            self.advance();
            let lambda = self.parse_lambda();
            self.expect_close(Punct::RParen);
            return lambda.map_loc(start, self.previous_location());
        }
        let start = self.current_location();
        self.advance();
        if self.is_punct(Punct::RParen) {
            self.advance();
            return Spanned::new(Expr::Tuple(Vec::new()), start);
        }
        let first = self.parse_expr();
        if self.is_punct(Punct::Comma) {
            let mut elems = vec![first];
            while self.eat_punct(Punct::Comma) {
                if self.is_punct(Punct::RParen) {
                    break;
                }
                elems.push(self.parse_expr());
            }
            self.expect_close(Punct::RParen);
            let end = self.previous_location().unwrap_or(start);
            return Spanned::new(Expr::Tuple(elems), start.merge(end));
        }
        self.expect_close(Punct::RParen);
        first
    }

    fn parse_array_literal(&mut self) -> Spanned<Expr> {
        let start = self.current_location();
        let elems = self.comma_list(Punct::LBracket, Punct::RBracket, Self::parse_expr);
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(Expr::Array(elems), start.merge(end))
    }
}

trait IdentOrDefault {
    fn unwrap_or_default_ident(self) -> (crate::intern::StringId, crate::location::Location);
}

impl IdentOrDefault for Option<(crate::intern::StringId, crate::location::Location)> {
    fn unwrap_or_default_ident(self) -> (crate::intern::StringId, crate::location::Location) {
        self.unwrap_or_else(|| (crate::intern::StringId::default(), crate::location::Location::point(crate::intern::StringId::default(), crate::location::Pos::new(0, 0, 0))))
    }
}

trait SpannedExt {
    fn map_loc(self, start: crate::location::Location, prev: Option<crate::location::Location>) -> Self;
}

impl SpannedExt for Spanned<Expr> {
    fn map_loc(self, start: crate::location::Location, prev: Option<crate::location::Location>) -> Self {
        let end = prev.unwrap_or(self.location);
        Spanned::new(self.node, start.merge(end))
    }
}

/// Narrows a scanned integer literal to its concrete width (§4.3: "i32 with
/// i64 fallback on overflow, diagnosed precisely rather than silently
/// wrapping").
fn narrow_literal(lit: Literal, diags: &mut crate::diagnostics::Diagnostics, loc: crate::location::Location) -> Literal {
    match lit {
        Literal::Int { value, base, suffix: None } => {
            if fits(&value, i32::MIN.into(), i32::MAX.into()) {
                Literal::Int { value, base, suffix: Some(NumericSuffix::I32) }
            } else if fits(&value, i64::MIN.into(), i64::MAX.into()) {
                Literal::Int { value, base, suffix: Some(NumericSuffix::I64) }
            } else {
                diags.push(crate::diagnostics::Diagnostic::new(
                    DiagnosticKind::LiteralOutOfRange,
                    loc,
                    "integer literal out of range for i64",
                ));
                Literal::Int { value, base, suffix: Some(NumericSuffix::I64) }
            }
        }
        other => other,
    }
}

fn fits(value: &BigInt, lo: BigInt, hi: BigInt) -> bool {
    *value >= lo && *value <= hi
}

#[allow(dead_code)]
fn int_base_label(base: IntBase) -> &'static str {
    match base {
        IntBase::Binary => "binary",
        IntBase::Octal => "octal",
        IntBase::Decimal => "decimal",
        IntBase::Hex => "hex",
    }
}
