//! A hand-rolled scanner for the demo binary.
//!
//! The `novac` library treats the token stream as something an external
//! scanner already produced (§6 "Input": "a token vector per file, produced
//! by the external scanner") and never lexes source text itself. This module
//! is that external scanner, kept deliberately small: just enough of the
//! grammar's lexical surface to drive `Package::compile` end to end from a
//! `.nv` file on disk.

use novac::{
    intern::{InternerBuilder, StringId},
    location::{Location, Pos},
    token::{IdentKind, IntBase, Keyword, Literal, NumericSuffix, Punct, Token, TokenKind},
};

pub struct Lexer<'a> {
    bytes: &'a [u8],
    idx: usize,
    line: u32,
    col: u32,
    file: StringId,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub const fn new(source: &'a str, file: StringId) -> Self {
        Self { bytes: source.as_bytes(), idx: 0, line: 0, col: 0, file }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.idx).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.idx + offset).copied()
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.col, self.idx as u32)
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.idx += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Tokenizes the whole source into a vector terminated by `TokenKind::Eof`.
    ///
    /// Bytes that don't start any recognized token are reported to stderr
    /// and skipped one at a time rather than aborting the scan, matching the
    /// preparser's own policy of recording an error and resynchronizing
    /// (§5 "Error recovery") instead of bailing out of the whole file.
    pub fn tokenize(mut self, interner: &mut InternerBuilder) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos();
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, Location::point(self.file, start)));
                break;
            };

            let kind = if c == b'"' {
                Some(self.lex_string(interner))
            } else if c == b'\'' {
                Some(self.lex_char())
            } else if c == b'`' {
                Some(self.lex_quoted_ident(interner))
            } else if c == b'b' && self.peek_at(1) == Some(b'"') {
                self.advance();
                Some(self.lex_bytes())
            } else if c == b'b' && self.peek_at(1) == Some(b'\'') {
                self.advance();
                Some(self.lex_byte())
            } else if c == b'c' && self.peek_at(1) == Some(b'"') {
                self.advance();
                Some(self.lex_cstr())
            } else if c == b'$' {
                self.advance();
                Some(self.lex_dollar(interner))
            } else if c.is_ascii_digit() {
                Some(self.lex_number())
            } else if is_ident_start(c) {
                Some(self.lex_ident_or_keyword(interner))
            } else {
                self.lex_punct()
            };

            let Some(kind) = kind else {
                eprintln!("warning: skipping unrecognized byte {:#04x} at {}:{}", c, start.line + 1, start.col + 1);
                self.advance();
                continue;
            };

            let end = self.pos();
            tokens.push(Token::new(kind, Location::new(self.file, start, end)));
        }
        tokens
    }

    fn lex_dollar(&mut self, interner: &mut InternerBuilder) -> TokenKind {
        if self.peek().is_some_and(is_ident_start) {
            let text = self.read_ident_text();
            TokenKind::Ident { kind: IdentKind::Dollar, name: interner.intern(&text) }
        } else {
            TokenKind::Punct(Punct::Dollar)
        }
    }

    fn read_ident_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c as char);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn lex_ident_or_keyword(&mut self, interner: &mut InternerBuilder) -> TokenKind {
        let text = self.read_ident_text();
        // `name!` is scanned as a single macro-invocation-head token rather
        // than an identifier immediately followed by `!`, matching how the
        // preparser tells macro calls apart from a boolean-not expression.
        if self.peek() == Some(b'!') {
            self.advance();
            return TokenKind::Ident { kind: IdentKind::MacroName, name: interner.intern(&text) };
        }
        match keyword_for(&text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident { kind: IdentKind::Normal, name: interner.intern(&text) },
        }
    }

    fn lex_quoted_ident(&mut self, interner: &mut InternerBuilder) -> TokenKind {
        self.advance(); // opening backtick
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == b'`' {
                self.advance();
                break;
            }
            text.push(c as char);
            self.advance();
        }
        TokenKind::Ident { kind: IdentKind::StringQuoted, name: interner.intern(&text) }
    }

    fn read_escaped_text(&mut self, quote: u8) -> Vec<u8> {
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                break;
            }
            if c == b'\\' {
                self.advance();
                let escaped = self.advance();
                bytes.push(match escaped {
                    Some(b'n') => b'\n',
                    Some(b't') => b'\t',
                    Some(b'r') => b'\r',
                    Some(b'0') => 0,
                    Some(other) => other,
                    None => break,
                });
            } else {
                bytes.push(c);
                self.advance();
            }
        }
        bytes
    }

    fn lex_string(&mut self, interner: &mut InternerBuilder) -> TokenKind {
        let bytes = self.read_escaped_text(b'"');
        let text = String::from_utf8_lossy(&bytes).into_owned();
        TokenKind::Literal(Literal::Str(interner.intern(&text)))
    }

    fn lex_bytes(&mut self) -> TokenKind {
        TokenKind::Literal(Literal::Bytes(self.read_escaped_text(b'"')))
    }

    fn lex_cstr(&mut self) -> TokenKind {
        let mut bytes = self.read_escaped_text(b'"');
        bytes.push(0);
        TokenKind::Literal(Literal::CStr(bytes))
    }

    fn lex_byte(&mut self) -> TokenKind {
        let bytes = self.read_escaped_text(b'\'');
        TokenKind::Literal(Literal::Byte(bytes.first().copied().unwrap_or(0)))
    }

    fn lex_char(&mut self) -> TokenKind {
        let bytes = self.read_escaped_text(b'\'');
        let c = String::from_utf8_lossy(&bytes).chars().next().unwrap_or('\0');
        TokenKind::Literal(Literal::Char(c))
    }

    fn read_digits(&mut self, is_digit: impl Fn(u8) -> bool) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if is_digit(c) {
                digits.push(c as char);
                self.advance();
            } else if c == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    fn lex_numeric_suffix(&mut self) -> Option<NumericSuffix> {
        let checkpoint = (self.idx, self.line, self.col);
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let text = self.read_ident_text();
        match numeric_suffix_for(&text) {
            Some(suffix) => Some(suffix),
            None => {
                (self.idx, self.line, self.col) = checkpoint;
                None
            }
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.advance();
            self.advance();
            let digits = self.read_digits(|c| c.is_ascii_hexdigit());
            let suffix = self.lex_numeric_suffix();
            let value = num_bigint::BigInt::parse_bytes(digits.as_bytes(), 16).unwrap_or_default();
            return TokenKind::Literal(Literal::Int { value, base: IntBase::Hex, suffix });
        }
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'o' | b'O')) {
            self.advance();
            self.advance();
            let digits = self.read_digits(|c| (b'0'..=b'7').contains(&c));
            let suffix = self.lex_numeric_suffix();
            let value = num_bigint::BigInt::parse_bytes(digits.as_bytes(), 8).unwrap_or_default();
            return TokenKind::Literal(Literal::Int { value, base: IntBase::Octal, suffix });
        }
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'b' | b'B')) {
            self.advance();
            self.advance();
            let digits = self.read_digits(|c| c == b'0' || c == b'1');
            let suffix = self.lex_numeric_suffix();
            let value = num_bigint::BigInt::parse_bytes(digits.as_bytes(), 2).unwrap_or_default();
            return TokenKind::Literal(Literal::Int { value, base: IntBase::Binary, suffix });
        }

        let digits = self.read_digits(|c| c.is_ascii_digit());
        let mut text = digits.clone();
        let mut is_float = false;

        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            text.push('.');
            text.push_str(&self.read_digits(|c| c.is_ascii_digit()));
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign_offset = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if self.peek_at(1 + sign_offset).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if let Some(sign @ (b'+' | b'-')) = self.peek() {
                    text.push(sign as char);
                    self.advance();
                }
                text.push_str(&self.read_digits(|c| c.is_ascii_digit()));
            }
        }

        let suffix = self.lex_numeric_suffix();
        if is_float {
            let value = text.parse().unwrap_or(0.0);
            TokenKind::Literal(Literal::Float { value, suffix })
        } else {
            let value = num_bigint::BigInt::parse_bytes(digits.as_bytes(), 10).unwrap_or_default();
            TokenKind::Literal(Literal::Int { value, base: IntBase::Decimal, suffix })
        }
    }

    fn lex_punct(&mut self) -> Option<TokenKind> {
        let two = (self.peek()?, self.peek_at(1).unwrap_or(0));
        if let Some(p) = two_char_punct(two) {
            self.advance();
            self.advance();
            return Some(TokenKind::Punct(p));
        }
        let c = self.advance()?;
        one_char_punct(c).map(TokenKind::Punct)
    }
}

const fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

const fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn numeric_suffix_for(text: &str) -> Option<NumericSuffix> {
    Some(match text {
        "i8" => NumericSuffix::I8,
        "i16" => NumericSuffix::I16,
        "i32" => NumericSuffix::I32,
        "i64" => NumericSuffix::I64,
        "isize" => NumericSuffix::Isize,
        "u8" => NumericSuffix::U8,
        "u16" => NumericSuffix::U16,
        "u32" => NumericSuffix::U32,
        "u64" => NumericSuffix::U64,
        "usize" => NumericSuffix::Usize,
        "f32" => NumericSuffix::F32,
        "f64" => NumericSuffix::F64,
        _ => return None,
    })
}

fn keyword_for(text: &str) -> Option<Keyword> {
    Some(match text {
        "module" => Keyword::Module,
        "use" => Keyword::Use,
        "include" => Keyword::Include,
        "fun" => Keyword::Fun,
        "type" => Keyword::Type,
        "object" => Keyword::Object,
        "class" => Keyword::Class,
        "trait" => Keyword::Trait,
        "enum" => Keyword::Enum,
        "record" => Keyword::Record,
        "error" => Keyword::Error,
        "macro" => Keyword::Macro,
        "if" => Keyword::If,
        "elif" => Keyword::Elif,
        "else" => Keyword::Else,
        "match" => Keyword::Match,
        "for" => Keyword::For,
        "while" => Keyword::While,
        "loop" => Keyword::Loop,
        "do" => Keyword::Do,
        "defer" => Keyword::Defer,
        "drop" => Keyword::Drop,
        "try" => Keyword::Try,
        "catch" => Keyword::Catch,
        "unsafe" => Keyword::Unsafe,
        "asm" => Keyword::Asm,
        "block" => Keyword::Block,
        "raise" => Keyword::Raise,
        "return" => Keyword::Return,
        "next" => Keyword::Next,
        "break" => Keyword::Break,
        "await" => Keyword::Await,
        "async" => Keyword::Async,
        "variable" => Keyword::Variable,
        "val" => Keyword::Val,
        "mut" => Keyword::Mut,
        "ref" => Keyword::Ref,
        "trace" => Keyword::Trace,
        "self" => Keyword::Self_,
        "begin" => Keyword::Begin,
        "end" => Keyword::End,
        "pub" => Keyword::Pub,
        "as" => Keyword::As,
        _ => return None,
    })
}

fn two_char_punct(chars: (u8, u8)) -> Option<Punct> {
    Some(match chars {
        (b':', b':') => Punct::ColonColon,
        (b'.', b'.') => Punct::DotDot,
        (b'-', b'>') => Punct::Arrow,
        (b'<', b'-') => Punct::LeftArrow,
        (b'=', b'>') => Punct::FatArrow,
        (b':', b'=') => Punct::ColonEq,
        (b'=', b'=') => Punct::EqEq,
        (b'!', b'=') => Punct::NotEq,
        (b'<', b'=') => Punct::Le,
        (b'>', b'=') => Punct::Ge,
        (b'&', b'&') => Punct::AndAnd,
        (b'|', b'|') => Punct::OrOr,
        _ => return None,
    })
}

fn one_char_punct(c: u8) -> Option<Punct> {
    Some(match c {
        b'(' => Punct::LParen,
        b')' => Punct::RParen,
        b'{' => Punct::LBrace,
        b'}' => Punct::RBrace,
        b'[' => Punct::LBracket,
        b']' => Punct::RBracket,
        b',' => Punct::Comma,
        b';' => Punct::Semi,
        b':' => Punct::Colon,
        b'.' => Punct::Dot,
        b'@' => Punct::At,
        b'=' => Punct::Eq,
        b'?' => Punct::Question,
        b'!' => Punct::Bang,
        b'*' => Punct::Star,
        b'&' => Punct::Amp,
        b'+' => Punct::Plus,
        b'-' => Punct::Minus,
        b'/' => Punct::Slash,
        b'%' => Punct::Percent,
        b'<' => Punct::Lt,
        b'>' => Punct::Gt,
        b'|' => Punct::Pipe,
        b'^' => Punct::Caret,
        b'$' => Punct::Dollar,
        _ => return None,
    })
}
