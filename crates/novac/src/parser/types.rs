//! Data-type parsing: dispatch on the first token (§4.3 "Data types").

use num_traits::ToPrimitive;

use super::ParseBlock;
use crate::{
    ast::{
        Spanned,
        data_type::{ArrayKind, DataType, Primitive},
    },
    token::{Keyword, Literal, Punct, TokenKind},
};

impl ParseBlock<'_> {
    pub fn parse_data_type(&mut self) -> Spanned<DataType> {
        let start = self.current_location();
        let Some(tok) = self.peek().cloned() else {
            return Spanned::new(DataType::Malformed, start);
        };
        let node = match &tok.kind {
            TokenKind::Ident { name, .. } => {
                if let Some(prim) = primitive_for(self.resolve(*name)) {
                    self.advance();
                    DataType::Primitive(prim)
                } else {
                    self.advance();
                    let mut segments = vec![*name];
                    while self.eat_punct(Punct::Dot) {
                        if let Some((seg, _)) = self.expect_ident() {
                            segments.push(seg);
                        }
                    }
                    let path = crate::ast::Path { segments, location: start };
                    let generics = if self.is_punct(Punct::LBracket) {
                        self.comma_list(Punct::LBracket, Punct::RBracket, Self::parse_data_type)
                    } else {
                        Vec::new()
                    };
                    // Whether a bare name refers to an enclosing generic
                    // parameter isn't knowable until the analyzer resolves it
                    // against the declaration's generic list; Custom covers
                    // both until then.
                    DataType::Custom { path, generics }
                }
            }
            TokenKind::Punct(Punct::LBracket) => self.parse_array_type(),
            TokenKind::Punct(Punct::LBrace) => {
                let elems = self.comma_list(Punct::LBrace, Punct::RBrace, Self::parse_data_type);
                DataType::Tuple(elems)
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.parse_data_type();
                self.expect_close(Punct::RParen);
                inner.node
            }
            TokenKind::Keyword(Keyword::Fun) => {
                self.advance();
                let params = self.comma_list(Punct::LParen, Punct::RParen, Self::parse_data_type);
                self.eat_punct(Punct::Arrow);
                let ret = Box::new(self.parse_data_type());
                DataType::Lambda { params, ret }
            }
            TokenKind::Keyword(Keyword::Mut) => {
                self.advance();
                DataType::Mut(Box::new(self.parse_data_type()))
            }
            TokenKind::Keyword(Keyword::Ref) => {
                self.advance();
                DataType::Ref(Box::new(self.parse_data_type()))
            }
            TokenKind::Keyword(Keyword::Trace) => {
                self.advance();
                DataType::Trace(Box::new(self.parse_data_type()))
            }
            TokenKind::Keyword(Keyword::Self_) => {
                self.advance();
                DataType::Primitive(Primitive::SelfType)
            }
            TokenKind::Punct(Punct::Question) => {
                self.advance();
                DataType::Optional(Box::new(self.parse_data_type()))
            }
            TokenKind::Punct(Punct::Star) => {
                self.advance();
                DataType::Ptr(Box::new(self.parse_data_type()))
            }
            TokenKind::Punct(Punct::Bang) => {
                self.advance();
                DataType::Result { errs: Vec::new(), ok: Box::new(self.parse_data_type()) }
            }
            TokenKind::Punct(Punct::Lt) => {
                let errs = self.comma_list(Punct::Lt, Punct::Gt, Self::parse_data_type);
                self.eat_punct(Punct::Bang);
                let ok = Box::new(self.parse_data_type());
                DataType::Result { errs, ok }
            }
            _ => {
                self.error_here(crate::diagnostics::DiagnosticKind::ExpectedOnlyOneDataType, "expected a data type");
                DataType::Malformed
            }
        };
        let end = self.previous_location().unwrap_or(start);
        Spanned::new(node, start.merge(end))
    }

    fn parse_array_type(&mut self) -> DataType {
        self.advance();
        let kind = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Punct(Punct::RBracket)) => ArrayKind::Dynamic,
            Some(TokenKind::Punct(Punct::Question)) => {
                self.advance();
                ArrayKind::Unknown
            }
            Some(TokenKind::Punct(Punct::Star)) => {
                self.advance();
                ArrayKind::MultiPtr
            }
            Some(TokenKind::Literal(Literal::Int { value, .. })) => {
                let n = value.to_u64().unwrap_or(u64::MAX);
                self.advance();
                ArrayKind::Sized(n)
            }
            _ => ArrayKind::Dynamic,
        };
        self.expect_close(Punct::RBracket);
        let elem = Box::new(self.parse_data_type());
        DataType::Array { kind, elem }
    }

}

fn primitive_for(text: &str) -> Option<Primitive> {
    Some(match text {
        "I8" | "i8" => Primitive::I8,
        "I16" | "i16" => Primitive::I16,
        "I32" | "i32" => Primitive::I32,
        "I64" | "i64" => Primitive::I64,
        "U8" | "u8" => Primitive::U8,
        "U16" | "u16" => Primitive::U16,
        "U32" | "u32" => Primitive::U32,
        "U64" | "u64" => Primitive::U64,
        "Isize" | "isize" => Primitive::Isize,
        "Usize" | "usize" => Primitive::Usize,
        "F32" | "f32" => Primitive::F32,
        "F64" | "f64" => Primitive::F64,
        "Bool" | "bool" => Primitive::Bool,
        "Char" | "char" => Primitive::Char,
        "Byte" => Primitive::Byte,
        "Bytes" => Primitive::Bytes,
        "CStr" => Primitive::CStr,
        "Str" => Primitive::Str,
        "Unit" => Primitive::Unit,
        "Never" => Primitive::Never,
        "Any" => Primitive::Any,
        "Object" => Primitive::Object,
        _ => return None,
    })
}
