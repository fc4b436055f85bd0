//! The macro table and hygienic expansion algorithm (§4.2).

use ahash::AHashMap;

use super::skeleton::TokenSpan;
use crate::{
    ast::Visibility,
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    intern::StringId,
    location::Location,
    token::{ExpandKind, Punct, Token, TokenKind},
};

/// The kind constraint a macro parameter places on its argument tokens.
///
/// Variant names match the source spelling exactly (`$x: Expr`), so the
/// `strum::EnumString` derive needs no case transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display, strum::EnumString)]
pub enum MacroParamKind {
    Id,
    Dt,
    Tk,
    Tks,
    Stmt,
    Expr,
    Path,
    Patt,
    Block,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MacroParam {
    pub name: StringId,
    pub kind: MacroParamKind,
}

/// `{ name, location, params, body, visibility }` (§3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MacroDef {
    pub name: StringId,
    pub location: Location,
    pub params: Vec<MacroParam>,
    pub body: Vec<Token>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroLookupError {
    NotFound,
    Ambiguous,
}

/// A package's macro state: a private table per file plus one root public
/// table, per §3 ("Stored in a per-package private table and a root public
/// table").
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MacroTable {
    private: AHashMap<StringId, MacroDef>,
    public: AHashMap<StringId, MacroDef>,
}

impl MacroTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, def: MacroDef) {
        match def.visibility {
            Visibility::Public => {
                self.public.insert(def.name, def);
            }
            Visibility::Private => {
                self.private.insert(def.name, def);
            }
        }
    }

    /// Searches private then public; ambiguity (both tables define the same
    /// name — only possible after merging another file's public table in) is
    /// an error.
    pub fn lookup(&self, name: StringId) -> Result<&MacroDef, MacroLookupError> {
        match (self.private.get(&name), self.public.get(&name)) {
            (Some(p), None) => Ok(p),
            (None, Some(q)) => Ok(q),
            (Some(_), Some(_)) => Err(MacroLookupError::Ambiguous),
            (None, None) => Err(MacroLookupError::NotFound),
        }
    }

    /// Imports another file's public macros into this table's public half,
    /// so the whole package shares one root public table (§3).
    pub fn merge_public_from(&mut self, other: &Self) {
        for (name, def) in &other.public {
            self.public.entry(*name).or_insert_with(|| def.clone());
        }
    }
}

/// The fixed predicates §4.2 step 2 requires to classify an argument's first
/// token against its parameter kind. These mirror the dispatch tables the
/// parser itself uses for data types, statements, expressions, and patterns.
fn is_data_type_start(tok: &Token) -> bool {
    matches!(
        &tok.kind,
        TokenKind::Ident { .. }
            | TokenKind::Keyword(
                crate::token::Keyword::Fun
                    | crate::token::Keyword::Mut
                    | crate::token::Keyword::Ref
                    | crate::token::Keyword::Trace
                    | crate::token::Keyword::Self_
            )
            | TokenKind::Punct(
                Punct::LBracket | Punct::LBrace | Punct::LParen | Punct::Lt | Punct::Question | Punct::Star | Punct::Bang
            )
    )
}

fn is_stmt_start(tok: &Token) -> bool {
    matches!(
        &tok.kind,
        TokenKind::Keyword(
            crate::token::Keyword::If
                | crate::token::Keyword::Match
                | crate::token::Keyword::For
                | crate::token::Keyword::While
                | crate::token::Keyword::Loop
                | crate::token::Keyword::Do
                | crate::token::Keyword::Defer
                | crate::token::Keyword::Drop
                | crate::token::Keyword::Try
                | crate::token::Keyword::Unsafe
                | crate::token::Keyword::Asm
                | crate::token::Keyword::Block
                | crate::token::Keyword::Raise
                | crate::token::Keyword::Return
                | crate::token::Keyword::Next
                | crate::token::Keyword::Break
                | crate::token::Keyword::Variable
                | crate::token::Keyword::Val
        )
    ) || is_expr_start(tok)
}

fn is_expr_start(tok: &Token) -> bool {
    matches!(
        &tok.kind,
        TokenKind::Literal(_)
            | TokenKind::Ident { .. }
            | TokenKind::Keyword(crate::token::Keyword::If | crate::token::Keyword::Match | crate::token::Keyword::Await)
            | TokenKind::Punct(
                Punct::LParen
                    | Punct::LBracket
                    | Punct::LBrace
                    | Punct::Minus
                    | Punct::Bang
                    | Punct::Amp
                    | Punct::Star
                    | Punct::At
            )
    )
}

fn is_pattern_start(tok: &Token) -> bool {
    matches!(&tok.kind, TokenKind::Literal(_) | TokenKind::Ident { .. })
        || matches!(&tok.kind, TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::DotDot))
}

fn is_block_start(tok: &Token) -> bool {
    matches!(&tok.kind, TokenKind::Punct(Punct::At) | TokenKind::Keyword(crate::token::Keyword::Begin))
}

fn is_path_start(tokens: &[Token]) -> bool {
    matches!(tokens.first().map(|t| &t.kind), Some(TokenKind::Ident { .. }))
        && matches!(tokens.get(1).map(|t| &t.kind), Some(TokenKind::Punct(Punct::Dot)))
}

/// One `$name` substitution prepared for a single expansion site.
enum Substitution {
    /// Id/Tk/Stmt/Block: the raw argument tokens are spliced in verbatim.
    Raw(TokenSpan),
    /// Tks: the outer `${ }` delimiters are stripped before splicing.
    Inner(TokenSpan),
    /// Expr/Patt/Path/Dt: deferred — becomes a single expand placeholder token.
    Placeholder(ExpandKind, TokenSpan),
}

/// Runs the six-step expansion algorithm (§4.2) for one macro call.
///
/// Returns the expanded token vector ready to be fed back into the
/// preparser's shape-recognizer at the call site (step 5); the caller is
/// responsible for that re-entry and for step 6's whole-pipeline re-run.
pub fn expand(def: &MacroDef, args: &[TokenSpan], call_site: Location, diags: &mut Diagnostics) -> Option<Vec<Token>> {
    if args.len() != def.params.len() {
        diags.push(Diagnostic::new(
            DiagnosticKind::MacroArityMismatch,
            call_site,
            format!("macro expects {} argument(s), found {}", def.params.len(), args.len()),
        ));
        return None;
    }

    let mut subs: AHashMap<StringId, Substitution> = AHashMap::default();
    for (param, arg) in def.params.iter().zip(args) {
        let sub = classify_argument(param, arg, call_site, diags)?;
        subs.insert(param.name, sub);
    }

    let mut out = Vec::with_capacity(def.body.len());
    for tok in &def.body {
        if let Some(name) = tok.dollar_name() {
            match subs.get(&name) {
                Some(Substitution::Raw(tokens) | Substitution::Inner(tokens)) => out.extend(tokens.iter().cloned()),
                Some(Substitution::Placeholder(kind, tokens)) => {
                    out.push(Token::new(TokenKind::Expand { kind: *kind, tokens: tokens.clone().into() }, tok.location));
                }
                None => {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::MacroUnknownParam,
                        tok.location,
                        format!("macro has no parameter `${}`", name.index()),
                    ));
                    return None;
                }
            }
        } else {
            out.push(tok.clone());
        }
    }
    Some(out)
}

fn classify_argument(
    param: &MacroParam,
    arg: &TokenSpan,
    call_site: Location,
    diags: &mut Diagnostics,
) -> Option<Substitution> {
    use MacroParamKind::{Block, Dt, Expr, Id, Patt, Path, Stmt, Tk, Tks};

    let mismatch = |diags: &mut Diagnostics| {
        diags.push(Diagnostic::new(
            DiagnosticKind::MacroParamKindMismatch,
            call_site,
            format!("argument does not match parameter kind `{}`", param.kind),
        ));
    };

    match param.kind {
        Id => match arg.first() {
            Some(t) if matches!(&t.kind, TokenKind::Ident { .. }) && arg.len() == 1 => Some(Substitution::Raw(arg.clone())),
            _ => {
                mismatch(diags);
                None
            }
        },
        Tk => {
            if arg.len() == 1 {
                Some(Substitution::Raw(arg.clone()))
            } else {
                mismatch(diags);
                None
            }
        }
        Tks => {
            let Some(first) = arg.first() else {
                mismatch(diags);
                return None;
            };
            let Some(last) = arg.last() else {
                mismatch(diags);
                return None;
            };
            if matches!(first.kind, TokenKind::Punct(Punct::Dollar)) && matches!(last.kind, TokenKind::Punct(Punct::RBrace)) {
                Some(Substitution::Inner(arg[1..arg.len() - 1].to_vec()))
            } else {
                mismatch(diags);
                None
            }
        }
        Stmt => arg.first().filter(|t| is_stmt_start(t)).map(|_| Substitution::Raw(arg.clone())).or_else(|| {
            mismatch(diags);
            None
        }),
        Block => arg.first().filter(|t| is_block_start(t)).map(|_| Substitution::Raw(arg.clone())).or_else(|| {
            mismatch(diags);
            None
        }),
        Dt => arg.first().filter(|t| is_data_type_start(t)).map(|_| Substitution::Placeholder(ExpandKind::Dt, arg.clone())).or_else(
            || {
                mismatch(diags);
                None
            },
        ),
        Expr => arg.first().filter(|t| is_expr_start(t)).map(|_| Substitution::Placeholder(ExpandKind::Expr, arg.clone())).or_else(
            || {
                mismatch(diags);
                None
            },
        ),
        Patt => arg.first().filter(|t| is_pattern_start(t)).map(|_| Substitution::Placeholder(ExpandKind::Patt, arg.clone())).or_else(
            || {
                mismatch(diags);
                None
            },
        ),
        Path => {
            if is_path_start(arg) {
                Some(Substitution::Placeholder(ExpandKind::Path, arg.clone()))
            } else {
                mismatch(diags);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MacroDef, MacroParam, MacroParamKind, MacroTable, expand};
    use crate::{
        ast::Visibility,
        diagnostics::Diagnostics,
        intern::InternerBuilder,
        location::{Location, Pos},
        token::{IdentKind, Token, TokenKind},
    };

    fn loc(interner: &mut InternerBuilder) -> Location {
        let file = interner.intern("m.nv");
        Location::point(file, Pos::new(0, 0, 0))
    }

    #[test]
    fn private_shadows_nothing_and_public_merge_is_visible() {
        let mut interner = InternerBuilder::new();
        let l = loc(&mut interner);
        let name = interner.intern("dbg");
        let mut table_a = MacroTable::new();
        table_a.define(MacroDef { name, location: l, params: vec![], body: vec![], visibility: Visibility::Public });
        let mut table_b = MacroTable::new();
        assert!(table_b.lookup(name).is_err());
        table_b.merge_public_from(&table_a);
        assert!(table_b.lookup(name).is_ok());
    }

    #[test]
    fn id_argument_substitutes_verbatim() {
        let mut interner = InternerBuilder::new();
        let l = loc(&mut interner);
        let param_name = interner.intern("x");
        let arg_name = interner.intern("y");
        let dollar_tok = Token::new(TokenKind::Ident { kind: IdentKind::Dollar, name: param_name }, l);
        let def = MacroDef {
            name: interner.intern("m"),
            location: l,
            params: vec![MacroParam { name: param_name, kind: MacroParamKind::Id }],
            body: vec![dollar_tok],
            visibility: Visibility::Private,
        };
        let arg = vec![Token::new(TokenKind::Ident { kind: IdentKind::Normal, name: arg_name }, l)];
        let mut diags = Diagnostics::new(vec![]);
        let expanded = expand(&def, &[arg], l, &mut diags).expect("expansion should succeed");
        assert_eq!(expanded.len(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn arity_mismatch_is_diagnosed() {
        let mut interner = InternerBuilder::new();
        let l = loc(&mut interner);
        let def = MacroDef { name: interner.intern("m"), location: l, params: vec![], body: vec![], visibility: Visibility::Private };
        let mut diags = Diagnostics::new(vec![]);
        let arg_name = interner.intern("y");
        let extra = vec![Token::new(TokenKind::Ident { kind: IdentKind::Normal, name: arg_name }, l)];
        assert!(expand(&def, &[extra], l, &mut diags).is_none());
        assert!(diags.has_errors());
    }
}
