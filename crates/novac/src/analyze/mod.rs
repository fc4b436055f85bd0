//! The analyzer / type checker (§4.4): builds the scope tree, resolves
//! names, infers and checks data types, and produces a typed ("checked")
//! tree. Grounded on the teacher's `Prepare` driver — a cursor struct that
//! walks parsed nodes once, threading resolution state through recursive
//! `prepare_*` calls — generalized from a flat namespace into scope-tree
//! lookups, and from "resolve to a slot index" into "resolve to a checked
//! type".
//!
//! Failure semantics (§4.4 "Failure semantics"): every `check_*` method is
//! infallible. On an error it pushes a diagnostic and returns
//! `CheckedType::Unknown` (or a node tainted with it) rather than
//! unwinding, so the rest of the enclosing declaration still gets checked.

pub mod generics;
pub mod operators;
pub mod patterns;
pub mod types;

use ahash::AHashMap;

use crate::{
    ast::{
        Path, Spanned,
        data_type::{DataType, Primitive},
        decl::{Decl, FunBody, FunDecl, ObjectKind, Param},
        expr::{Arg, BinOp, CallKind, CmpOp, Expr, MatchArm as ExprMatchArm, UnaryOp},
        pattern::Pattern,
        stmt::{MatchArmStmt, Stmt},
    },
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    intern::{InternerBuilder, StringId},
    location::Location,
    scope::{ScopeId, ScopeKind, ScopeTree, SymbolId, SymbolKind},
    signature::{Signature, SignatureTable, Substitution},
};

use self::{
    generics::CompilerGenericArena,
    operators::OperatorRegister,
    types::CheckedType,
};

/// A fully checked expression: every node carries its own resolved type,
/// mirroring the recursive `ExprLoc`/`Expr` shape the teacher threads
/// through `prepare_expression`, but typed instead of slot-resolved.
#[derive(Debug, Clone)]
pub struct CheckedExpr {
    pub location: Location,
    pub ty: CheckedType,
    pub kind: CheckedExprKind,
}

#[derive(Debug, Clone)]
pub enum CheckedExprKind {
    /// The literal's own payload, kept around so MIR lowering can emit the
    /// matching constant `Value` without re-deriving it from `ty`.
    Literal(crate::token::Literal),
    /// A resolved name reference, or `None` if resolution failed (the
    /// node's `ty` is already `Unknown` in that case).
    Name(Option<SymbolId>),
    Binary { lhs: Box<CheckedExpr>, op: BinOp, rhs: Box<CheckedExpr> },
    Cmp { lhs: Box<CheckedExpr>, op: CmpOp, rhs: Box<CheckedExpr> },
    Unary { op: UnaryOp, operand: Box<CheckedExpr> },
    If { cond: Box<CheckedExpr>, then_branch: Box<CheckedExpr>, else_branch: Option<Box<CheckedExpr>> },
    Match { scrutinee: Box<CheckedExpr>, arms: Vec<CheckedMatchArm> },
    Call { callee: Option<SymbolId>, args: Vec<CheckedExpr> },
    Tuple(Vec<CheckedExpr>),
    Array(Vec<CheckedExpr>),
    List(Vec<CheckedExpr>),
    Block(Vec<CheckedStmt>),
    /// A shape the analyzer doesn't yet resolve a richer kind for (object
    /// chains, record/variant/lambda/sys calls, casts, awaits). Still
    /// carries a best-effort `ty` on the enclosing `CheckedExpr`.
    Opaque,
}

#[derive(Debug, Clone)]
pub struct CheckedMatchArm {
    pub pattern: Spanned<Pattern>,
    /// The scope the pattern's bound names were inserted into (§4.4), so
    /// MIR lowering can re-resolve each binding's `SymbolId` while
    /// destructuring the scrutinee the same way [`patterns::check_pattern`]
    /// walked it.
    pub scope: ScopeId,
    pub guard: Option<CheckedExpr>,
    pub body: CheckedExpr,
}

#[derive(Debug, Clone)]
pub enum CheckedStmt {
    Expr(CheckedExpr),
    Variable { symbol: Option<SymbolId>, name: StringId, mutable: bool, ty: CheckedType, init: Option<CheckedExpr> },
    Assign { target: CheckedExpr, value: CheckedExpr },
    If {
        cond: CheckedExpr,
        then_block: Vec<CheckedStmt>,
        elifs: Vec<(CheckedExpr, Vec<CheckedStmt>)>,
        else_block: Option<Vec<CheckedStmt>>,
    },
    Match { scrutinee: CheckedExpr, arms: Vec<CheckedMatchArm> },
    Loop { body: Vec<CheckedStmt> },
    Return(Option<CheckedExpr>),
    Raise(CheckedExpr),
    Other,
}

/// A checked fun/method, ready for MIR lowering.
#[derive(Debug, Clone)]
pub struct CheckedFun {
    pub symbol: SymbolId,
    pub global_name: StringId,
    pub params: Vec<(StringId, CheckedType)>,
    pub return_ty: CheckedType,
    pub body: CheckedFunBody,
    pub scope: ScopeId,
}

#[derive(Debug, Clone)]
pub enum CheckedFunBody {
    Expr(CheckedExpr),
    Block(Vec<CheckedStmt>),
    None,
}

/// A checked record/record-object/class, ready for MIR struct lowering.
/// Enums and traits carry no field list of their own and never produce one
/// of these (§4.5 "one MIR struct per record").
#[derive(Debug, Clone)]
pub struct CheckedStruct {
    pub symbol: SymbolId,
    pub global_name: StringId,
    pub fields: Vec<(StringId, CheckedType)>,
}

/// A checked package-level constant, ready for MIR const lowering (§4.5
/// "one MIR const per constant").
#[derive(Debug, Clone)]
pub struct CheckedConst {
    pub symbol: SymbolId,
    pub global_name: StringId,
    pub ty: CheckedType,
    pub value: CheckedExpr,
}

/// The analyzer's full output (§6 "A checked package").
pub struct CheckedPackage {
    pub scopes: ScopeTree,
    pub funs: Vec<CheckedFun>,
    pub structs: Vec<CheckedStruct>,
    pub consts: Vec<CheckedConst>,
    pub operator_register: OperatorRegister,
    pub signatures: SignatureTable,
}

/// Drives one package's analysis pass. Owns the scope tree, signature
/// table, operator register, and compiler-generic arena for the whole
/// package; `check_package` is the single entry point.
pub struct Analyzer<'d> {
    interner: &'d mut InternerBuilder,
    scopes: ScopeTree,
    signatures: SignatureTable,
    operators: OperatorRegister,
    generics: CompilerGenericArena,
}

impl<'d> Analyzer<'d> {
    #[must_use]
    pub fn new(interner: &'d mut InternerBuilder) -> Self {
        let mut analyzer = Self {
            interner,
            scopes: ScopeTree::new(),
            signatures: SignatureTable::new(),
            operators: OperatorRegister::new(),
            generics: CompilerGenericArena::new(),
        };
        analyzer.register_builtin_operators();
        analyzer
    }

    /// Seeds the operator register with the primitive arithmetic/bitwise
    /// operators every package gets for free, so user-declared overloads and
    /// built-ins are resolved through the same candidate-collection path
    /// (§4.4 "Operator overloading").
    fn register_builtin_operators(&mut self) {
        const NUMERIC: &[Primitive] = &[
            Primitive::I8, Primitive::I16, Primitive::I32, Primitive::I64,
            Primitive::U8, Primitive::U16, Primitive::U32, Primitive::U64,
            Primitive::Isize, Primitive::Usize, Primitive::F32, Primitive::F64,
        ];
        const INTEGRAL: &[Primitive] = &[
            Primitive::I8, Primitive::I16, Primitive::I32, Primitive::I64,
            Primitive::U8, Primitive::U16, Primitive::U32, Primitive::U64,
            Primitive::Isize, Primitive::Usize,
        ];

        let arith = [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Mod];
        for op in arith {
            let name = self.intern_bin_op_name(op);
            for p in NUMERIC {
                self.operators.add_operator(operators::OperatorSignature {
                    name,
                    location: Location::default(),
                    params: vec![CheckedType::Primitive(*p), CheckedType::Primitive(*p)],
                    ret: CheckedType::Primitive(*p),
                });
            }
        }

        let bitwise = [BinOp::BitAnd, BinOp::BitOr, BinOp::BitXor, BinOp::Shl, BinOp::Shr];
        for op in bitwise {
            let name = self.intern_bin_op_name(op);
            for p in INTEGRAL {
                self.operators.add_operator(operators::OperatorSignature {
                    name,
                    location: Location::default(),
                    params: vec![CheckedType::Primitive(*p), CheckedType::Primitive(*p)],
                    ret: CheckedType::Primitive(*p),
                });
            }
        }

        for op in [BinOp::And, BinOp::Or] {
            let name = self.intern_bin_op_name(op);
            self.operators.add_operator(operators::OperatorSignature {
                name,
                location: Location::default(),
                params: vec![CheckedType::Primitive(Primitive::Bool), CheckedType::Primitive(Primitive::Bool)],
                ret: CheckedType::Primitive(Primitive::Bool),
            });
        }

        let neg_name = self.intern_unary_op_name(UnaryOp::Neg);
        for p in NUMERIC {
            self.operators.add_operator(operators::OperatorSignature {
                name: neg_name,
                location: Location::default(),
                params: vec![CheckedType::Primitive(*p)],
                ret: CheckedType::Primitive(*p),
            });
        }
        let not_name = self.intern_unary_op_name(UnaryOp::Not);
        self.operators.add_operator(operators::OperatorSignature {
            name: not_name,
            location: Location::default(),
            params: vec![CheckedType::Primitive(Primitive::Bool)],
            ret: CheckedType::Primitive(Primitive::Bool),
        });
        let bitnot_name = self.intern_unary_op_name(UnaryOp::BitNot);
        for p in INTEGRAL {
            self.operators.add_operator(operators::OperatorSignature {
                name: bitnot_name,
                location: Location::default(),
                params: vec![CheckedType::Primitive(*p)],
                ret: CheckedType::Primitive(*p),
            });
        }
    }

    pub fn check_package(mut self, decls: &[Spanned<Decl>], diags: &mut Diagnostics) -> CheckedPackage {
        let root = self.scopes.root();

        // Pass 1: register every top-level name so forward references
        // resolve regardless of source order (§8 property 5).
        for decl in decls {
            self.register_decl(&decl.node, root, diags);
        }

        // Pass 2: check bodies now that every name at this level exists.
        let mut funs = Vec::new();
        let mut structs = Vec::new();
        let mut consts = Vec::new();
        for decl in decls {
            match &decl.node {
                Decl::Fun(fun_decl) => funs.push(self.check_fun(fun_decl, root, diags)),
                Decl::Object(object) => structs.extend(self.check_struct(object, root, diags)),
                Decl::Const(const_decl) => consts.push(self.check_const(const_decl, root, diags)),
                _ => {}
            }
        }

        CheckedPackage { scopes: self.scopes, funs, structs, consts, operator_register: self.operators, signatures: self.signatures }
    }

    fn register_decl(&mut self, decl: &Decl, scope: ScopeId, diags: &mut Diagnostics) {
        match decl {
            Decl::Fun(fun) => {
                let symbol = self.scopes.insert(diags, scope, SymbolKind::Fun, fun.header.name, fun.header.location, None);
                let resolved_ty = self.fun_signature_type(fun, scope, diags);
                self.signatures.register(Signature::new(fun.header.name, symbol, fun.generics.clone(), resolved_ty));
            }
            Decl::Module(module) => {
                let sub = self.scopes.push_scope(scope, ScopeKind::Module);
                self.scopes.insert(diags, scope, SymbolKind::Module, module.header.name, module.header.location, Some(sub));
                for inner in &module.body {
                    self.register_decl(inner, sub, diags);
                }
            }
            Decl::Object(object) => self.register_object(object, scope, diags),
            Decl::Type(type_decl) => {
                let symbol =
                    self.scopes.insert(diags, scope, SymbolKind::Alias, type_decl.header.name, type_decl.header.location, None);
                let resolved = self.resolve_data_type(&type_decl.target.node, scope);
                self.signatures.register(Signature::new(
                    type_decl.header.name,
                    symbol,
                    type_decl.generics.clone(),
                    resolved,
                ));
            }
            Decl::Const(const_decl) => {
                self.scopes.insert(diags, scope, SymbolKind::Constant, const_decl.header.name, const_decl.header.location, None);
            }
            Decl::ErrorDef(error_decl) => {
                self.scopes.insert(diags, scope, SymbolKind::Error, error_decl.header.name, error_decl.header.location, None);
            }
            Decl::Use(use_decl) => {
                let name = use_decl.alias.unwrap_or_else(|| use_decl.path.head());
                self.scopes.insert(diags, scope, SymbolKind::Module, name, use_decl.header.location, None);
            }
            Decl::Include(_) | Decl::Malformed => {}
        }
    }

    fn register_object(&mut self, object: &crate::ast::decl::ObjectDecl, scope: ScopeId, diags: &mut Diagnostics) {
        let (kind, sub_kind) = match &object.kind {
            ObjectKind::Record(_) => (SymbolKind::Record, ScopeKind::Record),
            ObjectKind::RecordObject(_) => (SymbolKind::RecordObject, ScopeKind::RecordObject),
            ObjectKind::Enum(_) => (SymbolKind::Enum, ScopeKind::EnumObject),
            ObjectKind::EnumObject(_) => (SymbolKind::EnumObject, ScopeKind::EnumObject),
            ObjectKind::Class(_) => (SymbolKind::Class, ScopeKind::Class),
            ObjectKind::Trait(_) => (SymbolKind::Trait, ScopeKind::Trait),
        };
        let sub = self.scopes.push_scope(scope, sub_kind);
        let symbol = self.scopes.insert(diags, scope, kind, object.header.name, object.header.location, Some(sub));

        match &object.kind {
            ObjectKind::Enum(body) => {
                for variant in &body.variants {
                    self.scopes.insert(diags, sub, SymbolKind::Variable, variant.name, object.header.location, None);
                }
            }
            ObjectKind::EnumObject(body) => {
                for variant in &body.variants {
                    self.scopes.insert(diags, sub, SymbolKind::Variable, variant.name, object.header.location, None);
                }
                for method in &body.methods {
                    self.scopes.insert(diags, sub, SymbolKind::Method, method.header.name, method.header.location, None);
                }
            }
            ObjectKind::Record(body) => {
                for field in &body.fields {
                    self.scopes.insert(diags, sub, SymbolKind::Variable, field.name, object.header.location, None);
                }
            }
            ObjectKind::RecordObject(body) => {
                for field in &body.fields {
                    self.scopes.insert(diags, sub, SymbolKind::Variable, field.name, object.header.location, None);
                }
                for method in &body.methods {
                    self.scopes.insert(diags, sub, SymbolKind::Method, method.header.name, method.header.location, None);
                }
            }
            ObjectKind::Class(body) => {
                for field in &body.fields {
                    self.scopes.insert(diags, sub, SymbolKind::Variable, field.name, object.header.location, None);
                }
                for method in &body.methods {
                    self.scopes.insert(diags, sub, SymbolKind::Method, method.header.name, method.header.location, None);
                }
            }
            ObjectKind::Trait(body) => {
                for method in &body.methods {
                    self.scopes.insert(diags, sub, SymbolKind::Method, method.header.name, method.header.location, None);
                }
            }
        }

        let resolved_ty = CheckedType::Custom { scope: sub, name: object.header.name, generics: Vec::new(), recursive: false };
        self.signatures.register(Signature::new(object.header.name, symbol, object.generics.clone(), resolved_ty));
    }

    /// Checks a record/record-object/class's fields into a [`CheckedStruct`]
    /// for MIR struct lowering. Enums, enum-objects, and traits have no
    /// field list and never produce one (§4.5).
    fn check_struct(&mut self, object: &crate::ast::decl::ObjectDecl, scope: ScopeId, diags: &mut Diagnostics) -> Option<CheckedStruct> {
        let _ = diags;
        let fields = match &object.kind {
            ObjectKind::Record(body) => &body.fields,
            ObjectKind::RecordObject(body) => &body.fields,
            ObjectKind::Class(body) => &body.fields,
            ObjectKind::Enum(_) | ObjectKind::EnumObject(_) | ObjectKind::Trait(_) => return None,
        };
        let symbol_kind = match &object.kind {
            ObjectKind::Record(_) => SymbolKind::Record,
            ObjectKind::RecordObject(_) => SymbolKind::RecordObject,
            ObjectKind::Class(_) => SymbolKind::Class,
            ObjectKind::Enum(_) | ObjectKind::EnumObject(_) | ObjectKind::Trait(_) => unreachable!("filtered above"),
        };
        let symbol = match self.scopes.lookup(scope, symbol_kind, object.header.name) {
            crate::scope::Response::Found { symbol, .. } => symbol.id,
            crate::scope::Response::NotFound { .. } => SymbolId(0),
        };
        let checked_fields = fields.iter().map(|f| (f.name, self.resolve_data_type(&f.ty.node, scope))).collect();
        Some(CheckedStruct { symbol, global_name: object.header.global_name.unwrap_or(object.header.name), fields: checked_fields })
    }

    /// Checks a top-level constant's annotation (if any) against its value's
    /// inferred type and produces a [`CheckedConst`] for MIR const lowering.
    fn check_const(&mut self, const_decl: &crate::ast::decl::ConstDecl, scope: ScopeId, diags: &mut Diagnostics) -> CheckedConst {
        let declared = const_decl.ty.as_ref().map(|t| self.resolve_data_type(&t.node, scope));
        let value = self.check_expr(&const_decl.value, scope, diags);
        let ty = match declared {
            Some(d) => generics::expect_unify(&d, &value.ty, const_decl.value.location, &mut self.generics, diags),
            None => value.ty.clone(),
        };
        let symbol = match self.scopes.lookup(scope, SymbolKind::Constant, const_decl.header.name) {
            crate::scope::Response::Found { symbol, .. } => symbol.id,
            crate::scope::Response::NotFound { .. } => SymbolId(0),
        };
        CheckedConst { symbol, global_name: const_decl.header.global_name.unwrap_or(const_decl.header.name), ty, value }
    }

    fn fun_signature_type(&self, fun: &FunDecl, scope: ScopeId, diags: &mut Diagnostics) -> CheckedType {
        let _ = diags;
        let params = fun.params.iter().map(|p: &Param| self.resolve_data_type(&p.ty.node, scope)).collect();
        let ret = Box::new(self.resolve_data_type(&fun.return_ty.node, scope));
        CheckedType::Lambda { params, ret }
    }

    /// Resolves a parsed `DataType` into a `CheckedType`. `Custom`/`Generic`
    /// paths are resolved against the scope tree; an unresolved name taints
    /// to `Unknown` rather than erroring here (the caller, which has the
    /// use site's location, raises `NameNotFound`).
    fn resolve_data_type(&self, dt: &DataType, scope: ScopeId) -> CheckedType {
        match dt {
            DataType::Primitive(p) => CheckedType::Primitive(*p),
            DataType::Array { kind, elem } => {
                CheckedType::Array { kind: *kind, elem: Box::new(self.resolve_data_type(&elem.node, scope)) }
            }
            DataType::Tuple(elems) => {
                CheckedType::Tuple(elems.iter().map(|e| self.resolve_data_type(&e.node, scope)).collect())
            }
            DataType::List(elem) => CheckedType::List(Box::new(self.resolve_data_type(&elem.node, scope))),
            DataType::Lambda { params, ret } => CheckedType::Lambda {
                params: params.iter().map(|p| self.resolve_data_type(&p.node, scope)).collect(),
                ret: Box::new(self.resolve_data_type(&ret.node, scope)),
            },
            DataType::Ptr(t) => CheckedType::Ptr(Box::new(self.resolve_data_type(&t.node, scope))),
            DataType::Ref(t) => CheckedType::Ref(Box::new(self.resolve_data_type(&t.node, scope))),
            DataType::Trace(t) => CheckedType::Trace(Box::new(self.resolve_data_type(&t.node, scope))),
            DataType::Mut(t) => CheckedType::Mut(Box::new(self.resolve_data_type(&t.node, scope))),
            DataType::Optional(t) => CheckedType::Optional(Box::new(self.resolve_data_type(&t.node, scope))),
            DataType::Result { errs, ok } => CheckedType::Result {
                ok: Box::new(self.resolve_data_type(&ok.node, scope)),
                errs: errs.iter().map(|e| self.resolve_data_type(&e.node, scope)).collect(),
            },
            DataType::Custom { path, generics } => {
                let generic_args: Vec<CheckedType> = generics.iter().map(|g| self.resolve_data_type(&g.node, scope)).collect();
                match self.scopes.resolve_path(scope, SymbolKind::Record, &path.segments) {
                    crate::scope::Response::Found { scope: found_scope, .. } => {
                        CheckedType::Custom { scope: found_scope, name: path.head(), generics: generic_args, recursive: false }
                    }
                    crate::scope::Response::NotFound { .. } => self.resolve_alias(&path.segments, &generic_args, scope, path.head()),
                }
            }
            DataType::Generic(path) => CheckedType::Generic(path.head()),
            DataType::Malformed => CheckedType::Unknown,
        }
    }

    /// Falls back from `Custom`'s failed `Record` lookup to a `type` alias
    /// registered under `SymbolKind::Alias`, substituting `generic_args` into
    /// the alias's own resolved target (e.g. `Pair[i32, Str]` against
    /// `type Pair[T, U] = (T, U)` resolves to `(i32, Str)`). Still falls
    /// through to an unbound [`CheckedType::Generic`] if no alias matches
    /// either, same as the un-aliased path.
    fn resolve_alias(
        &self,
        segments: &[StringId],
        generic_args: &[CheckedType],
        scope: ScopeId,
        head: StringId,
    ) -> CheckedType {
        let crate::scope::Response::Found { symbol, .. } = self.scopes.resolve_path(scope, SymbolKind::Alias, segments)
        else {
            return CheckedType::Generic(head);
        };
        let Some(signature) = self.signatures.get(symbol.id) else {
            return CheckedType::Generic(head);
        };
        if signature.generic_params.len() != generic_args.len() {
            return signature.resolved_type.clone();
        }
        let mapping: AHashMap<StringId, CheckedType> =
            signature.generic_params.iter().copied().zip(generic_args.iter().cloned()).collect();
        signature.resolved_type.substitute(&mapping)
    }

    fn check_fun(&mut self, fun: &FunDecl, scope: ScopeId, diags: &mut Diagnostics) -> CheckedFun {
        let fun_scope = self.scopes.push_scope(scope, ScopeKind::FunBody);
        for generic in &fun.generics {
            self.scopes.insert(diags, fun_scope, SymbolKind::Generic, *generic, fun.header.location, None);
        }
        let mut params = Vec::with_capacity(fun.params.len());
        for param in &fun.params {
            let ty = self.resolve_data_type(&param.ty.node, fun_scope);
            self.scopes.insert(diags, fun_scope, SymbolKind::Variable, param.name.name, param.name.location, None);
            params.push((param.name.name, ty));
        }
        let return_ty = self.resolve_data_type(&fun.return_ty.node, fun_scope);

        let symbol_response = self.scopes.lookup(scope, SymbolKind::Fun, fun.header.name);
        let symbol = match symbol_response {
            crate::scope::Response::Found { symbol, .. } => Some(symbol.id),
            crate::scope::Response::NotFound { .. } => None,
        };

        let body = match &fun.body {
            FunBody::Expr(expr) => {
                let checked = self.check_expr(expr, fun_scope, diags);
                generics::expect_unify(&return_ty, &checked.ty, expr.location, &mut self.generics, diags);
                CheckedFunBody::Expr(checked)
            }
            FunBody::Block(stmts) => CheckedFunBody::Block(self.check_block(stmts, fun_scope, &return_ty, diags)),
            FunBody::None => CheckedFunBody::None,
        };

        CheckedFun {
            symbol: symbol.unwrap_or(SymbolId(0)),
            global_name: fun.header.global_name.unwrap_or(fun.header.name),
            params,
            return_ty,
            body,
            scope: fun_scope,
        }
    }

    fn check_block(
        &mut self,
        stmts: &[Spanned<Stmt>],
        scope: ScopeId,
        return_ty: &CheckedType,
        diags: &mut Diagnostics,
    ) -> Vec<CheckedStmt> {
        let block_scope = self.scopes.push_scope(scope, ScopeKind::Block);
        stmts.iter().map(|s| self.check_stmt(s, block_scope, return_ty, diags)).collect()
    }

    fn check_stmt(
        &mut self,
        stmt: &Spanned<Stmt>,
        scope: ScopeId,
        return_ty: &CheckedType,
        diags: &mut Diagnostics,
    ) -> CheckedStmt {
        match &stmt.node {
            Stmt::Expr(expr) => CheckedStmt::Expr(self.check_expr(expr, scope, diags)),
            Stmt::Variable { mutable, name, ty, init } => {
                let declared = ty.as_ref().map(|t| self.resolve_data_type(&t.node, scope));
                let init_checked = init.as_ref().map(|e| self.check_expr(e, scope, diags));
                let resolved_ty = match (&declared, &init_checked) {
                    (Some(d), Some(i)) => generics::expect_unify(d, &i.ty, name.location, &mut self.generics, diags),
                    (Some(d), None) => d.clone(),
                    (None, Some(i)) => i.ty.clone(),
                    (None, None) => CheckedType::Unknown,
                };
                let symbol = Some(self.scopes.insert(diags, scope, SymbolKind::Variable, name.name, name.location, None));
                CheckedStmt::Variable { symbol, name: name.name, mutable: *mutable, ty: resolved_ty, init: init_checked }
            }
            Stmt::Assign { target, value } => CheckedStmt::Assign {
                target: self.check_expr(target, scope, diags),
                value: self.check_expr(value, scope, diags),
            },
            Stmt::If { cond, capture: _, then_block, elifs, else_block } => {
                let cond_checked = self.check_expr(cond, scope, diags);
                let then_checked = self.check_block(then_block, scope, return_ty, diags);
                let elifs_checked = elifs
                    .iter()
                    .map(|elif| (self.check_expr(&elif.cond, scope, diags), self.check_block(&elif.body, scope, return_ty, diags)))
                    .collect();
                let else_checked = else_block.as_ref().map(|b| self.check_block(b, scope, return_ty, diags));
                CheckedStmt::If { cond: cond_checked, then_block: then_checked, elifs: elifs_checked, else_block: else_checked }
            }
            Stmt::Match { scrutinee, arms } => {
                let scrutinee_checked = self.check_expr(scrutinee, scope, diags);
                let (arms_checked, coverage) = self.check_match_arms_stmt(arms, &scrutinee_checked.ty, scope, diags);
                patterns::check_exhaustiveness(&coverage, None, stmt.location, diags);
                CheckedStmt::Match { scrutinee: scrutinee_checked, arms: arms_checked }
            }
            Stmt::For { binding, iter, body, .. } => {
                let iter_checked = self.check_expr(iter, scope, diags);
                let loop_scope = self.scopes.push_scope(scope, ScopeKind::ForBody);
                let elem_ty = match &iter_checked.ty {
                    CheckedType::List(elem) | CheckedType::Array { elem, .. } => (**elem).clone(),
                    _ => CheckedType::Unknown,
                };
                patterns::check_pattern(binding, &elem_ty, &mut self.scopes, loop_scope, &mut self.generics, diags);
                let body_checked = body.iter().map(|s| self.check_stmt(s, loop_scope, return_ty, diags)).collect();
                CheckedStmt::Loop { body: body_checked }
            }
            Stmt::While { cond, body, .. } => {
                let cond_checked = self.check_expr(cond, scope, diags);
                let loop_scope = self.scopes.push_scope(scope, ScopeKind::WhileBody);
                let mut body_checked = vec![CheckedStmt::Expr(cond_checked)];
                body_checked.extend(body.iter().map(|s| self.check_stmt(s, loop_scope, return_ty, diags)));
                CheckedStmt::Loop { body: body_checked }
            }
            Stmt::Loop { body, .. } => {
                let loop_scope = self.scopes.push_scope(scope, ScopeKind::LoopBody);
                CheckedStmt::Loop { body: body.iter().map(|s| self.check_stmt(s, loop_scope, return_ty, diags)).collect() }
            }
            Stmt::DoWhile { body, cond } => {
                let loop_scope = self.scopes.push_scope(scope, ScopeKind::DoWhileBody);
                let mut body_checked: Vec<CheckedStmt> =
                    body.iter().map(|s| self.check_stmt(s, loop_scope, return_ty, diags)).collect();
                body_checked.push(CheckedStmt::Expr(self.check_expr(cond, loop_scope, diags)));
                CheckedStmt::Loop { body: body_checked }
            }
            Stmt::TryCatch { body, catch_name, catch_body } => {
                let try_scope = self.scopes.push_scope(scope, ScopeKind::TryBody);
                self.scopes.set_catch(
                    try_scope,
                    crate::scope::CatchClause { name: catch_name.as_ref().map(|i| i.name), location: stmt.location },
                );
                let body_checked = body.iter().map(|s| self.check_stmt(s, try_scope, return_ty, diags)).collect::<Vec<_>>();
                let catch_scope = self.scopes.push_scope(scope, ScopeKind::CatchBody);
                if let Some(name) = catch_name {
                    self.scopes.insert(diags, catch_scope, SymbolKind::Variable, name.name, name.location, None);
                }
                let catch_checked = catch_body.iter().map(|s| self.check_stmt(s, catch_scope, return_ty, diags)).collect();
                CheckedStmt::If {
                    cond: self.opaque_expr(stmt.location, CheckedType::Primitive(Primitive::Bool)),
                    then_block: body_checked,
                    elifs: Vec::new(),
                    else_block: Some(catch_checked),
                }
            }
            Stmt::Unsafe(body) | Stmt::Defer(body) | Stmt::Block(body) => CheckedStmt::Loop {
                body: body.iter().map(|s| self.check_stmt(s, scope, return_ty, diags)).collect(),
            },
            Stmt::Drop(expr) => CheckedStmt::Expr(self.check_expr(expr, scope, diags)),
            Stmt::Asm(_) => CheckedStmt::Other,
            Stmt::Raise(expr) => CheckedStmt::Raise(self.check_expr(expr, scope, diags)),
            Stmt::Return(expr) => {
                let checked = expr.as_ref().map(|e| self.check_expr(e, scope, diags));
                let actual = checked.as_ref().map_or(CheckedType::unit(), |c| c.ty.clone());
                generics::expect_unify(return_ty, &actual, stmt.location, &mut self.generics, diags);
                CheckedStmt::Return(checked)
            }
            Stmt::Next(_) | Stmt::Break(_) | Stmt::Empty | Stmt::Malformed => CheckedStmt::Other,
        }
    }

    fn check_match_arms_stmt(
        &mut self,
        arms: &[MatchArmStmt],
        scrutinee_ty: &CheckedType,
        scope: ScopeId,
        diags: &mut Diagnostics,
    ) -> (Vec<CheckedMatchArm>, Vec<(Spanned<Pattern>, bool)>) {
        let mut checked = Vec::with_capacity(arms.len());
        let mut coverage = Vec::with_capacity(arms.len());
        for arm in arms {
            let case_scope = self.scopes.push_scope(scope, ScopeKind::MatchCase);
            let covers_all =
                patterns::check_pattern(&arm.pattern, scrutinee_ty, &mut self.scopes, case_scope, &mut self.generics, diags);
            let guard = arm.guard.as_ref().map(|g| self.check_expr(g, case_scope, diags));
            let body = self.check_block(&arm.body, case_scope, &CheckedType::unit(), diags);
            coverage.push((arm.pattern.clone(), covers_all));
            let body_ty = self.block_tail_ty(&body);
            checked.push(CheckedMatchArm {
                pattern: arm.pattern.clone(),
                scope: case_scope,
                guard,
                body: self.opaque_expr(arm.pattern.location, body_ty),
            });
        }
        (checked, coverage)
    }

    fn check_match_arms_expr(
        &mut self,
        arms: &[ExprMatchArm],
        scrutinee_ty: &CheckedType,
        scope: ScopeId,
        diags: &mut Diagnostics,
    ) -> (Vec<CheckedMatchArm>, Vec<(Spanned<Pattern>, bool)>) {
        let mut checked = Vec::with_capacity(arms.len());
        let mut coverage = Vec::with_capacity(arms.len());
        for arm in arms {
            let case_scope = self.scopes.push_scope(scope, ScopeKind::MatchCase);
            let covers_all =
                patterns::check_pattern(&arm.pattern, scrutinee_ty, &mut self.scopes, case_scope, &mut self.generics, diags);
            let guard = arm.guard.as_ref().map(|g| self.check_expr(g, case_scope, diags));
            let body = self.check_expr(&arm.body, case_scope, diags);
            coverage.push((arm.pattern.clone(), covers_all));
            checked.push(CheckedMatchArm { pattern: arm.pattern.clone(), scope: case_scope, guard, body });
        }
        (checked, coverage)
    }

    fn block_tail_ty(&self, stmts: &[CheckedStmt]) -> CheckedType {
        match stmts.last() {
            Some(CheckedStmt::Expr(e)) => e.ty.clone(),
            _ => CheckedType::unit(),
        }
    }

    fn opaque_expr(&self, location: Location, ty: CheckedType) -> CheckedExpr {
        CheckedExpr { location, ty, kind: CheckedExprKind::Opaque }
    }

    fn check_expr(&mut self, expr: &Spanned<Expr>, scope: ScopeId, diags: &mut Diagnostics) -> CheckedExpr {
        let location = expr.location;
        match &expr.node {
            Expr::Literal(lit) => {
                CheckedExpr { location, ty: literal_type(lit), kind: CheckedExprKind::Literal(lit.clone()) }
            }
            Expr::Path(path) => self.check_path(path, location, scope, diags),
            Expr::Binary { lhs, op, rhs } => {
                let lhs_checked = self.check_expr(lhs, scope, diags);
                let rhs_checked = self.check_expr(rhs, scope, diags);
                let op_name = self.intern_bin_op_name(*op);
                let ty = self.operators.resolve_binary(
                    op_name,
                    location,
                    &lhs_checked.ty,
                    &rhs_checked.ty,
                    &mut self.generics,
                    diags,
                );
                CheckedExpr {
                    location,
                    ty,
                    kind: CheckedExprKind::Binary { lhs: Box::new(lhs_checked), op: *op, rhs: Box::new(rhs_checked) },
                }
            }
            Expr::Cmp { lhs, op, rhs } => {
                let lhs_checked = self.check_expr(lhs, scope, diags);
                let rhs_checked = self.check_expr(rhs, scope, diags);
                generics::expect_unify(&lhs_checked.ty, &rhs_checked.ty, location, &mut self.generics, diags);
                CheckedExpr {
                    location,
                    ty: CheckedType::Primitive(Primitive::Bool),
                    kind: CheckedExprKind::Cmp { lhs: Box::new(lhs_checked), op: *op, rhs: Box::new(rhs_checked) },
                }
            }
            Expr::Unary { op, operand } => {
                let operand_checked = self.check_expr(operand, scope, diags);
                let op_name = self.intern_unary_op_name(*op);
                let ty = self.operators.resolve_unary(op_name, location, &operand_checked.ty, &mut self.generics, diags);
                CheckedExpr {
                    location,
                    ty,
                    kind: CheckedExprKind::Unary { op: *op, operand: Box::new(operand_checked) },
                }
            }
            Expr::If { cond, then_branch, else_branch } => {
                let cond_checked = self.check_expr(cond, scope, diags);
                generics::expect_unify(
                    &CheckedType::Primitive(Primitive::Bool),
                    &cond_checked.ty,
                    cond.location,
                    &mut self.generics,
                    diags,
                );
                let then_checked = self.check_expr(then_branch, scope, diags);
                let else_checked = else_branch.as_ref().map(|e| self.check_expr(e, scope, diags));
                let ty = match &else_checked {
                    Some(e) => generics::expect_unify(&then_checked.ty, &e.ty, location, &mut self.generics, diags),
                    None => CheckedType::unit(),
                };
                CheckedExpr {
                    location,
                    ty,
                    kind: CheckedExprKind::If {
                        cond: Box::new(cond_checked),
                        then_branch: Box::new(then_checked),
                        else_branch: else_checked.map(Box::new),
                    },
                }
            }
            Expr::Match { scrutinee, arms } => {
                let scrutinee_checked = self.check_expr(scrutinee, scope, diags);
                let (arms_checked, coverage) = self.check_match_arms_expr(arms, &scrutinee_checked.ty, scope, diags);
                patterns::check_exhaustiveness(&coverage, None, location, diags);
                let ty = arms_checked.iter().fold(CheckedType::Unknown, |acc, arm| {
                    if acc.is_unknown() {
                        arm.body.ty.clone()
                    } else {
                        acc
                    }
                });
                CheckedExpr {
                    location,
                    ty,
                    kind: CheckedExprKind::Match { scrutinee: Box::new(scrutinee_checked), arms: arms_checked },
                }
            }
            Expr::Tuple(elems) => {
                let checked: Vec<CheckedExpr> = elems.iter().map(|e| self.check_expr(e, scope, diags)).collect();
                let ty = CheckedType::Tuple(checked.iter().map(|e| e.ty.clone()).collect());
                CheckedExpr { location, ty, kind: CheckedExprKind::Tuple(checked) }
            }
            Expr::Array(elems) => {
                let checked: Vec<CheckedExpr> = elems.iter().map(|e| self.check_expr(e, scope, diags)).collect();
                let elem_ty = checked.first().map_or(CheckedType::Unknown, |e| e.ty.clone());
                let ty = CheckedType::Array {
                    kind: crate::ast::data_type::ArrayKind::Sized(checked.len() as u64),
                    elem: Box::new(elem_ty),
                };
                CheckedExpr { location, ty, kind: CheckedExprKind::Array(checked) }
            }
            Expr::List(elems) => {
                let checked: Vec<CheckedExpr> = elems.iter().map(|e| self.check_expr(e, scope, diags)).collect();
                let elem_ty = checked.first().map_or(CheckedType::Unknown, |e| e.ty.clone());
                CheckedExpr { location, ty: CheckedType::List(Box::new(elem_ty)), kind: CheckedExprKind::List(checked) }
            }
            Expr::Block(stmts) => {
                let checked = self.check_block(stmts, scope, &CheckedType::unit(), diags);
                let ty = self.block_tail_ty(&checked);
                CheckedExpr { location, ty, kind: CheckedExprKind::Block(checked) }
            }
            Expr::Call(call_kind) => self.check_call(call_kind, location, scope, diags),
            Expr::Access(_) | Expr::Await(_) | Expr::Cast { .. } => self.opaque_expr(location, CheckedType::Unknown),
            Expr::Malformed => self.opaque_expr(location, CheckedType::Unknown),
        }
    }

    fn check_path(&mut self, path: &Path, location: Location, scope: ScopeId, diags: &mut Diagnostics) -> CheckedExpr {
        let response = self.scopes.resolve_path(scope, SymbolKind::Variable, &path.segments);
        match response {
            crate::scope::Response::Found { symbol, .. } => {
                let ty = self
                    .signatures
                    .get(symbol.id)
                    .map(|sig| sig.resolved_type.clone())
                    .unwrap_or(CheckedType::Unknown);
                CheckedExpr { location, ty, kind: CheckedExprKind::Name(Some(symbol.id)) }
            }
            crate::scope::Response::NotFound { name } => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::NameNotFound,
                    location,
                    format!("name `{}` not found", self.interner.resolve(name)),
                ));
                CheckedExpr { location, ty: CheckedType::Unknown, kind: CheckedExprKind::Name(None) }
            }
        }
    }

    fn check_call(&mut self, call: &CallKind, location: Location, scope: ScopeId, diags: &mut Diagnostics) -> CheckedExpr {
        match call {
            CallKind::Function { callee, generics: call_generics, args } => {
                let callee_checked = self.check_expr(callee, scope, diags);
                let args_checked: Vec<CheckedExpr> = args.iter().map(|a: &Arg| self.check_expr(&a.value, scope, diags)).collect();
                let symbol = match &callee_checked.kind {
                    CheckedExprKind::Name(symbol) => *symbol,
                    _ => None,
                };
                let callee_ty = self.instantiate_call_site(&callee_checked.ty, symbol, call_generics, location, scope, diags);
                let ret_ty = match &callee_ty {
                    CheckedType::Lambda { params, ret } => {
                        for (param_ty, arg) in params.iter().zip(&args_checked) {
                            generics::expect_unify(param_ty, &arg.ty, location, &mut self.generics, diags);
                        }
                        (**ret).clone()
                    }
                    _ => CheckedType::Unknown,
                };
                CheckedExpr { location, ty: ret_ty, kind: CheckedExprKind::Call { callee: symbol, args: args_checked } }
            }
            CallKind::Lambda(lambda) => {
                let lambda_scope = self.scopes.push_scope(scope, ScopeKind::FunBody);
                for param in &lambda.params {
                    self.scopes.insert(diags, lambda_scope, SymbolKind::Variable, param.name, location, None);
                }
                let body = self.check_expr(&lambda.body, lambda_scope, diags);
                let params = lambda
                    .params
                    .iter()
                    .map(|p| p.ty.as_ref().map_or(CheckedType::Unknown, |t| self.resolve_data_type(&t.node, scope)))
                    .collect();
                let ty = CheckedType::Lambda { params, ret: Box::new(body.ty.clone()) };
                self.opaque_expr(location, ty)
            }
            CallKind::Record { ty, .. } => {
                let resolved = self.resolve_data_type(&DataType::Custom { path: ty.clone(), generics: Vec::new() }, scope);
                self.opaque_expr(location, resolved)
            }
            CallKind::Variant { ty, .. } => {
                let resolved = self.resolve_data_type(&DataType::Custom { path: ty.clone(), generics: Vec::new() }, scope);
                self.opaque_expr(location, resolved)
            }
            CallKind::Sys { .. } => self.opaque_expr(location, CheckedType::Unknown),
        }
    }

    /// Resolves a call site's `::[T1, T2, ...]` explicit generics, if any,
    /// against `callee`'s registered signature (§4.4 "Generic
    /// instantiation"). A callee with no registered signature, or a call
    /// with no explicit generics, type-checks against its own inferred type
    /// unchanged. An arity mismatch between the supplied generics and the
    /// signature's declared params diagnoses and falls back the same way.
    fn instantiate_call_site(
        &mut self,
        callee_ty: &CheckedType,
        callee: Option<SymbolId>,
        call_generics: &[Spanned<DataType>],
        location: Location,
        scope: ScopeId,
        diags: &mut Diagnostics,
    ) -> CheckedType {
        if call_generics.is_empty() {
            return callee_ty.clone();
        }
        let Some(symbol) = callee else {
            return callee_ty.clone();
        };
        let substitution =
            Substitution::new(call_generics.iter().map(|g| self.resolve_data_type(&g.node, scope)).collect());
        match self.signatures.instantiate(symbol, substitution) {
            Some(instantiated) => instantiated,
            None => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::GenericArityMismatch,
                    location,
                    "number of explicit generic arguments does not match the callee's declared generics".to_string(),
                ));
                callee_ty.clone()
            }
        }
    }

    /// Interns the canonical operator glyph for `op` so the operator
    /// register can key builtin and user-declared overloads under the same
    /// `StringId` a user's `operator (+) (...)` declaration would intern.
    fn intern_bin_op_name(&mut self, op: BinOp) -> StringId {
        let glyph = match op {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Range => "..",
        };
        self.interner.intern(glyph)
    }

    fn intern_unary_op_name(&mut self, op: UnaryOp) -> StringId {
        let glyph = match op {
            UnaryOp::Neg => "unary-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Ref => "&",
            UnaryOp::Deref => "unary*",
            UnaryOp::Trace => "trace",
        };
        self.interner.intern(glyph)
    }
}

fn literal_type(lit: &crate::token::Literal) -> CheckedType {
    use crate::token::{Literal, NumericSuffix};
    match lit {
        Literal::Int { suffix, .. } => CheckedType::Primitive(match suffix {
            Some(NumericSuffix::I8) => Primitive::I8,
            Some(NumericSuffix::I16) => Primitive::I16,
            Some(NumericSuffix::I64) => Primitive::I64,
            Some(NumericSuffix::Isize) => Primitive::Isize,
            Some(NumericSuffix::U8) => Primitive::U8,
            Some(NumericSuffix::U16) => Primitive::U16,
            Some(NumericSuffix::U32) => Primitive::U32,
            Some(NumericSuffix::U64) => Primitive::U64,
            Some(NumericSuffix::Usize) => Primitive::Usize,
            // A float suffix can't land on an integer literal; the parser
            // rejects that combination before this point.
            Some(NumericSuffix::F32) | Some(NumericSuffix::F64) | Some(NumericSuffix::I32) | None => Primitive::I32,
        }),
        Literal::Float { suffix, .. } => {
            CheckedType::Primitive(if *suffix == Some(NumericSuffix::F32) { Primitive::F32 } else { Primitive::F64 })
        }
        Literal::Char(_) => CheckedType::Primitive(Primitive::Char),
        Literal::Byte(_) => CheckedType::Primitive(Primitive::Byte),
        Literal::Str(_) => CheckedType::Primitive(Primitive::Str),
        Literal::Bytes(_) => CheckedType::Primitive(Primitive::Bytes),
        Literal::CStr(_) => CheckedType::Primitive(Primitive::CStr),
    }
}
