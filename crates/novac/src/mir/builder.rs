//! Lowers a checked package into MIR (§4.5 "MIR builder").
//!
//! Grounded on the teacher's `CodeBuilder`: a cursor over the unit currently
//! being emitted, names minted by a monotonic counter and checked against a
//! hash set for uniqueness, one method per instruction shape. The unit here
//! is a basic block rather than a flat bytecode stream, so the cursor
//! additionally tracks the current block and a binding environment mirroring
//! the checked scope chain, in place of the teacher's flat local-slot table.

use ahash::{AHashMap, AHashSet};
use num_traits::ToPrimitive;

use crate::{
    analyze::{
        CheckedExpr, CheckedExprKind, CheckedFun, CheckedFunBody, CheckedMatchArm, CheckedPackage, CheckedStmt,
        types::CheckedType,
    },
    ast::{
        Spanned,
        expr::{BinOp, CmpOp, UnaryOp},
        pattern::Pattern,
    },
    intern::{InternerBuilder, StringId},
    location::Location,
    scope::{Response, ScopeId, ScopeTree, SymbolId, SymbolKind},
    signature::SignatureTable,
    token::Literal,
};

use super::{
    Block, BlockId, ConstItem, DebugInfoId, DebugInfoRecord, DebugTable, Fun, Instruction, InstructionKind, Item, Module,
    RegId, StructItem, Value, VarId,
};

/// Mints unique register/variable/block names, per §4.5 "Name management":
/// "registers and variables are numbered per function with a shared
/// monotonic counter that also validates uniqueness against a hash set."
#[derive(Default)]
struct NameManager {
    seen: AHashSet<StringId>,
    counter: u32,
}

impl NameManager {
    fn fresh(&mut self, interner: &mut InternerBuilder, base: &str) -> StringId {
        loop {
            let candidate = format!("{base}.{}", self.counter);
            self.counter += 1;
            let id = interner.intern(&candidate);
            if self.seen.insert(id) {
                return id;
            }
        }
    }

    /// Variable names preserve the source identifier when it hasn't been
    /// used yet in this function; a collision (shadowing, or two same-named
    /// bindings in sibling blocks) falls back to the counter-suffixed form
    /// like any other fresh name.
    fn fresh_var(&mut self, interner: &mut InternerBuilder, source_name: StringId) -> StringId {
        if self.seen.insert(source_name) {
            return source_name;
        }
        let base = interner.resolve(source_name).to_owned();
        self.fresh(interner, &base)
    }
}

/// What a checked `SymbolId` is bound to while lowering the function that
/// declares it: either a ready SSA value (a param, or a pattern-destructured
/// piece of a scrutinee) or the address of a mutable alloca that must be
/// loaded to read.
#[derive(Debug, Clone)]
enum Binding {
    Value(Value),
    Var(VarId),
}

/// Per-function lowering state: the block list built so far, the index of
/// the block currently being appended to, the lexical `limit` stack (§4.5
/// "Block limits"), the binding environment, and the name manager.
struct FunctionCursor {
    blocks: Vec<Block>,
    current: usize,
    env: AHashMap<SymbolId, Binding>,
    names: NameManager,
    limit_stack: Vec<BlockId>,
}

impl FunctionCursor {
    fn new() -> Self {
        Self { blocks: Vec::new(), current: 0, env: AHashMap::new(), names: NameManager::default(), limit_stack: Vec::new() }
    }

    fn push_block(&mut self, name: StringId) -> BlockId {
        let id = BlockId(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        let limit = self.limit_stack.last().copied();
        self.blocks.push(Block { id, name, limit, instructions: Vec::new() });
        id
    }

    fn switch_to(&mut self, block: BlockId) {
        self.current = block.0 as usize;
    }

    fn is_current_terminated(&self) -> bool {
        self.blocks[self.current].is_terminated()
    }

    fn push(&mut self, kind: InstructionKind, ty: CheckedType, debug_info: DebugInfoId) {
        debug_assert!(!self.is_current_terminated(), "instruction emitted after block's terminator");
        self.blocks[self.current].instructions.push(Instruction { kind, ty, debug_info });
    }

    fn terminate(&mut self, kind: InstructionKind, debug_info: DebugInfoId) {
        debug_assert!(kind.is_terminator(), "terminate() called with a non-terminator instruction");
        self.push(kind, CheckedType::unit(), debug_info);
    }
}

pub struct MirBuilder<'d> {
    interner: &'d mut InternerBuilder,
    debug_info: DebugTable,
}

impl<'d> MirBuilder<'d> {
    #[must_use]
    pub fn new(interner: &'d mut InternerBuilder) -> Self {
        Self { interner, debug_info: DebugTable::default() }
    }

    /// Lowers every checked struct/const/fun in `package` into one MIR
    /// [`Module`] — one [`Item::Struct`] per record/record-object/class, one
    /// [`Item::Const`] per package-level constant, one [`Item::Fun`] per fun
    /// (§4.5 "one MIR struct per record", "one MIR const per constant").
    /// Only meaningful once the package's error count is zero (§4.4 "Failure
    /// semantics": "MIR lowering is only attempted if the package's error
    /// count is zero").
    pub fn lower_package(mut self, package: &CheckedPackage) -> Module {
        let mut items = Vec::with_capacity(package.structs.len() + package.consts.len() + package.funs.len());
        for checked_struct in &package.structs {
            items.push(Item::Struct(StructItem { name: checked_struct.global_name, fields: checked_struct.fields.clone() }));
        }
        for checked_const in &package.consts {
            let value = self.lower_const_expr(&checked_const.value);
            items.push(Item::Const(ConstItem { name: checked_const.global_name, ty: checked_const.ty.clone(), value }));
        }
        for fun in &package.funs {
            items.push(Item::Fun(self.lower_fun(fun, &package.scopes, &package.signatures)));
        }
        Module { items, debug_info: self.debug_info }
    }

    /// Folds a constant's checked value into a MIR [`Value`] without a
    /// function cursor — constants have no basic blocks to emit instructions
    /// into, so only the constant-expression shapes (literals, and
    /// aggregates of them) are meaningful here; anything else falls back to
    /// [`Self::zero_value`] the same way a fun body would for an
    /// [`CheckedExprKind::Opaque`] node.
    fn lower_const_expr(&mut self, expr: &CheckedExpr) -> Value {
        match &expr.kind {
            CheckedExprKind::Literal(lit) => self.literal_value(lit),
            CheckedExprKind::Tuple(elems) | CheckedExprKind::Array(elems) | CheckedExprKind::List(elems) => {
                let fields = elems.iter().map(|e| self.lower_const_expr(e)).collect();
                Value::Aggregate { ty: expr.ty.clone(), fields }
            }
            CheckedExprKind::Unary { op: UnaryOp::Neg, operand } => match self.lower_const_expr(operand) {
                Value::ConstInt(i) => Value::ConstInt(-i),
                Value::ConstFloat(f) => Value::ConstFloat(-f),
                other => other,
            },
            _ => self.zero_value(&expr.ty),
        }
    }

    fn debug_record(&mut self, location: Location, scope: ScopeId) -> DebugInfoId {
        self.debug_info.insert(DebugInfoRecord {
            file: location.file,
            scope,
            line: location.start().line,
            column: location.start().col,
        })
    }

    fn lower_fun(&mut self, fun: &CheckedFun, scopes: &ScopeTree, signatures: &SignatureTable) -> Fun {
        let mut cursor = FunctionCursor::new();
        let entry_name = cursor.names.fresh(self.interner, "entry");
        let entry = cursor.push_block(entry_name);
        cursor.switch_to(entry);

        for (i, (name, _ty)) in fun.params.iter().enumerate() {
            if let Response::Found { symbol, .. } = scopes.lookup(fun.scope, SymbolKind::Variable, *name) {
                cursor.env.insert(symbol.id, Binding::Value(Value::Arg(u32::try_from(i).unwrap_or(u32::MAX))));
            }
        }

        match &fun.body {
            CheckedFunBody::Expr(expr) => {
                let value = self.lower_expr(expr, &mut cursor, fun.scope, scopes, signatures);
                if !cursor.is_current_terminated() {
                    let debug = self.debug_record(expr.location, fun.scope);
                    cursor.terminate(InstructionKind::Ret { value: Some(value) }, debug);
                }
            }
            CheckedFunBody::Block(stmts) => {
                self.lower_stmts(stmts, &mut cursor, fun.scope, scopes, signatures);
                if !cursor.is_current_terminated() {
                    let debug = self.debug_record(Location::default(), fun.scope);
                    cursor.terminate(InstructionKind::Ret { value: None }, debug);
                }
            }
            CheckedFunBody::None => {
                let debug = self.debug_record(Location::default(), fun.scope);
                cursor.terminate(InstructionKind::Ret { value: None }, debug);
            }
        }

        Fun { name: fun.global_name, params: fun.params.clone(), return_ty: fun.return_ty.clone(), blocks: cursor.blocks }
    }

    fn lower_stmts(
        &mut self,
        stmts: &[CheckedStmt],
        cursor: &mut FunctionCursor,
        scope: ScopeId,
        scopes: &ScopeTree,
        signatures: &SignatureTable,
    ) {
        for stmt in stmts {
            self.lower_stmt(stmt, cursor, scope, scopes, signatures);
        }
    }

    fn lower_stmt(
        &mut self,
        stmt: &CheckedStmt,
        cursor: &mut FunctionCursor,
        scope: ScopeId,
        scopes: &ScopeTree,
        signatures: &SignatureTable,
    ) {
        match stmt {
            CheckedStmt::Expr(expr) => {
                self.lower_expr(expr, cursor, scope, scopes, signatures);
            }
            CheckedStmt::Variable { symbol, name, ty, init, .. } => {
                let debug = self.debug_record(init.as_ref().map_or(Location::default(), |e| e.location), scope);
                let var_name = cursor.names.fresh_var(self.interner, *name);
                let var = VarId(var_name);
                cursor.push(InstructionKind::Alloca { var }, ty.clone(), debug);
                if let Some(init_expr) = init {
                    let value = self.lower_expr(init_expr, cursor, scope, scopes, signatures);
                    cursor.push(InstructionKind::Store { ptr: Value::Var(var), value }, ty.clone(), debug);
                }
                if let Some(symbol) = symbol {
                    cursor.env.insert(*symbol, Binding::Var(var));
                }
            }
            CheckedStmt::Assign { target, value } => {
                let debug = self.debug_record(target.location, scope);
                let rhs = self.lower_expr(value, cursor, scope, scopes, signatures);
                let ptr = match &target.kind {
                    CheckedExprKind::Name(Some(symbol)) => match cursor.env.get(symbol) {
                        Some(Binding::Var(var)) => Value::Var(*var),
                        Some(Binding::Value(v)) => v.clone(),
                        None => Value::ConstUnit,
                    },
                    _ => self.lower_expr(target, cursor, scope, scopes, signatures),
                };
                cursor.push(InstructionKind::Store { ptr, value: rhs }, target.ty.clone(), debug);
            }
            CheckedStmt::If { cond, then_block, elifs, else_block } => {
                self.lower_if_stmt(cond, then_block, elifs, else_block.as_deref(), cursor, scope, scopes, signatures);
            }
            CheckedStmt::Match { scrutinee, arms } => {
                let debug = self.debug_record(scrutinee.location, scope);
                let scrutinee_value = self.lower_expr(scrutinee, cursor, scope, scopes, signatures);
                let merge_name = cursor.names.fresh(self.interner, "match.merge");
                let merge = cursor.push_block(merge_name);
                self.lower_match(arms, &scrutinee_value, None, merge, cursor, scopes, signatures, debug);
                cursor.switch_to(merge);
            }
            CheckedStmt::Loop { body } => {
                let header_name = cursor.names.fresh(self.interner, "loop.header");
                let header = cursor.push_block(header_name);
                let debug = self.debug_record(Location::default(), scope);
                cursor.terminate(InstructionKind::Jmp { target: header }, debug);
                cursor.switch_to(header);
                cursor.limit_stack.push(header);
                self.lower_stmts(body, cursor, scope, scopes, signatures);
                cursor.limit_stack.pop();
                if !cursor.is_current_terminated() {
                    cursor.terminate(InstructionKind::Jmp { target: header }, debug);
                }
                let after_name = cursor.names.fresh(self.interner, "loop.after");
                let after = cursor.push_block(after_name);
                cursor.switch_to(after);
            }
            CheckedStmt::Return(expr) => {
                let debug = self.debug_record(expr.as_ref().map_or(Location::default(), |e| e.location), scope);
                let value = expr.as_ref().map(|e| self.lower_expr(e, cursor, scope, scopes, signatures));
                cursor.terminate(InstructionKind::Ret { value }, debug);
            }
            CheckedStmt::Raise(expr) => {
                let debug = self.debug_record(expr.location, scope);
                let value = self.lower_expr(expr, cursor, scope, scopes, signatures);
                cursor.terminate(InstructionKind::Ret { value: Some(value) }, debug);
            }
            CheckedStmt::Other => {}
        }
    }

    /// Lowers an `if`/`elif*`/`else` chain used as a statement. Each `elif`
    /// is handled by recursing with the remaining `elifs` slice, mirroring
    /// how the checker itself flattens them onto one `CheckedStmt::If`.
    #[allow(clippy::too_many_arguments)]
    fn lower_if_stmt(
        &mut self,
        cond: &CheckedExpr,
        then_block: &[CheckedStmt],
        elifs: &[(CheckedExpr, Vec<CheckedStmt>)],
        else_block: Option<&[CheckedStmt]>,
        cursor: &mut FunctionCursor,
        scope: ScopeId,
        scopes: &ScopeTree,
        signatures: &SignatureTable,
    ) {
        let debug = self.debug_record(cond.location, scope);
        let cond_value = self.lower_expr(cond, cursor, scope, scopes, signatures);

        let then_name = cursor.names.fresh(self.interner, "if.then");
        let then_id = cursor.push_block(then_name);
        let else_name = cursor.names.fresh(self.interner, "if.else");
        let else_id = cursor.push_block(else_name);
        let merge_name = cursor.names.fresh(self.interner, "if.merge");
        let merge_id = cursor.push_block(merge_name);

        cursor.terminate(InstructionKind::JmpCond { cond: cond_value, then_block: then_id, else_block: else_id }, debug);

        cursor.switch_to(then_id);
        self.lower_stmts(then_block, cursor, scope, scopes, signatures);
        if !cursor.is_current_terminated() {
            cursor.terminate(InstructionKind::Jmp { target: merge_id }, debug);
        }

        cursor.switch_to(else_id);
        if let Some((elif_cond, elif_body)) = elifs.split_first() {
            self.lower_if_stmt(elif_cond, elif_body, &elifs[1..], else_block, cursor, scope, scopes, signatures);
        } else if let Some(body) = else_block {
            self.lower_stmts(body, cursor, scope, scopes, signatures);
        }
        if !cursor.is_current_terminated() {
            cursor.terminate(InstructionKind::Jmp { target: merge_id }, debug);
        }

        cursor.switch_to(merge_id);
    }

    /// Lowers a match's arms into one block per arm plus a `switch`
    /// terminator in the block active on entry, sharing the logic for both
    /// statement-position matches (`result_var` is `None`) and
    /// expression-position matches (`result_var` holds each arm's value).
    #[allow(clippy::too_many_arguments)]
    fn lower_match(
        &mut self,
        arms: &[CheckedMatchArm],
        scrutinee: &Value,
        result_var: Option<VarId>,
        merge: BlockId,
        cursor: &mut FunctionCursor,
        scopes: &ScopeTree,
        signatures: &SignatureTable,
        debug: DebugInfoId,
    ) {
        let entry_block = cursor.current;
        let mut switch_arms = Vec::new();
        let mut default_block = None;

        for arm in arms {
            let arm_name = cursor.names.fresh(self.interner, "match.arm");
            let arm_block = cursor.push_block(arm_name);
            cursor.switch_to(arm_block);
            self.bind_pattern(&arm.pattern, scrutinee, cursor, scopes, arm.scope, debug);
            if let Some(guard) = &arm.guard {
                self.lower_expr(guard, cursor, arm.scope, scopes, signatures);
            }
            let value = self.lower_expr(&arm.body, cursor, arm.scope, scopes, signatures);
            if let Some(var) = result_var {
                cursor.push(InstructionKind::Store { ptr: Value::Var(var), value }, CheckedType::unit(), debug);
            }
            if !cursor.is_current_terminated() {
                cursor.terminate(InstructionKind::Jmp { target: merge }, debug);
            }

            match &arm.pattern.node {
                Pattern::Variant { variant, .. } => switch_arms.push((*variant, arm_block)),
                Pattern::Literal(lit) => {
                    let key = self.literal_switch_key(lit);
                    switch_arms.push((key, arm_block));
                }
                _ => {
                    default_block.get_or_insert(arm_block);
                }
            }
        }

        let default = default_block.unwrap_or(merge);
        cursor.blocks[entry_block].instructions.push(Instruction {
            kind: InstructionKind::Switch { scrutinee: scrutinee.clone(), arms: switch_arms, default },
            ty: CheckedType::unit(),
            debug_info: debug,
        });
    }

    fn bind_pattern(
        &mut self,
        pattern: &Spanned<Pattern>,
        value: &Value,
        cursor: &mut FunctionCursor,
        scopes: &ScopeTree,
        case_scope: ScopeId,
        debug: DebugInfoId,
    ) {
        match &pattern.node {
            Pattern::Wildcard | Pattern::Literal(_) | Pattern::Range { .. } | Pattern::AutoComplete | Pattern::Malformed => {}
            Pattern::Binding(ident) => self.bind_name(ident.name, value, cursor, scopes, case_scope),
            Pattern::As { pattern: inner, name } => {
                self.bind_name(name.name, value, cursor, scopes, case_scope);
                self.bind_pattern(inner, value, cursor, scopes, case_scope, debug);
            }
            Pattern::Tuple(elems) | Pattern::Array(elems) | Pattern::List(elems) => {
                for (i, elem) in elems.iter().enumerate() {
                    let reg = RegId(cursor.names.fresh(self.interner, "destructure"));
                    let index = i128::from(u32::try_from(i).unwrap_or(u32::MAX));
                    cursor.push(
                        InstructionKind::GetElement { result: reg, base: value.clone(), index: Value::ConstInt(index) },
                        CheckedType::Unknown,
                        debug,
                    );
                    self.bind_pattern(elem, &Value::Reg(reg), cursor, scopes, case_scope, debug);
                }
            }
            Pattern::Record { fields, .. } => {
                for (field_name, field_pattern) in fields {
                    let reg = RegId(cursor.names.fresh(self.interner, "field"));
                    cursor.push(
                        InstructionKind::GetField { result: reg, base: value.clone(), field: *field_name },
                        CheckedType::Unknown,
                        debug,
                    );
                    self.bind_pattern(field_pattern, &Value::Reg(reg), cursor, scopes, case_scope, debug);
                }
            }
            Pattern::Variant { value: payload, .. } => {
                if let Some(inner) = payload {
                    let payload_field = self.interner.intern("payload");
                    let reg = RegId(cursor.names.fresh(self.interner, "payload"));
                    cursor.push(
                        InstructionKind::GetField { result: reg, base: value.clone(), field: payload_field },
                        CheckedType::Unknown,
                        debug,
                    );
                    self.bind_pattern(inner, &Value::Reg(reg), cursor, scopes, case_scope, debug);
                }
            }
            Pattern::ListHead { head, tail } => {
                let reg = RegId(cursor.names.fresh(self.interner, "head"));
                cursor.push(
                    InstructionKind::GetElement { result: reg, base: value.clone(), index: Value::ConstInt(0) },
                    CheckedType::Unknown,
                    debug,
                );
                self.bind_pattern(head, &Value::Reg(reg), cursor, scopes, case_scope, debug);
                self.bind_pattern(tail, value, cursor, scopes, case_scope, debug);
            }
            Pattern::ListTail { init, last } => {
                self.bind_pattern(init, value, cursor, scopes, case_scope, debug);
                let reg = RegId(cursor.names.fresh(self.interner, "last"));
                cursor.push(
                    InstructionKind::GetElement { result: reg, base: value.clone(), index: Value::ConstInt(-1) },
                    CheckedType::Unknown,
                    debug,
                );
                self.bind_pattern(last, &Value::Reg(reg), cursor, scopes, case_scope, debug);
            }
        }
    }

    fn bind_name(&mut self, name: StringId, value: &Value, cursor: &mut FunctionCursor, scopes: &ScopeTree, case_scope: ScopeId) {
        if let Response::Found { symbol, .. } = scopes.lookup(case_scope, SymbolKind::Variable, name) {
            cursor.env.insert(symbol.id, Binding::Value(value.clone()));
        }
    }

    fn lower_expr(
        &mut self,
        expr: &CheckedExpr,
        cursor: &mut FunctionCursor,
        scope: ScopeId,
        scopes: &ScopeTree,
        signatures: &SignatureTable,
    ) -> Value {
        let debug = self.debug_record(expr.location, scope);
        match &expr.kind {
            CheckedExprKind::Literal(lit) => self.literal_value(lit),
            CheckedExprKind::Name(Some(symbol)) => match cursor.env.get(symbol) {
                Some(Binding::Value(v)) => v.clone(),
                Some(Binding::Var(var)) => {
                    let var = *var;
                    let reg = RegId(cursor.names.fresh(self.interner, "load"));
                    cursor.push(InstructionKind::Load { result: reg, ptr: Value::Var(var) }, expr.ty.clone(), debug);
                    Value::Reg(reg)
                }
                None => match signatures.get(*symbol) {
                    Some(sig) => Value::Global(sig.global_name),
                    None => Value::ConstUnit,
                },
            },
            CheckedExprKind::Name(None) => Value::ConstUnit,
            CheckedExprKind::Binary { lhs, op, rhs } => {
                let lhs_value = self.lower_expr(lhs, cursor, scope, scopes, signatures);
                let rhs_value = self.lower_expr(rhs, cursor, scope, scopes, signatures);
                let op_name = self.interner.intern(bin_op_glyph(*op));
                let reg = RegId(cursor.names.fresh(self.interner, "bin"));
                cursor.push(
                    InstructionKind::BinOp { result: reg, op: op_name, lhs: lhs_value, rhs: rhs_value },
                    expr.ty.clone(),
                    debug,
                );
                Value::Reg(reg)
            }
            CheckedExprKind::Cmp { lhs, op, rhs } => {
                let lhs_value = self.lower_expr(lhs, cursor, scope, scopes, signatures);
                let rhs_value = self.lower_expr(rhs, cursor, scope, scopes, signatures);
                let op_name = self.interner.intern(cmp_op_glyph(*op));
                let reg = RegId(cursor.names.fresh(self.interner, "cmp"));
                cursor.push(
                    InstructionKind::BinOp { result: reg, op: op_name, lhs: lhs_value, rhs: rhs_value },
                    expr.ty.clone(),
                    debug,
                );
                Value::Reg(reg)
            }
            CheckedExprKind::Unary { op, operand } => {
                let operand_value = self.lower_expr(operand, cursor, scope, scopes, signatures);
                let op_name = self.interner.intern(unary_op_glyph(*op));
                let reg = RegId(cursor.names.fresh(self.interner, "un"));
                cursor.push(InstructionKind::UnOp { result: reg, op: op_name, operand: operand_value }, expr.ty.clone(), debug);
                Value::Reg(reg)
            }
            CheckedExprKind::If { cond, then_branch, else_branch } => self.lower_if_expr(
                cond,
                then_branch,
                else_branch.as_deref(),
                &expr.ty,
                cursor,
                scope,
                scopes,
                signatures,
            ),
            CheckedExprKind::Match { scrutinee, arms } => {
                let scrutinee_value = self.lower_expr(scrutinee, cursor, scope, scopes, signatures);
                let result_var = VarId(cursor.names.fresh(self.interner, "match.result"));
                cursor.push(InstructionKind::Alloca { var: result_var }, expr.ty.clone(), debug);
                let merge_name = cursor.names.fresh(self.interner, "match.merge");
                let merge = cursor.push_block(merge_name);
                self.lower_match(arms, &scrutinee_value, Some(result_var), merge, cursor, scopes, signatures, debug);
                cursor.switch_to(merge);
                let reg = RegId(cursor.names.fresh(self.interner, "load"));
                cursor.push(InstructionKind::Load { result: reg, ptr: Value::Var(result_var) }, expr.ty.clone(), debug);
                Value::Reg(reg)
            }
            CheckedExprKind::Call { callee, args } => {
                let callee_value = match (*callee).and_then(|s| signatures.get(s)) {
                    Some(sig) => Value::Global(sig.global_name),
                    None => Value::ConstUnit,
                };
                let arg_values = args.iter().map(|a| self.lower_expr(a, cursor, scope, scopes, signatures)).collect();
                let reg = RegId(cursor.names.fresh(self.interner, "call"));
                cursor.push(
                    InstructionKind::Call { result: Some(reg), callee: callee_value, args: arg_values },
                    expr.ty.clone(),
                    debug,
                );
                Value::Reg(reg)
            }
            CheckedExprKind::Tuple(elems) | CheckedExprKind::Array(elems) | CheckedExprKind::List(elems) => {
                let fields = elems.iter().map(|e| self.lower_expr(e, cursor, scope, scopes, signatures)).collect();
                Value::Aggregate { ty: expr.ty.clone(), fields }
            }
            CheckedExprKind::Block(stmts) => self.lower_expr_block(stmts, cursor, scope, scopes, signatures),
            CheckedExprKind::Opaque => self.zero_value(&expr.ty),
        }
    }

    fn lower_expr_block(
        &mut self,
        stmts: &[CheckedStmt],
        cursor: &mut FunctionCursor,
        scope: ScopeId,
        scopes: &ScopeTree,
        signatures: &SignatureTable,
    ) -> Value {
        let Some((last, init)) = stmts.split_last() else {
            return Value::ConstUnit;
        };
        self.lower_stmts(init, cursor, scope, scopes, signatures);
        match last {
            CheckedStmt::Expr(e) => self.lower_expr(e, cursor, scope, scopes, signatures),
            other => {
                self.lower_stmt(other, cursor, scope, scopes, signatures);
                Value::ConstUnit
            }
        }
    }

    /// Lowers an `if` used as an expression: both branches store into one
    /// result alloca (no phi instructions exist in this IR, per §3) and the
    /// merge block loads it back out.
    #[allow(clippy::too_many_arguments)]
    fn lower_if_expr(
        &mut self,
        cond: &CheckedExpr,
        then_branch: &CheckedExpr,
        else_branch: Option<&CheckedExpr>,
        result_ty: &CheckedType,
        cursor: &mut FunctionCursor,
        scope: ScopeId,
        scopes: &ScopeTree,
        signatures: &SignatureTable,
    ) -> Value {
        let debug = self.debug_record(cond.location, scope);
        let cond_value = self.lower_expr(cond, cursor, scope, scopes, signatures);

        let result_var = VarId(cursor.names.fresh(self.interner, "if.result"));
        cursor.push(InstructionKind::Alloca { var: result_var }, result_ty.clone(), debug);

        let then_name = cursor.names.fresh(self.interner, "if.then");
        let then_id = cursor.push_block(then_name);
        let else_name = cursor.names.fresh(self.interner, "if.else");
        let else_id = cursor.push_block(else_name);
        let merge_name = cursor.names.fresh(self.interner, "if.merge");
        let merge_id = cursor.push_block(merge_name);

        cursor.terminate(InstructionKind::JmpCond { cond: cond_value, then_block: then_id, else_block: else_id }, debug);

        cursor.switch_to(then_id);
        let then_value = self.lower_expr(then_branch, cursor, scope, scopes, signatures);
        cursor.push(InstructionKind::Store { ptr: Value::Var(result_var), value: then_value }, result_ty.clone(), debug);
        if !cursor.is_current_terminated() {
            cursor.terminate(InstructionKind::Jmp { target: merge_id }, debug);
        }

        cursor.switch_to(else_id);
        let else_value = match else_branch {
            Some(e) => self.lower_expr(e, cursor, scope, scopes, signatures),
            None => Value::ConstUnit,
        };
        cursor.push(InstructionKind::Store { ptr: Value::Var(result_var), value: else_value }, result_ty.clone(), debug);
        if !cursor.is_current_terminated() {
            cursor.terminate(InstructionKind::Jmp { target: merge_id }, debug);
        }

        cursor.switch_to(merge_id);
        let reg = RegId(cursor.names.fresh(self.interner, "load"));
        cursor.push(InstructionKind::Load { result: reg, ptr: Value::Var(result_var) }, result_ty.clone(), debug);
        Value::Reg(reg)
    }

    /// Interns a type-tagged text key for a `Pattern::Literal` switch arm, so
    /// `1` and `"1"` (or any two literals of different kinds that stringify
    /// the same) never collide in one switch's `arms` map.
    fn literal_switch_key(&mut self, lit: &Literal) -> StringId {
        let text = match lit {
            Literal::Int { value, .. } => format!("int:{value}"),
            Literal::Float { value, .. } => format!("float:{value}"),
            Literal::Char(c) => format!("char:{c}"),
            Literal::Byte(b) => format!("byte:{b}"),
            Literal::Str(s) => format!("str:{}", self.interner.resolve(*s)),
            Literal::Bytes(bytes) | Literal::CStr(bytes) => format!("bytes:{}", String::from_utf8_lossy(bytes)),
        };
        self.interner.intern(&text)
    }

    fn literal_value(&mut self, lit: &Literal) -> Value {
        match lit {
            Literal::Int { value, .. } => Value::ConstInt(value.to_i128().unwrap_or(0)),
            Literal::Float { value, .. } => Value::ConstFloat(*value),
            Literal::Char(c) => Value::ConstInt(i128::from(u32::from(*c))),
            Literal::Byte(b) => Value::ConstInt(i128::from(*b)),
            Literal::Str(s) => Value::ConstStr(*s),
            Literal::Bytes(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                Value::ConstStr(self.interner.intern(&text))
            }
            Literal::CStr(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                Value::ConstStr(self.interner.intern(&text))
            }
        }
    }

    /// Best-effort placeholder value for a node the analyzer left
    /// [`CheckedExprKind::Opaque`] (record/variant/lambda/sys calls, casts,
    /// object-access chains — shapes the analyzer resolves a type for but
    /// not yet a full checked structure for). Keeps lowering total without
    /// fabricating a specific representation the analyzer never committed to.
    fn zero_value(&self, ty: &CheckedType) -> Value {
        if ty.is_numeric() {
            Value::ConstInt(0)
        } else {
            Value::ConstUnit
        }
    }
}

fn bin_op_glyph(op: BinOp) -> &'static str {
    match op {
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
    }
}

fn cmp_op_glyph(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::Ne => "!=",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
    }
}

fn unary_op_glyph(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "unary-",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::Ref => "&",
        UnaryOp::Deref => "unary*",
        UnaryOp::Trace => "trace",
    }
}
