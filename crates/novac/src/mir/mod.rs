//! MIR (§3 "MIR", §4.5 "MIR builder"): the CFG-of-basic-blocks mid-level IR
//! lowered from a checked package. Owned by the package once built; every
//! downstream back end (native codegen, bytecode interpreter) reads it by
//! reference only — none of that lives in this crate (§1 "out of scope").
//!
//! Mirrors the teacher's bytecode module in spirit (one builder owns a
//! `current` cursor over the unit being emitted, names are assigned by a
//! monotonic counter validated against a hash set) but the unit here is a
//! basic block, not a flat instruction stream, since MIR is block-structured
//! rather than stack-machine bytecode.

pub mod builder;

use crate::{analyze::types::CheckedType, intern::StringId, scope::ScopeId};

/// One compiled unit: every fun/struct/const/prototype lowered from a
/// package, plus the debug-info table every instruction's index points into.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub items: Vec<Item>,
    pub debug_info: DebugTable,
}

#[derive(Debug, Clone)]
pub enum Item {
    Fun(Fun),
    Struct(StructItem),
    Const(ConstItem),
    Prototype(Prototype),
}

/// One MIR function: a name, its typed parameter/return shape, and an
/// ordered list of basic blocks — the first is always the entry block.
#[derive(Debug, Clone)]
pub struct Fun {
    pub name: StringId,
    pub params: Vec<(StringId, CheckedType)>,
    pub return_ty: CheckedType,
    pub blocks: Vec<Block>,
}

/// One MIR struct, lowered from a record/class declaration. Referred to by
/// name rather than by direct reference, so cyclic field types (a record
/// mentioning its own enclosing record) never need a back-pointer (§9).
#[derive(Debug, Clone)]
pub struct StructItem {
    pub name: StringId,
    pub fields: Vec<(StringId, CheckedType)>,
}

#[derive(Debug, Clone)]
pub struct ConstItem {
    pub name: StringId,
    pub ty: CheckedType,
    pub value: Value,
}

/// A declared-but-not-defined fun (an `extern`/ABI boundary, or a trait
/// method with no default body) — enough shape for a caller to emit a
/// `call`, nothing a back end can lower a body for.
#[derive(Debug, Clone)]
pub struct Prototype {
    pub name: StringId,
    pub params: Vec<CheckedType>,
    pub return_ty: CheckedType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegId(pub StringId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub StringId);

/// One basic block: an id, a human-readable name, an optional lexical
/// *limit* (§4.5 "Block limits" — the outer block that terminates this
/// block's lexical region, letting the builder insert cleanup before a jump
/// leaves it), and its straight-line instruction list.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub name: StringId,
    pub limit: Option<BlockId>,
    pub instructions: Vec<Instruction>,
}

impl Block {
    /// Invariant (§3, §8 property 6): every block ends with exactly one
    /// terminator. Checked with `debug_assert!` rather than a `Diagnostic`
    /// since MIR lowering is internal-invariant territory, never user-facing
    /// (§7 "MIR lowering: should never error").
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self.instructions.last().map(|i| &i.kind), Some(k) if k.is_terminator())
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub ty: CheckedType,
    pub debug_info: DebugInfoId,
}

#[derive(Debug, Clone)]
pub enum InstructionKind {
    Alloca { var: VarId },
    Load { result: RegId, ptr: Value },
    Store { ptr: Value, value: Value },
    GetField { result: RegId, base: Value, field: StringId },
    GetElement { result: RegId, base: Value, index: Value },
    BinOp { result: RegId, op: StringId, lhs: Value, rhs: Value },
    UnOp { result: RegId, op: StringId, operand: Value },
    Cast { result: RegId, value: Value, to: CheckedType },
    Call { result: Option<RegId>, callee: Value, args: Vec<Value> },
    Trunc { result: RegId, value: Value },
    SExt { result: RegId, value: Value },
    ZExt { result: RegId, value: Value },
    FpExt { result: RegId, value: Value },
    PtrToInt { result: RegId, value: Value },
    IntToPtr { result: RegId, value: Value },

    Jmp { target: BlockId },
    JmpCond { cond: Value, then_block: BlockId, else_block: BlockId },
    Switch { scrutinee: Value, arms: Vec<(StringId, BlockId)>, default: BlockId },
    Try { value: Value, ok_block: BlockId, err_block: BlockId },
    Ret { value: Option<Value> },
}

impl InstructionKind {
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(self, Self::Jmp { .. } | Self::JmpCond { .. } | Self::Switch { .. } | Self::Try { .. } | Self::Ret { .. })
    }
}

/// A usable operand: a compile-time constant, a named SSA temporary, a
/// pointer to a mutable alloca, a function argument, a pointer to a block
/// (used by `switch`/`jmp` operands that need to name a target as a value,
/// e.g. a jump table entry), or an aggregate built from other values.
#[derive(Debug, Clone)]
pub enum Value {
    ConstInt(i128),
    ConstFloat(f64),
    ConstBool(bool),
    ConstStr(StringId),
    ConstUnit,
    Reg(RegId),
    Var(VarId),
    Arg(u32),
    /// A reference to a package-level fun/const by its global (mangled)
    /// name, used as a `call`'s callee operand.
    Global(StringId),
    BlockPtr(BlockId),
    Aggregate { ty: CheckedType, fields: Vec<Value> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DebugInfoId(u32);

/// `(file, scope, line, column)`, per §4.5 "Debug info".
#[derive(Debug, Clone, Copy)]
pub struct DebugInfoRecord {
    pub file: StringId,
    pub scope: ScopeId,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DebugTable {
    records: Vec<DebugInfoRecord>,
}

impl DebugTable {
    pub fn insert(&mut self, record: DebugInfoRecord) -> DebugInfoId {
        let id = DebugInfoId(u32::try_from(self.records.len()).unwrap_or(u32::MAX));
        self.records.push(record);
        id
    }

    #[must_use]
    pub fn get(&self, id: DebugInfoId) -> &DebugInfoRecord {
        &self.records[id.0 as usize]
    }
}
