use crate::operand::Access;
use deobf_bitvec::Operator;

/// The expected tag of one operand slot in an [`InstructionDescriptor`] —
/// just the `Immediate`/`Register` discriminant, not a full
/// [`crate::Operand`], since the concrete register/immediate is only known
/// once an actual instruction is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Immediate,
    Register,
    /// Either an immediate or a register is acceptable in this slot (a
    /// generic arithmetic source operand, say). Destination operands are
    /// never `Any`: only a register can be written to.
    Any,
}

impl OperandKind {
    pub fn accepts(self, is_register: bool) -> bool {
        match self {
            OperandKind::Immediate => !is_register,
            OperandKind::Register => is_register,
            OperandKind::Any => true,
        }
    }
}

/// Static, per-mnemonic metadata shared by every instance of one instruction
/// (§3). `deobf-ir`'s own [`crate::catalogue`] hands out `&'static` instances
/// of this that a lifter references by pointer; two instructions share a
/// descriptor iff they share a mnemonic, so descriptor identity
/// (`std::ptr::eq`) is a cheap mnemonic-equality check.
#[derive(Debug, Clone, Copy)]
pub struct InstructionDescriptor {
    pub name: &'static str,
    pub operand_kinds: &'static [OperandKind],
    /// Index into `operand_kinds` of the `(base register, immediate offset)`
    /// pair that addresses memory, if this instruction touches memory.
    pub memory_operand_index: Option<usize>,
    pub memory_access: Option<Access>,
    /// The expression-DAG operator this instruction's effect lowers to, for
    /// `SymbolicRewrite` (§4.7). `None` for instructions with no
    /// expressible symbolic effect (`nop`, `ret`, unconditional `jmp`).
    pub symbolic_operator: Option<Operator>,
    /// Operand index holding a branch target resolved against the lifted
    /// program's real address space.
    pub real_branch_operand: Option<usize>,
    /// Operand index holding a branch target resolved against the routine's
    /// own VIP space (an IR-internal jump, e.g. a thunk).
    pub virtual_branch_operand: Option<usize>,
    /// Side effects beyond reading/writing its declared operands (e.g.
    /// `syscall`); such instructions are never eligible for
    /// `DeadCodeElimination`.
    pub volatile: bool,
    /// Index into `operand_kinds` whose operand size determines this
    /// instruction's access size, when it isn't simply the widest operand.
    pub access_size_index: Option<usize>,
}

impl InstructionDescriptor {
    pub fn operand_count(&self) -> usize {
        self.operand_kinds.len()
    }

    pub fn has_memory_operand(&self) -> bool {
        self.memory_operand_index.is_some()
    }

    pub fn is_branch(&self) -> bool {
        self.real_branch_operand.is_some() || self.virtual_branch_operand.is_some()
    }
}

impl PartialEq for InstructionDescriptor {
    /// Descriptor identity, not field-by-field comparison: two distinct
    /// `static` tables with identical fields are still different mnemonics
    /// as far as anything holding a `&'static InstructionDescriptor` cares.
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

impl Eq for InstructionDescriptor {}

impl core::fmt::Display for InstructionDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.name)
    }
}
