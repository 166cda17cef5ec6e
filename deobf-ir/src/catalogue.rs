//! A small built-in instruction set used by tests and by routines that have
//! no real lifter behind them (`ArchitectureIdentifier::Virtual`).
//!
//! Every entry is a `static InstructionDescriptor`: consumers hold a
//! `&'static` reference to one of these rather than an owned copy, so two
//! instructions with the same mnemonic always compare equal by descriptor
//! identity (`InstructionDescriptor::eq`).
//!
//! `mov` has no `symbolic_operator`: plain assignment isn't one of the
//! algebra's operators, so `SymbolicRewrite` recognizes it by descriptor
//! identity instead of through the generic operator-driven lowering path.

use crate::descriptor::{InstructionDescriptor, OperandKind};
use crate::operand::Access;
use deobf_bitvec::Operator;

pub static NOP: InstructionDescriptor = InstructionDescriptor {
    name: "nop",
    operand_kinds: &[],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: None,
    real_branch_operand: None,
    virtual_branch_operand: None,
    volatile: false,
    access_size_index: None,
};

pub static MOV_REG_REG: InstructionDescriptor = InstructionDescriptor {
    name: "mov",
    operand_kinds: &[OperandKind::Register, OperandKind::Register],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: None,
    real_branch_operand: None,
    virtual_branch_operand: None,
    volatile: false,
    access_size_index: None,
};

pub static MOV_REG_IMM: InstructionDescriptor = InstructionDescriptor {
    name: "mov",
    operand_kinds: &[OperandKind::Register, OperandKind::Immediate],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: None,
    real_branch_operand: None,
    virtual_branch_operand: None,
    volatile: false,
    access_size_index: None,
};

macro_rules! binary_arith {
    ($static_name:ident, $mnemonic:expr, $op:expr) => {
        pub static $static_name: InstructionDescriptor = InstructionDescriptor {
            name: $mnemonic,
            operand_kinds: &[OperandKind::Register, OperandKind::Any, OperandKind::Any],
            memory_operand_index: None,
            memory_access: None,
            symbolic_operator: Some($op),
            real_branch_operand: None,
            virtual_branch_operand: None,
            volatile: false,
            access_size_index: None,
        };
    };
}

macro_rules! unary_arith {
    ($static_name:ident, $mnemonic:expr, $op:expr) => {
        pub static $static_name: InstructionDescriptor = InstructionDescriptor {
            name: $mnemonic,
            operand_kinds: &[OperandKind::Register, OperandKind::Any],
            memory_operand_index: None,
            memory_access: None,
            symbolic_operator: Some($op),
            real_branch_operand: None,
            virtual_branch_operand: None,
            volatile: false,
            access_size_index: None,
        };
    };
}

binary_arith!(ADD, "add", Operator::Add);
binary_arith!(SUB, "sub", Operator::Sub);
binary_arith!(AND, "and", Operator::And);
binary_arith!(OR, "or", Operator::Or);
binary_arith!(XOR, "xor", Operator::Xor);
unary_arith!(NOT, "not", Operator::Not);
unary_arith!(NEG, "neg", Operator::Neg);

pub static PUSH: InstructionDescriptor = InstructionDescriptor {
    name: "push",
    operand_kinds: &[OperandKind::Any],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: Some(Operator::Push),
    real_branch_operand: None,
    virtual_branch_operand: None,
    volatile: false,
    access_size_index: None,
};

pub static POP: InstructionDescriptor = InstructionDescriptor {
    name: "pop",
    operand_kinds: &[OperandKind::Register],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: Some(Operator::Pop),
    real_branch_operand: None,
    virtual_branch_operand: None,
    volatile: false,
    access_size_index: None,
};

/// Unconditional jump to an IR-internal VIP (e.g. a thunk block).
pub static JMP: InstructionDescriptor = InstructionDescriptor {
    name: "jmp",
    operand_kinds: &[OperandKind::Immediate],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: Some(Operator::Jump),
    real_branch_operand: None,
    virtual_branch_operand: Some(0),
    volatile: false,
    access_size_index: None,
};

/// Conditional jump: `(condition, target)`, target resolved in VIP space.
pub static JCC: InstructionDescriptor = InstructionDescriptor {
    name: "jcc",
    operand_kinds: &[OperandKind::Any, OperandKind::Immediate],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: Some(Operator::Jump),
    real_branch_operand: None,
    virtual_branch_operand: Some(1),
    volatile: false,
    access_size_index: None,
};

pub static CALL: InstructionDescriptor = InstructionDescriptor {
    name: "call",
    operand_kinds: &[OperandKind::Immediate],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: Some(Operator::Call),
    real_branch_operand: Some(0),
    virtual_branch_operand: None,
    volatile: true,
    access_size_index: None,
};

pub static RET: InstructionDescriptor = InstructionDescriptor {
    name: "ret",
    operand_kinds: &[],
    memory_operand_index: None,
    memory_access: None,
    symbolic_operator: Some(Operator::Return),
    real_branch_operand: None,
    virtual_branch_operand: None,
    volatile: true,
    access_size_index: None,
};

/// `dst <- [base + offset]`.
pub static LOAD: InstructionDescriptor = InstructionDescriptor {
    name: "load",
    operand_kinds: &[OperandKind::Register, OperandKind::Register, OperandKind::Immediate],
    memory_operand_index: Some(1),
    memory_access: Some(Access::Read),
    symbolic_operator: Some(Operator::Read),
    real_branch_operand: None,
    virtual_branch_operand: None,
    volatile: false,
    access_size_index: None,
};

/// `[base + offset] <- src`.
pub static STORE: InstructionDescriptor = InstructionDescriptor {
    name: "store",
    operand_kinds: &[OperandKind::Register, OperandKind::Immediate, OperandKind::Any],
    memory_operand_index: Some(0),
    memory_access: Some(Access::Write),
    symbolic_operator: Some(Operator::Write),
    real_branch_operand: None,
    virtual_branch_operand: None,
    volatile: false,
    access_size_index: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_identity_distinguishes_overloads() {
        assert_ne!(&MOV_REG_REG as *const _, &MOV_REG_IMM as *const _);
        assert_eq!(MOV_REG_REG.name, MOV_REG_IMM.name);
    }

    #[test]
    fn jmp_targets_are_virtual_not_real() {
        assert_eq!(JMP.virtual_branch_operand, Some(0));
        assert_eq!(JMP.real_branch_operand, None);
        assert_eq!(CALL.real_branch_operand, Some(0));
    }

    #[test]
    fn ret_is_volatile_so_dce_never_removes_it() {
        assert!(RET.volatile);
    }
}
