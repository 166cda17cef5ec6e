use deobf_expr::UniqueId;
use deobf_ir::{RegisterDescriptor, RegisterKind};

fn kind_tag(kind: RegisterKind) -> u64 {
    match kind {
        RegisterKind::GeneralPurpose => 0,
        RegisterKind::StackPointer => 1,
        RegisterKind::InstructionPointer => 2,
        RegisterKind::Flags => 3,
        RegisterKind::Segment => 4,
        RegisterKind::Control => 5,
        RegisterKind::Debug => 6,
        RegisterKind::Test => 7,
        RegisterKind::Fp => 8,
        RegisterKind::Mmx => 9,
        RegisterKind::Xmm => 10,
        RegisterKind::Ymm => 11,
        RegisterKind::Zmm => 12,
        RegisterKind::Internal => 13,
        RegisterKind::Stack => 14,
    }
}

/// A stable bijection from a register to the `UniqueId` the symbolic layer
/// names it by. `SymbolicRewrite` builds expressions out of register
/// operands; two descriptors that compare equal must map to the same uid,
/// and descriptors of different kinds sharing a raw `id` must not collide,
/// so the kind tag is folded into the high bits.
pub fn register_uid(reg: RegisterDescriptor) -> UniqueId {
    UniqueId::numbered((kind_tag(reg.kind) << 32) | reg.id as u64)
}
