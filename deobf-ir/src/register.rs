use deobf_bitvec::BitCount;

/// A key into [`crate::Routine`]'s internal-register arena. Only
/// `RegisterKind::Internal` registers are backed by one of these; registers
/// lifted from a real architecture carry a raw, lifter-assigned `id`
/// instead, since the routine doesn't own their numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegId(u32);

deobf_entity::entity_impl!(RegId, "vreg");

/// What a register physically is, independent of which architecture it
/// comes from (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    GeneralPurpose,
    StackPointer,
    InstructionPointer,
    Flags,
    Segment,
    Control,
    Debug,
    Test,
    Fp,
    Mmx,
    Xmm,
    Ymm,
    Zmm,
    /// A virtual register minted by [`crate::Routine::alloc_register`]; has
    /// no physical counterpart.
    Internal,
    Stack,
}

/// `(kind, id, bitcount)` — identifies one register, independent of any
/// particular access to it. Two descriptors with equal fields name the same
/// register (§3): this is a plain value type, not an entity reference, so
/// lifted architectural registers and internal ones share one representation
/// without the routine having to own every possible physical register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterDescriptor {
    pub kind: RegisterKind,
    pub id: u32,
    pub bitcount: BitCount,
}

impl RegisterDescriptor {
    pub fn new(kind: RegisterKind, id: u32, bitcount: BitCount) -> Self {
        RegisterDescriptor { kind, id, bitcount }
    }

    pub fn internal(reg_id: RegId, bitcount: BitCount) -> Self {
        RegisterDescriptor {
            kind: RegisterKind::Internal,
            id: reg_id.0,
            bitcount,
        }
    }

    pub fn is_internal(self) -> bool {
        matches!(self.kind, RegisterKind::Internal)
    }
}

impl core::fmt::Display for RegisterDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self.kind {
            RegisterKind::Internal => write!(f, "vreg{}:i{}", self.id, self.bitcount),
            kind => write!(f, "{kind:?}{}:i{}", self.id, self.bitcount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_descriptor_round_trips_its_id() {
        let id = RegId::new(7);
        let desc = RegisterDescriptor::internal(id, 64);
        assert!(desc.is_internal());
        assert_eq!(desc.id, 7);
    }

    #[test]
    fn equal_fields_mean_equal_register() {
        let a = RegisterDescriptor::new(RegisterKind::GeneralPurpose, 0, 64);
        let b = RegisterDescriptor::new(RegisterKind::GeneralPurpose, 0, 64);
        assert_eq!(a, b);
    }
}
