use crate::instruction::Instruction;
use crate::vip::Vip;

/// A key into [`crate::Routine`]'s block arena.
///
/// Predecessor/successor lists store `BlockId`s rather than `Vip`s: the
/// owning-map-plus-non-owning-reference pattern `deobf-entity` is built for
/// (see its crate doc) — edges are cheap `Copy` keys into the routine's
/// `PrimaryMap`, not a second VIP lookup on every CFG walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

deobf_entity::entity_impl!(BlockId, "block");

/// An ordered run of instructions with no internal control-flow join or
/// branch (§3).
#[derive(Debug, Clone)]
pub struct BasicBlock {
    vip: Vip,
    instructions: Vec<Instruction>,
    predecessors: Vec<BlockId>,
    successors: Vec<BlockId>,
}

impl BasicBlock {
    pub(crate) fn new(vip: Vip) -> Self {
        BasicBlock {
            vip,
            instructions: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn vip(&self) -> Vip {
        self.vip
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }

    pub(crate) fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    pub(crate) fn add_successor_id(&mut self, id: BlockId) {
        if !self.successors.contains(&id) {
            self.successors.push(id);
        }
    }

    pub(crate) fn add_predecessor_id(&mut self, id: BlockId) {
        if !self.predecessors.contains(&id) {
            self.predecessors.push(id);
        }
    }

    pub(crate) fn remove_successor_id(&mut self, id: BlockId) {
        self.successors.retain(|s| *s != id);
    }

    pub(crate) fn remove_predecessor_id(&mut self, id: BlockId) {
        self.predecessors.retain(|p| *p != id);
    }
}
