use crate::arch::{ArchitectureIdentifier, CallConvention};
use crate::block::{BasicBlock, BlockId};
use crate::error::IrError;
use crate::instruction::Instruction;
use crate::register::{RegId, RegisterDescriptor, RegisterKind};
use crate::vip::Vip;
use deobf_bitvec::BitCount;
use deobf_entity::PrimaryMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A lifted routine: its CFG, its instructions, and the bookkeeping a
/// pipeline needs to know "has anything changed since I last looked" (§3,
/// §5).
///
/// Blocks are owned in a dense [`PrimaryMap`] keyed by [`BlockId`]; a
/// routine's `Vip`s (which a lifter chooses and are not necessarily dense)
/// are resolved to a `BlockId` through a side table. Mutating methods take
/// `&mut self` — per §5 the routine-level "lock" this implies is the
/// caller's responsibility (share a `Routine` behind a `Mutex` for
/// concurrent access, the same way `cranelift-codegen::ir::Function` is not
/// self-synchronizing either); the epoch counters are plain `AtomicU64` so
/// they stay readable without acquiring whatever lock the caller chose.
pub struct Routine {
    arch: ArchitectureIdentifier,
    blocks: PrimaryMap<BlockId, BasicBlock>,
    vip_index: HashMap<Vip, BlockId>,
    entry: Option<BlockId>,
    routine_convention: CallConvention,
    default_subroutine_convention: CallConvention,
    call_site_conventions: HashMap<Vip, CallConvention>,
    internal_registers: PrimaryMap<RegId, BitCount>,
    epoch: AtomicU64,
    cfg_epoch: AtomicU64,
}

impl Routine {
    pub fn new(arch: ArchitectureIdentifier) -> Self {
        let convention = arch.default_calling_convention();
        Routine {
            arch,
            blocks: PrimaryMap::new(),
            vip_index: HashMap::new(),
            entry: None,
            routine_convention: convention.clone(),
            default_subroutine_convention: convention,
            call_site_conventions: HashMap::new(),
            internal_registers: PrimaryMap::new(),
            epoch: AtomicU64::new(0),
            cfg_epoch: AtomicU64::new(0),
        }
    }

    pub fn architecture(&self) -> ArchitectureIdentifier {
        self.arch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn cfg_epoch(&self) -> u64 {
        self.cfg_epoch.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    fn bump_cfg(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.cfg_epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Mint a fresh internal (virtual) register of the given width. Ids are
    /// monotonically increasing and never reused for the lifetime of this
    /// routine (§3).
    pub fn alloc_register(&mut self, bitcount: BitCount) -> RegisterDescriptor {
        let id = self.internal_registers.push(bitcount);
        self.bump();
        RegisterDescriptor::internal(id, bitcount)
    }

    /// Create a block at `vip` if one doesn't already exist there. The
    /// first block ever created becomes the entry unless
    /// [`Routine::set_entry`] is called explicitly afterward. Returns
    /// whether a new block was actually created.
    pub fn create_block(&mut self, vip: Vip) -> bool {
        if self.vip_index.contains_key(&vip) {
            return false;
        }
        let id = self.blocks.push(BasicBlock::new(vip));
        self.vip_index.insert(vip, id);
        if self.entry.is_none() {
            self.entry = Some(id);
        }
        self.bump();
        true
    }

    pub fn block_id(&self, vip: Vip) -> Option<BlockId> {
        self.vip_index.get(&vip).copied()
    }

    pub fn block(&self, vip: Vip) -> Option<&BasicBlock> {
        self.block_id(vip).map(|id| &self.blocks[id])
    }

    pub fn block_by_id(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks.iter()
    }

    /// The number of *live* blocks. `remove_block` never frees the
    /// underlying `PrimaryMap` slot (there is no removal API for it), so
    /// this counts through `vip_index` rather than `self.blocks.len()` —
    /// the latter would include every orphaned slot ever removed and could
    /// never decrease.
    pub fn block_count(&self) -> usize {
        self.vip_index.len()
    }

    pub fn entry(&self) -> Option<Vip> {
        self.entry.map(|id| self.blocks[id].vip())
    }

    pub fn entry_id(&self) -> Option<BlockId> {
        self.entry
    }

    /// Designate `vip` as the entry block explicitly, overriding whichever
    /// block was created first.
    pub fn set_entry(&mut self, vip: Vip) -> Result<(), IrError> {
        let id = self.block_id(vip).ok_or(IrError::BlockNotFound(vip))?;
        self.entry = Some(id);
        self.bump();
        Ok(())
    }

    /// Link `from -> to`, adding the reciprocal predecessor edge on `to`
    /// (§3's symmetric-edge invariant).
    pub fn add_successor(&mut self, from: Vip, to: Vip) -> Result<(), IrError> {
        let from_id = self.block_id(from).ok_or(IrError::BlockNotFound(from))?;
        let to_id = self.block_id(to).ok_or(IrError::BlockNotFound(to))?;
        self.blocks[from_id].add_successor_id(to_id);
        self.blocks[to_id].add_predecessor_id(from_id);
        self.bump_cfg();
        Ok(())
    }

    /// Break the `from -> to` edge symmetrically, without removing either
    /// block.
    pub fn remove_successor(&mut self, from: Vip, to: Vip) -> Result<(), IrError> {
        let from_id = self.block_id(from).ok_or(IrError::BlockNotFound(from))?;
        let to_id = self.block_id(to).ok_or(IrError::BlockNotFound(to))?;
        self.blocks[from_id].remove_successor_id(to_id);
        self.blocks[to_id].remove_predecessor_id(from_id);
        self.bump_cfg();
        Ok(())
    }

    /// Remove a block after nullifying every edge that touches it. If the
    /// removed block was the entry, any surviving block becomes the new
    /// entry (arbitrarily — callers that care should call
    /// [`Routine::set_entry`] afterward).
    pub fn remove_block(&mut self, vip: Vip) -> Result<(), IrError> {
        let id = self.block_id(vip).ok_or(IrError::BlockNotFound(vip))?;
        let predecessors: Vec<BlockId> = self.blocks[id].predecessors().to_vec();
        let successors: Vec<BlockId> = self.blocks[id].successors().to_vec();
        for pred in predecessors {
            self.blocks[pred].remove_successor_id(id);
        }
        for succ in successors {
            self.blocks[succ].remove_predecessor_id(id);
        }
        self.vip_index.remove(&vip);
        self.call_site_conventions.remove(&vip);
        // `PrimaryMap` has no removal; the slot is left as an orphaned,
        // unreachable block with no edges and no VIP pointing at it. Any
        // CFG walk starting from `entry` (or any reachable traversal) never
        // visits it, which is all the rest of this crate relies on.
        if self.entry == Some(id) {
            self.entry = self.vip_index.values().copied().find(|k| *k != id);
        }
        self.bump_cfg();
        Ok(())
    }

    pub fn add_instruction(&mut self, vip: Vip, instr: Instruction) -> Result<(), IrError> {
        let id = self.block_id(vip).ok_or(IrError::BlockNotFound(vip))?;
        self.blocks[id].instructions_mut().push(instr);
        self.bump();
        Ok(())
    }

    pub fn insert_instruction(&mut self, vip: Vip, index: usize, instr: Instruction) -> Result<(), IrError> {
        let id = self.block_id(vip).ok_or(IrError::BlockNotFound(vip))?;
        let instructions = self.blocks[id].instructions_mut();
        if index > instructions.len() {
            return Err(IrError::InstructionIndexOutOfRange {
                vip,
                index,
                len: instructions.len(),
            });
        }
        instructions.insert(index, instr);
        self.bump();
        Ok(())
    }

    pub fn replace_instruction(&mut self, vip: Vip, index: usize, instr: Instruction) -> Result<Instruction, IrError> {
        let id = self.block_id(vip).ok_or(IrError::BlockNotFound(vip))?;
        let instructions = self.blocks[id].instructions_mut();
        if index >= instructions.len() {
            return Err(IrError::InstructionIndexOutOfRange {
                vip,
                index,
                len: instructions.len(),
            });
        }
        let old = std::mem::replace(&mut instructions[index], instr);
        self.bump();
        Ok(old)
    }

    pub fn remove_instruction(&mut self, vip: Vip, index: usize) -> Result<Instruction, IrError> {
        let id = self.block_id(vip).ok_or(IrError::BlockNotFound(vip))?;
        let instructions = self.blocks[id].instructions_mut();
        if index >= instructions.len() {
            return Err(IrError::InstructionIndexOutOfRange {
                vip,
                index,
                len: instructions.len(),
            });
        }
        let removed = instructions.remove(index);
        self.bump();
        Ok(removed)
    }

    pub fn routine_convention(&self) -> &CallConvention {
        &self.routine_convention
    }

    pub fn set_routine_convention(&mut self, convention: CallConvention) {
        self.routine_convention = convention;
        self.bump();
    }

    pub fn default_subroutine_convention(&self) -> &CallConvention {
        &self.default_subroutine_convention
    }

    pub fn set_default_subroutine_convention(&mut self, convention: CallConvention) {
        self.default_subroutine_convention = convention;
        self.bump();
    }

    /// The convention a call at `vip` should use: the call-site override if
    /// one was set, otherwise [`Routine::default_subroutine_convention`].
    pub fn call_site_convention(&self, vip: Vip) -> &CallConvention {
        self.call_site_conventions
            .get(&vip)
            .unwrap_or(&self.default_subroutine_convention)
    }

    pub fn set_call_site_convention(&mut self, vip: Vip, convention: CallConvention) {
        self.call_site_conventions.insert(vip, convention);
        self.bump();
    }

    /// Register kinds that exist independent of any one instance — used by
    /// `deobf-passes::IStackRefSubstitution` to recognize the architectural
    /// stack register regardless of which concrete id the lifter assigned.
    pub fn is_stack_pointer(&self, reg: RegisterDescriptor) -> bool {
        matches!(reg.kind, RegisterKind::StackPointer)
    }
}
