//! Basic blocks and functions: the arena-addressed containers instructions
//! and blocks live in.
//!
//! Blocks and instructions are identified by stable arena ids (`BlockId`,
//! `InstId`) rather than by vector position, per the design notes' guidance
//! to use "an arena of blocks and instructions addressed by stable indices
//! or generational IDs" instead of owning back-edges directly. A separate
//! `order` vector records the current, live, front-to-back layout of blocks
//! (so "index 0 is the entry" and "ordered list of basic blocks" hold at the
//! API level) without ever renumbering an existing `BlockId` when a new
//! entry block is spliced in front, or when a later block is deleted.

use indexmap::IndexSet;

use crate::instruction::{InstData, InstId, Op};
use crate::types::TypeId;
use crate::value::Value;

/// A stable handle to a basic block inside a [`Function`]'s block arena.
/// Never reused or renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

/// The two representational modes of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// A flat sequence of instructions per block.
    Pure,
    /// Some computing instructions are marked `inline`: consumed by exactly
    /// one other instruction and spliced into that user's expression tree,
    /// no longer present in any block's live instruction list.
    Expr,
}

/// An ordered sequence of instructions belonging to one function, plus a
/// cached set of predecessor blocks. [`Function`] keeps this cache in sync
/// whenever it mutates a block's instruction list through its own
/// insert/remove/replace helpers; passes that rewire predecessor edges
/// directly (merge-basic-block-sequences re-targeting a successor's
/// predecessor set) do so explicitly through [`Function::block_mut`].
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    insts: Vec<InstId>,
    preds: IndexSet<BlockId>,
}

impl BasicBlock {
    pub fn insts(&self) -> &[InstId] {
        &self.insts
    }

    pub fn predecessors(&self) -> &IndexSet<BlockId> {
        &self.preds
    }

    pub fn predecessors_mut(&mut self) -> &mut IndexSet<BlockId> {
        &mut self.preds
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }
}

/// An ordered list of basic blocks (index 0 is the entry), a return type, an
/// argument-type list, and a form tag.
pub struct Function {
    pub return_type: TypeId,
    pub arg_types: Vec<TypeId>,
    pub form: Form,
    blocks: Vec<Option<BasicBlock>>,
    insts: Vec<InstData>,
    order: Vec<BlockId>,
}

impl Function {
    /// A new function starts with exactly one, empty, entry block.
    pub fn new(return_type: TypeId, arg_types: Vec<TypeId>) -> Self {
        let mut f = Function {
            return_type,
            arg_types,
            form: Form::Pure,
            blocks: Vec::new(),
            insts: Vec::new(),
            order: Vec::new(),
        };
        let entry = f.push_block();
        f.order.push(entry);
        f
    }

    fn push_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Some(BasicBlock::default()));
        id
    }

    pub fn entry(&self) -> BlockId {
        self.order[0]
    }

    /// Append a new, empty block to the function.
    pub fn create_block(&mut self) -> BlockId {
        let id = self.push_block();
        self.order.push(id);
        id
    }

    /// Splice a new, empty block in front of the current entry, and make it
    /// the new entry. Used by SSA construction to install a block of
    /// seeding `rload`s that dominates every other block.
    pub fn create_entry_block(&mut self) -> BlockId {
        let id = self.push_block();
        self.order.insert(0, id);
        id
    }

    /// Remove a block from the live layout. Its arena slot is cleared so
    /// that any stale reference to it panics instead of silently reading
    /// garbage.
    pub fn remove_block(&mut self, id: BlockId) {
        self.order.retain(|&b| b != id);
        self.blocks[id.0 as usize] = None;
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks[id.0 as usize].as_ref().expect("use of a removed block")
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks[id.0 as usize].as_mut().expect("use of a removed block")
    }

    /// The function's blocks, in their current front-to-back layout order;
    /// `blocks_in_order()[0]` is always the entry.
    pub fn blocks_in_order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn inst(&self, id: InstId) -> &InstData {
        &self.insts[id.0 as usize]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut InstData {
        &mut self.insts[id.0 as usize]
    }

    fn alloc_inst(&mut self, data: InstData) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(data);
        id
    }

    /// Allocate an instruction in the arena without placing it in any
    /// block's live list. Used for SSA construction's `DummyPhiArgument`
    /// sentinels, which are referenced only from a ϕ-node's pairs and are
    /// never themselves "in" a block.
    pub(crate) fn alloc_floating_inst(&mut self, data: InstData) -> InstId {
        self.alloc_inst(data)
    }

    fn successors_or_empty(&self, block: BlockId) -> Vec<BlockId> {
        match self.block(block).insts.last() {
            Some(&last) => self.inst(last).op.successors(true),
            None => vec![],
        }
    }

    fn resync_preds(&mut self, block: BlockId, before: &[BlockId], after: &[BlockId]) {
        for b in before {
            if !after.contains(b) {
                if let Some(bb) = self.blocks[b.0 as usize].as_mut() {
                    bb.preds.shift_remove(&block);
                }
            }
        }
        for b in after {
            if !before.contains(b) {
                if let Some(bb) = self.blocks[b.0 as usize].as_mut() {
                    bb.preds.insert(block);
                }
            }
        }
    }

    /// Insert a new instruction at `index` within `block`'s live list,
    /// keeping predecessor caches of any affected successor in sync.
    pub fn insert_inst_at(&mut self, block: BlockId, index: usize, data: InstData) -> InstId {
        let before = self.successors_or_empty(block);
        let id = self.alloc_inst(data);
        self.block_mut(block).insts.insert(index, id);
        let after = self.successors_or_empty(block);
        self.resync_preds(block, &before, &after);
        id
    }

    /// Append a new instruction to the end of `block`'s live list.
    pub fn append_inst(&mut self, block: BlockId, data: InstData) -> InstId {
        let index = self.block(block).len();
        self.insert_inst_at(block, index, data)
    }

    /// Remove and return the id of the instruction at `index` in `block`'s
    /// live list. The instruction's arena record is left untouched (it may
    /// still be reachable through another instruction's input, e.g. when
    /// `to-expr` inlines it).
    pub fn remove_inst_at(&mut self, block: BlockId, index: usize) -> InstId {
        let before = self.successors_or_empty(block);
        let id = self.block_mut(block).insts.remove(index);
        let after = self.successors_or_empty(block);
        self.resync_preds(block, &before, &after);
        id
    }

    /// Replace the instruction at `index` with a newly-built one, returning
    /// the new id. The old arena record is left in place but is no longer
    /// reachable from `block`'s live list; callers that need to retarget
    /// existing references to the old value must call
    /// [`Function::replace_value`] themselves (this mirrors the instruction
    /// record never being freed while a use might remain).
    pub fn replace_inst_at(&mut self, block: BlockId, index: usize, data: InstData) -> InstId {
        let before = self.successors_or_empty(block);
        let id = self.alloc_inst(data);
        self.block_mut(block).insts[index] = id;
        let after = self.successors_or_empty(block);
        self.resync_preds(block, &before, &after);
        id
    }

    pub fn terminator(&self, block: BlockId) -> Option<InstId> {
        self.block(block).insts.last().copied()
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.terminator(block).map(|id| self.inst(id).is_terminator()).unwrap_or(false)
    }

    /// Successors of `block`, derived from its last instruction.
    /// `allow_incomplete` controls whether an unterminated block yields `[]`
    /// (a mid-construction query) or panics.
    pub fn successors(&self, block: BlockId, allow_incomplete: bool) -> Vec<BlockId> {
        match self.block(block).insts.last() {
            Some(&last) => self.inst(last).op.successors(allow_incomplete),
            None => {
                assert!(allow_incomplete, "successors() called on an empty block without allow_incomplete");
                vec![]
            }
        }
    }

    /// Rewrite every occurrence of `old` to `new` across every live
    /// instruction in the function.
    pub fn replace_value(&mut self, old: Value, new: Value) {
        let order = self.order.clone();
        for block in order {
            let inst_ids: Vec<InstId> = self.block(block).insts.clone();
            for id in inst_ids {
                self.inst_mut(id).map_inputs(&mut |v| if v == old { new } else { v });
            }
        }
    }

    /// Iterate `(block, index, inst_id)` for every live instruction, in
    /// layout order. Used by passes that need to enumerate the whole
    /// function (dead-code elimination, copy elimination).
    pub fn iter_live_insts(&self) -> impl Iterator<Item = (BlockId, usize, InstId)> + '_ {
        self.order.iter().flat_map(move |&block| {
            self.block(block).insts.iter().enumerate().map(move |(i, &id)| (block, i, id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Context;

    #[test]
    fn new_function_has_one_empty_entry_block() {
        let ctx = Context::new(32);
        let f = Function::new(ctx.void_type, vec![]);
        assert_eq!(f.blocks_in_order(), &[f.entry()]);
        assert!(f.block(f.entry()).is_empty());
    }

    #[test]
    fn create_entry_block_becomes_the_new_entry_without_renumbering() {
        let ctx = Context::new(32);
        let mut f = Function::new(ctx.void_type, vec![]);
        let old_entry = f.entry();
        let new_entry = f.create_entry_block();
        assert_eq!(f.entry(), new_entry);
        assert_ne!(new_entry, old_entry);
        assert_eq!(f.blocks_in_order(), &[new_entry, old_entry]);
        assert!(f.block(old_entry).is_empty());
    }

    #[test]
    fn inserting_a_jump_updates_the_target_predecessor_cache() {
        let ctx = Context::new(32);
        let mut f = Function::new(ctx.void_type, vec![]);
        let entry = f.entry();
        let target = f.create_block();
        f.append_inst(entry, InstData::new(Op::Jump { dest: target }));
        assert!(f.block(target).predecessors().contains(&entry));
    }

    #[test]
    fn removing_a_block_clears_its_arena_slot() {
        let ctx = Context::new(32);
        let mut f = Function::new(ctx.void_type, vec![]);
        let b = f.create_block();
        f.remove_block(b);
        assert!(!f.blocks_in_order().contains(&b));
    }

    #[test]
    #[should_panic]
    fn using_a_removed_block_panics() {
        let ctx = Context::new(32);
        let mut f = Function::new(ctx.void_type, vec![]);
        let b = f.create_block();
        f.remove_block(b);
        f.block(b);
    }
}
