//! Use maps: for every computing instruction, the set of instructions
//! consuming its value.
//!
//! In FORM_EXPR a use inside an expression tree is attributed two ways: the
//! canonical, deepest sub-instruction actually holding the value as an
//! operand (the "immediate consumer"), and the tree's root (non-inlined)
//! instruction, since that's the unit most passes and the renderer reason
//! about. [`UseMap::consumers_of`] returns the former; [`UseMap::root_consumers_of`]
//! the latter.

use indexmap::{IndexMap, IndexSet};

use crate::function::Function;
use crate::instruction::InstId;

use super::inlined;

pub struct UseMap {
    consumers: IndexMap<InstId, IndexSet<InstId>>,
    root_consumers: IndexMap<InstId, IndexSet<InstId>>,
}

impl UseMap {
    pub fn compute(function: &Function) -> Self {
        let mut consumers: IndexMap<InstId, IndexSet<InstId>> = IndexMap::new();
        let mut root_consumers: IndexMap<InstId, IndexSet<InstId>> = IndexMap::new();
        for (_, _, root) in function.iter_live_insts() {
            for member in inlined::walk(function, root) {
                for input in function.inst(member).inputs() {
                    if let Some(producer) = input.producer() {
                        consumers.entry(producer).or_default().insert(member);
                        root_consumers.entry(producer).or_default().insert(root);
                    }
                }
            }
        }
        UseMap { consumers, root_consumers }
    }

    /// The deepest sub-instructions that directly hold `inst`'s value as an
    /// operand — the canonical representation.
    pub fn consumers_of(&self, inst: InstId) -> Option<&IndexSet<InstId>> {
        self.consumers.get(&inst)
    }

    /// The root (non-inlined, block-resident) instructions whose expression
    /// tree transitively consumes `inst`'s value.
    pub fn root_consumers_of(&self, inst: InstId) -> Option<&IndexSet<InstId>> {
        self.root_consumers.get(&inst)
    }

    pub fn use_count(&self, inst: InstId) -> usize {
        self.consumers_of(inst).map(IndexSet::len).unwrap_or(0)
    }

    pub fn is_used_exactly_once(&self, inst: InstId) -> bool {
        self.use_count(inst) == 1
    }

    pub fn is_unused(&self, inst: InstId) -> bool {
        self.use_count(inst) == 0
    }
}
