//! Dominance frontiers, computed bottom-up over the dominator tree.
//!
//! `DF(B) = DF_local(B) ∪ ⋃_{C ∈ children(B)} { W ∈ DF(C) | idom(W) ≠ B }`,
//! the standard Cytron/Ferrante/Rosen/Wegman formulation: a successor `S` of
//! `B` belongs to `DF_local(B)` when `B` does not immediately dominate `S`;
//! a block in a dominator-tree child's frontier is propagated up unless `B`
//! itself immediately dominates it.

use indexmap::IndexSet;

use crate::function::{BlockId, Function};

use super::dominance::DominatorTree;

pub struct DominanceFrontiers {
    frontier: indexmap::IndexMap<BlockId, IndexSet<BlockId>>,
}

impl DominanceFrontiers {
    pub fn compute(function: &Function, dom: &DominatorTree) -> Self {
        let mut frontier = indexmap::IndexMap::new();
        Self::visit_post_order(dom.root(), function, dom, &mut frontier);
        DominanceFrontiers { frontier }
    }

    fn visit_post_order(
        block: BlockId,
        function: &Function,
        dom: &DominatorTree,
        frontier: &mut indexmap::IndexMap<BlockId, IndexSet<BlockId>>,
    ) {
        for &child in dom.children(block) {
            Self::visit_post_order(child, function, dom, frontier);
        }
        let mut df = IndexSet::new();
        for succ in function.successors(block, false) {
            if dom.idom(succ) != Some(block) {
                df.insert(succ);
            }
        }
        for &child in dom.children(block) {
            for &w in &frontier[&child] {
                if dom.idom(w) != Some(block) {
                    df.insert(w);
                }
            }
        }
        frontier.insert(block, df);
    }

    pub fn of(&self, block: BlockId) -> &IndexSet<BlockId> {
        self.frontier.get(&block).expect("dominance frontier requested for a block unreachable from entry")
    }

    /// The iterated dominance frontier of a set of blocks: the fixpoint of
    /// repeatedly unioning in the frontier of every newly-added block. This
    /// is the set SSA construction places a register's ϕ-nodes over, seeded
    /// with that register's store sites.
    pub fn iterated(&self, seeds: impl IntoIterator<Item = BlockId>) -> IndexSet<BlockId> {
        let mut result = IndexSet::new();
        let mut worklist: Vec<BlockId> = seeds.into_iter().collect();
        while let Some(b) = worklist.pop() {
            for &d in self.of(b) {
                if result.insert(d) {
                    worklist.push(d);
                }
            }
        }
        result
    }
}
