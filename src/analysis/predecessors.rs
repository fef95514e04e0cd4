//! Predecessor-edge computation, from scratch.
//!
//! [`crate::function::BasicBlock`] keeps an incrementally-maintained
//! predecessor cache so callers don't pay for a full recompute on every
//! query. This module is the from-scratch reference computation: it
//! iterates every block's successor edges and accumulates the reverse
//! edges, independent of whatever the incremental cache currently holds.
//! Tests use it to check the cache hasn't drifted; passes that rewire CFG
//! edges directly (merge-basic-block-sequences) use it to rebuild from a
//! known-good state rather than trust partial cache bookkeeping.

use indexmap::{IndexMap, IndexSet};

use crate::function::{BlockId, Function};

/// Predecessor sets for every block currently in `function`'s layout,
/// computed from each block's successor edges.
///
/// `allow_incomplete` controls whether an unterminated block contributes no
/// successor edges (appropriate mid-construction) or causes this function to
/// panic (a fully-built function must never contain one).
pub fn compute(function: &Function, allow_incomplete: bool) -> IndexMap<BlockId, IndexSet<BlockId>> {
    let mut preds: IndexMap<BlockId, IndexSet<BlockId>> = function
        .blocks_in_order()
        .iter()
        .map(|&b| (b, IndexSet::new()))
        .collect();
    for &block in function.blocks_in_order() {
        for succ in function.successors(block, allow_incomplete) {
            preds.entry(succ).or_default().insert(block);
        }
    }
    preds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{InstData, Op};
    use crate::types::Context;

    #[test]
    fn predecessors_match_successor_edges() {
        let ctx = Context::new(32);
        let mut f = Function::new(ctx.void_type, vec![]);
        let entry = f.entry();
        let target = f.create_block();
        f.append_inst(entry, InstData::new(Op::Jump { dest: target }));
        f.append_inst(target, InstData::new(Op::Ret { value: None }));

        let preds = compute(&f, false);
        assert!(preds[&target].contains(&entry));
        assert!(preds[&entry].is_empty());
    }

    #[test]
    fn matches_the_functions_incremental_cache() {
        let ctx = Context::new(32);
        let mut f = Function::new(ctx.void_type, vec![]);
        let entry = f.entry();
        let a = f.create_block();
        let b = f.create_block();
        let cond = ctx.const_int(ctx.bool_type, 1).unwrap();
        f.append_inst(entry, InstData::new(Op::Branch { cond, if_true: a, if_false: b }));
        f.append_inst(a, InstData::new(Op::Ret { value: None }));
        f.append_inst(b, InstData::new(Op::Ret { value: None }));

        let preds = compute(&f, false);
        for &block in f.blocks_in_order() {
            assert_eq!(preds[&block].iter().collect::<Vec<_>>(), f.block(block).predecessors().iter().collect::<Vec<_>>());
        }
    }
}
