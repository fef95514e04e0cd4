//! merge-basic-block-sequences: splice a maximal chain of single-successor
//! / single-predecessor blocks into one block.
//!
//! Grounded on the original reference implementation's
//! `MergeBasicBlockSequences`: starting from each block in layout order,
//! walk forward while the current block has exactly one successor S and S
//! has exactly one predecessor (the current block) — these can never
//! execute independently of each other, so they can be fused without
//! changing semantics. The chain's instructions are concatenated, in order,
//! into the first block (dropping each intermediate jump terminator); any
//! phi in a block right after the chain that names one of the fused-away
//! blocks as a predecessor is re-pointed at the first block; every
//! fused-away block is then deleted.

use crate::function::{BlockId, Function};
use crate::instruction::Op;

/// Find the maximal chain of blocks starting at `start` that are fusable:
/// each block in the chain but the last has exactly one successor, which in
/// turn has exactly one predecessor (the block before it).
fn find_chain(function: &Function, start: BlockId) -> Vec<BlockId> {
    let mut chain = vec![start];
    loop {
        let current = *chain.last().unwrap();
        let succs = function.successors(current, false);
        if succs.len() != 1 {
            break;
        }
        let next = succs[0];
        if chain.contains(&next) || function.block(next).predecessors().len() != 1 {
            break;
        }
        chain.push(next);
    }
    chain
}

fn retarget_phi_predecessor(function: &mut Function, block: BlockId, from: BlockId, to: BlockId) {
    let ids: Vec<_> = function.block(block).insts().to_vec();
    for id in ids {
        if let Op::Phi { pairs } = &mut function.inst_mut(id).op {
            for (pred, _) in pairs.iter_mut() {
                if *pred == from {
                    *pred = to;
                }
            }
        }
    }
}

/// Fuse every maximal chain of single-successor/single-predecessor blocks
/// into their first member, deleting the rest.
#[tracing::instrument(skip(function))]
pub fn process_function(function: &mut Function) {
    let mut merged = 0;
    let mut visited = std::collections::HashSet::new();

    for &start in function.blocks_in_order().to_vec().iter() {
        if visited.contains(&start) || !function.blocks_in_order().contains(&start) {
            continue;
        }
        let chain = find_chain(function, start);
        if chain.len() < 2 {
            visited.insert(start);
            continue;
        }

        let last = *chain.last().unwrap();
        let after = function.successors(last, false);

        // Gather every (op, origin) pair across the whole chain, in order,
        // dropping every terminator except the last block's own — that one
        // becomes `start`'s new terminator.
        let mut flattened = Vec::new();
        for (ci, &block) in chain.iter().enumerate() {
            let is_last_block = ci == chain.len() - 1;
            let insts: Vec<_> = function.block(block).insts().to_vec();
            for (ii, &id) in insts.iter().enumerate() {
                let is_last_inst = is_last_block && ii == insts.len() - 1;
                if !is_last_inst && function.inst(id).is_terminator() {
                    continue;
                }
                flattened.push((function.inst(id).op.clone(), function.inst(id).origin.clone()));
            }
        }

        while !function.block(start).is_empty() {
            function.remove_inst_at(start, 0);
        }
        for (op, origin) in flattened {
            let index = function.block(start).len();
            function.insert_inst_at(start, index, crate::instruction::InstData::with_origin(op, origin));
        }

        for &succ in &after {
            retarget_phi_predecessor(function, succ, last, start);
        }

        for &block in &chain[1..] {
            function.remove_block(block);
        }
        merged += chain.len() - 1;
        for &block in &chain {
            visited.insert(block);
        }
    }

    if merged > 0 {
        let rebuilt = crate::analysis::predecessors::compute(function, false);
        for &block in function.blocks_in_order().to_vec().iter() {
            *function.block_mut(block).predecessors_mut() = rebuilt[&block].clone();
        }
    }

    tracing::trace!(merged, "merge-basic-block-sequences pass complete");
}
