//! strip-unused-branches: collapse a `branch` into a plain `jump` when both
//! (or the one present) arm is an empty, unreferenced relay block.
//!
//! Grounded on the original reference implementation's
//! `StripUnusedBranches`: match a block B ending in `branch` to T/F targets
//! forming an if/then(/else) shape — each of T (and F, if distinct from the
//! join) has B as its only predecessor and a single successor, the same join
//! block J — and where T (and F) contain nothing but their own jump
//! terminator and are not referenced by any phi in J or any other successor.
//! On a match, B's terminator becomes `jump J` and T (and F) are deleted.

use crate::analysis::inlined;
use crate::function::{BlockId, Function};
use crate::instruction::{InstData, Op};

struct PatternMatch {
    then_bb: BlockId,
    else_bb: Option<BlockId>,
    next_bb: BlockId,
}

fn is_referenced_by_phi(function: &Function, bb: BlockId) -> bool {
    for succ in function.successors(bb, false) {
        for &root in function.block(succ).insts() {
            for member in inlined::walk(function, root) {
                if let Op::Phi { pairs } = &function.inst(member).op {
                    if pairs.iter().any(|(pred, _)| *pred == bb) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

fn match_if_pattern(function: &Function, left: BlockId, right: BlockId) -> Option<PatternMatch> {
    if function.block(left).predecessors().len() != 1 {
        return None;
    }
    let left_succs = function.successors(left, false);
    if left_succs.len() != 1 {
        return None;
    }
    let next_bb = left_succs[0];

    if next_bb == right {
        return Some(PatternMatch { then_bb: left, else_bb: None, next_bb });
    }
    let right_preds = function.block(right).predecessors();
    let right_succs = function.successors(right, false);
    if right_preds.len() == 1 && right_succs.len() == 1 && right_succs[0] == next_bb {
        return Some(PatternMatch { then_bb: left, else_bb: Some(right), next_bb });
    }
    None
}

fn is_empty_relay(function: &Function, bb: BlockId) -> bool {
    function.block(bb).len() == 1 && !is_referenced_by_phi(function, bb)
}

/// Collapse every if/then(/else) branch whose arms are empty, unreferenced
/// relay blocks into a plain jump, deleting the relay blocks.
#[tracing::instrument(skip(function))]
pub fn process_function(function: &mut Function) {
    let mut to_remove: Vec<BlockId> = Vec::new();
    let mut stripped = 0;

    for &block in function.blocks_in_order().to_vec().iter() {
        let Some(term) = function.terminator(block) else { continue };
        let (if_true, if_false) = match &function.inst(term).op {
            Op::Branch { if_true, if_false, .. } => (*if_true, *if_false),
            _ => continue,
        };

        let Some(matched) = match_if_pattern(function, if_true, if_false).or_else(|| match_if_pattern(function, if_false, if_true)) else {
            continue;
        };
        if !is_empty_relay(function, matched.then_bb) {
            continue;
        }
        if let Some(else_bb) = matched.else_bb {
            if !is_empty_relay(function, else_bb) {
                continue;
            }
        }

        let origin = function.inst(term).origin.clone();
        let last_index = function.block(block).len() - 1;
        function.replace_inst_at(block, last_index, InstData::with_origin(Op::Jump { dest: matched.next_bb }, origin));

        to_remove.push(matched.then_bb);
        if let Some(else_bb) = matched.else_bb {
            to_remove.push(else_bb);
        }
        stripped += 1;
    }

    if !to_remove.is_empty() {
        for block in to_remove {
            function.remove_block(block);
        }
        let rebuilt = crate::analysis::predecessors::compute(function, false);
        for &block in function.blocks_in_order().to_vec().iter() {
            *function.block_mut(block).predecessors_mut() = rebuilt[&block].clone();
        }
    }
    tracing::trace!(stripped, "strip-unused-branches pass complete");
}
